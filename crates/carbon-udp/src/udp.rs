// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP ingestion for the Graphite plaintext protocol.
//!
//! This module implements the receiver's three moving parts: the ingestion
//! loop that reads datagrams and reassembles newline-delimited records split
//! across datagram boundaries, the periodic reporter that checkpoints the
//! ingestion counters into the output channel, and the lifecycle surface
//! that binds the socket and coordinates shutdown.

use crate::config::UdpConfig;
use crate::errors::{ParseError, ReceiverError};
use crate::incomplete::IncompleteStorage;
use crate::point::{self, Point};
use crate::stats::ReceiverStats;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Datagram receive buffer. One read never yields more than this many bytes.
const BUFFER_SIZE: usize = 2048;

// BufferReader abstracts the datagram source for the ingestion loop.
enum BufferReader {
    /// Bound UDP socket (the production transport)
    UdpSocket(UdpSocket),

    /// Mirror reader for testing - replays a fixed datagram
    #[allow(dead_code)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl BufferReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            BufferReader::UdpSocket(socket) => {
                let mut buf = [0; BUFFER_SIZE];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                Ok((buf[..amt].to_owned(), src))
            }
            BufferReader::MirrorTest(data, peer) => Ok((data.clone(), *peer)),
        }
    }
}

/// The ingestion loop: owns the socket, the per-sender fragment store, and
/// the parse-and-forward path.
struct IngestWorker {
    reader: BufferReader,
    out: mpsc::Sender<Point>,
    stats: Arc<ReceiverStats>,
    storage: IncompleteStorage,
    log_incomplete: bool,
    cancel_token: CancellationToken,
}

impl IngestWorker {
    /// Runs until the cancellation token fires. Transient read failures are
    /// counted and logged without stopping the loop; cancellation is the
    /// expected closure and touches no counter.
    async fn spin(mut self) {
        loop {
            let (datagram, peer) = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                read = self.reader.read() => match read {
                    Ok(read) => read,
                    Err(e) => {
                        self.stats.incr_errors();
                        error!("udp read failed: {e}");
                        continue;
                    }
                },
            };
            self.consume_datagram(&datagram, peer).await;
        }
        debug!("udp ingestion loop stopped");
    }

    /// Reassembles newline-delimited records from one datagram: any pending
    /// fragment from the same sender is logically prepended, every complete
    /// line is parsed and forwarded, and an unterminated tail is stored for
    /// the sender's next datagram.
    async fn consume_datagram(&mut self, datagram: &[u8], peer: SocketAddr) {
        let data = match self.storage.pop(&peer) {
            Some(mut fragment) => {
                fragment.extend_from_slice(datagram);
                fragment
            }
            None => datagram.to_vec(),
        };

        let mut rest: &[u8] = &data;
        loop {
            match rest.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let line = &rest[..pos];
                    rest = &rest[pos + 1..];
                    // skip empty lines
                    if !line.is_empty() {
                        self.consume_line(line).await;
                    }
                }
                None => {
                    if !rest.is_empty() {
                        if self.log_incomplete {
                            log_incomplete(peer, datagram, rest);
                        }
                        if self.storage.store(peer, rest.to_vec()) {
                            self.stats.incr_incomplete_received();
                        } else {
                            warn!(
                                "oversized fragment from {} dropped ({} bytes)",
                                peer,
                                rest.len()
                            );
                        }
                    }
                    break;
                }
            }
        }
    }

    async fn consume_line(&mut self, line: &[u8]) {
        let parsed = std::str::from_utf8(line)
            .map_err(|_| ParseError::InvalidUtf8)
            .and_then(point::parse);
        match parsed {
            Ok(point) => {
                self.stats.incr_metrics_received();
                self.forward(point).await;
            }
            Err(e) => {
                self.stats.incr_errors();
                info!("line dropped: {e}");
            }
        }
    }

    // The blocking send into the output channel is the receiver's only
    // backpressure mechanism. A shutdown request wins the race against a
    // stalled consumer; the in-flight point is dropped.
    async fn forward(&self, point: Point) {
        tokio::select! {
            biased;
            res = self.out.send(point) => {
                if res.is_err() {
                    error!("output channel closed, point dropped");
                }
            }
            _ = self.cancel_token.cancelled() => {
                debug!("shutdown during forward, in-flight point dropped");
            }
        }
    }
}

/// Logs a diagnostic for a datagram that ended mid-record. Large payloads
/// are previewed as first line, elided byte count, then the tail.
fn log_incomplete(peer: SocketAddr, datagram: &[u8], tail: &[u8]) {
    if let Some(p) = datagram.iter().position(|&b| b == b'\n') {
        if p + tail.len() + 10 < datagram.len() {
            warn!(
                "incomplete message from {}: \"{}\\n...({} bytes)...{}\"",
                peer,
                String::from_utf8_lossy(&datagram[..p]),
                datagram.len() - p - tail.len() - 2,
                String::from_utf8_lossy(tail),
            );
            return;
        }
    }
    warn!(
        "incomplete message from {}: {:?}",
        peer,
        String::from_utf8_lossy(datagram),
    );
}

/// Periodically checkpoints the ingestion counters and emits them as summary
/// points through the output channel.
struct StatsReporter {
    stats: Arc<ReceiverStats>,
    out: mpsc::Sender<Point>,
    graph_prefix: String,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl StatsReporter {
    async fn spin(self) {
        let mut ticker = interval(self.interval);
        ticker.tick().await; // discard first tick, which is instantaneous
        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                _ = ticker.tick() => self.checkpoint().await,
            }
        }
        debug!("udp stats reporter stopped");
    }

    async fn checkpoint(&self) {
        let snapshot = self.stats.checkpoint();
        debug!(
            metrics_received = snapshot.metrics_received,
            incomplete_received = snapshot.incomplete_received,
            errors = snapshot.errors,
            "udp checkpoint"
        );

        let timestamp = unix_now();
        self.emit("udp.metricsReceived", snapshot.metrics_received, timestamp)
            .await;
        self.emit(
            "udp.incompleteReceived",
            snapshot.incomplete_received,
            timestamp,
        )
        .await;
        self.emit("udp.errors", snapshot.errors, timestamp).await;
    }

    async fn emit(&self, metric: &str, value: u64, timestamp: i64) {
        let point = Point::new(
            format!("{}{}", self.graph_prefix, metric),
            value as f64,
            timestamp,
        );
        tokio::select! {
            biased;
            res = self.out.send(point) => {
                if res.is_err() {
                    error!("output channel closed, checkpoint point dropped");
                }
            }
            _ = self.cancel_token.cancelled() => {}
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

/// UDP receiver for the Graphite plaintext protocol.
///
/// Forwarded points go into the `out` channel handed to [`UdpReceiver::new`];
/// the channel's capacity sets how far the consumer may fall behind, since
/// the ingestion loop blocks on a full channel instead of dropping records.
pub struct UdpReceiver {
    config: UdpConfig,
    out: mpsc::Sender<Point>,
    stats: Arc<ReceiverStats>,
    cancel_token: CancellationToken,
    stopped: AtomicBool,
    local_addr: Option<SocketAddr>,
    ingest_task: Option<JoinHandle<()>>,
    stats_task: Option<JoinHandle<()>>,
}

impl UdpReceiver {
    pub fn new(config: UdpConfig, out: mpsc::Sender<Point>) -> Result<Self, ReceiverError> {
        config.validate()?;
        Ok(Self {
            config,
            out,
            stats: Arc::new(ReceiverStats::default()),
            cancel_token: CancellationToken::new(),
            stopped: AtomicBool::new(false),
            local_addr: None,
            ingest_task: None,
            stats_task: None,
        })
    }

    /// Binds the configured address and spawns the ingestion loop and the
    /// stats reporter. This is the only operation that reports failure by
    /// return value; from here on the receiver speaks through logs and
    /// counters.
    pub async fn listen(&mut self) -> Result<(), ReceiverError> {
        if self.ingest_task.is_some() {
            return Err(ReceiverError::AlreadyStarted);
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket = UdpSocket::bind(&addr).await?;
        let local_addr = socket.local_addr()?;
        self.local_addr = Some(local_addr);
        info!("udp: listening on {local_addr}");

        let worker = IngestWorker {
            reader: BufferReader::UdpSocket(socket),
            out: self.out.clone(),
            stats: Arc::clone(&self.stats),
            storage: IncompleteStorage::new(
                self.config.incomplete_expires,
                self.config.incomplete_max_size,
                self.config.max_fragment_len,
            ),
            log_incomplete: self.config.log_incomplete,
            cancel_token: self.cancel_token.clone(),
        };
        self.ingest_task = Some(tokio::spawn(worker.spin()));

        let reporter = StatsReporter {
            stats: Arc::clone(&self.stats),
            out: self.out.clone(),
            graph_prefix: self.config.graph_prefix.clone(),
            interval: self.config.stats_interval,
            cancel_token: self.cancel_token.clone(),
        };
        self.stats_task = Some(tokio::spawn(reporter.spin()));

        Ok(())
    }

    /// Address the socket is actually bound to. Useful when listening on
    /// port 0 in tests.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Counters accumulated by the ingestion loop since the last checkpoint.
    #[must_use]
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Signals shutdown and waits until both tasks have fully exited. After
    /// this returns, no further points are forwarded and the bound port is
    /// released. Repeated calls are no-ops.
    pub async fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_token.cancel();
        if let Some(task) = self.ingest_task.take() {
            if let Err(e) = task.await {
                error!("udp ingestion task failed: {e}");
            }
        }
        if let Some(task) = self.stats_task.take() {
            if let Err(e) = task.await {
                error!("udp stats task failed: {e}");
            }
        }
        info!("udp: stopped");
    }
}
