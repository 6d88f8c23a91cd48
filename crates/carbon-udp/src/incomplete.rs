// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Expired entries are scanned out at most once per this interval.
const PURGE_INTERVAL: Duration = Duration::from_secs(1);

struct IncompleteRecord {
    deadline: Instant,
    data: Vec<u8>,
}

/// Holds the delimiter-less tail of each sender's last datagram until the
/// sender's next datagram reclaims it or the deadline passes.
///
/// Single-writer: only the ingestion loop reads or writes this map, which is
/// why it carries no lock. Any future design with multiple reader tasks on
/// one socket must shard the store by sender address or put a lock in front
/// of it.
pub(crate) struct IncompleteStorage {
    records: HashMap<SocketAddr, IncompleteRecord, FnvBuildHasher>,
    expires: Duration,
    max_size: usize,
    max_fragment_len: Option<usize>,
    next_purge: Instant,
}

impl IncompleteStorage {
    pub(crate) fn new(
        expires: Duration,
        max_size: usize,
        max_fragment_len: Option<usize>,
    ) -> Self {
        Self {
            records: HashMap::default(),
            expires,
            max_size,
            max_fragment_len,
            next_purge: Instant::now() + PURGE_INTERVAL,
        }
    }

    /// Stores `data` as the pending fragment for `peer`, overwriting any
    /// fragment already held. Returns false when the fragment exceeds the
    /// configured length cap and was dropped instead.
    pub(crate) fn store(&mut self, peer: SocketAddr, data: Vec<u8>) -> bool {
        if let Some(max_len) = self.max_fragment_len {
            if data.len() > max_len {
                return false;
            }
        }
        self.records.insert(
            peer,
            IncompleteRecord {
                deadline: Instant::now() + self.expires,
                data,
            },
        );
        self.check_and_clear();
        true
    }

    /// Removes and returns the fragment for `peer`. A fragment past its
    /// deadline is discarded rather than returned.
    pub(crate) fn pop(&mut self, peer: &SocketAddr) -> Option<Vec<u8>> {
        let record = self.records.remove(peer)?;
        if record.deadline <= Instant::now() {
            return None;
        }
        Some(record.data)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    // A purge only runs once the store is at capacity and the previous purge
    // is at least PURGE_INTERVAL in the past, so the full scan stays
    // amortized no matter how hot the store loop is.
    fn check_and_clear(&mut self) {
        if self.records.len() < self.max_size {
            return;
        }
        let now = Instant::now();
        if self.next_purge > now {
            return;
        }
        self.purge(now);
    }

    fn purge(&mut self, now: Instant) {
        self.records.retain(|_, record| record.deadline > now);
        self.next_purge = now + PURGE_INTERVAL;
    }
}
