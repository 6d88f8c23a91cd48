// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use carbon_udp::{Point, UdpConfig, UdpReceiver};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

async fn start_receiver(config: UdpConfig) -> (UdpReceiver, mpsc::Receiver<Point>, SocketAddr) {
    let (tx, rx) = mpsc::channel(1_024);
    let mut receiver = UdpReceiver::new(config, tx).expect("invalid config");
    receiver.listen().await.expect("failed to bind");
    let addr = receiver.local_addr().expect("no bound address");
    (receiver, rx, addr)
}

fn localhost_config() -> UdpConfig {
    UdpConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..UdpConfig::default()
    }
}

async fn recv_point(rx: &mut mpsc::Receiver<Point>) -> Point {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for point")
        .expect("output channel closed")
}

#[tokio::test]
async fn udp_receiver_forwards_single_datagram() {
    let (mut receiver, mut rx, addr) = start_receiver(localhost_config()).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    client
        .send_to(b"servers.web01.load 0.42 1656581409\n", addr)
        .await
        .expect("send failed");

    let point = recv_point(&mut rx).await;
    assert_eq!(point.name, "servers.web01.load");
    assert_eq!(point.value, 0.42);
    assert_eq!(point.timestamp, 1_656_581_409);
    assert_eq!(receiver.stats().metrics_received(), 1);

    receiver.stop().await;
}

#[tokio::test]
async fn udp_receiver_reassembles_across_datagrams() {
    let (mut receiver, mut rx, addr) = start_receiver(localhost_config()).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    client
        .send_to(b"foo 1 100\nbar 2", addr)
        .await
        .expect("send failed");

    // the first record is complete and must arrive on its own
    let point = recv_point(&mut rx).await;
    assert_eq!(point, Point::new("foo".to_string(), 1.0, 100));

    client.send_to(b" 200\n", addr).await.expect("send failed");

    let point = recv_point(&mut rx).await;
    assert_eq!(point, Point::new("bar".to_string(), 2.0, 200));

    assert_eq!(receiver.stats().metrics_received(), 2);
    assert_eq!(receiver.stats().incomplete_received(), 1);
    assert_eq!(receiver.stats().errors(), 0);

    receiver.stop().await;
}

#[tokio::test]
async fn udp_receiver_interleaves_senders() {
    let (mut receiver, mut rx, addr) = start_receiver(localhost_config()).await;

    let alice = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    let bob = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");

    alice.send_to(b"alice.cpu 1", addr).await.expect("send");
    bob.send_to(b"bob.cpu 2 200\n", addr).await.expect("send");

    let point = recv_point(&mut rx).await;
    assert_eq!(point.name, "bob.cpu");

    alice.send_to(b"0 100\n", addr).await.expect("send");
    let point = recv_point(&mut rx).await;
    assert_eq!(point, Point::new("alice.cpu".to_string(), 10.0, 100));

    receiver.stop().await;
}

#[tokio::test]
async fn udp_receiver_emits_checkpoint_points() {
    let config = UdpConfig {
        stats_interval: Duration::from_millis(100),
        graph_prefix: "test.prefix.".to_string(),
        ..localhost_config()
    };
    let (mut receiver, mut rx, addr) = start_receiver(config).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    client
        .send_to(b"foo 1 100\n", addr)
        .await
        .expect("send failed");

    let point = recv_point(&mut rx).await;
    assert_eq!(point.name, "foo");

    // scan for the first checkpoint that saw the metric
    let found = timeout(Duration::from_secs(5), async {
        loop {
            let point = rx.recv().await.expect("output channel closed");
            if point.name == "test.prefix.udp.metricsReceived" && point.value == 1.0 {
                return point;
            }
        }
    })
    .await
    .expect("no checkpoint observed");
    assert!(found.timestamp > 0);

    // the checkpoint drained the counter
    assert_eq!(receiver.stats().metrics_received(), 0);

    receiver.stop().await;
}

#[tokio::test]
async fn udp_receiver_listen_twice_fails() {
    let (mut receiver, _rx, _addr) = start_receiver(localhost_config()).await;

    assert!(receiver.listen().await.is_err());

    receiver.stop().await;
}

#[tokio::test]
async fn udp_receiver_stop_is_idempotent_and_drains() {
    let (mut receiver, mut rx, addr) = start_receiver(localhost_config()).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    client
        .send_to(b"foo 1 100\n", addr)
        .await
        .expect("send failed");
    let _ = recv_point(&mut rx).await;

    receiver.stop().await;
    receiver.stop().await;

    // after stop the socket is gone; nothing sent now may surface later
    client
        .send_to(b"late 9 900\n", addr)
        .await
        .expect("send failed");
    sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    // the port is released and can be bound again
    UdpSocket::bind(addr).await.expect("port still held");
}
