//! End-to-end ingestion over real sockets: bytes in, snapshots out.

use hub::Engine;
use hub::config::{HubConfig, IngestMode};
use oes_core::Sport;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

fn test_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = HubConfig {
        bind_addr: "127.0.0.1:0".to_owned(),
        scoreboard_tcp_port: 0,
        scoreboard_udp_port: 0,
        ingest_mode: IngestMode::Auto,
        serial_port: "COM1".to_owned(),
        sources_file: dir.path().join("data_sources.json"),
        statcrew_file: dir.path().join("statcrew_sources.json"),
        virtius_file: dir.path().join("virtius_sources.json"),
    };
    let engine = Engine::new(cfg);
    (dir, engine)
}

fn basketball_packet() -> Vec<u8> {
    let mut pkt = vec![0x30u8; 23];
    pkt[0] = 0x02;
    pkt[1] = b't';
    pkt[7] = b'4';
    pkt[8] = b'5';
    pkt[22] = 0x0D;
    pkt
}

fn lacrosse_packet() -> Vec<u8> {
    let mut pkt = vec![0x30u8; 47];
    pkt[0] = 0x02;
    pkt[1] = b'l';
    pkt[2] = b'1';
    pkt[3] = b'2';
    pkt[4] = b'3';
    pkt[5] = b'4';
    pkt[46] = 0x0D;
    pkt
}

/// Poll the store until a snapshot appears for `(sport, source)`.
async fn wait_for_snapshot(
    engine: &Engine,
    sport: Sport,
    source: Option<&str>,
) -> Map<String, Value> {
    for _ in 0..100 {
        let snapshot = engine.store.get(sport, source);
        if !snapshot.is_empty() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no snapshot arrived for {sport:?} from {source:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn inbound_tcp_connection_is_framed_and_stored() {
    let (_dir, engine) = test_engine();
    let bound = engine
        .start_network_listeners(0, 0, IngestMode::Tcp)
        .await;
    let addr = bound.tcp.expect("tcp listener bound");
    assert!(bound.udp.is_none(), "tcp mode must not bind udp");

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let local = stream.local_addr().expect("local_addr");

    // Split the frame across two writes; the framer must reassemble.
    let pkt = basketball_packet();
    stream.write_all(&pkt[..10]).await.expect("write");
    stream.flush().await.expect("flush");
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(&pkt[10..]).await.expect("write");
    stream.flush().await.expect("flush");

    let expected_source = format!("tcp:{}:{}", local.ip(), local.port());
    let snapshot = wait_for_snapshot(&engine, Sport::Basketball, Some(&expected_source)).await;
    assert_eq!(snapshot["home_score"], "45");
    assert_eq!(snapshot["_meta"]["source"], expected_source.as_str());

    engine.stop_network_listeners().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn udp_datagrams_are_tagged_per_peer() {
    let (_dir, engine) = test_engine();
    let bound = engine
        .start_network_listeners(0, 0, IngestMode::Udp)
        .await;
    let addr = bound.udp.expect("udp listener bound");
    assert!(bound.tcp.is_none(), "udp mode must not bind tcp");

    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    let local = socket.local_addr().expect("local_addr");
    socket
        .send_to(&basketball_packet(), addr)
        .await
        .expect("send");

    let expected_source = format!("udp:{}:{}", local.ip(), local.port());
    let snapshot = wait_for_snapshot(&engine, Sport::Basketball, Some(&expected_source)).await;
    assert_eq!(snapshot["_meta"]["source"], expected_source.as_str());

    engine.stop_network_listeners().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn outbound_client_connects_and_ingests() {
    let (_dir, engine) = test_engine();

    // Fake console: accept one connection and stream a packet.
    let console = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let console_addr = console.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let (mut stream, _) = console.accept().await.expect("accept");
        stream
            .write_all(&basketball_packet())
            .await
            .expect("write");
        // Hold the connection open so the worker keeps reading.
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let entry = engine.registry.add(
        &console_addr.ip().to_string(),
        console_addr.port(),
        "Fake console",
        Default::default(),
    );
    engine.start_tcp_client(&entry).await;

    let snapshot = wait_for_snapshot(&engine, Sport::Basketball, Some(&entry.id)).await;
    assert_eq!(snapshot["_meta"]["source"], entry.id.as_str());

    engine.stop_tcp_client(&entry.id).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn sport_override_rewrites_lacrosse_to_clock_only_gymnastics() {
    let (_dir, engine) = test_engine();

    let console = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let console_addr = console.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let (mut stream, _) = console.accept().await.expect("accept");
        stream.write_all(&lacrosse_packet()).await.expect("write");
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let overrides = hub::registry::normalize_sport_overrides(Some(&serde_json::json!({
        "Lacrosse": "Gymnastics",
    })));
    let entry = engine.registry.add(
        &console_addr.ip().to_string(),
        console_addr.port(),
        "Gym clock",
        overrides,
    );
    engine.start_tcp_client(&entry).await;

    let snapshot = wait_for_snapshot(&engine, Sport::Gymnastics, Some(&entry.id)).await;
    assert_eq!(snapshot["game_clock"], "12:34");
    // Reduced record: clock plus metadata, nothing else.
    assert_eq!(snapshot.len(), 2);
    assert!(engine.store.get(Sport::Lacrosse, Some(&entry.id)).is_empty());

    engine.stop_tcp_client(&entry.id).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stopping_a_worker_is_bounded() {
    let (_dir, engine) = test_engine();
    // No console listening: the worker sits in its backoff/connect loop.
    let entry = engine
        .registry
        .add("127.0.0.1", 1, "Nothing there", Default::default());
    engine.start_tcp_client(&entry).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    engine.stop_tcp_client(&entry.id).await;
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn starting_an_already_running_source_is_a_noop() {
    let (_dir, engine) = test_engine();
    let entry = engine
        .registry
        .add("127.0.0.1", 1, "Nothing there", Default::default());
    engine.start_tcp_client(&entry).await;
    engine.start_tcp_client(&entry).await;
    engine.stop_tcp_client(&entry.id).await;
    // A second stop finds nothing to do.
    engine.stop_tcp_client(&entry.id).await;
}
