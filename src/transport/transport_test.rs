use std::time::Duration;

use serde_json::json;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::timeout;

use super::*;
use crate::broadcast;
use crate::config::BroadcastConfig;
use crate::pipeline::decode;

fn setup(static_dir: PathBuf) -> (
    BroadcastHandle,
    impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone,
    watch::Sender<()>,
) {
    let (handle, worker) = broadcast::channel(&BroadcastConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(worker.run(shutdown_rx));
    let filter = routes("ws".to_string(), static_dir, handle.clone());
    (handle, filter, shutdown_tx)
}

async fn wait_for_subscribers(
    handle: &BroadcastHandle,
    expected: usize,
) {
    for _ in 0..100 {
        if handle.stats().await.map(|s| s.subscribers) == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscriber count never reached {expected}");
}

async fn recv_json(client: &mut warp::test::WsClient) -> Value {
    let msg = timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("Timeout waiting for websocket frame")
        .expect("websocket closed");
    serde_json::from_str(msg.to_str().expect("text frame")).unwrap()
}

#[tokio::test]
async fn test_websocket_receives_snapshot_on_connect() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, filter, _shutdown) = setup(dir.path().to_path_buf());
    handle.publish(decode(r#"{"state":"FLOW","emoji":"🌊"}"#));

    let mut client = warp::test::ws().path("/ws").handshake(filter).await.expect("handshake");

    assert_eq!(
        recv_json(&mut client).await,
        json!({"kind": "state", "state": "FLOW", "emoji": "🌊"})
    );
}

#[tokio::test]
async fn test_websocket_without_snapshot_waits_for_next_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, filter, _shutdown) = setup(dir.path().to_path_buf());
    // errors are broadcast but never retained
    handle.publish(decode(r#"{"error":"warming up"}"#));

    let mut client = warp::test::ws().path("/ws").handshake(filter).await.expect("handshake");
    wait_for_subscribers(&handle, 1).await;
    handle.publish(decode(r#"{"state":"ACTIVE"}"#));

    assert_eq!(
        recv_json(&mut client).await,
        json!({"kind": "state", "state": "ACTIVE"})
    );
}

#[tokio::test]
async fn test_websocket_fanout_to_multiple_clients() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, filter, _shutdown) = setup(dir.path().to_path_buf());

    let mut first = warp::test::ws().path("/ws").handshake(filter.clone()).await.expect("handshake");
    let mut second = warp::test::ws().path("/ws").handshake(filter).await.expect("handshake");
    wait_for_subscribers(&handle, 2).await;

    handle.publish(decode(r#"{"error":"No MUSE stream found"}"#));

    let expected = json!({"kind": "error", "message": "No MUSE stream found"});
    assert_eq!(recv_json(&mut first).await, expected);
    assert_eq!(recv_json(&mut second).await, expected);
}

#[tokio::test]
async fn test_client_messages_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, filter, _shutdown) = setup(dir.path().to_path_buf());

    let mut client = warp::test::ws().path("/ws").handshake(filter).await.expect("handshake");
    client.send_text("set vibe mode please").await;
    wait_for_subscribers(&handle, 1).await;
    handle.publish(decode(r#"{"x":1}"#));

    assert_eq!(recv_json(&mut client).await, json!({"kind": "state", "x": 1}));
}

#[tokio::test]
async fn test_closing_client_unregisters_subscriber() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, filter, _shutdown) = setup(dir.path().to_path_buf());

    let mut client = warp::test::ws().path("/ws").handshake(filter).await.expect("handshake");
    wait_for_subscribers(&handle, 1).await;

    client.send(Message::close()).await;
    wait_for_subscribers(&handle, 0).await;
}

#[tokio::test]
async fn test_static_assets_are_served_for_other_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>dashboard</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "connect('/ws')").unwrap();
    let (_handle, filter, _shutdown) = setup(dir.path().to_path_buf());

    let index = warp::test::request().path("/").reply(&filter).await;
    assert_eq!(index.status(), 200);
    assert_eq!(index.body().as_ref(), b"<h1>dashboard</h1>");

    let script = warp::test::request().path("/app.js").reply(&filter).await;
    assert_eq!(script.status(), 200);
    assert_eq!(script.body().as_ref(), b"connect('/ws')");

    let missing = warp::test::request().path("/nope.css").reply(&filter).await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_bind_serves_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, worker) = broadcast::channel(&BroadcastConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(worker.run(shutdown_rx.clone()));
    let config = ServerConfig {
        listen_address: "127.0.0.1".into(),
        port: 0,
        ws_path: "ws".into(),
        static_dir: dir.path().to_path_buf(),
    };

    let (addr, server) = bind(&config, handle, shutdown_rx).expect("bind");
    let server = tokio::spawn(server);

    assert_ne!(addr.port(), 0);
    tokio::net::TcpStream::connect(addr).await.expect("listener accepts");

    shutdown_tx.send(()).unwrap();
    timeout(Duration::from_secs(2), server)
        .await
        .expect("server should stop on shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_bind_reports_address_in_use() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let (handle, _worker) = broadcast::channel(&BroadcastConfig::default());
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let config = ServerConfig {
        listen_address: "127.0.0.1".into(),
        port: taken.local_addr().unwrap().port(),
        ws_path: "ws".into(),
        static_dir: dir.path().to_path_buf(),
    };

    assert!(matches!(bind(&config, handle, shutdown_rx), Err(Error::Bind(_))));
}
