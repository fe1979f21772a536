use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;

use super::*;
use crate::pipeline::decode;

fn subscriber(buffer: usize) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
    mpsc::channel(buffer)
}

fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn parsed(frame: &Frame) -> Value {
    serde_json::from_str(frame).unwrap()
}

#[test]
fn no_snapshot_means_nothing_on_connect() {
    let mut hub = Broadcaster::new();
    let (tx, mut rx) = subscriber(4);

    assert!(!hub.on_connect(1, tx));

    assert!(drain(&mut rx).is_empty());
    assert!(hub.snapshot().is_none());
    assert_eq!(hub.subscriber_count(), 1);
}

#[test]
fn late_subscriber_receives_exactly_the_latest_state() {
    let mut hub = Broadcaster::new();
    let (early_tx, mut early_rx) = subscriber(8);
    hub.on_connect(1, early_tx);

    hub.on_record(decode(r#"{"state":"FLOW"}"#));
    hub.on_record(decode(r#"{"state":"STRESS"}"#));
    assert_eq!(drain(&mut early_rx).len(), 2);

    let (late_tx, mut late_rx) = subscriber(8);
    assert!(hub.on_connect(2, late_tx));

    let frames = drain(&mut late_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(parsed(&frames[0]), json!({"kind": "state", "state": "STRESS"}));
    // connecting someone else is invisible to existing subscribers
    assert!(drain(&mut early_rx).is_empty());
}

#[test]
fn fanout_reaches_every_subscriber_with_identical_frame() {
    let mut hub = Broadcaster::new();
    let mut receivers = Vec::new();
    for id in 1..=5 {
        let (tx, rx) = subscriber(4);
        hub.on_connect(id, tx);
        receivers.push(rx);
    }

    let delivery = hub.on_record(decode(r#"{"state":"FLOW","detail":"Alpha=0.42"}"#));

    assert_eq!(delivery, Delivery { attempted: 5, delivered: 5 });
    let frames: Vec<Frame> = receivers.iter_mut().flat_map(drain).collect();
    assert_eq!(frames.len(), 5);
    for frame in &frames {
        assert_eq!(frame.as_bytes(), frames[0].as_bytes());
        assert!(Arc::ptr_eq(frame, &frames[0]));
    }
}

#[test]
fn disconnected_subscriber_gets_nothing_and_is_removed() {
    let mut hub = Broadcaster::new();
    let (stay_tx, mut stay_rx) = subscriber(4);
    let (leave_tx, mut leave_rx) = subscriber(4);
    hub.on_connect(1, stay_tx);
    hub.on_connect(2, leave_tx);

    assert!(hub.on_disconnect(2));
    let delivery = hub.on_record(decode(r#"{"x":1}"#));

    assert_eq!(delivery.attempted, 1);
    assert_eq!(drain(&mut stay_rx).len(), 1);
    assert!(drain(&mut leave_rx).is_empty());
    assert!(!hub.is_subscribed(2));
    assert!(!hub.on_disconnect(2));
}

#[test]
fn error_record_fans_out_without_touching_snapshot() {
    let mut hub = Broadcaster::new();
    let (tx, mut rx) = subscriber(4);
    hub.on_connect(1, tx);
    hub.on_record(decode(r#"{"state":"FLOW"}"#));
    let snapshot = hub.snapshot().cloned().unwrap();

    let delivery = hub.on_record(decode(r#"{"error":"No MUSE stream found"}"#));

    assert_eq!(delivery.delivered, 1);
    let frames = drain(&mut rx);
    assert_eq!(
        parsed(&frames[1]),
        json!({"kind": "error", "message": "No MUSE stream found"})
    );
    assert!(Arc::ptr_eq(hub.snapshot().unwrap(), &snapshot));
}

#[test]
fn error_before_any_state_leaves_snapshot_unset() {
    let mut hub = Broadcaster::new();
    hub.on_record(decode(r#"{"error":"boom"}"#));

    let (tx, mut rx) = subscriber(4);
    hub.on_connect(1, tx);

    assert!(hub.snapshot().is_none());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn noise_is_ignored() {
    let mut hub = Broadcaster::new();
    let (tx, mut rx) = subscriber(4);
    hub.on_connect(1, tx);

    let delivery = hub.on_record(decode("not json"));

    assert_eq!(delivery, Delivery::default());
    assert!(drain(&mut rx).is_empty());
    assert!(hub.snapshot().is_none());
}

#[test]
fn full_subscriber_is_skipped_without_blocking_others() {
    let mut hub = Broadcaster::new();
    let (slow_tx, mut slow_rx) = subscriber(1);
    let (fast_tx, mut fast_rx) = subscriber(8);
    hub.on_connect(1, slow_tx);
    hub.on_connect(2, fast_tx);

    hub.on_record(decode(r#"{"seq":1}"#));
    let delivery = hub.on_record(decode(r#"{"seq":2}"#));

    assert_eq!(delivery, Delivery { attempted: 2, delivered: 1 });
    assert_eq!(delivery.skipped(), 1);
    let slow = drain(&mut slow_rx);
    assert_eq!(slow.len(), 1);
    assert_eq!(parsed(&slow[0])["seq"], json!(1));
    assert_eq!(drain(&mut fast_rx).len(), 2);
    // skipped, not evicted
    assert!(hub.is_subscribed(1));
}

#[test]
fn closed_subscriber_channel_is_skipped() {
    let mut hub = Broadcaster::new();
    let (tx, rx) = subscriber(4);
    hub.on_connect(1, tx);
    drop(rx);

    let delivery = hub.on_record(decode(r#"{"x":1}"#));

    assert_eq!(delivery, Delivery { attempted: 1, delivered: 0 });
}

#[test]
fn snapshot_is_overwritten_by_each_state() {
    let mut hub = Broadcaster::new();
    for n in 0..3 {
        hub.on_record(decode(&format!(r#"{{"n":{n}}}"#)));
    }

    assert_eq!(parsed(hub.snapshot().unwrap()), json!({"kind": "state", "n": 2}));
}
