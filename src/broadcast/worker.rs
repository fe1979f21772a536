//! Single-owner task around [`Broadcaster`].
//!
//! ```text
//! stdout pump ──Publish──┐
//! ws session ──Connect───┼─> command queue ─> BroadcastWorker ─try_send─> per-subscriber channel
//! Subscription::drop ────┘     (unbounded)      (owns state)                 (bounded)
//! ```
//!
//! Every mutation of the snapshot and subscriber set is serialized through the command queue,
//! so a subscriber can never observe a broadcast "between" registration and snapshot delivery.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;

use super::Broadcaster;
use super::Frame;
use super::SubscriberId;
use crate::config::BroadcastConfig;
use crate::pipeline::Record;

#[derive(Debug)]
pub(crate) enum Command {
    Connect {
        id: SubscriberId,
        sender: mpsc::Sender<Frame>,
    },
    Disconnect {
        id: SubscriberId,
    },
    Publish(Record),
    Stats(oneshot::Sender<BroadcastStats>),
}

/// Point-in-time view of the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastStats {
    pub subscribers: usize,
    pub snapshot: Option<String>,
}

/// Cloneable front door to the broadcaster task.
#[derive(Debug, Clone)]
pub struct BroadcastHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
    subscriber_buffer: usize,
}

impl BroadcastHandle {
    /// Queues a record for fanout. Returns `false` once the worker has stopped.
    pub fn publish(
        &self,
        record: Record,
    ) -> bool {
        self.commands.send(Command::Publish(record)).is_ok()
    }

    /// Registers a new subscriber.
    ///
    /// The retained snapshot, if any, is the first frame the subscription yields. The
    /// subscriber is unregistered when the returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);

        if self.commands.send(Command::Connect { id, sender }).is_err() {
            debug!(subscriber = id, "broadcaster stopped, subscription will stay empty");
        }

        Subscription {
            id,
            receiver,
            commands: self.commands.clone(),
        }
    }

    /// Current subscriber count and snapshot; `None` once the worker has stopped.
    pub async fn stats(&self) -> Option<BroadcastStats> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Stats(tx)).ok()?;
        rx.await.ok()
    }
}

/// Receiving side of one subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Frame>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next frame, or `None` once the broadcaster has stopped.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn receiver_mut(&mut self) -> &mut mpsc::Receiver<Frame> {
        &mut self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.commands.send(Command::Disconnect { id: self.id }).is_err() {
            trace!(subscriber = self.id, "broadcaster stopped, nothing to unregister");
        }
        trace!(subscriber = self.id, "subscription dropped");
    }
}

/// Task owning the [`Broadcaster`] state.
#[derive(Debug)]
pub struct BroadcastWorker {
    state: Broadcaster,
    commands: mpsc::UnboundedReceiver<Command>,
}

/// Creates a connected handle/worker pair. Spawn [`BroadcastWorker::run`] to start fanout.
pub fn channel(config: &BroadcastConfig) -> (BroadcastHandle, BroadcastWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = BroadcastHandle {
        commands: tx,
        next_id: Arc::new(AtomicU64::new(1)),
        subscriber_buffer: config.subscriber_buffer,
    };
    let worker = BroadcastWorker {
        state: Broadcaster::new(),
        commands: rx,
    };
    (handle, worker)
}

impl BroadcastWorker {
    /// Processes commands in arrival order until shutdown or until every handle is gone.
    pub async fn run(
        mut self,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        debug!("broadcast worker started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            debug!("all broadcast handles dropped");
                            break;
                        }
                    }
                }
                _ = shutdown_signal.changed() => {
                    debug!("broadcast worker received shutdown signal");
                    break;
                }
            }
        }
        debug!("broadcast worker stopped");
    }

    fn handle(
        &mut self,
        command: Command,
    ) {
        match command {
            Command::Connect { id, sender } => {
                self.state.on_connect(id, sender);
            }
            Command::Disconnect { id } => {
                self.state.on_disconnect(id);
            }
            Command::Publish(record) => {
                self.state.on_record(record);
            }
            Command::Stats(reply) => {
                let _ = reply.send(BroadcastStats {
                    subscribers: self.state.subscriber_count(),
                    snapshot: self.state.snapshot().map(|f| f.to_string()),
                });
            }
        }
    }
}
