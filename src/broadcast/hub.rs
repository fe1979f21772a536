use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::Envelope;
use super::Frame;
use crate::metrics::DROPPED_DELIVERIES_TOTAL;
use crate::metrics::SUBSCRIBERS;
use crate::pipeline::Record;

pub type SubscriberId = u64;

/// Outcome of one fanout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers a send was attempted on
    pub attempted: usize,
    /// Sends that were accepted by the subscriber channel
    pub delivered: usize,
}

impl Delivery {
    pub fn skipped(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Retained snapshot plus the set of connected subscribers.
///
/// Owned by a single task (see [`super::BroadcastWorker`]); nothing here is shared.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Frame>>,
    snapshot: Option<Frame>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one decoded record.
    ///
    /// State records replace the snapshot and fan out; error records only fan out.
    pub fn on_record(
        &mut self,
        record: Record,
    ) -> Delivery {
        let Some(envelope) = Envelope::from_record(record) else {
            return Delivery::default();
        };

        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to encode envelope: {:?}", e);
                return Delivery::default();
            }
        };

        if envelope.is_state() {
            self.snapshot = Some(frame.clone());
        }

        let delivery = self.fanout(&frame);
        trace!(
            attempted = delivery.attempted,
            delivered = delivery.delivered,
            "broadcast {} envelope",
            if envelope.is_state() { "state" } else { "error" }
        );
        delivery
    }

    /// Registers a subscriber and hands it the snapshot, if any.
    ///
    /// Returns whether the snapshot was delivered.
    pub fn on_connect(
        &mut self,
        id: SubscriberId,
        sender: mpsc::Sender<Frame>,
    ) -> bool {
        let delivered = match &self.snapshot {
            Some(frame) => try_deliver(id, &sender, frame),
            None => false,
        };
        self.subscribers.insert(id, sender);
        SUBSCRIBERS.set(self.subscribers.len() as i64);
        info!(
            subscriber = id,
            "subscriber connected (total: {})",
            self.subscribers.len()
        );
        delivered
    }

    /// Removes a subscriber; returns whether it was a member.
    pub fn on_disconnect(
        &mut self,
        id: SubscriberId,
    ) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            SUBSCRIBERS.set(self.subscribers.len() as i64);
            info!(
                subscriber = id,
                "subscriber disconnected (total: {})",
                self.subscribers.len()
            );
        }
        removed
    }

    pub fn snapshot(&self) -> Option<&Frame> {
        self.snapshot.as_ref()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_subscribed(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.subscribers.contains_key(&id)
    }

    fn fanout(
        &self,
        frame: &Frame,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for (id, sender) in &self.subscribers {
            delivery.attempted += 1;
            if try_deliver(*id, sender, frame) {
                delivery.delivered += 1;
            }
        }
        delivery
    }
}

/// Best-effort, non-blocking send: a full or closed channel skips this frame.
fn try_deliver(
    id: SubscriberId,
    sender: &mpsc::Sender<Frame>,
    frame: &Frame,
) -> bool {
    match sender.try_send(frame.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(subscriber = id, "subscriber buffer full, skipping frame");
            DROPPED_DELIVERIES_TOTAL.inc();
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(subscriber = id, "subscriber channel closed, skipping frame");
            DROPPED_DELIVERIES_TOTAL.inc();
            false
        }
    }
}
