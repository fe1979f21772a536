//! Retained-snapshot fanout to WebSocket subscribers.
//!
//! - [`Envelope`] is the wire shape (`state` or `error`).
//! - [`Broadcaster`] holds the snapshot and the subscriber set.
//! - [`BroadcastWorker`] owns a `Broadcaster` on its own task; everything else talks to it
//!   through a cloneable [`BroadcastHandle`].
mod envelope;
mod hub;
mod worker;
pub use envelope::*;
pub use hub::*;
pub use worker::*;

#[cfg(test)]
mod hub_test;
