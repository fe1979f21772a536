//! Bridges a supervised line-oriented JSON producer to WebSocket subscribers.
//!
//! A child process writes one JSON object per line on stdout. Each line is classified
//! ([`pipeline`]), re-encoded as a tagged envelope and fanned out to every connected
//! subscriber ([`broadcast`]). The most recent state is retained and replayed to late
//! joiners. The producer is restarted after a fixed cooldown whenever it exits
//! ([`supervisor`]).
mod bridge;
mod config;
mod constants;
mod errors;

pub mod broadcast;
pub mod metrics;
pub mod pipeline;
pub mod supervisor;
pub mod transport;

pub use bridge::*;
pub use config::*;
pub use errors::*;
