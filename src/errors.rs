//! Error hierarchy for the producer bridge.
//!
//! Only startup failures (configuration, binding, signal wiring) ever surface as an [`Error`]
//! to the caller. Everything that happens once the bridge is running (producer crashes, spawn
//! failures, undecodable lines, slow subscribers) is logged and absorbed by the component that
//! observed it.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration sources could not be merged or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded fine but failed semantic validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Host-level I/O failures (signal registration, stderr forwarding)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The producer executable could not be started
    #[error("Failed to spawn producer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An envelope could not be rendered as JSON text
    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    /// The listening socket could not be bound
    #[error("Failed to bind listener: {0}")]
    Bind(String),

    #[error("{0}")]
    SignalSenderClosed(String),
}
