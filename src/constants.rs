use std::time::Duration;

// -
// Configuration sources

/// Environment variable naming an extra configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Prefix of `SIDECAST__SECTION__FIELD` overrides
pub(crate) const ENV_PREFIX: &str = "SIDECAST";

// -
// Wire format

/// Envelope discriminator key
pub(crate) const ENVELOPE_KIND_KEY: &str = "kind";

/// Field a producer sets to report a failure instead of a state record
pub(crate) const ERROR_FIELD: &str = "error";

// -
// Supervision

/// How long pumps may keep reading after the producer exits.
///
/// Bounds the drain when a descendant inherited the producer's pipes and keeps them open.
pub(crate) const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
