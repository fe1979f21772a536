//! Configuration management for the producer bridge.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH` or an explicit override file)
//! - Environment variable overrides (`SIDECAST__SECTION__FIELD`)
//! - Section-wise validation
mod broadcast;
mod logging;
mod monitoring;
mod producer;
mod server;
pub use broadcast::*;
pub use logging::*;
pub use monitoring::*;
pub use producer::*;
pub use server::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::ENV_PREFIX;
use crate::Error;
use crate::Result;

/// Top-level configuration container
///
/// Merged from, in increasing priority:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables prefixed with `SIDECAST__`
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BridgeConfig {
    /// Listening socket, WebSocket path and static asset root
    pub server: ServerConfig,
    /// Supervised producer process
    pub producer: ProducerConfig,
    /// Subscriber fanout tuning
    pub broadcast: BroadcastConfig,
    /// Prometheus exporter
    pub monitoring: MonitoringConfig,
    /// Log filtering
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so further overrides can be layered via
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("SIDECAST__SERVER__PORT", "4000");
    /// let cfg = BridgeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.producer.validate()?;
        self.broadcast.validate()?;
        self.monitoring.validate()?;

        if self.monitoring.prometheus_enabled && self.monitoring.prometheus_port == self.server.port {
            return Err(Error::InvalidConfig(format!(
                "prometheus_port {} collides with server port",
                self.monitoring.prometheus_port
            )));
        }
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
