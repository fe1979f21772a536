//! Fluent assembly of a [`Bridge`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let bridge = BridgeBuilder::new(None, shutdown_rx)?
//!     .build()?;
//! bridge.run().await?;
//! ```
//!
//! `build()` binds the listening socket (and the metrics exporter when enabled), so an unusable
//! port is reported before the producer is ever spawned.

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::info;

use super::Bridge;
use super::ServerFuture;
use crate::broadcast;
use crate::metrics;
use crate::supervisor::ProcessSupervisor;
use crate::supervisor::SupervisorEvent;
use crate::transport;
use crate::BridgeConfig;
use crate::Result;

pub struct BridgeBuilder {
    config: BridgeConfig,
    shutdown_signal: watch::Receiver<()>,
    event_listener: Option<mpsc::UnboundedSender<SupervisorEvent>>,
}

impl BridgeBuilder {
    /// Loads and validates configuration, layering `override_path` on top when given.
    pub fn new(
        override_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut config = BridgeConfig::new()?;
        if let Some(p) = override_path {
            info!("with_override_config from: {}", p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config.validate()?, shutdown_signal))
    }

    /// Uses an already validated configuration.
    pub fn init(
        config: BridgeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            shutdown_signal,
            event_listener: None,
        }
    }

    /// Forwards producer lifecycle events to `listener`.
    pub fn with_event_listener(
        mut self,
        listener: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Self {
        self.event_listener = Some(listener);
        self
    }

    /// Wires broadcaster, supervisor and transport together and binds the listeners.
    pub fn build(self) -> Result<Bridge> {
        let (broadcast, worker) = broadcast::channel(&self.config.broadcast);

        let mut supervisor = ProcessSupervisor::new(self.config.producer.clone(), broadcast.clone());
        if let Some(listener) = self.event_listener {
            supervisor = supervisor.with_event_listener(listener);
        }

        let (local_addr, server) =
            transport::bind(&self.config.server, broadcast.clone(), self.shutdown_signal.clone())?;

        let mut metrics_addr = None;
        let mut metrics_server: Option<ServerFuture> = None;
        if self.config.monitoring.prometheus_enabled {
            let (addr, server) =
                metrics::bind(self.config.monitoring.prometheus_port, self.shutdown_signal.clone())?;
            metrics_addr = Some(addr);
            metrics_server = Some(Box::pin(server));
        }

        Ok(Bridge {
            config: self.config,
            local_addr,
            metrics_addr,
            broadcast,
            worker,
            supervisor,
            server: Box::pin(server),
            metrics_server,
            shutdown_signal: self.shutdown_signal,
        })
    }
}
