//! Composition root: one broadcaster, one supervised producer, one listener.
mod builder;
pub use builder::*;

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::sync::watch;
use tracing::info;

use crate::broadcast::BroadcastHandle;
use crate::broadcast::BroadcastWorker;
use crate::supervisor::ProcessSupervisor;
use crate::BridgeConfig;
use crate::Result;

pub(crate) type ServerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A fully wired bridge, ready to [`run`](Bridge::run).
pub struct Bridge {
    config: BridgeConfig,
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    broadcast: BroadcastHandle,
    worker: BroadcastWorker,
    supervisor: ProcessSupervisor,
    server: ServerFuture,
    metrics_server: Option<ServerFuture>,
    shutdown_signal: watch::Receiver<()>,
}

impl Bridge {
    /// Address the subscriber listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the metrics exporter, when monitoring is enabled.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Handle onto the broadcaster, e.g. to observe subscribers in-process.
    pub fn broadcast(&self) -> BroadcastHandle {
        self.broadcast.clone()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs until the shutdown signal fires.
    ///
    /// Returns once the supervisor has killed the active producer. The listener and the
    /// broadcaster stop on the same signal; open subscriber sessions are not drained.
    pub async fn run(self) -> Result<()> {
        let Bridge {
            config,
            local_addr,
            metrics_addr: _,
            broadcast: _,
            worker,
            supervisor,
            server,
            metrics_server,
            shutdown_signal,
        } = self;

        info!("Dashboard: http://{}", local_addr);
        info!("WebSocket: ws://{}/{}", local_addr, config.server.ws_path);

        if let Some(metrics_server) = metrics_server {
            tokio::spawn(metrics_server);
        }

        tokio::spawn(worker.run(shutdown_signal.clone()));
        tokio::spawn(server);

        supervisor.run(shutdown_signal).await;
        info!("bridge stopped");
        Ok(())
    }
}
