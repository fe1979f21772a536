//! Keep-forever supervisor for the producer sidecar.
//!
//! ```text
//!            spawn ok                     exit (any code / signal)
//!   Start ───────────> Running ───────────────────────────────> Cooldown
//!     ^  spawn failed ─────────────────────────────────────────────┘ │
//!     └──────────────────────── cooldown elapsed ────────────────────┘
//! ```
//!
//! There is no retry ceiling and no backoff growth: a producer that keeps crashing is restarted
//! at the same fixed cadence for the lifetime of the host. A shutdown signal in either state
//! kills the active child (if any) and ends the loop.
mod pump;
pub use pump::*;


use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::broadcast::BroadcastHandle;
use crate::config::ProducerConfig;
use crate::constants::PUMP_DRAIN_TIMEOUT;
use crate::metrics::PRODUCER_RESTARTS_TOTAL;
use crate::pipeline::LineFramer;
use crate::Error;
use crate::Result;

/// Lifecycle notifications, mainly for observers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Spawned {
        attempt: u64,
        pid: Option<u32>,
        at: Instant,
    },
    SpawnFailed {
        attempt: u64,
        reason: String,
        at: Instant,
    },
    Exited {
        attempt: u64,
        code: Option<i32>,
        signal: Option<i32>,
        at: Instant,
    },
    /// Shutdown observed; no further spawns
    Stopped,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Shutdown,
}

pub struct ProcessSupervisor {
    config: ProducerConfig,
    broadcast: BroadcastHandle,
    events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
}

impl ProcessSupervisor {
    pub fn new(
        config: ProducerConfig,
        broadcast: BroadcastHandle,
    ) -> Self {
        Self {
            config,
            broadcast,
            events: None,
        }
    }

    /// Publishes [`SupervisorEvent`]s to `listener`.
    pub fn with_event_listener(
        mut self,
        listener: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Self {
        self.events = Some(listener);
        self
    }

    /// Runs the spawn / exit / cooldown loop until `shutdown_signal` fires.
    pub async fn run(
        self,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        let cooldown = self.config.restart_cooldown();
        let mut attempt = 0u64;

        loop {
            attempt += 1;
            match self.spawn() {
                Ok(child) => {
                    info!(
                        attempt,
                        pid = ?child.id(),
                        "producer `{}` started",
                        self.config.program
                    );
                    self.emit(SupervisorEvent::Spawned {
                        attempt,
                        pid: child.id(),
                        at: Instant::now(),
                    });

                    match self.supervise(child, &mut shutdown_signal).await {
                        Outcome::Exited(status) => self.on_exit(attempt, status),
                        Outcome::Shutdown => break,
                    }
                }
                Err(e) => {
                    error!(attempt, "{}", e);
                    self.emit(SupervisorEvent::SpawnFailed {
                        attempt,
                        reason: e.to_string(),
                        at: Instant::now(),
                    });
                }
            }

            PRODUCER_RESTARTS_TOTAL.inc();
            warn!("restarting producer in {:?}", cooldown);
            tokio::select! {
                _ = tokio::time::sleep(cooldown) => {}
                _ = shutdown_signal.changed() => {
                    info!("shutdown during cooldown, producer will not be restarted");
                    break;
                }
            }
        }

        self.emit(SupervisorEvent::Stopped);
        info!("producer supervisor stopped");
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.spawn().map_err(|source| Error::Spawn {
            program: self.config.program.clone(),
            source,
        })
    }

    /// Pumps the child's streams until it exits or shutdown is requested.
    async fn supervise(
        &self,
        mut child: Child,
        shutdown_signal: &mut watch::Receiver<()>,
    ) -> Outcome {
        let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            let framer = LineFramer::with_max_line_bytes(self.config.max_line_bytes);
            let broadcast = self.broadcast.clone();
            pumps.push(tokio::spawn(async move {
                let stats = pump_records(stdout, framer, broadcast).await;
                info!(
                    states = stats.states,
                    errors = stats.errors,
                    noise = stats.noise,
                    "producer stdout closed"
                );
            }));
        }

        if let Some(stderr) = child.stderr.take() {
            let prefix = self.config.stderr_prefix.clone();
            pumps.push(tokio::spawn(async move {
                if let Err(e) = forward_diagnostics(stderr, tokio::io::stderr(), &prefix).await {
                    warn!("forwarding producer stderr failed: {}", e);
                }
            }));
        }

        tokio::select! {
            status = child.wait() => {
                // records written right before exit are still in the pipe
                let drain = tokio::time::timeout(
                    PUMP_DRAIN_TIMEOUT,
                    futures::future::join_all(pumps.iter_mut()),
                );
                tokio::select! {
                    drained = drain => {
                        if drained.is_err() {
                            warn!(
                                "producer pipes still open {:?} after exit, abandoning them",
                                PUMP_DRAIN_TIMEOUT
                            );
                        }
                        pumps.iter().for_each(JoinHandle::abort);
                    }
                    _ = shutdown_signal.changed() => {
                        pumps.iter().for_each(JoinHandle::abort);
                        return Outcome::Shutdown;
                    }
                }
                Outcome::Exited(status)
            }
            _ = shutdown_signal.changed() => {
                info!(pid = ?child.id(), "shutdown requested, killing producer");
                if let Err(e) = child.kill().await {
                    warn!("failed to kill producer: {}", e);
                }
                pumps.iter().for_each(JoinHandle::abort);
                Outcome::Shutdown
            }
        }
    }

    fn on_exit(
        &self,
        attempt: u64,
        status: std::io::Result<ExitStatus>,
    ) {
        let (code, signal) = match &status {
            Ok(status) => (status.code(), exit_signal(status)),
            Err(e) => {
                warn!("failed to collect producer exit status: {}", e);
                (None, None)
            }
        };
        warn!(attempt, "producer exited (code={:?} signal={:?})", code, signal);
        self.emit(SupervisorEvent::Exited {
            attempt,
            code,
            signal,
            at: Instant::now(),
        });
    }

    fn emit(
        &self,
        event: SupervisorEvent,
    ) {
        if let Some(listener) = &self.events {
            let _ = listener.send(event);
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
