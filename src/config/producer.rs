use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How the supervised producer is launched and restarted
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProducerConfig {
    /// Executable to launch
    /// Default: "python3"
    #[serde(default = "default_program")]
    pub program: String,

    /// Fixed arguments passed to the executable
    /// Default: ["lsl_reader.py"]
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory of the producer
    /// Default: "."
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Fixed delay between a producer exit and the next spawn (unit: milliseconds)
    /// Default: 3000
    #[serde(default = "default_restart_cooldown_ms")]
    pub restart_cooldown_ms: u64,

    /// Written before every forwarded stderr chunk, e.g. "[reader] " to tag reader diagnostics
    /// Default: "" (forward verbatim)
    #[serde(default)]
    pub stderr_prefix: String,

    /// Longest accepted stdout line in bytes (0 means unlimited)
    /// Default: 0
    #[serde(default)]
    pub max_line_bytes: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: default_working_dir(),
            restart_cooldown_ms: default_restart_cooldown_ms(),
            stderr_prefix: String::new(),
            max_line_bytes: 0,
        }
    }
}

impl ProducerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(Error::InvalidConfig("producer program cannot be empty".into()));
        }

        if self.restart_cooldown_ms == 0 {
            return Err(Error::InvalidConfig(
                "restart_cooldown_ms must be > 0 to avoid a hot restart loop".into(),
            ));
        }

        Ok(())
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.restart_cooldown_ms)
    }
}

fn default_program() -> String {
    "python3".into()
}
fn default_args() -> Vec<String> {
    vec!["lsl_reader.py".into()]
}
fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_restart_cooldown_ms() -> u64 {
    3000
}
