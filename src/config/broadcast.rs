use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BroadcastConfig {
    /// Outbound frames buffered per subscriber before deliveries are skipped
    /// Default: 16
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl BroadcastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidConfig("subscriber_buffer must be > 0".into()));
        }
        Ok(())
    }
}

fn default_subscriber_buffer() -> usize {
    16
}
