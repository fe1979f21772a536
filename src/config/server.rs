use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Listening socket and routing for the subscriber-facing HTTP surface
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    /// Default: "0.0.0.0"
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// TCP port shared by the WebSocket endpoint and the static asset server
    /// Default: 3002
    #[serde(default = "default_port")]
    pub port: u16,

    /// Single path segment that upgrades to a subscriber WebSocket
    /// Default: "ws"
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Directory served for every non-WebSocket request
    /// Default: "public"
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            port: default_port(),
            ws_path: default_ws_path(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        // port 0 binds an ephemeral port, reported by `Bridge::local_addr`
        self.socket_addr()?;

        if self.ws_path.is_empty() || self.ws_path.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "ws_path {:?} must be a single non-empty path segment",
                self.ws_path
            )));
        }

        if self.static_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("static_dir cannot be empty".into()));
        }

        Ok(())
    }

    /// Resolved bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_address.parse().map_err(|e| {
            Error::InvalidConfig(format!(
                "listen_address {:?} is not an IP address: {}",
                self.listen_address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3002
}
fn default_ws_path() -> String {
    "ws".into()
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
