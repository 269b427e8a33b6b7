//! Configuration pieces shared by the tankmon binaries.
//!
//! Files are JSON5. Every section has serde defaults, so an empty file (or
//! no file at all) yields a peer-mode bridge logging at `info`.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the bridge joins the Zenoh network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZenohMode {
    /// Discover neighbours and exchange data directly (default).
    #[default]
    Peer,
    /// Attach to a single router, typically the MQTT bridge in front of the devices.
    Client,
    Router,
}

impl ZenohMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ZenohMode::Peer => "peer",
            ZenohMode::Client => "client",
            ZenohMode::Router => "router",
        }
    }
}

impl fmt::Display for ZenohMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zenoh connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZenohConfig {
    #[serde(default)]
    pub mode: ZenohMode,

    /// Locators to connect to, e.g. `tcp/mosquitto:7447`.
    #[serde(default)]
    pub connect: Vec<String>,

    /// Locators to listen on (peer and router mode).
    #[serde(default)]
    pub listen: Vec<String>,
}

impl ZenohConfig {
    /// Client-mode settings attached to a single broker endpoint.
    pub fn client(endpoint: &str) -> Self {
        let mut config = Self::default();
        config.set_broker(endpoint);
        config
    }

    /// Attach to `endpoint` as a client, replacing any configured endpoints.
    ///
    /// URL-style endpoints (`tcp://host:port`) are accepted.
    pub fn set_broker(&mut self, endpoint: &str) {
        self.mode = ZenohMode::Client;
        self.connect = vec![normalize_endpoint(endpoint)];
    }

    /// Check the settings before a session is opened.
    pub fn validate(&self) -> Result<()> {
        if self.mode == ZenohMode::Client && self.connect.is_empty() {
            return Err(Error::InvalidZenoh(
                "client mode needs a connect endpoint (set BROKER or zenoh.connect)".to_string(),
            ));
        }

        if let Some(bad) = self
            .connect
            .iter()
            .chain(&self.listen)
            .find(|e| !is_locator(e))
        {
            return Err(Error::InvalidZenoh(format!(
                "endpoint {:?} is not a locator like tcp/mosquitto:7447",
                bad
            )));
        }

        Ok(())
    }
}

/// Turn a URL-style endpoint (`tcp://host:1883`) into Zenoh locator form
/// (`tcp/host:1883`). Locators are returned unchanged.
pub fn normalize_endpoint(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        Some((proto, rest)) => format!("{}/{}", proto, rest),
        None => endpoint.to_string(),
    }
}

fn is_locator(endpoint: &str) -> bool {
    match endpoint.split_once('/') {
        Some((proto, addr)) => {
            !proto.is_empty()
                && proto.chars().all(|c| c.is_ascii_alphanumeric())
                && !addr.is_empty()
                && !addr.starts_with('/')
        }
        None => false,
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level (or full filter directives) for the tankmon crates.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    ///
    /// Zenoh is capped at `warn`; its session chatter drowns out the bridge.
    pub fn filter_directives(&self) -> String {
        format!("{},zenoh=warn", self.level)
    }
}

/// Read and parse a JSON5 configuration file.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;

    json5::from_str(&content).map_err(|source| Error::InvalidConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a JSON5 configuration string.
pub fn parse_config<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(json5::from_str(content)?)
}
