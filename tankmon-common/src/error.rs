use std::path::PathBuf;

use thiserror::Error;

/// Errors from configuration loading, session setup and logging setup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read config file {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path:?}: {source}")]
    InvalidConfigFile {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },

    #[error("cannot parse config: {0}")]
    ParseConfig(#[from] json5::Error),

    #[error("invalid zenoh settings: {0}")]
    InvalidZenoh(String),

    #[error("zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("cannot encode zenoh setting: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot initialize tracing: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
