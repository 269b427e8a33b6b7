//! Plumbing shared by the tankmon crates.
//!
//! - [`config`]: JSON5 loading plus the Zenoh and logging sections
//! - [`session`]: opening a Zenoh session from [`ZenohConfig`]
//! - [`error`]: the shared [`Error`] type

pub mod config;
pub mod error;
pub mod session;

pub use config::{
    LogFormat, LoggingConfig, ZenohConfig, ZenohMode, load_config, normalize_endpoint,
    parse_config,
};
pub use error::{Error, Result};
pub use session::connect;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` replaces [`LoggingConfig::filter_directives`] when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directives()).map_err(|e| {
            Error::Tracing(format!("invalid log level {:?}: {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| Error::Tracing(e.to_string()))
}
