//! Zenoh session setup.

use tracing::info;
use zenoh::Session;

use crate::config::ZenohConfig;
use crate::error::{Error, Result};

fn insert(config: &mut zenoh::Config, key: &str, value: &str) -> Result<()> {
    config
        .insert_json5(key, value)
        .map_err(|e| Error::InvalidZenoh(format!("{}: {}", key, e)))
}

/// Translate validated settings into a Zenoh configuration.
fn zenoh_config(config: &ZenohConfig) -> Result<zenoh::Config> {
    config.validate()?;

    let mut zenoh_config = zenoh::Config::default();
    insert(&mut zenoh_config, "mode", &serde_json::to_string(&config.mode)?)?;

    if !config.connect.is_empty() {
        insert(
            &mut zenoh_config,
            "connect/endpoints",
            &serde_json::to_string(&config.connect)?,
        )?;
    }
    if !config.listen.is_empty() {
        insert(
            &mut zenoh_config,
            "listen/endpoints",
            &serde_json::to_string(&config.listen)?,
        )?;
    }

    Ok(zenoh_config)
}

/// Open a Zenoh session.
pub async fn connect(config: &ZenohConfig) -> Result<Session> {
    let zenoh_config = zenoh_config(config)?;

    info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Opening Zenoh session"
    );
    let session = zenoh::open(zenoh_config).await?;
    info!(zid = %session.zid(), "Zenoh session open");

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZenohMode;

    #[test]
    fn test_client_config() {
        let config = zenoh_config(&ZenohConfig::client("tcp/127.0.0.1:7447"));
        assert!(config.is_ok());
    }

    #[test]
    fn test_peer_with_listen() {
        let config = ZenohConfig {
            mode: ZenohMode::Peer,
            connect: Vec::new(),
            listen: vec!["tcp/127.0.0.1:0".to_string()],
        };
        assert!(zenoh_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected_before_open() {
        let config = ZenohConfig {
            mode: ZenohMode::Client,
            ..Default::default()
        };
        assert!(matches!(zenoh_config(&config), Err(Error::InvalidZenoh(_))));
    }
}
