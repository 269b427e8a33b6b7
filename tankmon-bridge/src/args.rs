//! CLI argument parsing.
//!
//! Every flag can also be supplied through the environment, matching the
//! container deployment (`SENSOR`, `BROKER`, `VM_PUSH_URL`).

use std::path::PathBuf;

use clap::Parser;

use crate::decoder::DeviceProfile;

/// Bridge sensor telemetry to a Prometheus import endpoint.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tankmon-bridge")]
#[command(about = "Push sensor telemetry to a Prometheus-compatible import endpoint")]
#[command(version)]
pub struct BridgeArgs {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, env = "TANKMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sensor name, used in the key expression and the `sensor` label.
    #[arg(long, env = "SENSOR")]
    pub sensor: Option<String>,

    /// Device profile of the sensor.
    #[arg(long, value_enum, env = "PROFILE")]
    pub profile: Option<DeviceProfile>,

    /// Zenoh endpoint to connect to (e.g. tcp/mosquitto:7447).
    #[arg(long, env = "BROKER")]
    pub connect: Option<String>,

    /// Prometheus import URL to push to.
    #[arg(long, env = "VM_PUSH_URL")]
    pub push_url: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BridgeArgs {
    /// Parse CLI arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
