//! Bridge from sensor telemetry messages to a Prometheus import endpoint.
//!
//! Subscribes to one sensor's state messages, keeps the decoded readings as
//! gauges and pushes a labeled snapshot after every message.
//!
//! # Key Expressions
//!
//! ```text
//! tele/<sensor>/SENSOR
//! ```
//!
//! MQTT devices reach this key space through a Zenoh MQTT bridge, which maps
//! the topic `tele/<sensor>/SENSOR` to the same key expression.

pub mod args;
pub mod config;
pub mod decoder;
pub mod subscriber;

pub use args::BridgeArgs;
pub use config::{BridgeConfig, ConfigError, SensorConfig};
pub use decoder::{DecodeError, DeviceGauges, DeviceProfile};
pub use subscriber::SensorSubscriber;
