//! Decoding of device telemetry messages into gauges.
//!
//! Devices publish JSON state messages. Two layouts are understood:
//!
//! ```text
//! tank:   {"Distance": 1000, "Temperature": 23.76, "Humidity": 33.66}
//! energy: {"Time": "...", "ENERGY": {"Total": 12.3, "Power": 150, "Voltage": 231, ...}}
//! ```
//!
//! Field names are matched like Go's `encoding/json` does: an exact match
//! wins, otherwise the first key equal ignoring ASCII case is used. Fields
//! missing from a message (or `null`) leave the corresponding gauge untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tankmon_push::{Gauge, GaugeRegistry, RegistryError};
use thiserror::Error;

/// Errors while decoding a device message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no {0} section")]
    MissingSection(&'static str),
}

/// Kind of device publishing on the sensor key expression.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// Ultrasonic tank level sensor with temperature/humidity probe.
    #[default]
    Tank,
    /// Power meter reporting an `ENERGY` section.
    Energy,
}

/// A message field and the gauge it feeds.
#[derive(Debug, Clone, Copy)]
struct Field {
    key: &'static str,
    gauge: &'static str,
}

const fn field(key: &'static str, gauge: &'static str) -> Field {
    Field { key, gauge }
}

const TANK_FIELDS: &[Field] = &[
    field("Distance", "distance"),
    field("Temperature", "temperature"),
    field("Humidity", "humidity"),
];

const ENERGY_SECTION: &str = "ENERGY";

const ENERGY_FIELDS: &[Field] = &[
    field("Total", "energy_total_kwh"),
    field("Today", "energy_today_kwh"),
    field("Yesterday", "energy_yesterday_kwh"),
    field("Power", "power_watts"),
    field("ApparentPower", "apparent_power_va"),
    field("ReactivePower", "reactive_power_var"),
    field("Factor", "power_factor"),
    field("Voltage", "voltage_volts"),
    field("Current", "current_amperes"),
];

/// Look up `key`, falling back to a case-insensitive match.
fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn read_fields(
    object: &Map<String, Value>,
    fields: &[Field],
) -> Result<Vec<Option<f64>>, DecodeError> {
    fields
        .iter()
        .map(|f| match lookup(object, f.key) {
            Some(value) => Ok(Option::<f64>::deserialize(value)?),
            None => Ok(None),
        })
        .collect()
}

impl DeviceProfile {
    fn fields(self) -> &'static [Field] {
        match self {
            DeviceProfile::Tank => TANK_FIELDS,
            DeviceProfile::Energy => ENERGY_FIELDS,
        }
    }

    /// Names of the gauges this profile maintains.
    pub fn gauge_names(self) -> impl Iterator<Item = &'static str> {
        self.fields().iter().map(|f| f.gauge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceProfile::Tank => "tank",
            DeviceProfile::Energy => "energy",
        }
    }

    /// Decode `payload` into values ordered like [`gauge_names`](Self::gauge_names).
    pub fn decode(self, payload: &[u8]) -> Result<Vec<Option<f64>>, DecodeError> {
        let message: Map<String, Value> = serde_json::from_slice(payload)?;

        match self {
            DeviceProfile::Tank => read_fields(&message, TANK_FIELDS),
            DeviceProfile::Energy => {
                let section = lookup(&message, ENERGY_SECTION)
                    .filter(|v| !v.is_null())
                    .ok_or(DecodeError::MissingSection(ENERGY_SECTION))?;
                let section = Map::<String, Value>::deserialize(section)?;
                read_fields(&section, ENERGY_FIELDS)
            }
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gauges of one device, updated from its messages.
#[derive(Debug, Clone)]
pub struct DeviceGauges {
    profile: DeviceProfile,
    gauges: Vec<Gauge>,
}

impl DeviceGauges {
    /// Register the profile's gauges in `registry`.
    pub fn register(
        registry: &GaugeRegistry,
        profile: DeviceProfile,
    ) -> Result<Self, RegistryError> {
        let gauges = profile
            .gauge_names()
            .map(|name| registry.gauge(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { profile, gauges })
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Decode a message and update the gauges it carries.
    ///
    /// Returns how many gauges were set.
    pub fn apply(&self, payload: &[u8]) -> Result<usize, DecodeError> {
        let values = self.profile.decode(payload)?;

        let mut updated = 0;
        for (gauge, value) in self.gauges.iter().zip(values) {
            if let Some(value) = value {
                gauge.set(value);
                updated += 1;
            }
        }

        Ok(updated)
    }
}
