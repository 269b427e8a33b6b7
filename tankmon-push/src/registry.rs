//! In-process gauge registry and the snapshot source abstraction.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::labels::{escape_label_value, is_valid_identifier};
use crate::process::write_process_metrics;

/// Something that can render the current metric values as Prometheus text
/// exposition.
pub trait SnapshotSource: Send + Sync {
    /// Write a complete exposition snapshot into `out`.
    fn write_snapshot(&self, out: &mut dyn Write, include_process_metrics: bool)
    -> io::Result<()>;
}

impl<F> SnapshotSource for F
where
    F: Fn(&mut dyn Write, bool) -> io::Result<()> + Send + Sync,
{
    fn write_snapshot(
        &self,
        out: &mut dyn Write,
        include_process_metrics: bool,
    ) -> io::Result<()> {
        self(out, include_process_metrics)
    }
}

/// A shared `f64` gauge. Clones update the same value.
#[derive(Debug, Clone)]
pub struct Gauge {
    bits: Arc<AtomicU64>,
}

impl Gauge {
    fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(0f64.to_bits())),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Check a metric family name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Series key: family name plus its rendered label block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    labels: String,
}

impl SeriesKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Result<Self, RegistryError> {
        if !is_valid_metric_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let mut parts = Vec::with_capacity(labels.len());
        for (key, value) in labels {
            if !is_valid_identifier(key) {
                return Err(RegistryError::InvalidLabel {
                    name: name.to_string(),
                    label: key.to_string(),
                });
            }
            parts.push(format!("{}=\"{}\"", key, escape_label_value(value)));
        }

        let labels = if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        };

        Ok(Self {
            name: name.to_string(),
            labels,
        })
    }
}

/// Thread-safe registry of gauges.
///
/// Renders as Prometheus text exposition, sorted by series, with one
/// `# TYPE` comment per metric family.
#[derive(Debug, Default)]
pub struct GaugeRegistry {
    gauges: RwLock<BTreeMap<SeriesKey, Gauge>>,
}

/// Create a shareable registry handle.
pub type SharedRegistry = Arc<GaugeRegistry>;

impl GaugeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create an unlabeled gauge.
    pub fn gauge(&self, name: &str) -> Result<Gauge, RegistryError> {
        self.gauge_with_labels(name, &[])
    }

    /// Get or create a gauge carrying fixed labels, e.g. `power{phase="1"}`.
    pub fn gauge_with_labels(
        &self,
        name: &str,
        labels: &[(&str, &str)],
    ) -> Result<Gauge, RegistryError> {
        let key = SeriesKey::new(name, labels)?;

        if let Some(gauge) = self.gauges.read().get(&key) {
            return Ok(gauge.clone());
        }

        let mut gauges = self.gauges.write();
        Ok(gauges.entry(key).or_insert_with(Gauge::new).clone())
    }

    /// Number of registered series.
    pub fn len(&self) -> usize {
        self.gauges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.read().is_empty()
    }

    /// Render the registered gauges.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let gauges = self.gauges.read();
        let mut last_family: Option<&str> = None;

        for (key, gauge) in gauges.iter() {
            if last_family != Some(key.name.as_str()) {
                writeln!(out, "# TYPE {} gauge", key.name)?;
                last_family = Some(key.name.as_str());
            }
            writeln!(
                out,
                "{}{} {}",
                key.name,
                key.labels,
                format_value(gauge.get())
            )?;
        }

        Ok(())
    }
}

impl SnapshotSource for GaugeRegistry {
    fn write_snapshot(
        &self,
        out: &mut dyn Write,
        include_process_metrics: bool,
    ) -> io::Result<()> {
        self.render(out)?;
        if include_process_metrics {
            write_process_metrics(out)?;
        }
        Ok(())
    }
}

/// Format a floating point value for Prometheus.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(registry: &GaugeRegistry, process: bool) -> String {
        let mut out = Vec::new();
        registry.write_snapshot(&mut out, process).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_gauge_set_get() {
        let registry = GaugeRegistry::new();
        let gauge = registry.gauge("distance").unwrap();
        assert_eq!(gauge.get(), 0.0);

        gauge.set(1000.0);
        assert_eq!(gauge.get(), 1000.0);

        // Same name returns the same cell.
        let again = registry.gauge("distance").unwrap();
        assert_eq!(again.get(), 1000.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_render_sorted_with_type_comments() {
        let registry = GaugeRegistry::new();
        registry.gauge("temperature").unwrap().set(23.760967);
        registry.gauge("distance").unwrap().set(1000.0);
        registry.gauge("humidity").unwrap().set(33.5);

        assert_eq!(
            render(&registry, false),
            "# TYPE distance gauge\ndistance 1000\n\
             # TYPE humidity gauge\nhumidity 33.5\n\
             # TYPE temperature gauge\ntemperature 23.760967\n"
        );
    }

    #[test]
    fn test_render_labeled_family() {
        let registry = GaugeRegistry::new();
        registry
            .gauge_with_labels("power_watts", &[("phase", "2")])
            .unwrap()
            .set(5.0);
        registry
            .gauge_with_labels("power_watts", &[("phase", "1")])
            .unwrap()
            .set(4.0);

        assert_eq!(
            render(&registry, false),
            "# TYPE power_watts gauge\n\
             power_watts{phase=\"1\"} 4\n\
             power_watts{phase=\"2\"} 5\n"
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = GaugeRegistry::new();
        assert_eq!(
            registry.gauge("1bad").unwrap_err(),
            RegistryError::InvalidName("1bad".to_string())
        );
        assert!(registry.gauge("has.dot").is_err());
        assert!(matches!(
            registry.gauge_with_labels("ok", &[("bad-label", "x")]),
            Err(RegistryError::InvalidLabel { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_label_values_escaped() {
        let registry = GaugeRegistry::new();
        registry
            .gauge_with_labels("info", &[("name", "say \"hi\"")])
            .unwrap()
            .set(1.0);

        assert!(render(&registry, false).contains("info{name=\"say \\\"hi\\\"\"} 1\n"));
    }

    #[test]
    fn test_closure_snapshot_source() {
        let source = |out: &mut dyn Write, process: bool| -> io::Result<()> {
            writeln!(out, "fake {}", if process { 1 } else { 0 })
        };

        let mut out = Vec::new();
        source.write_snapshot(&mut out, true).unwrap();
        assert_eq!(out, b"fake 1\n");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(2.25), "2.25");
        assert_eq!(format_value(-0.5), "-0.5");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
