//! Prometheus text exposition pusher for tankmon gauges.
//!
//! Renders in-process gauges as Prometheus text exposition, injects extra
//! labels (e.g. `sensor="tank1"`) into every series and pushes the
//! gzip-compressed result to a VictoriaMetrics-style import endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ SnapshotSource  │────>│    rewrite()    │────>│     Pusher      │──> HTTP GET (gzip)
//! │ (GaugeRegistry) │     │ (+ ExtraLabels) │     │ (detached task) │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(GaugeRegistry::new());
//! registry.gauge("distance")?.set(1000.0);
//!
//! let pusher = Pusher::new(registry.clone());
//! pusher.push(
//!     "http://vm:8428/api/v1/import/prometheus",
//!     Duration::from_secs(20),
//!     r#"sensor="tank1""#,
//!     false,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod exposition;
pub mod labels;
pub mod process;
pub mod push;
pub mod registry;

pub use config::PushConfig;
pub use error::{DeliveryError, LabelError, PushError, RegistryError, StructuralViolation};
pub use exposition::rewrite;
pub use labels::{ExtraLabels, validate};
pub use push::{PushRequest, Pusher, deliver, redact_url};
pub use registry::{Gauge, GaugeRegistry, SharedRegistry, SnapshotSource};
