//! Zenoh subscriber feeding device messages into the gauges.

use tankmon_common::config::ZenohConfig;
use tankmon_push::{PushRequest, Pusher};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};
use zenoh::sample::SampleKind;

use crate::decoder::DeviceGauges;

/// Subscribes to one sensor and pushes a snapshot after every decoded message.
pub struct SensorSubscriber {
    gauges: DeviceGauges,
    pusher: Pusher,
    request: PushRequest,
    zenoh_config: ZenohConfig,
    key_expr: String,
}

impl SensorSubscriber {
    pub fn new(
        gauges: DeviceGauges,
        pusher: Pusher,
        request: PushRequest,
        zenoh_config: ZenohConfig,
        key_expr: impl Into<String>,
    ) -> Self {
        Self {
            gauges,
            pusher,
            request,
            zenoh_config,
            key_expr: key_expr.into(),
        }
    }

    pub fn key_expr(&self) -> &str {
        &self.key_expr
    }

    /// Decode one message and start a push if any gauge changed.
    ///
    /// Returns whether a push was started.
    pub fn handle_payload(&self, key: &str, payload: &[u8]) -> bool {
        match self.gauges.apply(payload) {
            Ok(0) => {
                debug!(key = %key, "Message carried no known readings");
                false
            }
            Ok(updated) => {
                trace!(key = %key, updated, "Updated gauges");
                // Delivery is fire-and-forget; the task logs its own outcome.
                drop(self.pusher.push_request(self.request.clone()));
                true
            }
            Err(e) => {
                warn!(
                    key = %key,
                    profile = %self.gauges.profile(),
                    payload_len = payload.len(),
                    error = %e,
                    "Failed to decode sensor message"
                );
                false
            }
        }
    }

    /// Run the subscriber until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let session = tankmon_common::connect(&self.zenoh_config).await?;

        info!(key_expr = %self.key_expr, "Subscribing to sensor");
        let subscriber = session
            .declare_subscriber(&self.key_expr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create subscriber: {}", e))?;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping subscriber");
                        break;
                    }
                }

                sample = subscriber.recv_async() => {
                    match sample {
                        Ok(sample) => {
                            if sample.kind() == SampleKind::Delete {
                                trace!(key = %sample.key_expr(), "Ignoring delete sample");
                                continue;
                            }

                            let payload = sample.payload().to_bytes();
                            self.handle_payload(sample.key_expr().as_str(), &payload);
                        }
                        Err(e) => {
                            warn!("Error receiving sample: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        subscriber
            .undeclare()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to undeclare subscriber: {}", e))?;
        session
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to close session: {}", e))?;

        info!("Subscriber stopped");
        Ok(())
    }
}
