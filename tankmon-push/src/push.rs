//! Fire-and-forget delivery of gauge snapshots to a Prometheus import endpoint.
//!
//! [`Pusher::push`] validates its inputs synchronously and then hands the
//! actual work to a detached Tokio task. Delivery outcomes are only reported
//! through `tracing`; the caller learns "accepted for delivery", never
//! "delivered". There is no retry.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Client;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use url::Url;

use crate::config::PushConfig;
use crate::error::{DeliveryError, PushError};
use crate::exposition::rewrite;
use crate::labels::ExtraLabels;
use crate::registry::SnapshotSource;

/// Parse a push URL, accepting only `http`/`https` with a host.
pub fn parse_push_url(raw: &str) -> Result<Url, PushError> {
    let url = Url::parse(raw).map_err(|source| PushError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PushError::UnsupportedScheme {
            url: raw.to_string(),
        });
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(PushError::MissingHost {
            url: raw.to_string(),
        });
    }

    Ok(url)
}

/// Render a URL with any embedded credentials removed, for logging.
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    // Both only fail for URLs that cannot carry credentials in the first place.
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.to_string()
}

/// A validated push destination plus the options for one delivery.
#[derive(Debug, Clone)]
pub struct PushRequest {
    url: Url,
    redacted_url: String,
    timeout: Duration,
    labels: ExtraLabels,
    include_process_metrics: bool,
}

impl PushRequest {
    /// Validate labels and URL. Nothing is sent.
    pub fn new(
        url: &str,
        timeout: Duration,
        extra_labels: &str,
        include_process_metrics: bool,
    ) -> Result<Self, PushError> {
        let labels =
            ExtraLabels::parse(extra_labels).map_err(|source| PushError::InvalidLabels {
                labels: extra_labels.to_string(),
                source,
            })?;

        Ok(Self::with_labels(
            parse_push_url(url)?,
            timeout,
            labels,
            include_process_metrics,
        ))
    }

    /// Build a request from already validated parts.
    pub fn with_labels(
        url: Url,
        timeout: Duration,
        labels: ExtraLabels,
        include_process_metrics: bool,
    ) -> Self {
        Self {
            redacted_url: redact_url(&url),
            url,
            timeout,
            labels,
            include_process_metrics,
        }
    }

    /// Build a request from push configuration and the labels to inject.
    pub fn from_config(config: &PushConfig, labels: ExtraLabels) -> Result<Self, PushError> {
        Ok(Self::with_labels(
            parse_push_url(&config.url)?,
            config.timeout(),
            labels,
            config.include_process_metrics,
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn redacted_url(&self) -> &str {
        &self.redacted_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn labels(&self) -> &ExtraLabels {
        &self.labels
    }
}

/// Gzip-compress `data` with the default compression level.
fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Snapshot, rewrite, compress and send one push, waiting for the response.
pub async fn deliver(
    client: &Client,
    request: &PushRequest,
    source: &dyn SnapshotSource,
) -> Result<(), DeliveryError> {
    let mut raw = Vec::new();
    source
        .write_snapshot(&mut raw, request.include_process_metrics)
        .map_err(DeliveryError::Snapshot)?;

    let payload = if request.labels.is_empty() {
        raw
    } else {
        rewrite(&raw, &request.labels)?
    };

    let body = gzip(&payload).map_err(DeliveryError::Compress)?;

    // The import endpoint expects GET with a body.
    let response = client
        .get(request.url.clone())
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_ENCODING, "gzip")
        .timeout(request.timeout)
        .body(body)
        .send()
        .await
        .map_err(|source| DeliveryError::Transport {
            url: request.redacted_url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .bytes()
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        return Err(DeliveryError::UnexpectedStatus {
            url: request.redacted_url.clone(),
            status: status.as_u16(),
            body,
        });
    }

    // Drain so the connection can go back to the pool.
    let _ = response.bytes().await;
    Ok(())
}

/// Pushes snapshots of a [`SnapshotSource`] to Prometheus import endpoints.
#[derive(Clone)]
pub struct Pusher {
    client: Client,
    source: Arc<dyn SnapshotSource>,
}

impl Pusher {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self::with_client(source, Client::new())
    }

    pub fn with_client(source: Arc<dyn SnapshotSource>, client: Client) -> Self {
        Self { client, source }
    }

    /// Validate the arguments and start a background push.
    ///
    /// Returns as soon as the delivery task is spawned. The handle may be
    /// dropped; it never carries the delivery result. Must be called from
    /// within a Tokio runtime.
    pub fn push(
        &self,
        url: &str,
        timeout: Duration,
        extra_labels: &str,
        include_process_metrics: bool,
    ) -> Result<JoinHandle<()>, PushError> {
        let request = PushRequest::new(url, timeout, extra_labels, include_process_metrics)?;
        Ok(self.push_request(request))
    }

    /// Start a background push for an already validated request.
    pub fn push_request(&self, request: PushRequest) -> JoinHandle<()> {
        let client = self.client.clone();
        let source = self.source.clone();

        tokio::spawn(async move {
            match deliver(&client, &request, source.as_ref()).await {
                Ok(()) => {
                    debug!(url = %request.redacted_url, "Pushed metrics");
                }
                Err(e) if e.is_fatal() => {
                    error!(
                        fatal = true,
                        url = %request.redacted_url,
                        error = %e,
                        "BUG: snapshot source produced malformed exposition, aborting push"
                    );
                }
                Err(e) => {
                    error!(url = %request.redacted_url, error = %e, "Metrics push failed");
                }
            }
        })
    }
}
