//! Error types for label validation, pushing and delivery.

use thiserror::Error;

/// Errors returned by the label validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("missing `=` after {tail:?}")]
    MissingEquals { tail: String },

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("missing starting `\"` for {ident:?} value; tail={tail:?}")]
    MissingOpeningQuote { ident: String, tail: String },

    #[error("missing trailing `\"` for {ident:?} value; tail={tail:?}")]
    UnterminatedValue { ident: String, tail: String },

    #[error("missing `,` after {ident:?} value; tail={tail:?}")]
    MissingSeparator { ident: String, tail: String },

    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
}

/// A metric line without whitespace between the series and its value.
///
/// This means the snapshot source produced broken exposition text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing whitespace between metric name and metric value in exposition line {line:?}")]
pub struct StructuralViolation {
    pub line: String,
}

/// Configuration errors surfaced synchronously by [`crate::Pusher::push`].
#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid extra labels {labels:?}: {source}")]
    InvalidLabels {
        labels: String,
        #[source]
        source: LabelError,
    },

    #[error("cannot parse push URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme in push URL {url:?}; expecting 'http' or 'https'")]
    UnsupportedScheme { url: String },

    #[error("missing host in push URL {url:?}")]
    MissingHost { url: String },
}

impl PushError {
    /// Whether this error is about the destination URL rather than the labels.
    pub fn is_invalid_url(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::UnsupportedScheme { .. } | Self::MissingHost { .. }
        )
    }
}

/// Failures of a single delivery attempt. Only ever logged.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("cannot write metrics snapshot: {0}")]
    Snapshot(#[source] std::io::Error),

    #[error(transparent)]
    StructuralViolation(#[from] StructuralViolation),

    #[error("cannot compress metrics: {0}")]
    Compress(#[source] std::io::Error),

    #[error("cannot push metrics to {url:?}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "unexpected status code in response from {url:?}: {status}; expecting 2xx; response body: {body:?}"
    )]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },
}

impl DeliveryError {
    /// Fatal errors point at a bug in the snapshot producer, not at the network.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StructuralViolation(_))
    }
}

/// Errors from gauge registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid metric name {0:?}")]
    InvalidName(String),

    #[error("invalid label name {label:?} for metric {name:?}")]
    InvalidLabel { name: String, label: String },
}

/// Push configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid extra labels: {0}")]
    Labels(#[from] LabelError),
}
