//! Error types for run resolution.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ResultsError>;

/// gRPC status code the Results API gateway reports for missing records.
pub(crate) const GRPC_NOT_FOUND: i64 = 5;

/// Errors that can occur while resolving or listing runs.
#[derive(Debug, Error)]
pub enum ResultsError {
    /// Label selector could not be parsed.
    #[error("invalid label selector {pair:?}: {reason}")]
    MalformedSelector { pair: String, reason: String },

    /// Record carries no payload at all.
    #[error("record {record} has no embedded Tekton data")]
    EmptyRecord { record: String },

    /// Payload is present but is not a Tekton resource.
    #[error("decode Tekton resource in record {record}: {reason}")]
    Decode { record: String, reason: String },

    /// Payload string is not valid base64.
    #[error("decode base64 payload of record {record}: {source}")]
    Base64Decode {
        record: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Remote store reports the addressed item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Scan finished without a single matching run.
    #[error("no run found that matches the provided filters")]
    NoRunFound,

    /// Several runs match and automatic selection is disabled.
    #[error(
        "multiple run instances match the filters ({}). Please refine the filters with an exact name or prefix.",
        .candidates.join(", ")
    )]
    AmbiguousSelector { candidates: Vec<String> },

    /// Direct lookup by unique identifier failed.
    #[error("get record by UID {uid}: {source}")]
    DirectLookup {
        uid: String,
        #[source]
        source: Box<ResultsError>,
    },

    /// Remote store returned a non-success status.
    #[error("results API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not the expected JSON.
    #[error("invalid response body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Kubernetes client failed.
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Caller passed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Rendering a run failed.
    #[error("format output: {0}")]
    Format(String),

    /// Cancellation was requested before the operation finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl ResultsError {
    /// Whether the remote store reported absence of the addressed item.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Classify a non-success response from the Results API.
    ///
    /// HTTP 404 and gateway bodies carrying gRPC `NOT_FOUND` map to
    /// [`ResultsError::NotFound`]; everything else stays an opaque API error.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let message = body.trim().to_string();
        if status == 404 || grpc_code(&message) == Some(GRPC_NOT_FOUND) {
            Self::NotFound(message)
        } else {
            Self::Api { status, message }
        }
    }
}

fn grpc_code(body: &str) -> Option<i64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("code")?
        .as_i64()
}
