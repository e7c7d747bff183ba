//! Error types for the catalog API client and fetch coordinator.
//!
//! # Design
//! `ApiError` is the single failure value produced by the request executor.
//! Every variant answers the same three questions (`message`, `status`,
//! `payload`) so callers can treat it as one structured error, while the
//! variant itself still tells a transport failure apart from a non-2xx
//! response or an unparseable success body. Failures that never reached a
//! server report the sentinel status `500`.

use serde_json::Value;
use thiserror::Error;

/// Status reported for failures that have no real HTTP status.
pub const CLIENT_ERROR_STATUS: u16 = 500;

/// User-facing message for any failed catalog fetch.
pub const FETCH_FAILED_MESSAGE: &str =
    "Could not retrieve data catalog. Please check network connection.";

/// User-facing message when a fetch succeeds with no items.
pub const EMPTY_RESULT_MESSAGE: &str = "The endpoint returned no items.";

/// Errors returned by `ApiClient`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The HTTP call could not complete (connection refused, DNS, TLS...).
    #[error("Network or Client Error: {0}")]
    Network(String),

    /// The request could not be built from the given endpoint and options.
    #[error("Network or Client Error: {0}")]
    InvalidRequest(String),

    /// The request payload could not be serialized to JSON.
    #[error("Network or Client Error: request body serialization failed: {0}")]
    Serialization(String),

    /// The server answered with a status outside 200-299.
    #[error("Request failed with status {status}")]
    Status {
        status: u16,
        /// Parsed JSON error body, or the raw text as a JSON string.
        payload: Option<Value>,
    },

    /// A 2xx response whose body is not the expected JSON.
    #[error("Network or Client Error: malformed response body: {0}")]
    MalformedBody(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => CLIENT_ERROR_STATUS,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ApiError::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// A transport could not complete the round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Network(err.0)
    }
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unsupported base URL scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
}

/// Why a coordinator fetch ended in the failure state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request succeeded but carried an empty collection.
    #[error("The endpoint returned no items.")]
    EmptyResult,
}

impl FetchError {
    /// The static message shown to consumers; never the underlying detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Api(_) => FETCH_FAILED_MESSAGE,
            FetchError::EmptyResult => EMPTY_RESULT_MESSAGE,
        }
    }
}
