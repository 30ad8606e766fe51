//! Typed error hierarchy for the xmlapi crate.
//!
//! Every public operation returns [`XmlApiError`] on failure. Variants map to
//! the boundary where the failure happened:
//! - `Auth` covers the `/authorize` endpoint and the reauthorization step of
//!   the request pipeline.
//! - `Api` covers non-success HTTP statuses from ordinary endpoints and keeps
//!   the raw response body, which is the only diagnostic the service gives.
//! - `Domain` covers the service reporting a failure inside a 200 response
//!   (the envelope's `error` field).
//! - `Encode` / `Parse` cover JSON serialization of request bodies and
//!   deserialization of response bodies.
//! - `Network` wraps transport failures that never produced a status code.
//! - `Config` covers client construction from incomplete configuration.

use reqwest::StatusCode;

/// Unified error type for all xmlapi operations.
#[derive(Debug, thiserror::Error)]
pub enum XmlApiError {
    /// Authorization against `/authorize` failed.
    ///
    /// Raised when the endpoint answers with a non-success status, when its
    /// body cannot be decoded, or when the body carries no token. The session
    /// token is left untouched in all of these cases.
    #[error("authorization failed: {message}")]
    Auth {
        /// Human-readable description, including status and body when available.
        message: String,
        /// The underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service returned a non-success HTTP status.
    #[error("API error {status}: {body}")]
    Api {
        /// The HTTP status code of the final attempt.
        status: StatusCode,
        /// The raw response body text.
        body: String,
    },

    /// The HTTP call succeeded but the response envelope carried an error
    /// message.
    #[error("{0}")]
    Domain(String),

    /// A request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A response body could not be deserialized.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A network-level failure (DNS, TCP, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The client configuration is incomplete or unreadable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, XmlApiError>;
