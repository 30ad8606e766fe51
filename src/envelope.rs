//! Status/error envelope returned by the mutating endpoints.
//!
//! The service signals failure on two layers: an HTTP status (handled by
//! the request pipeline) and, inside a `200 OK`, a non-empty `error` field.
//! [`Envelope::into_result`] turns the second layer into
//! `XmlApiError::Domain`.

use serde::Deserialize;

use crate::error::{Result, XmlApiError};

/// `{"status": "...", "error": "..."}`.
///
/// Some deployments name the success field `data` instead of `status`;
/// both are accepted. Missing or `null` fields read as empty.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    /// Success message.
    #[serde(default, alias = "data")]
    pub status: Option<String>,
    /// Failure message; non-empty means the operation did not happen.
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// Returns the status message, or the envelope error as
    /// `XmlApiError::Domain` when it is non-empty.
    pub fn into_result(self) -> Result<String> {
        match self.error {
            Some(error) if !error.is_empty() => Err(XmlApiError::Domain(error)),
            _ => Ok(self.status.unwrap_or_default()),
        }
    }
}
