//! Session state and the `/authorize` wire contract.
//!
//! A [`Session`] owns the long-lived API key and the short-lived token
//! handed out by `GET /authorize`. The key is only ever sent to the
//! authorization endpoint; every other request carries the token. The
//! session itself performs no I/O: [`crate::client::XmlClient`] drives the
//! authorize round-trip and hands the decoded [`AuthorizeResponse`] to
//! [`Session::store`].

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, XmlApiError};

/// Fixed authorization endpoint. Requests to it carry the API key instead of
/// the session token.
pub const AUTHORIZE_ENDPOINT: &str = "/authorize";

/// Tokens this close to their expiry are treated as already expired so that
/// a request does not race the boundary.
const EXPIRY_BUFFER_SECS: i64 = 30;

/// Numeric expiries below this (September 2001 as an epoch) are token
/// lifetimes in seconds, not absolute timestamps.
const RELATIVE_EXPIRY_LIMIT_SECS: i64 = 1_000_000_000;

/// Body of a successful `GET /authorize`.
///
/// `token` is optional at the serde level so that a 200 response without it
/// decodes cleanly and can be reported as an authorization failure rather
/// than a parse failure. `expires` is kept raw for the same reason: an
/// expiry in an unknown shape must not cost a valid token.
#[derive(Debug, Deserialize)]
pub struct AuthorizeResponse {
    /// Bearer token for subsequent requests.
    #[serde(default)]
    pub token: Option<String>,
    /// When the token stops being accepted, if the service says. See
    /// [`expiry_instant`] for the accepted shapes.
    #[serde(default)]
    pub expires: Option<Value>,
}

/// Interprets a raw `expires` value against `now`.
///
/// Accepted shapes:
/// - RFC 3339 timestamp string.
/// - Integer (or integer string) of at least 1e9: seconds since the Unix
///   epoch.
/// - Smaller non-negative integer: lifetime in seconds from `now`.
///
/// Anything else yields `None`.
pub fn expiry_instant(value: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| from_seconds(secs, now)),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<i64>().ok().and_then(|secs| from_seconds(secs, now)))
        }
        _ => None,
    }
}

fn from_seconds(secs: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if secs < 0 {
        None
    } else if secs < RELATIVE_EXPIRY_LIMIT_SECS {
        now.checked_add_signed(Duration::try_seconds(secs)?)
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

/// Credentials and current token for one client instance.
///
/// Invariants:
/// - `token` is `None` until the first successful [`Session::store`].
/// - `token` and `expires_at` are always replaced together, so a reader
///   never observes a new token paired with the previous expiry.
/// - A failed store leaves both fields untouched.
#[derive(Debug)]
pub struct Session {
    api_key: String,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session with no token; the first request authorizes.
    pub fn new(api_key: &str) -> Self {
        Session {
            api_key: api_key.to_string(),
            token: None,
            expires_at: None,
        }
    }

    /// Creates a session that already holds `token`, with no known expiry.
    pub fn with_token(api_key: &str, token: &str) -> Self {
        Session {
            api_key: api_key.to_string(),
            token: Some(token.to_string()),
            expires_at: None,
        }
    }

    /// The API key sent to the authorize endpoint.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the current token, or `None` if none has been obtained or the
    /// known expiry (minus the safety buffer) has passed.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.token.as_deref()
    }

    /// The last issued token, ignoring its expiry.
    ///
    /// Used right after an authorize round-trip: a token the service just
    /// handed out is sent even if it expires within the safety buffer.
    pub(crate) fn issued_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Expiry of the current token, when the service reported one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Replaces the token with the one carried by `response`.
    ///
    /// # Errors
    ///
    /// `XmlApiError::Auth` if the response has no token or an empty one. The
    /// session is not modified in that case.
    pub fn store(&mut self, response: AuthorizeResponse) -> Result<()> {
        let token = match response.token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(XmlApiError::Auth {
                    message: "authorize response did not contain a token".to_string(),
                    source: None,
                });
            }
        };

        let expires_at = response.expires.as_ref().and_then(|raw| {
            let at = expiry_instant(raw, Utc::now());
            if at.is_none() && !raw.is_null() {
                warn!(expires = %raw, "ignoring undecodable token expiry");
            }
            at
        });

        self.expires_at = expires_at;
        self.token = Some(token);
        Ok(())
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= at,
            None => false,
        }
    }
}
