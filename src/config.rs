//! Client configuration.
//!
//! Values come from three layers, later layers winning:
//! 1. built-in defaults ([`ClientConfig::default`]);
//! 2. an optional TOML file ([`ClientConfig::load`]);
//! 3. explicit overrides ([`ClientConfig::apply_overrides`]), which the CLI
//!    feeds from its flags and the `XMLAPI_BASE_URL` / `XMLAPI_API_KEY`
//!    environment variables.
//!
//! ```toml
//! base_url = "https://xml.example.net"
//! api_key = "k-123"
//! connect_timeout_secs = 5
//! request_timeout_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, XmlApiError};

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Settings needed to build an [`XmlClient`](crate::client::XmlClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service address; endpoint paths such as `/read` are appended to it.
    pub base_url: String,
    /// Long-lived key exchanged for a token at `/authorize`.
    pub api_key: Option<String>,
    /// TCP + TLS handshake timeout.
    pub connect_timeout_secs: u64,
    /// Whole round-trip timeout, including reading the response body.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document. Missing keys take their default values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| XmlApiError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| XmlApiError::Config(format!("cannot read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded client config");
        Self::from_toml_str(&content)
    }

    /// Replaces `base_url` and `api_key` with any provided non-empty value.
    pub fn apply_overrides(&mut self, base_url: Option<String>, api_key: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.is_empty()) {
            self.base_url = url;
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
