//! Authenticated HTTP client for the XML file service.
//!
//! `XmlClient` wraps a `reqwest::Client` and a [`Session`] behind a `Mutex`
//! and exposes one request pipeline, [`XmlClient::execute`], which every
//! typed operation in [`crate::nodes`] and [`crate::files`] goes through.
//!
//! Token lifecycle:
//! - Lazy acquisition: the first request that finds no usable token calls
//!   `/authorize` before sending. A token whose reported expiry has passed
//!   counts as unusable.
//! - One-shot 401 retry: if the service answers `401 Unauthorized`, the
//!   client reauthorizes, rebuilds the request with the fresh token and
//!   sends it exactly once more. The second answer is final, even if it is
//!   another 401.
//! - Single-flight refresh: the session lock is held for the whole
//!   authorize round-trip. A task that hit 401 with token `T` only
//!   reauthorizes if the session still holds `T`; otherwise it reuses the
//!   token another task already fetched.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{AUTHORIZE_ENDPOINT, AuthorizeResponse, Session};
use crate::config::ClientConfig;
use crate::error::{Result, XmlApiError};

/// Builds the underlying `reqwest::Client` with explicit timeouts.
fn build_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?)
}

/// Maps the final attempt's status: any status >= 400 becomes
/// `XmlApiError::Api` carrying the body.
fn final_response(status: StatusCode, payload: Bytes) -> Result<Bytes> {
    if status.is_client_error() || status.is_server_error() {
        return Err(XmlApiError::Api {
            status,
            body: String::from_utf8_lossy(&payload).into_owned(),
        });
    }
    Ok(payload)
}

/// Authenticated client for the XML file service.
///
/// `session` sits behind an async `Mutex` so that concurrent calls sharing
/// one client serialize token refresh. Ordinary requests hold the lock only
/// long enough to copy the token out.
pub struct XmlClient {
    http: Client,
    base_url: String,
    session: Mutex<Session>,
}

impl XmlClient {
    /// Creates a client for `base_url` using the default timeouts.
    ///
    /// A trailing `/` on `base_url` is ignored, since endpoint paths start
    /// with one.
    pub fn new(session: Session, base_url: &str) -> Result<Self> {
        let defaults = ClientConfig::default();
        Self::with_timeouts(
            session,
            base_url,
            defaults.connect_timeout(),
            defaults.request_timeout(),
        )
    }

    /// Creates a client from a resolved [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// `XmlApiError::Config` if no API key is configured.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| XmlApiError::Config("an API key is required".to_string()))?;
        Self::with_timeouts(
            Session::new(api_key),
            &config.base_url,
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    fn with_timeouts(
        session: Session,
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(XmlClient {
            http: build_http_client(connect_timeout, request_timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: Mutex::new(session),
        })
    }

    /// Exchanges the API key for a fresh token and stores it in the session.
    ///
    /// Safe to call at any time; the stored token is replaced wholesale.
    ///
    /// # Errors
    ///
    /// - `XmlApiError::Auth` on a non-success status, an undecodable body or
    ///   a body without a token.
    /// - `XmlApiError::Network` if the request could not be completed.
    ///
    /// The previous token is kept in every failure case.
    pub async fn authorize(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.authorize_locked(&mut session).await
    }

    /// Returns the token currently held by the session, if it is usable.
    pub async fn token(&self) -> Option<String> {
        self.session.lock().await.token().map(str::to_owned)
    }

    /// Core request pipeline. All typed operations delegate here.
    ///
    /// `endpoint` is appended to the base URL (e.g. `"/read"`). `params`
    /// become the query string. `body` is serialized as JSON when present.
    ///
    /// Requests to [`AUTHORIZE_ENDPOINT`] carry the API key and are sent
    /// once, without touching the session. Every other endpoint carries the
    /// session token.
    ///
    /// Returns the raw body of the final attempt on success.
    ///
    /// # Errors
    ///
    /// - `XmlApiError::Encode` if `body` cannot be serialized; nothing is sent.
    /// - `XmlApiError::Auth` if a needed (re)authorization fails.
    /// - `XmlApiError::Api` for any final status >= 400, carrying the body.
    /// - `XmlApiError::Network` for transport failures.
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Bytes> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(XmlApiError::Encode)?
            .map(Bytes::from);

        if endpoint == AUTHORIZE_ENDPOINT {
            let api_key = self.session.lock().await.api_key().to_owned();
            let (status, payload) = self
                .send(method, endpoint, Some(&api_key), params, body)
                .await?;
            return final_response(status, payload);
        }

        let token = self.bearer_token().await?;
        let (mut status, mut payload) = self
            .send(method.clone(), endpoint, Some(&token), params, body.clone())
            .await?;

        // On 401, reauthorize and retry exactly once. Any other status skips
        // the retry path.
        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "request unauthorized, reauthorizing");
            let fresh_token = self.reauthorize(&token).await?;
            (status, payload) = self
                .send(method, endpoint, Some(&fresh_token), params, body)
                .await?;
            if status == StatusCode::UNAUTHORIZED {
                warn!(endpoint, "request still unauthorized after reauthorization");
            }
        }

        final_response(status, payload)
    }

    /// Runs [`execute`](Self::execute) without a body and decodes the JSON
    /// response into `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let payload = self.execute::<()>(method, endpoint, params, None).await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Returns a usable token, authorizing first if the session has none or
    /// its token has expired.
    async fn bearer_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.token() {
            return Ok(token.to_owned());
        }

        self.authorize_locked(&mut session).await?;
        session
            .issued_token()
            .map(str::to_owned)
            .ok_or_else(|| XmlApiError::Auth {
                message: "token missing after authorization".to_string(),
                source: None,
            })
    }

    /// Replaces `stale` with a fresh token after the service rejected it.
    ///
    /// If another task already swapped the token while this one waited for
    /// the lock, the newer token is returned without another authorize call.
    async fn reauthorize(&self, stale: &str) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.token() {
            if current != stale {
                debug!("reusing token refreshed by a concurrent request");
                return Ok(current.to_owned());
            }
        }

        self.authorize_locked(&mut session).await?;
        session
            .issued_token()
            .map(str::to_owned)
            .ok_or_else(|| XmlApiError::Auth {
                message: "token missing after reauthorization".to_string(),
                source: None,
            })
    }

    /// Performs the `/authorize` round-trip. The caller holds the session lock.
    async fn authorize_locked(&self, session: &mut Session) -> Result<()> {
        let (status, payload) = self
            .send(
                Method::GET,
                AUTHORIZE_ENDPOINT,
                Some(session.api_key()),
                &[],
                None,
            )
            .await?;

        if !status.is_success() {
            return Err(XmlApiError::Auth {
                message: format!(
                    "authorize request failed ({status}): {}",
                    String::from_utf8_lossy(&payload)
                ),
                source: None,
            });
        }

        let response: AuthorizeResponse =
            serde_json::from_slice(&payload).map_err(|e| XmlApiError::Auth {
                message: "failed to parse authorize response".to_string(),
                source: Some(Box::new(e)),
            })?;
        session.store(response)?;

        info!(
            token_len = session.issued_token().map_or(0, str::len),
            expires_at = ?session.expires_at(),
            "stored new session token"
        );
        Ok(())
    }

    /// Sends one attempt and reads its whole body.
    ///
    /// The response is consumed by reading the body, so the connection is
    /// released before this returns on every path, including body read
    /// failures.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        credential: Option<&str>,
        params: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> Result<(StatusCode, Bytes)> {
        debug!(%method, endpoint, "sending request");
        let resp = self
            .build_request(method, endpoint, credential, params, body)
            .send()
            .await?;

        let status = resp.status();
        let payload = resp.bytes().await?;
        debug!(%status, endpoint, bytes = payload.len(), "received response");
        Ok((status, payload))
    }

    /// Constructs one attempt from scratch.
    ///
    /// Called for the first attempt and again for the retry, so the retry
    /// always carries whatever credential the caller read after refreshing.
    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        credential: Option<&str>,
        params: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(credential) = credential {
            req = req.header(AUTHORIZATION, credential);
        }
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(payload) = body {
            req = req.body(payload);
        }
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> XmlClient {
        XmlClient::new(Session::with_token("key", "tok"), base_url).unwrap()
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let c = client("http://xml.test:8080/");
        let req = c
            .build_request(Method::GET, "/listFile", None, &[], None)
            .build()
            .unwrap();
        assert_eq!(req.url().as_str(), "http://xml.test:8080/listFile");
    }

    #[test]
    fn request_carries_credential_and_content_type() {
        let c = client("http://xml.test");
        let req = c
            .build_request(Method::PUT, "/update", Some("tok-1"), &[], None)
            .build()
            .unwrap();
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.headers()[AUTHORIZATION], "tok-1");
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn request_without_credential_has_no_authorization_header() {
        let c = client("http://xml.test");
        let req = c
            .build_request(Method::GET, "/read", None, &[], None)
            .build()
            .unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn query_parameters_are_url_encoded() {
        let c = client("http://xml.test");
        let req = c
            .build_request(
                Method::GET,
                "/read",
                None,
                &[("deviceid", "dev 1"), ("path", "/root/item[2]")],
                None,
            )
            .build()
            .unwrap();
        let pairs: Vec<(String, String)> = req
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("deviceid".to_string(), "dev 1".to_string()),
                ("path".to_string(), "/root/item[2]".to_string()),
            ]
        );
    }

    #[test]
    fn empty_params_leave_no_query_string() {
        let c = client("http://xml.test");
        let req = c
            .build_request(Method::GET, "/authorize", Some("key"), &[], None)
            .build()
            .unwrap();
        assert!(req.url().query().is_none());
    }

    #[test]
    fn body_is_attached_verbatim() {
        let c = client("http://xml.test");
        let req = c
            .build_request(
                Method::POST,
                "/create",
                None,
                &[],
                Some(Bytes::from_static(br#"{"a":1}"#)),
            )
            .build()
            .unwrap();
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"a":1}"#);
    }

    #[test]
    fn final_response_maps_error_statuses() {
        let ok = final_response(StatusCode::OK, Bytes::from_static(b"{}")).unwrap();
        assert_eq!(&ok[..], b"{}");

        let err = final_response(StatusCode::UNAUTHORIZED, Bytes::from_static(b"no")).unwrap_err();
        assert!(
            matches!(err, XmlApiError::Api { status, ref body } if status == StatusCode::UNAUTHORIZED && body == "no")
        );
    }

    #[test]
    fn from_config_requires_api_key() {
        let err = XmlClient::from_config(&ClientConfig::default()).err().unwrap();
        assert!(matches!(err, XmlApiError::Config(_)));
    }

    #[tokio::test]
    async fn from_config_builds_unauthorized_session() {
        let config = ClientConfig {
            api_key: Some("k".to_string()),
            ..ClientConfig::default()
        };
        let c = XmlClient::from_config(&config).unwrap();
        assert!(c.token().await.is_none());
        assert_eq!(c.base_url, "http://localhost:8080");
    }
}
