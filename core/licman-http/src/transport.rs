//! The transport seam.
//!
//! [`HttpClient`](crate::HttpClient) never talks to the network directly; it
//! hands a finished [`Request`] to a [`Transport`]. Production code uses
//! [`ReqwestTransport`], tests substitute their own.

use crate::error::{HttpError, HttpResult};
use async_trait::async_trait;
use licman_types::{ApiError, Method, Request, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport-level knobs, fixed when the transport is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub follow_redirects: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            verify_ssl: true,
            follow_redirects: false,
        }
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends one request and returns whatever the server answered, whatever
/// its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the underlying client.
    ///
    /// # Errors
    ///
    /// Fails with `transport_unavailable` when no client can be built.
    pub fn new(settings: TransportSettings) -> HttpResult<Self> {
        let redirect = if settings.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .redirect(redirect)
            .build()
            .map_err(|e| {
                HttpError::Config(ApiError::new(
                    "transport_unavailable",
                    format!("HTTP transport could not be initialized: {e}"),
                ))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method()), request.url());

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(basic) = request.basic_auth() {
            if request.header("authorization").is_none() {
                builder = builder.basic_auth(&basic.username, Some(&basic.password));
            }
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_string());
        }

        let reply = builder
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let code = reply.status().as_u16();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in reply.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let body = reply
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        debug!(code, bytes = body.len(), "received response");
        Ok(Response::new(code, headers, body))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}
