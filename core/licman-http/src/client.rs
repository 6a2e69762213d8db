//! The license API client.

use crate::error::{HttpError, HttpResult};
use crate::options::ConnectionOptions;
use crate::transport::{ReqwestTransport, Transport, TransportSettings};
use licman_auth::{Credentials, Signer, SignerOptions};
use licman_types::{ApiError, Method, Params, Request, Response};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `Content-Type` sent with JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

const BOM: char = '\u{feff}';

/// One connection to a license server.
pub struct HttpClient {
    base_api_url: String,
    site_url: String,
    options: ConnectionOptions,
    signer: Signer,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_api_url", &self.base_api_url)
            .field("site_url", &self.site_url)
            .field("scheme", &self.signer.scheme())
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Connects to `server_url` with a `reqwest` transport.
    ///
    /// `site_url` identifies the calling site and is sent as `Referer`.
    ///
    /// # Errors
    ///
    /// Fails when the namespace is missing or the transport can't be built.
    pub fn new(
        server_url: &str,
        credentials: Credentials,
        options: ConnectionOptions,
        site_url: impl Into<String>,
    ) -> HttpResult<Self> {
        options.ensure_namespace()?;
        let transport = ReqwestTransport::new(TransportSettings {
            timeout: options.timeout(),
            verify_ssl: options.verify_ssl,
            follow_redirects: options.follow_redirects,
        })?;
        Self::with_transport(server_url, credentials, options, site_url, Arc::new(transport))
    }

    /// Connects to `server_url` through a caller-supplied transport.
    pub fn with_transport(
        server_url: &str,
        credentials: Credentials,
        options: ConnectionOptions,
        site_url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> HttpResult<Self> {
        let namespace = options.ensure_namespace()?;
        let base_api_url = format!(
            "{}{}{}/{}/",
            server_url.trim_end_matches('/'),
            options.api_prefix,
            namespace,
            options.version
        );

        let signer = Signer::for_url(
            &base_api_url,
            credentials,
            SignerOptions {
                query_string_auth: options.query_string_auth,
                verify_ssl: options.verify_ssl,
                oauth_timestamp: options.oauth_timestamp,
            },
        );

        info!(%base_api_url, "license API client ready");
        Ok(Self {
            base_api_url,
            site_url: site_url.into(),
            options,
            signer,
            transport,
        })
    }

    /// `server_url + api_prefix + namespace + "/" + version + "/"`.
    #[must_use]
    pub fn base_api_url(&self) -> &str {
        &self.base_api_url
    }

    #[must_use]
    pub fn is_ssl(&self) -> bool {
        self.base_api_url
            .get(..8)
            .is_some_and(|p| p.eq_ignore_ascii_case("https://"))
    }

    #[must_use]
    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.options
    }

    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Signs, sends and decodes one call.
    ///
    /// `body` is sent as JSON for methods that carry one; `query` is signed
    /// and appended to the URL; `headers` override the defaults.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        query: Params,
        headers: BTreeMap<String, String>,
    ) -> HttpResult<Value> {
        let request = self.build_request(endpoint, method, body, query, headers)?;
        debug!(%method, url = request.url(), "sending license API request");

        match self.transport.send(&request).await {
            Ok(response) => process_response(request, response),
            Err(err) => {
                warn!(error = %err, "license API transport failure");
                let transport = ApiError::new(
                    "transport_error",
                    format!(
                        "An error occurred when parsing response. Transport error: [{}]",
                        err.message
                    ),
                )
                .with_request(request.clone());
                let protocol = process_response(request, Response::empty())
                    .err()
                    .and_then(|e| e.protocol_error().cloned());
                Err(HttpError::Transport {
                    transport,
                    protocol,
                })
            }
        }
    }

    pub async fn get(&self, endpoint: &str, query: Params) -> HttpResult<Value> {
        self.request(endpoint, Method::Get, None, query, BTreeMap::new())
            .await
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> HttpResult<Value> {
        self.request(endpoint, Method::Post, Some(body), Params::new(), BTreeMap::new())
            .await
    }

    pub async fn put(&self, endpoint: &str, body: &Value) -> HttpResult<Value> {
        self.request(endpoint, Method::Put, Some(body), Params::new(), BTreeMap::new())
            .await
    }

    pub async fn delete(&self, endpoint: &str, query: Params) -> HttpResult<Value> {
        self.request(endpoint, Method::Delete, None, query, BTreeMap::new())
            .await
    }

    pub async fn options(&self, endpoint: &str) -> HttpResult<Value> {
        self.request(endpoint, Method::Options, None, Params::new(), BTreeMap::new())
            .await
    }

    fn build_request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        query: Params,
        extra_headers: BTreeMap<String, String>,
    ) -> HttpResult<Request> {
        let url = format!("{}{}", self.base_api_url, endpoint);
        let signed = self.signer.sign(method, &url, query)?;
        if let Some(warning) = signed.warnings.into_iter().next() {
            return Err(HttpError::Rejected(warning));
        }

        let body = match body {
            Some(value) if method.carries_body() && has_data(value) => {
                serde_json::to_string(value)?
            }
            _ => String::new(),
        };

        let mut headers = BTreeMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            (
                "User-Agent".to_string(),
                format!("{}/{}", self.options.user_agent, env!("CARGO_PKG_VERSION")),
            ),
            ("Referer".to_string(), self.site_url.clone()),
        ]);
        headers.extend(extra_headers);
        if !body.is_empty() {
            headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        }

        Ok(Request::new(
            with_query(&url, &signed.params),
            method,
            signed.params,
            headers,
            body,
        )
        .with_basic_auth(signed.basic_auth))
    }
}

fn has_data(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn with_query(url: &str, params: &Params) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.flatten())
        .finish();
    format!("{url}?{query}")
}

/// Decodes `response` into JSON, or the error it represents.
pub(crate) fn process_response(request: Request, response: Response) -> HttpResult<Value> {
    let body = response.body();
    let body = body.strip_prefix(BOM).unwrap_or(body);

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Err(HttpError::InvalidJson(
                ApiError::new("invalid_json_response", format!("JSON Error: {e}"))
                    .with_request(request)
                    .with_response(response),
            ));
        }
    };

    if response.is_success() {
        return Ok(parsed);
    }

    let errors = parsed.get("errors").cloned().unwrap_or_else(|| parsed.clone());
    let (code, message) = error_fields(&errors).unwrap_or_else(|| {
        ("http_error".to_string(), response.body().to_string())
    });

    debug!(code = response.code(), error = %code, "license API returned an error");
    Err(HttpError::Api(
        ApiError::new(code, message)
            .with_status(response.code())
            .with_request(request)
            .with_response(response)
            .with_response_error(errors),
    ))
}

/// `errors[0].{code,message}` for arrays, `{code,message}` for objects.
fn error_fields(errors: &Value) -> Option<(String, String)> {
    let entry = match errors {
        Value::Array(items) => items.first()?,
        Value::Object(_) => errors,
        _ => return None,
    };
    Some((text(entry.get("code")?), text(entry.get("message")?)))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
