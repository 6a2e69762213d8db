//! Connection options.

use crate::error::{HttpError, HttpResult};
use licman_types::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Error code for a connection without a REST namespace.
pub const NAMESPACE_NOT_VALID: &str = "rest_api_namespace_not_valid";

/// Per-connection settings. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// REST namespace, e.g. `lmfwc`. Required.
    pub namespace: String,
    pub version: String,
    /// Connect and total timeout, in seconds.
    pub timeout: u64,
    pub verify_ssl: bool,
    pub follow_redirects: bool,
    /// Send basic-auth credentials as query parameters.
    pub query_string_auth: bool,
    pub user_agent: String,
    /// Must have leading and trailing slashes.
    #[serde(alias = "wp_api_prefix")]
    pub api_prefix: String,
    /// Fixed `oauth_timestamp`; the current time when unset.
    pub oauth_timestamp: Option<i64>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            version: "v2".to_string(),
            timeout: 15,
            verify_ssl: true,
            follow_redirects: false,
            query_string_auth: false,
            user_agent: "Licman License Manager API Client-Rust".to_string(),
            api_prefix: "/wp-json/".to_string(),
            oauth_timestamp: None,
        }
    }
}

impl ConnectionOptions {
    /// Default options for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Resolves a loose option map, filling defaults. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Fails with `rest_api_namespace_not_valid` when no namespace is given.
    pub fn resolve(map: Value) -> HttpResult<Self> {
        let options: Self = serde_json::from_value(map)?;
        options.ensure_namespace()?;
        Ok(options)
    }

    /// Checks that a namespace is configured.
    pub fn ensure_namespace(&self) -> HttpResult<&str> {
        if self.namespace.trim().is_empty() {
            return Err(HttpError::Config(ApiError::new(
                NAMESPACE_NOT_VALID,
                "REST API namespace must be defined first.",
            )));
        }
        Ok(&self.namespace)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
