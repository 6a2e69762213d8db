//! Value objects for a single HTTP exchange.

use crate::{Error, Params, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP methods spoken by the license API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns true for methods that carry a JSON body.
    #[must_use]
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }
}

/// Transport-level basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An outbound request, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    url: String,
    method: Method,
    parameters: Params,
    headers: BTreeMap<String, String>,
    body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    basic_auth: Option<BasicCredentials>,
}

impl Request {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        method: Method,
        parameters: Params,
        headers: BTreeMap<String, String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method,
            parameters,
            headers,
            body: body.into(),
            basic_auth: None,
        }
    }

    /// Attaches transport-level basic credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, credentials: Option<BasicCredentials>) -> Self {
        self.basic_auth = credentials;
        self
    }

    /// Full URL including the query string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Authenticated parameters sent with the request.
    #[must_use]
    pub fn parameters(&self) -> &Params {
        &self.parameters
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns a header value, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers as `Name: value` lines.
    #[must_use]
    pub fn raw_headers(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect()
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn basic_auth(&self) -> Option<&BasicCredentials> {
        self.basic_auth.as_ref()
    }
}

/// An inbound response, immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    code: u16,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Response {
    #[must_use]
    pub fn new(code: u16, headers: BTreeMap<String, String>, body: impl Into<String>) -> Self {
        Self {
            code,
            headers,
            body: body.into(),
        }
    }

    /// An empty response, used when the transport produced nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the header map from raw `Name: value` lines. Status lines and
    /// other lines without `": "` are skipped; repeated headers are joined
    /// with `", "`.
    #[must_use]
    pub fn parse_header_lines(raw: &str) -> BTreeMap<String, String> {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((key, value)) = line.split_once(": ") else {
                continue;
            };
            headers
                .entry(key.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value.trim());
                })
                .or_insert_with(|| value.trim().to_string());
        }
        headers
    }

    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns true for 200, 201 and 202; every other code is an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.code, 200..=202)
    }
}
