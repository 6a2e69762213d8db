//! Site identity keys.
//!
//! A site key scopes one license to one installation. Both the client and
//! the server derive it from the site URL, so the derivation must stay
//! byte-for-byte stable:
//!
//! `data-` + host (port dropped, leading `www.` stripped, lower-cased, every
//! character outside `[a-z0-9_-]` removed).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Prefix shared by every site key.
pub const SITE_KEY_PREFIX: &str = "data-";

/// A deterministic identity key derived from a site's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteKey(String);

impl SiteKey {
    /// Derives the key for the site at `site_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or has no host.
    pub fn from_url(site_url: &str) -> Result<Self> {
        let url = Url::parse(site_url.trim())?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::MissingHost(site_url.to_string()))?;

        Ok(Self(format!("{SITE_KEY_PREFIX}{}", normalize_host(host))))
    }

    /// Wraps an already-derived key (e.g. one returned by the server).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalized domain part (without the prefix).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.strip_prefix(SITE_KEY_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SiteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SiteKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SiteKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Normalizes a host name into the key alphabet `[a-z0-9_-]`.
fn normalize_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    let trimmed = lower.strip_prefix("www.").unwrap_or(&lower);

    trimmed
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}
