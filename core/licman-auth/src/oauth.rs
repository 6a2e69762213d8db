//! One-shot HMAC-SHA256 request signing.
//!
//! The base string is `METHOD&encode(url)&entries`, where every parameter is
//! percent-encoded, sorted by the raw bytes of its encoded key, rendered as
//! `key=value`, percent-encoded once more and joined with a literal `%26`.
//! Nested values expand to `key%5Bsub%5D` entries. The server recomputes the
//! same string, so any change here breaks every deployed client.

use crate::encode::encode;
use crate::error::{AuthError, AuthResult};
use crate::Credentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use licman_types::{Method, ParamValue, Params};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `oauth_signature_method` parameter.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA256";

const NONCE_LEN: usize = 40;

/// Signs one request with the consumer secret.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
    timestamp: Option<i64>,
    nonce: Option<String>,
}

impl OAuthSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            timestamp: None,
            nonce: None,
        }
    }

    /// Fixes `oauth_timestamp`. Without it the current Unix time is used.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Fixes `oauth_nonce`. Without it a fresh nonce is derived per call.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Merges the OAuth parameters into `params`, signs the result and
    /// returns every parameter, signature included, in byte order.
    pub fn sign(&self, method: Method, url: &str, mut params: Params) -> AuthResult<Params> {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let nonce = self.nonce.clone().unwrap_or_else(fresh_nonce);

        params.insert("consumer_key", &self.credentials.consumer_key);
        params.insert("consumer_secret", &self.credentials.consumer_secret);
        params.insert("oauth_timestamp", timestamp);
        params.insert("oauth_nonce", nonce);
        params.insert("oauth_signature_method", SIGNATURE_METHOD);

        let signature = signature(method, url, &params, &self.credentials.consumer_secret)?;
        debug!(%method, url, "signed request with {}", SIGNATURE_METHOD);
        params.insert("oauth_signature", signature);

        Ok(params)
    }
}

/// Computes `base64(HMAC-SHA256(base_string, secret + "&"))`.
pub(crate) fn signature(
    method: Method,
    url: &str,
    params: &Params,
    consumer_secret: &str,
) -> AuthResult<String> {
    let mac = keyed_mac(method, url, params, consumer_secret)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Returns the MAC state after absorbing the base string.
pub(crate) fn keyed_mac(
    method: Method,
    url: &str,
    params: &Params,
    consumer_secret: &str,
) -> AuthResult<HmacSha256> {
    let key = format!("{consumer_secret}&");
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| AuthError::InvalidKey)?;
    mac.update(base_string(method, url, params).as_bytes());
    Ok(mac)
}

/// Builds the string that gets signed.
#[must_use]
pub fn base_string(method: Method, url: &str, params: &Params) -> String {
    let normalized: BTreeMap<String, &ParamValue> =
        params.iter().map(|(key, value)| (encode(key), value)).collect();

    let mut entries = Vec::with_capacity(normalized.len());
    for (key, value) in normalized {
        push_entries(&key, value, &mut entries);
    }

    format!("{}&{}&{}", method.as_str(), encode(url), entries.join("%26"))
}

fn push_entries(key: &str, value: &ParamValue, out: &mut Vec<String>) {
    match value {
        ParamValue::Text(text) => out.push(encode(&format!("{key}={}", encode(text)))),
        ParamValue::Nested(nested) => {
            for (sub, inner) in nested {
                push_entries(&format!("{key}%5B{sub}%5D"), inner, out);
            }
        }
    }
}

fn fresh_nonce() -> String {
    let now = chrono::Utc::now();
    let seed = format!(
        "{} {}",
        now.timestamp_subsec_nanos(),
        now.timestamp()
    );
    let mut nonce = hex::encode(Sha256::digest(seed.as_bytes()));
    nonce.truncate(NONCE_LEN);
    nonce
}
