//! Server-side checks of signed requests.

use crate::error::{AuthError, AuthResult};
use crate::oauth::keyed_mac;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::Mac;
use licman_types::{Method, Params};

/// Recomputes the OAuth signature over `params` (minus `oauth_signature`)
/// and compares it in constant time.
pub fn verify_oauth(
    method: Method,
    url: &str,
    params: &Params,
    consumer_secret: &str,
) -> AuthResult<()> {
    let mut unsigned = params.clone();
    let provided = unsigned
        .remove("oauth_signature")
        .and_then(|value| value.as_text().map(str::to_owned))
        .ok_or(AuthError::MissingSignature)?;
    let provided = STANDARD
        .decode(provided.as_bytes())
        .map_err(|e| AuthError::MalformedSignature(e.to_string()))?;

    keyed_mac(method, url, &unsigned, consumer_secret)?
        .verify_slice(&provided)
        .map_err(|_| AuthError::SignatureMismatch)
}

/// Checks an `Authorization: Basic ...` header value against the consumer pair.
pub fn verify_basic(header: &str, consumer_key: &str, consumer_secret: &str) -> AuthResult<()> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedBasicHeader)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedBasicHeader);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedBasicHeader)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedBasicHeader)?;
    let (key, secret) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedBasicHeader)?;

    if key == consumer_key && secret == consumer_secret {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
