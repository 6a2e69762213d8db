use thiserror::Error;

/// Signing and verification errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HMAC key could not be used.
    #[error("invalid signing key")]
    InvalidKey,

    /// The request carried no `oauth_signature` parameter.
    #[error("missing oauth_signature parameter")]
    MissingSignature,

    /// The signature was not valid base64.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature did not match the recomputed one.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The `Authorization: Basic` header could not be decoded.
    #[error("malformed basic authorization header")]
    MalformedBasicHeader,

    /// The basic credentials did not match.
    #[error("invalid consumer credentials")]
    InvalidCredentials,
}

/// Result type for signing operations.
pub type AuthResult<T> = Result<T, AuthError>;
