//! Error types for the license client.

use licman_http::HttpError;
use licman_types::{ApiError, ErrorSet};
use thiserror::Error;

/// Duplicate or malformed form request, rejected locally.
pub const LICENSE_FORM_INVALID_REQUEST: &str = "license_form_invalid_request";
/// The license form was used while debug mode is on.
pub const DEBUG_MODE_NOT_ALLOWED: &str = "debug_mode_not_allowed";
/// A debug-only call was made outside debug mode.
pub const DEBUG_MODE_DISABLED: &str = "debug_mode_disabled";
/// A `POST`/`PUT` debug call had nothing to send.
pub const NO_INSERT_DATA_FOUND: &str = "no_insert_data_found";
/// Re-validation was attempted without a persisted license.
pub const LICENSE_DATA_INVALID: &str = "license_data_invalid";
/// Server error code for an expired license.
pub const LICENSE_EXPIRED: &str = "lmfwc_rest_license_expired";

/// License client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP call failed (transport, protocol or configuration).
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Rejected locally, before any network call.
    #[error("{0}")]
    Rejected(ApiError),

    /// The submitted form has field errors.
    #[error("license form has {} invalid field(s)", .0.len())]
    InvalidForm(ErrorSet),

    /// The persistence backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Types(#[from] licman_types::Error),
}

impl ClientError {
    pub(crate) fn rejected(code: &str, message: impl Into<String>) -> Self {
        Self::Rejected(ApiError::new(code, message))
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::Rejected(ApiError::new(LICENSE_FORM_INVALID_REQUEST, message).with_status(400))
    }

    /// The structured error payload, if there is one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Http(e) => e.api_error(),
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// The error code, or an empty string for local failures.
    #[must_use]
    pub fn code(&self) -> &str {
        self.api_error().map_or("", |e| e.code.as_str())
    }
}

/// Result type for license client operations.
pub type ClientResult<T> = Result<T, ClientError>;
