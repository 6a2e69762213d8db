//! The structured error payload surfaced to callers.
//!
//! Shape: `{code, message, data: {status?, request?, response?, ...}}`, the
//! same shape the license server uses for its own error bodies.

use crate::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagnostic context attached to an [`ApiError`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// HTTP-class status of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// The request that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Box<Request>>,
    /// The response that was received, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Box<Response>>,
    /// The server-supplied error value (`.errors` or the whole body).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_error: Option<Value>,
    /// Free-form extra context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A coded, human-readable error with optional diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "ErrorData::is_empty")]
    pub data: ErrorData,
}

impl ApiError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: ErrorData::default(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.data.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_request(mut self, request: Request) -> Self {
        self.data.request = Some(Box::new(request));
        self
    }

    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.data.response = Some(Box::new(response));
        self
    }

    #[must_use]
    pub fn with_response_error(mut self, value: Value) -> Self {
        self.data.response_error = Some(value);
        self
    }

    #[must_use]
    pub fn with_data(mut self, value: Value) -> Self {
        self.data.data = Some(value);
        self
    }

    /// Status attached to the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.data.status
    }

    /// Returns true if the error carries `code`.
    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}
