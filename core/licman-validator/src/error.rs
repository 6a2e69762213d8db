use licman_types::ApiError;
use serde_json::Value;
use thiserror::Error;

/// Code of every rejection the validator produces.
pub const LICENSE_SERVER_ERROR: &str = "license_server_error";

#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The request was refused; carries the HTTP status to answer with.
    #[error("{0}")]
    Rejected(ApiError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ValidatorError {
    pub(crate) fn rejected(message: impl Into<String>, status: u16, data: Option<Value>) -> Self {
        let mut error = ApiError::new(LICENSE_SERVER_ERROR, message).with_status(status);
        if let Some(data) = data {
            error = error.with_data(data);
        }
        Self::Rejected(error)
    }

    /// HTTP status to answer with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected(e) => e.status().unwrap_or(400),
            _ => 500,
        }
    }

    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;
