//! Core type definitions for licman.
//!
//! This crate defines the protocol-level types shared by the license client,
//! the HTTP layer and the server-side validator:
//! - Site identity keys (one license scoped to one installation)
//! - License status and form state
//! - Ordered request parameters
//! - Request/response value objects of a single HTTP exchange
//! - The structured error payload surfaced to callers
//!
//! Nothing here performs I/O.

mod api_error;
mod error_set;
mod message;
mod params;
mod site;
mod status;

pub use api_error::{ApiError, ErrorData};
pub use error_set::ErrorSet;
pub use message::{BasicCredentials, Method, Request, Response};
pub use params::{leading_int, ParamValue, Params};
pub use site::SiteKey;
pub use status::{FormState, LicenseStatus};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("unknown form state: {0}")]
    UnknownFormState(String),

    #[error("unsupported HTTP method: {0}")]
    UnknownMethod(String),
}
