//! Async HTTP client for the license API.
//!
//! [`HttpClient`] signs every call with the connection's [`Signer`], sends
//! it through a [`Transport`] and turns the reply into either parsed JSON or
//! a structured [`HttpError`]. Transport failures and protocol failures are
//! reported on separate channels so callers can tell "the server rejected
//! us" apart from "we could not reach the server".
//!
//! [`Signer`]: licman_auth::Signer

mod client;
mod error;
mod options;
mod transport;

pub use client::{HttpClient, JSON_CONTENT_TYPE};
pub use error::{HttpError, HttpResult};
pub use options::{ConnectionOptions, NAMESPACE_NOT_VALID};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportSettings};

/// Request/response value objects, shared with the rest of the workspace.
pub mod message {
    pub use licman_types::{BasicCredentials, Method, Request, Response};
}

pub use licman_auth::Credentials;
pub use licman_types::{ApiError, Method, Params, Request, Response};
