//! Request signing for the license API.
//!
//! Two schemes are supported, chosen once per connection by the target's URL
//! scheme:
//! - **Basic** for `https` targets: credentials travel as transport-level
//!   basic auth, or as plain query parameters when query-string auth is on.
//! - **OAuth** for plain `http` targets: a one-shot HMAC-SHA256 signature
//!   over the method, URL and every parameter.
//!
//! The [`verify`] functions are the server-side counterpart.

mod basic;
mod credentials;
mod encode;
mod error;
mod oauth;
mod signer;
pub mod verify;

pub use basic::BasicSigner;
pub use credentials::Credentials;
pub use encode::encode;
pub use error::{AuthError, AuthResult};
pub use oauth::{OAuthSigner, SIGNATURE_METHOD, base_string};
pub use signer::{Scheme, SignedParams, Signer, SignerOptions, BASICAUTH_SSL_NOT_INSTALLED};

pub use licman_types::{ParamValue, Params};
