//! Server-side half of the licman activation handshake.
//!
//! This crate handles:
//! - Pre-dispatch validation of activate / deactivate / validate requests
//! - The short-lived transient handed from validation to the response rewrite
//! - Per-site license metadata and the authoritative status flip
//! - Per-license-key locking around the whole round trip
//!
//! Boundary code extracts an [`InboundRequest`] from the real HTTP request;
//! everything here is a pure function of that value and the injected stores.

mod config;
mod error;
mod locks;
mod repository;
mod request;
mod transient;
mod validator;

pub use config::{ValidationMessages, ValidatorConfig, DEFAULT_BASE_ROUTE, DEFAULT_FORM_TOKEN};
pub use error::{ValidatorError, ValidatorResult, LICENSE_SERVER_ERROR};
pub use locks::KeyedLocks;
pub use repository::{
    LicenseRepository, MemoryRepository, Product, RepositorySeed, ServerLicense, SiteMeta, User,
    STATUS_ACTIVE, STATUS_DELIVERED, STATUS_INACTIVE, STATUS_SOLD,
};
pub use request::InboundRequest;
pub use transient::{
    transient_key, MemoryTransientStore, Transient, TransientStore, TRANSIENT_TTL,
};
pub use validator::ServerValidator;
