//! Client-side license activation for licman.
//!
//! This crate handles:
//! - License form validation (ordered field rules, all errors collected)
//! - Activation and deactivation against the license server
//! - Background re-validation and local expiry
//! - Product metadata caching and update checks
//!
//! # Design Principles
//!
//! - **Injected persistence**: every record goes through a [`LicenseStore`];
//!   nothing reads global state.
//! - **Local guards first**: duplicate activations and deactivations of a
//!   never-activated license are rejected without a network call.
//! - **One site, one license**: the site key derived from
//!   [`ManagerConfig::site_url`] is the only identity the client uses.

mod config;
mod error;
mod expiry;
mod form;
mod manager;
mod record;
mod store;
mod update;
mod version;

pub use config::{CacheMode, CheckOrigin, ManagerConfig, ProductId, ProductKind};
pub use error::{
    ClientError, ClientResult, DEBUG_MODE_DISABLED, DEBUG_MODE_NOT_ALLOWED, LICENSE_DATA_INVALID,
    LICENSE_EXPIRED, LICENSE_FORM_INVALID_REQUEST, NO_INSERT_DATA_FOUND,
};
pub use expiry::parse_expiry;
pub use form::{FieldRule, FormSubmission, FormView};
pub use manager::{LicenseManager, Notice, NoticeKind};
pub use record::{LicenseData, LicenseRecord, ProductMetadata};
pub use store::{FileStore, LicenseStore, MemoryStore};
pub use update::{PluginUpdate, ThemeUpdate, UpdateDescriptor};
pub use version::compare_versions;
