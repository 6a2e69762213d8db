//! Manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lifetime of cached product metadata.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Whether the product is a plugin or a theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    #[default]
    Plugin,
    Theme,
}

/// Identifies the installed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductId {
    /// Installation directory; prefixes every store key.
    pub dirname: String,
    /// Main file, `<dirname>.php` when not given.
    pub filename: String,
    #[serde(default)]
    pub kind: ProductKind,
}

impl ProductId {
    pub fn plugin(dirname: impl Into<String>) -> Self {
        let dirname = dirname.into();
        Self {
            filename: format!("{dirname}.php"),
            dirname,
            kind: ProductKind::Plugin,
        }
    }

    pub fn theme(dirname: impl Into<String>) -> Self {
        let dirname = dirname.into();
        Self {
            filename: "style.css".to_string(),
            dirname,
            kind: ProductKind::Theme,
        }
    }

    /// `<dirname>/<filename>`.
    #[must_use]
    pub fn basename(&self) -> String {
        format!("{}/{}", self.dirname, self.filename)
    }

    #[must_use]
    pub fn license_key(&self) -> String {
        format!("{}-license-data", self.dirname)
    }

    #[must_use]
    pub fn product_key(&self) -> String {
        format!("{}-product-data", self.dirname)
    }

    #[must_use]
    pub fn update_key(&self) -> String {
        format!("{}-update-data", self.dirname)
    }
}

/// Product metadata caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Always ask the server.
    Disabled,
    /// Reuse metadata younger than the TTL.
    Ttl(Duration),
}

impl Default for CacheMode {
    fn default() -> Self {
        Self::Ttl(DEFAULT_CACHE_TTL)
    }
}

/// Where an update check was triggered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOrigin {
    /// The recurring background check.
    Scheduled,
    /// The platform's core update screen; always bypasses the cache.
    CoreUpdateScreen,
}

impl CheckOrigin {
    /// Value sent as the `flag` parameter.
    #[must_use]
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::CoreUpdateScreen => "update-core",
        }
    }
}

/// Configuration for one [`LicenseManager`](crate::LicenseManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub product: ProductId,
    /// Canonical URL of the installing site. The site key and the
    /// `Referer` header both come from here.
    pub site_url: String,
    /// Version currently installed, compared against the server's.
    pub installed_version: String,
    /// Debug mode: form submissions are refused, raw calls are allowed.
    #[serde(default)]
    pub debug: bool,
    /// Lock the form once the license is active.
    #[serde(default = "default_true")]
    pub disable_form: bool,
    #[serde(default)]
    pub cache: CacheMode,
}

fn default_true() -> bool {
    true
}

impl ManagerConfig {
    pub fn new(
        product: ProductId,
        site_url: impl Into<String>,
        installed_version: impl Into<String>,
    ) -> Self {
        Self {
            product,
            site_url: site_url.into(),
            installed_version: installed_version.into(),
            debug: false,
            disable_form: true,
            cache: CacheMode::default(),
        }
    }
}
