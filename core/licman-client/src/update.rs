//! Update descriptors handed to the platform's updater.

use crate::config::{ProductId, ProductKind};
use crate::record::ProductMetadata;
use serde::{Deserialize, Serialize};

/// A newer version is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateDescriptor {
    Plugin(PluginUpdate),
    Theme(ThemeUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginUpdate {
    /// `<dirname>/<filename>`.
    pub slug: String,
    pub new_version: String,
    pub package: String,
    pub tested: String,
    pub requires: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeUpdate {
    pub theme: String,
    pub new_version: String,
    pub package: String,
    pub url: String,
}

impl UpdateDescriptor {
    /// Builds the descriptor shape matching the product kind.
    #[must_use]
    pub fn for_product(product: &ProductId, meta: &ProductMetadata) -> Self {
        match product.kind {
            ProductKind::Plugin => Self::Plugin(PluginUpdate {
                slug: product.basename(),
                new_version: meta.version.clone(),
                package: meta.package.clone(),
                tested: meta.wp_tested.clone(),
                requires: meta.wp_requires.clone(),
            }),
            ProductKind::Theme => Self::Theme(ThemeUpdate {
                theme: product.dirname.clone(),
                new_version: meta.version.clone(),
                package: meta.package.clone(),
                url: meta.url.clone(),
            }),
        }
    }

    #[must_use]
    pub fn new_version(&self) -> &str {
        match self {
            Self::Plugin(p) => &p.new_version,
            Self::Theme(t) => &t.new_version,
        }
    }
}
