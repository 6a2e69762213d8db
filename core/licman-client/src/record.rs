//! Persisted and wire-level license records.

use chrono::{DateTime, Utc};
use licman_types::LicenseStatus;
use serde::{Deserialize, Serialize};

/// The license as the client persists it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseRecord {
    /// Site key the license was activated for.
    pub key: String,
    pub status: LicenseStatus,
    pub license_key: String,
    pub email: Option<String>,
    pub order_id: Option<i64>,
    /// Days the license is valid for after purchase.
    pub valid_for: Option<i64>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub expires_at: Option<String>,
    /// Maximum number of activations.
    pub total_count: Option<u64>,
    /// Activations used so far.
    pub active_count: Option<u64>,
    pub purchased_on: Option<String>,
    pub product_id: Option<i64>,
}

impl LicenseRecord {
    /// Builds the record from a successful server response.
    #[must_use]
    pub fn from_data(data: &LicenseData) -> Self {
        Self {
            key: data.key.clone().unwrap_or_default(),
            status: data.state,
            license_key: data.license_key.clone(),
            email: data.email.clone().filter(|e| !e.is_empty()),
            order_id: data.order_id,
            valid_for: data.valid_for,
            expires_at: data.expires_at.clone(),
            total_count: data.times_activated_max,
            active_count: data.times_activated,
            purchased_on: data.created_at.clone(),
            product_id: data.product_id,
        }
    }
}

/// The `data` object of a license API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LicenseData {
    pub id: Option<i64>,
    /// Site key added by the server after a successful activation.
    pub key: Option<String>,
    pub email: Option<String>,
    /// Human-readable state added by the server.
    pub state: LicenseStatus,
    /// Numeric server-side status (3 active, 4 inactive).
    pub status: Option<i64>,
    pub order_id: Option<i64>,
    pub product_id: Option<i64>,
    pub user_id: Option<i64>,
    pub license_key: String,
    pub expires_at: Option<String>,
    pub valid_for: Option<i64>,
    pub times_activated: Option<u64>,
    pub times_activated_max: Option<u64>,
    pub created_at: Option<String>,
    /// The one snake_case field of the payload.
    #[serde(rename = "product_meta", skip_serializing_if = "Option::is_none")]
    pub product_meta: Option<ProductMetadata>,
}

/// Product details cached alongside the license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductMetadata {
    pub version: String,
    pub logo: String,
    pub cover: String,
    pub content: String,
    pub wp_tested: String,
    pub wp_requires: String,
    /// Download URL of the latest package.
    pub package: String,
    /// Product homepage.
    pub url: String,
    /// When this copy was stored locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl ProductMetadata {
    /// Returns true if the server sent nothing useful.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Self {
            cached_at: self.cached_at,
            ..Self::default()
        } == *self
    }

    /// Returns true if the cached copy is younger than `ttl`.
    #[must_use]
    pub fn is_fresh(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        let Some(cached_at) = self.cached_at else {
            return false;
        };
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now < cached_at + ttl)
    }
}
