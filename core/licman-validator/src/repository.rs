//! Authoritative license, product, order and user records.

use crate::error::{ValidatorError, ValidatorResult};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

pub const STATUS_SOLD: i64 = 1;
pub const STATUS_DELIVERED: i64 = 2;
pub const STATUS_ACTIVE: i64 = 3;
pub const STATUS_INACTIVE: i64 = 4;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A license as the server stores it. Serializes to the API's `data` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerLicense {
    pub id: i64,
    pub license_key: String,
    pub order_id: Option<i64>,
    pub product_id: Option<i64>,
    pub user_id: Option<i64>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub expires_at: Option<String>,
    pub valid_for: Option<i64>,
    pub status: i64,
    pub times_activated: Option<u64>,
    pub times_activated_max: Option<u64>,
    pub created_at: Option<String>,
}

impl ServerLicense {
    /// Returns true once `expires_at` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .as_deref()
            .and_then(|d| NaiveDateTime::parse_from_str(d, DATE_FORMAT).ok())
            .is_some_and(|at| at.and_utc() <= Utc::now())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: i64,
    pub slug: String,
    /// Sent back to clients as `product_meta`.
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub email: String,
}

/// What the server remembers about one site using a license.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMeta {
    /// `active` or `inactive`.
    pub status: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Storage behind the validator and the reference license service.
pub trait LicenseRepository: Send + Sync {
    fn license(&self, license_key: &str) -> ValidatorResult<Option<ServerLicense>>;

    fn save_license(&self, license: &ServerLicense) -> ValidatorResult<()>;

    fn product(&self, product_id: i64) -> ValidatorResult<Option<Product>>;

    fn order_exists(&self, order_id: i64) -> ValidatorResult<bool>;

    fn user(&self, user_id: i64) -> ValidatorResult<Option<User>>;

    /// Metadata stored for `site_key` on the license with `license_id`.
    fn site_meta(&self, license_id: i64, site_key: &str) -> ValidatorResult<Option<SiteMeta>>;

    fn save_site_meta(&self, license_id: i64, site_key: &str, meta: SiteMeta)
        -> ValidatorResult<()>;

    /// Sets the numeric status of the license with `license_id`.
    fn update_status(&self, license_id: i64, status: i64) -> ValidatorResult<()>;
}

/// Initial contents for a [`MemoryRepository`], usually loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySeed {
    pub licenses: Vec<ServerLicense>,
    pub products: Vec<Product>,
    pub orders: Vec<i64>,
    pub users: Vec<User>,
}

#[derive(Debug, Default)]
struct State {
    licenses: HashMap<String, ServerLicense>,
    products: HashMap<i64, Product>,
    orders: HashSet<i64>,
    users: HashMap<i64, User>,
    meta: HashMap<(i64, String), SiteMeta>,
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seeded(seed: RepositorySeed) -> Self {
        let state = State {
            licenses: seed
                .licenses
                .into_iter()
                .map(|l| (l.license_key.clone(), l))
                .collect(),
            products: seed.products.into_iter().map(|p| (p.id, p)).collect(),
            orders: seed.orders.into_iter().collect(),
            users: seed.users.into_iter().map(|u| (u.id, u)).collect(),
            meta: HashMap::new(),
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> ValidatorResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> ValidatorResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> ValidatorError {
    ValidatorError::Storage("repository lock poisoned".to_string())
}

impl LicenseRepository for MemoryRepository {
    fn license(&self, license_key: &str) -> ValidatorResult<Option<ServerLicense>> {
        Ok(self.read()?.licenses.get(license_key).cloned())
    }

    fn save_license(&self, license: &ServerLicense) -> ValidatorResult<()> {
        self.write()?
            .licenses
            .insert(license.license_key.clone(), license.clone());
        Ok(())
    }

    fn product(&self, product_id: i64) -> ValidatorResult<Option<Product>> {
        Ok(self.read()?.products.get(&product_id).cloned())
    }

    fn order_exists(&self, order_id: i64) -> ValidatorResult<bool> {
        Ok(self.read()?.orders.contains(&order_id))
    }

    fn user(&self, user_id: i64) -> ValidatorResult<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    fn site_meta(&self, license_id: i64, site_key: &str) -> ValidatorResult<Option<SiteMeta>> {
        Ok(self
            .read()?
            .meta
            .get(&(license_id, site_key.to_string()))
            .cloned())
    }

    fn save_site_meta(
        &self,
        license_id: i64,
        site_key: &str,
        meta: SiteMeta,
    ) -> ValidatorResult<()> {
        self.write()?
            .meta
            .insert((license_id, site_key.to_string()), meta);
        Ok(())
    }

    fn update_status(&self, license_id: i64, status: i64) -> ValidatorResult<()> {
        let mut state = self.write()?;
        if let Some(license) = state.licenses.values_mut().find(|l| l.id == license_id) {
            license.status = status;
        }
        Ok(())
    }
}
