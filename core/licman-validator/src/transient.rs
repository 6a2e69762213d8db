//! The validation-to-rewrite handoff.
//!
//! A transient is written once a request passes validation and consumed by
//! the response rewrite of the same request. It is keyed by a hash of the
//! license key and never outlives [`TRANSIENT_TTL`].

use crate::error::{ValidatorError, ValidatorResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const TRANSIENT_TTL: Duration = Duration::from_secs(5 * 60);

/// Request-scoped context stashed by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transient {
    /// Site key derived from the `Referer`.
    pub key: String,
    /// The `Referer` itself.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Hex SHA-256 of the license key.
#[must_use]
pub fn transient_key(license_key: &str) -> String {
    hex::encode(Sha256::digest(license_key.as_bytes()))
}

pub trait TransientStore: Send + Sync {
    fn set(&self, key: &str, value: Transient) -> ValidatorResult<()>;

    /// Returns the live value under `key`; expired values are dropped.
    fn get(&self, key: &str) -> ValidatorResult<Option<Transient>>;

    fn delete(&self, key: &str) -> ValidatorResult<()>;
}

#[derive(Debug)]
pub struct MemoryTransientStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Transient, Instant)>>,
}

impl Default for MemoryTransientStore {
    fn default() -> Self {
        Self::with_ttl(TRANSIENT_TTL)
    }
}

impl MemoryTransientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including ones that have expired.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> ValidatorError {
    ValidatorError::Storage("transient lock poisoned".to_string())
}

impl TransientStore for MemoryTransientStore {
    fn set(&self, key: &str, value: Transient) -> ValidatorResult<()> {
        let deadline = Instant::now() + self.ttl;
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), (value, deadline));
        Ok(())
    }

    fn get(&self, key: &str) -> ValidatorResult<Option<Transient>> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> ValidatorResult<()> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
