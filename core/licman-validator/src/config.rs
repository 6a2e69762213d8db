//! Validator configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Route every license request lives under.
pub const DEFAULT_BASE_ROUTE: &str = "/lmfwc/v2/licenses";

/// Token the client license form sends in its `Authorization` header.
pub const DEFAULT_FORM_TOKEN: &str = "validate_license";

/// Custom rejection messages, mirroring the rules registered on the client.
///
/// `None` falls back to the built-in message for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationMessages {
    pub license_key: Option<String>,
    pub slug: Option<String>,
    pub order_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Route prefix, without a trailing slash.
    pub base_route: String,
    /// Debug mode skips the form checks and accepts unknown keys.
    /// Never enable in production.
    pub debug: bool,
    /// Flip the stored status to active/inactive for single-activation
    /// licenses.
    pub update_status: bool,
    /// Extra data saved with the site metadata on activation.
    pub activation_data: Option<Value>,
    pub form_token: String,
    pub messages: ValidationMessages,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            base_route: DEFAULT_BASE_ROUTE.to_string(),
            debug: false,
            update_status: true,
            activation_data: None,
            form_token: DEFAULT_FORM_TOKEN.to_string(),
            messages: ValidationMessages::default(),
        }
    }
}
