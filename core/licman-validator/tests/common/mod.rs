#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use licman_validator::{
    InboundRequest, MemoryRepository, MemoryTransientStore, Product, RepositorySeed,
    ServerLicense, ServerValidator, User, ValidatorConfig, STATUS_DELIVERED,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const SITE_URL: &str = "https://www.client-site.test";
pub const SITE_KEY: &str = "data-client-sitetest";

pub struct Harness {
    pub validator: ServerValidator,
    pub repository: Arc<MemoryRepository>,
    pub transients: Arc<MemoryTransientStore>,
}

pub fn license(key: &str, max: u64) -> ServerLicense {
    ServerLicense {
        id: 1,
        license_key: key.to_string(),
        order_id: Some(42),
        product_id: Some(7),
        user_id: Some(5),
        expires_at: Some("2099-01-01 00:00:00".to_string()),
        valid_for: Some(365),
        status: STATUS_DELIVERED,
        times_activated: Some(0),
        times_activated_max: Some(max),
        created_at: Some("2024-01-01 10:00:00".to_string()),
    }
}

pub fn seed(max: u64) -> RepositorySeed {
    RepositorySeed {
        licenses: vec![license("ABC-123", max)],
        products: vec![Product {
            id: 7,
            slug: "my-plugin".to_string(),
            meta: Some(json!({"version": "2.0.0"})),
        }],
        orders: vec![42],
        users: vec![User {
            id: 5,
            email: "buyer@example.com".to_string(),
        }],
    }
}

pub fn harness_with(config: ValidatorConfig, max: u64) -> Harness {
    let repository = Arc::new(MemoryRepository::seeded(seed(max)));
    let transients = Arc::new(MemoryTransientStore::new());
    Harness {
        validator: ServerValidator::new(config, repository.clone(), transients.clone()),
        repository,
        transients,
    }
}

pub fn harness() -> Harness {
    harness_with(ValidatorConfig::default(), 1)
}

pub fn tws(token: &str) -> String {
    format!("TWS {}", STANDARD.encode(token))
}

/// A request exactly as the client license form sends it.
pub fn form_request(state: &str) -> InboundRequest {
    InboundRequest::new(format!("/lmfwc/v2/licenses/{state}/ABC-123"))
        .param("form_state", state)
        .param("order_id", "42")
        .authorization(tws("validate_license"))
        .from_email("buyer@example.com")
        .referer(SITE_URL)
}

/// The license service's response body for the seeded license.
pub fn response_body(max: u64) -> Value {
    serde_json::to_value(license("ABC-123", max)).unwrap()
}
