#![allow(dead_code)]

use async_trait::async_trait;
use licman_client::{
    FieldRule, FormSubmission, LicenseManager, LicenseStore, ManagerConfig, MemoryStore, ProductId,
};
use licman_http::{
    ConnectionOptions, Credentials, HttpClient, Request, Response, Transport, TransportError,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const SITE_URL: &str = "https://www.client-site.test";
pub const SITE_KEY: &str = "data-client-sitetest";

/// Replays canned replies and records every request it was given.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Response, TransportError>>>,
    seen: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(code: u16, body: &Value) -> Arc<Self> {
        let mock = Self::default();
        mock.push(code, body);
        Arc::new(mock)
    }

    pub fn push(&self, code: u16, body: &Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(Response::new(code, BTreeMap::new(), body.to_string())));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(message)));
    }

    pub fn last(&self) -> Request {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no reply queued")))
    }
}

// ── Fixtures ────────────────────────────────────────────────────

pub fn config() -> ManagerConfig {
    ManagerConfig::new(ProductId::plugin("my-plugin"), SITE_URL, "1.0.0")
}

pub fn http(transport: Arc<MockTransport>) -> HttpClient {
    HttpClient::with_transport(
        "http://server.test",
        Credentials::new("ck_test", "cs_test"),
        ConnectionOptions {
            oauth_timestamp: Some(1_700_000_000),
            ..ConnectionOptions::new("lmfwc")
        },
        SITE_URL,
        transport,
    )
    .unwrap()
}

pub fn manager_with(
    config: ManagerConfig,
    transport: Arc<MockTransport>,
    store: Arc<dyn LicenseStore>,
) -> LicenseManager {
    let mut manager = LicenseManager::new(config, http(transport), store).unwrap();
    manager.set_validation(rules());
    manager
}

pub fn manager(transport: Arc<MockTransport>) -> (LicenseManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (manager_with(config(), transport, store.clone()), store)
}

pub fn rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new("license_key", "License key is required."),
        FieldRule::new("email", "Email is required."),
        FieldRule::new("order_id", "Order ID is required."),
    ]
}

pub fn form(state: &str) -> FormSubmission {
    FormSubmission::new(state, "token-1")
        .field("license_key", " ABC-123 ")
        .field("email", "buyer@example.com")
        .field("order_id", "42")
}

pub fn license_body(state: &str, status: i64) -> Value {
    json!({
        "success": true,
        "data": {
            "id": 1,
            "orderId": 42,
            "productId": 7,
            "licenseKey": "ABC-123",
            "expiresAt": "2030-01-01 00:00:00",
            "validFor": 365,
            "status": status,
            "timesActivated": 1,
            "timesActivatedMax": 3,
            "createdAt": "2024-01-01 10:00:00",
            "key": SITE_KEY,
            "email": "buyer@example.com",
            "state": state,
            "product_meta": {
                "version": "2.0.0",
                "package": "https://server.test/my-plugin.zip",
                "logo": "https://server.test/logo.png",
                "wp_tested": "6.5",
                "wp_requires": "6.0"
            }
        }
    })
}

pub fn expired_body() -> Value {
    json!({
        "errors": [{
            "code": "lmfwc_rest_license_expired",
            "message": "The license Key expired on 2024-01-01 00:00:00 (UTC)"
        }]
    })
}

/// A manager whose license was just activated through the form.
pub async fn activated(transport: Arc<MockTransport>) -> (LicenseManager, Arc<MemoryStore>) {
    transport.push(200, &license_body("active", 3));
    let (mut manager, store) = manager(transport);
    assert!(manager.submit_form(&form("activate")));
    manager.process().await.unwrap();
    (manager, store)
}
