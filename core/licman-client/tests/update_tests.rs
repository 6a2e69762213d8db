mod common;

use chrono::{Duration, Utc};
use common::{activated, config, expired_body, form, license_body, manager_with, MockTransport};
use licman_client::{
    CacheMode, CheckOrigin, LicenseStore, MemoryStore, ProductId, ProductMetadata,
    UpdateDescriptor,
};
use licman_types::LicenseStatus;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn body_with_version(version: &str) -> serde_json::Value {
    let mut body = license_body("active", 3);
    body["data"]["product_meta"]["version"] = json!(version);
    body
}

// ── Cache ───────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_cache_answers_without_network() {
    let transport = MockTransport::new();
    let (mut manager, _store) = activated(transport.clone()).await;

    let update = manager
        .check_for_update(CheckOrigin::Scheduled)
        .await
        .unwrap()
        .unwrap();

    let UpdateDescriptor::Plugin(plugin) = update else {
        panic!("expected a plugin descriptor");
    };
    assert_eq!(plugin.slug, "my-plugin/my-plugin.php");
    assert_eq!(plugin.new_version, "2.0.0");
    assert_eq!(plugin.package, "https://server.test/my-plugin.zip");
    assert_eq!(plugin.tested, "6.5");
    assert_eq!(plugin.requires, "6.0");
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn pending_descriptor_is_reused_while_still_newer() {
    let transport = MockTransport::new();
    let (mut manager, store) = activated(transport.clone()).await;

    let first = manager.check_for_update(CheckOrigin::Scheduled).await.unwrap();
    manager.purge_product_cache().unwrap();
    let second = manager
        .check_for_update(CheckOrigin::CoreUpdateScreen)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.count(), 1);
    assert!(store.load("my-plugin-update-data").unwrap().is_some());

    transport.push(200, &license_body("inactive", 4));
    assert!(manager.submit_form(&form("deactivate")));
    manager.process().await.unwrap();
    assert!(store.load("my-plugin-update-data").unwrap().is_none());
}

#[tokio::test]
async fn pending_descriptor_is_dropped_once_installed() {
    let transport = MockTransport::new();
    let (mut manager, store) = activated(transport.clone()).await;
    let pending = manager.check_for_update(CheckOrigin::Scheduled).await.unwrap();
    assert_eq!(pending.unwrap().new_version(), "2.0.0");

    let mut upgraded = config();
    upgraded.installed_version = "2.0.0".to_string();
    let mut upgraded = manager_with(upgraded, transport.clone(), store.clone());

    assert_eq!(
        upgraded.check_for_update(CheckOrigin::Scheduled).await.unwrap(),
        None
    );
    assert!(store.load("my-plugin-update-data").unwrap().is_none());
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn expiry_clears_the_pending_update_and_product_cache() {
    let transport = MockTransport::new();
    let (mut manager, store) = activated(transport.clone()).await;
    assert!(manager
        .check_for_update(CheckOrigin::Scheduled)
        .await
        .unwrap()
        .is_some());

    transport.push(403, &expired_body());
    manager.check_license_status().await.unwrap();

    assert!(store.load("my-plugin-update-data").unwrap().is_none());
    assert!(store.load("my-plugin-product-data").unwrap().is_none());
    assert_eq!(
        manager.check_for_update(CheckOrigin::Scheduled).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn core_update_screen_bypasses_the_cache() {
    let transport = MockTransport::new();
    let (mut manager, _store) = activated(transport.clone()).await;
    transport.push(200, &body_with_version("3.0.0"));

    let update = manager
        .check_for_update(CheckOrigin::CoreUpdateScreen)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.new_version(), "3.0.0");
    assert_eq!(transport.count(), 2);
    let request = transport.last();
    assert_eq!(request.parameters().text("flag"), Some("update-core"));
    assert_eq!(request.parameters().text("form_state"), Some("validate"));
    assert_eq!(manager.product().unwrap().unwrap().version, "3.0.0");
}

#[tokio::test]
async fn stale_cache_is_refreshed() {
    let transport = MockTransport::new();
    let (mut manager, store) = activated(transport.clone()).await;
    let stale = ProductMetadata {
        version: "2.0.0".to_string(),
        cached_at: Some(Utc::now() - Duration::hours(3)),
        ..ProductMetadata::default()
    };
    store
        .save("my-plugin-product-data", &serde_json::to_string(&stale).unwrap())
        .unwrap();
    transport.push(200, &body_with_version("2.1.0"));

    let update = manager.check_for_update(CheckOrigin::Scheduled).await.unwrap();
    assert_eq!(update.unwrap().new_version(), "2.1.0");
    assert_eq!(transport.count(), 2);
    assert_eq!(transport.last().parameters().text("flag"), Some("scheduled"));
}

#[tokio::test]
async fn disabled_cache_always_asks_the_server() {
    let transport = MockTransport::new();
    transport.push(200, &license_body("active", 3));
    transport.push(200, &body_with_version("2.0.1"));
    let mut config = config();
    config.cache = CacheMode::Disabled;
    let mut manager = manager_with(config, transport.clone(), Arc::new(MemoryStore::new()));
    assert!(manager.submit_form(&form("activate")));
    manager.process().await.unwrap();

    let update = manager.check_for_update(CheckOrigin::Scheduled).await.unwrap();
    assert_eq!(update.unwrap().new_version(), "2.0.1");
    assert_eq!(transport.count(), 2);
}

// ── Outcomes ────────────────────────────────────────────────────

#[tokio::test]
async fn same_version_is_not_an_update() {
    let transport = MockTransport::new();
    transport.push(200, &license_body("active", 3));
    let mut config = config();
    config.installed_version = "2.0.0".to_string();
    let store = Arc::new(MemoryStore::new());
    let mut manager = manager_with(config, transport.clone(), store.clone());
    assert!(manager.submit_form(&form("activate")));
    manager.process().await.unwrap();

    assert_eq!(
        manager.check_for_update(CheckOrigin::Scheduled).await.unwrap(),
        None
    );
    assert!(store.load("my-plugin-update-data").unwrap().is_none());
}

#[tokio::test]
async fn no_license_means_no_update() {
    let transport = MockTransport::new();
    let (mut manager, _store) = common::manager(transport.clone());

    assert_eq!(
        manager.check_for_update(CheckOrigin::Scheduled).await.unwrap(),
        None
    );
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn expired_state_in_update_check_expires_the_license() {
    let transport = MockTransport::new();
    let (mut manager, _store) = activated(transport.clone()).await;
    transport.push(200, &license_body("expired", 2));

    assert_eq!(
        manager
            .check_for_update(CheckOrigin::CoreUpdateScreen)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        manager.license().unwrap().unwrap().status,
        LicenseStatus::Expired
    );
}

#[tokio::test]
async fn theme_descriptor_carries_the_homepage() {
    let transport = MockTransport::new();
    let mut body = license_body("active", 3);
    body["data"]["product_meta"]["url"] = json!("https://server.test/themes/my-theme");
    transport.push(200, &body);
    let mut config = config();
    config.product = ProductId::theme("my-theme");
    let mut manager = manager_with(config, transport.clone(), Arc::new(MemoryStore::new()));
    assert!(manager.submit_form(&form("activate")));
    manager.process().await.unwrap();

    let update = manager
        .check_for_update(CheckOrigin::Scheduled)
        .await
        .unwrap()
        .unwrap();
    let UpdateDescriptor::Theme(theme) = update else {
        panic!("expected a theme descriptor");
    };
    assert_eq!(theme.theme, "my-theme");
    assert_eq!(theme.url, "https://server.test/themes/my-theme");
    assert_eq!(theme.new_version, "2.0.0");
}
