mod common;

use common::{form_request, harness, harness_with, response_body, tws, SITE_KEY, SITE_URL};
use licman_validator::{
    transient_key, InboundRequest, LicenseRepository, TransientStore, ValidationMessages,
    ValidatorConfig, ValidatorError, LICENSE_SERVER_ERROR, STATUS_ACTIVE, STATUS_DELIVERED,
    STATUS_INACTIVE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn rejection(result: Result<(), ValidatorError>) -> (u16, String) {
    let err = result.unwrap_err();
    let api = err.api_error().unwrap();
    assert_eq!(api.code, LICENSE_SERVER_ERROR);
    (err.status(), api.message.clone())
}

// ── Form checks ─────────────────────────────────────────────────

#[test]
fn requests_without_the_form_token_are_refused() {
    let h = harness();
    let mut request = form_request("activate");
    request.authorization = None;
    assert_eq!(
        rejection(h.validator.validate_request(&request)),
        (401, "Request was made outside of license form.".to_string())
    );

    let request = form_request("activate").authorization(tws("guess"));
    assert_eq!(rejection(h.validator.validate_request(&request)).0, 401);

    let request = form_request("activate").authorization("TWS !!!not-base64");
    assert_eq!(rejection(h.validator.validate_request(&request)).0, 401);
}

#[test]
fn form_state_is_required() {
    let h = harness();
    let mut request = form_request("activate");
    request.params.remove("form_state");

    let err = h.validator.validate_request(&request).unwrap_err();
    let api = err.api_error().unwrap();
    assert_eq!(err.status(), 401);
    assert_eq!(
        api.message,
        "License form must only be used to activate/deactivate license."
    );
    assert_eq!(api.data.data, Some(json!({"order_id": "42"})));
}

#[test]
fn route_must_match_the_form_state() {
    let h = harness();
    let request = form_request("activate").param("form_state", "deactivate");

    let err = h.validator.validate_request(&request).unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(
        err.api_error().unwrap().data.data.as_ref().unwrap()["remote_route"],
        "/lmfwc/v2/licenses/deactivate/"
    );
}

#[test]
fn unknown_license_is_not_found() {
    let h = harness();
    let mut request = form_request("activate");
    request.route = "/lmfwc/v2/licenses/activate/NOPE".to_string();
    assert_eq!(
        rejection(h.validator.validate_request(&request)),
        (404, "License key not found".to_string())
    );

    request.route = "/lmfwc/v2/licenses/activate/".to_string();
    assert_eq!(rejection(h.validator.validate_request(&request)).0, 404);
}

#[test]
fn custom_messages_replace_the_defaults() {
    let config = ValidatorConfig {
        messages: ValidationMessages {
            license_key: Some("Check your license key.".to_string()),
            order_id: Some("Check your order number.".to_string()),
            ..ValidationMessages::default()
        },
        ..ValidatorConfig::default()
    };
    let h = harness_with(config, 1);

    let mut request = form_request("activate");
    request.route = "/lmfwc/v2/licenses/activate/NOPE".to_string();
    assert_eq!(
        rejection(h.validator.validate_request(&request)).1,
        "Check your license key."
    );

    let request = form_request("activate").param("order_id", "43");
    assert_eq!(
        rejection(h.validator.validate_request(&request)),
        (404, "Check your order number.".to_string())
    );
}

#[test]
fn order_id_is_read_as_an_absolute_leading_integer() {
    let h = harness();
    for order_id in ["42", "-42", "42abc"] {
        let request = form_request("activate").param("order_id", order_id);
        assert!(h.validator.validate_request(&request).is_ok(), "order {order_id}");
    }
}

// ── Debug mode ──────────────────────────────────────────────────

#[test]
fn debug_mode_accepts_unknown_keys_without_the_form() {
    let h = harness_with(
        ValidatorConfig {
            debug: true,
            ..ValidatorConfig::default()
        },
        1,
    );
    let request = InboundRequest::new("/lmfwc/v2/licenses/UNKNOWN");
    assert!(h.validator.validate_request(&request).is_ok());

    let body = json!({"licenseKey": "ABC-123", "timesActivatedMax": 1});
    let rewritten = h
        .validator
        .rewrite_response(&form_request("activate"), body.clone())
        .unwrap();
    assert_eq!(rewritten, body);
}

// ── Record checks ───────────────────────────────────────────────

#[test]
fn mismatched_records_name_the_field() {
    let h = harness();

    let request = form_request("activate").param("slug", "other-plugin");
    assert_eq!(
        rejection(h.validator.validate_request(&request)),
        (404, "Product not found.".to_string())
    );

    let request = form_request("activate").param("order_id", "7");
    assert_eq!(
        rejection(h.validator.validate_request(&request)).1,
        "Order not found."
    );

    let request = form_request("activate").from_email("someone@else.test");
    assert_eq!(
        rejection(h.validator.validate_request(&request)).1,
        "Email not found."
    );
}

#[test]
fn matching_records_stash_the_transient() {
    let h = harness();
    let request = form_request("activate").param("slug", "my-plugin");
    h.validator.validate_request(&request).unwrap();

    let stashed = h.transients.get(&transient_key("ABC-123")).unwrap().unwrap();
    assert_eq!(stashed.key, SITE_KEY);
    assert_eq!(stashed.url, SITE_URL);
    assert_eq!(stashed.email.as_deref(), Some("buyer@example.com"));
}

// ── Duplicate transitions ───────────────────────────────────────

fn round_trip(h: &common::Harness, state: &str) -> serde_json::Value {
    let request = form_request(state);
    h.validator.validate_request(&request).unwrap();
    h.validator
        .rewrite_response(&request, common::response_body(1))
        .unwrap()
}

#[test]
fn second_activation_for_the_same_site_is_rejected() {
    let h = harness();
    round_trip(&h, "activate");

    assert_eq!(
        rejection(h.validator.validate_request(&form_request("activate"))),
        (
            400,
            "The license for this site has already been <b>activated</b>.".to_string()
        )
    );
}

#[test]
fn deactivation_then_repeat_is_rejected() {
    let h = harness();
    round_trip(&h, "activate");
    round_trip(&h, "deactivate");

    assert_eq!(
        rejection(h.validator.validate_request(&form_request("deactivate"))).1,
        "The license for this site has already been <b>deactivated</b>."
    );
    assert!(h.validator.validate_request(&form_request("activate")).is_ok());
}

#[test]
fn another_site_may_activate_the_same_license() {
    let h = harness();
    round_trip(&h, "activate");

    let request = form_request("activate").referer("https://second-site.test");
    assert!(h.validator.validate_request(&request).is_ok());
}

// ── Response rewrite ────────────────────────────────────────────

#[test]
fn single_activation_license_flips_status() {
    let h = harness();
    let body = round_trip(&h, "activate");

    assert_eq!(body["status"], STATUS_ACTIVE);
    assert_eq!(body["key"], SITE_KEY);
    assert_eq!(body["email"], "buyer@example.com");
    assert_eq!(body["state"], "active");

    let stored = h.repository.license("ABC-123").unwrap().unwrap();
    assert_eq!(stored.status, STATUS_ACTIVE);
    let meta = h.repository.site_meta(1, SITE_KEY).unwrap().unwrap();
    assert_eq!(meta.status, "active");
    assert_eq!(meta.url, SITE_URL);
    assert!(h.transients.get(&transient_key("ABC-123")).unwrap().is_none());

    let body = round_trip(&h, "deactivate");
    assert_eq!(body["status"], STATUS_INACTIVE);
    assert_eq!(body["state"], "inactive");
}

#[test]
fn multi_activation_license_keeps_its_status() {
    let h = harness_with(ValidatorConfig::default(), 3);
    let request = form_request("activate");
    h.validator.validate_request(&request).unwrap();
    let body = h
        .validator
        .rewrite_response(&request, response_body(3))
        .unwrap();

    assert_eq!(body["status"], STATUS_DELIVERED);
    assert_eq!(body["state"], "active");
    let stored = h.repository.license("ABC-123").unwrap().unwrap();
    assert_eq!(stored.status, STATUS_DELIVERED);
}

#[test]
fn activation_data_is_saved_with_the_site() {
    let h = harness_with(
        ValidatorConfig {
            activation_data: Some(json!({"plan": "pro"})),
            ..ValidatorConfig::default()
        },
        1,
    );
    round_trip(&h, "activate");
    let meta = h.repository.site_meta(1, SITE_KEY).unwrap().unwrap();
    assert_eq!(meta.data, Some(json!({"plan": "pro"})));
}

#[test]
fn unrelated_responses_pass_through() {
    let h = harness();
    let body = response_body(1);
    let request = InboundRequest::new("/lmfwc/v2/licenses/ABC-123");
    assert_eq!(h.validator.rewrite_response(&request, body.clone()).unwrap(), body);

    let request = form_request("activate");
    let list = json!([{"licenseKey": "ABC-123"}]);
    assert_eq!(h.validator.rewrite_response(&request, list.clone()).unwrap(), list);
}

// ── Validate route ──────────────────────────────────────────────

fn validate_request(token: &str) -> InboundRequest {
    InboundRequest::new("/lmfwc/v2/licenses/validate/ABC-123")
        .param("form_state", "validate")
        .param("flag", "status")
        .authorization(tws(token))
        .from_email("buyer@example.com")
        .referer(SITE_URL)
}

#[test]
fn validate_accepts_the_site_token() {
    let h = harness();
    round_trip(&h, "activate");

    let request = validate_request(&format!("{SITE_KEY}:2024-01-01 10:00:00"));
    h.validator.validate_request(&request).unwrap();
    let body = h
        .validator
        .rewrite_response(&request, response_body(1))
        .unwrap();
    assert_eq!(body["state"], "active");
    assert_eq!(body["key"], SITE_KEY);
}

#[test]
fn validate_rejects_a_foreign_site_token() {
    let h = harness();
    let request = validate_request("data-othersite:2024-01-01 10:00:00");
    assert_eq!(rejection(h.validator.validate_request(&request)).0, 401);
}
