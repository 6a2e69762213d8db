use licman_types::{ApiError, BasicCredentials, ErrorSet, Method, Params, Request, Response};
use std::collections::BTreeMap;
use std::str::FromStr;

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ── Method ──────────────────────────────────────────────────────

#[test]
fn method_parse_and_body() {
    assert_eq!(Method::from_str("get").unwrap(), Method::Get);
    assert!(Method::Post.carries_body());
    assert!(Method::Put.carries_body());
    assert!(!Method::Get.carries_body());
    assert!(!Method::Delete.carries_body());
    assert!(Method::from_str("PATCH").is_err());
}

// ── Request ─────────────────────────────────────────────────────

#[test]
fn raw_headers_are_lines() {
    let req = Request::new(
        "http://example.com/wp-json/lmfwc/v2/licenses",
        Method::Get,
        Params::new(),
        headers(&[("Accept", "application/json"), ("From", "a@b.c")]),
        "",
    );
    assert_eq!(
        req.raw_headers(),
        vec!["Accept: application/json".to_string(), "From: a@b.c".to_string()]
    );
}

#[test]
fn header_lookup_is_case_insensitive() {
    let req = Request::new("u", Method::Get, Params::new(), headers(&[("Referer", "x")]), "");
    assert_eq!(req.header("referer"), Some("x"));
    assert_eq!(req.header("missing"), None);
}

#[test]
fn basic_auth_password_is_not_serialized() {
    let req = Request::new("u", Method::Get, Params::new(), BTreeMap::new(), "").with_basic_auth(
        Some(BasicCredentials {
            username: "ck_1".into(),
            password: "cs_secret".into(),
        }),
    );
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("ck_1"));
    assert!(!json.contains("cs_secret"));
    assert!(!format!("{req:?}").contains("cs_secret"));
}

// ── Response ────────────────────────────────────────────────────

#[test]
fn success_codes() {
    for code in [200, 201, 202] {
        assert!(Response::new(code, BTreeMap::new(), "").is_success());
    }
    for code in [0, 204, 301, 400, 403, 404, 500] {
        assert!(!Response::new(code, BTreeMap::new(), "").is_success());
    }
}

#[test]
fn header_lines_skip_status_and_join_duplicates() {
    let raw = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n";
    let parsed = Response::parse_header_lines(raw);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed["Content-Type"], "application/json");
    assert_eq!(parsed["Set-Cookie"], "a=1, b=2");
}

// ── ApiError / ErrorSet ─────────────────────────────────────────

#[test]
fn api_error_payload_shape() {
    let err = ApiError::new("license_server_error", "nope").with_status(404);
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["code"], "license_server_error");
    assert_eq!(json["message"], "nope");
    assert_eq!(json["data"]["status"], 404);
    assert_eq!(err.to_string(), "nope");
    assert!(err.is("license_server_error"));
}

#[test]
fn api_error_without_data_omits_it() {
    let json = serde_json::to_value(ApiError::new("c", "m")).unwrap();
    assert!(json.get("data").is_none());
}

#[test]
fn error_set_keeps_order_and_replaces() {
    let mut errors = ErrorSet::new();
    errors.insert("license_key", "required");
    errors.insert("email", "bad email");
    errors.insert("license_key", "still required");
    let fields: Vec<&str> = errors.fields().collect();
    assert_eq!(fields, vec!["license_key", "email"]);
    assert_eq!(errors.get("license_key"), Some("still required"));
    let json = serde_json::to_string(&errors).unwrap();
    assert_eq!(json, r#"{"license_key":"still required","email":"bad email"}"#);
}
