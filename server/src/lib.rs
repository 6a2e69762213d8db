//! Reference license server: HTTP routes, consumer authentication and the
//! in-memory license service behind the validator.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use licman_auth::verify::{verify_basic, verify_oauth};
use licman_types::{ApiError, Method, Params};
use licman_validator::{
    InboundRequest, KeyedLocks, LicenseRepository, ServerLicense, ServerValidator,
    TransientStore, ValidatorConfig, ValidatorError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Code the license API uses for data errors.
pub const DATA_ERROR: &str = "lmfwc_rest_data_error";
/// Code of the expired-license error the client reacts to.
pub const LICENSE_EXPIRED: &str = "lmfwc_rest_license_expired";
pub const AUTHENTICATION_ERROR: &str = "lmfwc_rest_authentication_error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Mount point of the REST API, without a trailing slash.
    pub api_prefix: String,
    pub namespace: String,
    pub version: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Scheme and authority clients sign against, e.g. `https://licenses.example`.
    /// Defaults to `http://` plus the request's `Host` header.
    pub public_url: Option<String>,
    pub validator: ValidatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/wp-json".to_string(),
            namespace: "lmfwc".to_string(),
            version: "v2".to_string(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            public_url: None,
            validator: ValidatorConfig::default(),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Api(ApiError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl ServerError {
    fn api(code: &str, message: impl Into<String>, status: u16) -> Self {
        Self::Api(ApiError::new(code, message).with_status(status))
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Api(e) => e.status().unwrap_or(400),
            Self::Validator(e) => e.status(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::BAD_REQUEST);
        let error = match self {
            Self::Api(e) => e,
            Self::Validator(e) => e.api_error().cloned().unwrap_or_else(|| {
                ApiError::new("license_server_error", e.to_string()).with_status(500)
            }),
        };
        (status, Json(json!(error))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

// ── License service ─────────────────────────────────────────────

/// The license operations the routes dispatch to.
pub struct LicenseService {
    repository: Arc<dyn LicenseRepository>,
}

impl LicenseService {
    pub fn new(repository: Arc<dyn LicenseRepository>) -> Self {
        Self { repository }
    }

    fn find(&self, key: &str) -> ServerResult<ServerLicense> {
        self.repository.license(key)?.ok_or_else(|| {
            ServerError::api(DATA_ERROR, format!("License Key: {key} could not be found."), 404)
        })
    }

    fn ensure_current(license: &ServerLicense) -> ServerResult<()> {
        if license.is_expired() {
            let date = license.expires_at.as_deref().unwrap_or_default();
            return Err(ServerError::api(
                LICENSE_EXPIRED,
                format!("The license Key expired on {date} (UTC)."),
                403,
            ));
        }
        Ok(())
    }

    /// Uses one activation of `key`.
    pub fn activate(&self, key: &str) -> ServerResult<ServerLicense> {
        let mut license = self.find(key)?;
        Self::ensure_current(&license)?;

        let used = license.times_activated.unwrap_or(0);
        if license.times_activated_max.is_some_and(|max| max > 0 && used >= max) {
            return Err(ServerError::api(
                DATA_ERROR,
                format!("License Key: {key} reached maximum activation count."),
                404,
            ));
        }
        license.times_activated = Some(used + 1);
        self.repository.save_license(&license)?;
        info!(license_id = license.id, activations = used + 1, "license activated");
        Ok(license)
    }

    /// Releases one activation of `key`.
    pub fn deactivate(&self, key: &str) -> ServerResult<ServerLicense> {
        let mut license = self.find(key)?;
        let used = license.times_activated.unwrap_or(0);
        if used == 0 {
            return Err(ServerError::api(
                DATA_ERROR,
                format!("License Key: {key} has not been activated yet."),
                404,
            ));
        }
        license.times_activated = Some(used - 1);
        self.repository.save_license(&license)?;
        info!(license_id = license.id, activations = used - 1, "license deactivated");
        Ok(license)
    }

    /// Reports `key` as it stands.
    pub fn validate(&self, key: &str) -> ServerResult<ServerLicense> {
        let license = self.find(key)?;
        Self::ensure_current(&license)?;
        Ok(license)
    }

    /// Response `data` for `license`, with the product's metadata attached.
    pub fn data(&self, license: &ServerLicense) -> ServerResult<Value> {
        let mut data = serde_json::to_value(license).map_err(ValidatorError::from)?;
        let product = match license.product_id {
            Some(id) => self.repository.product(id)?,
            None => None,
        };
        if let Some(meta) = product.and_then(|p| p.meta) {
            data["product_meta"] = meta;
        }
        Ok(data)
    }
}

// ── HTTP ────────────────────────────────────────────────────────

pub struct AppState {
    pub config: ServerConfig,
    pub validator: ServerValidator,
    pub service: LicenseService,
    pub locks: KeyedLocks,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        repository: Arc<dyn LicenseRepository>,
        transients: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            validator: ServerValidator::new(config.validator.clone(), repository.clone(), transients),
            service: LicenseService::new(repository),
            locks: KeyedLocks::new(),
            config,
        }
    }

    fn license_base(&self) -> String {
        format!(
            "{}/{}/{}/licenses",
            self.config.api_prefix, self.config.namespace, self.config.version
        )
    }
}

/// Builds the license API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let base = state.license_base();
    Router::new()
        .route(&format!("{base}/{{action}}"), get(license_handler))
        .route(&format!("{base}/{{action}}/{{key}}"), get(license_handler))
        .with_state(state)
}

async fn license_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
    Query(query): Query<BTreeMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    authenticate(&state, &headers, uri.path(), &query)?;

    let route = uri
        .path()
        .strip_prefix(state.config.api_prefix.as_str())
        .unwrap_or(uri.path())
        .to_string();
    let inbound = InboundRequest {
        route,
        params: query,
        authorization: header("authorization"),
        from: header("from"),
        referer: header("referer"),
    };

    let action = path.get("action").map(String::as_str).unwrap_or_default();
    let key = path.get("key").map(String::as_str).unwrap_or_default();
    debug!(action, route = %inbound.route, "license request");

    let _guard = state.locks.lock(key).await;
    state.validator.validate_request(&inbound).inspect_err(|e| {
        warn!(status = e.status(), error = %e, "license request rejected");
    })?;

    let license = match action {
        "activate" => state.service.activate(key)?,
        "deactivate" => state.service.deactivate(key)?,
        "validate" => state.service.validate(key)?,
        _ => {
            return Err(ServerError::api(
                "rest_no_route",
                "No route was found matching the URL and request method.",
                404,
            ));
        }
    };

    let data = state.service.data(&license)?;
    let data = state.validator.rewrite_response(&inbound, data)?;
    Ok(Json(json!({"success": true, "data": data})))
}

/// Checks the API consumer: OAuth signature, query-string credentials or
/// basic auth, in that order.
fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    query: &BTreeMap<String, String>,
) -> ServerResult<()> {
    let config = &state.config;
    let invalid = || ServerError::api(AUTHENTICATION_ERROR, "Consumer key or secret is invalid.", 401);
    let key_matches = query.get("consumer_key") == Some(&config.consumer_key);

    if query.contains_key("oauth_signature") {
        if !key_matches {
            return Err(invalid());
        }
        let origin = match &config.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host = headers
                    .get("host")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                format!("http://{host}")
            }
        };
        let params: Params = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        return verify_oauth(Method::Get, &format!("{origin}{path}"), &params, &config.consumer_secret)
            .map_err(|e| {
                debug!(error = %e, "oauth signature rejected");
                invalid()
            });
    }

    if query.contains_key("consumer_secret") {
        return if key_matches && query.get("consumer_secret") == Some(&config.consumer_secret) {
            Ok(())
        } else {
            Err(invalid())
        };
    }

    let basic = headers
        .get_all("authorization")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("basic ")));
    match basic {
        Some(value) => verify_basic(value, &config.consumer_key, &config.consumer_secret)
            .map_err(|_| invalid()),
        None => Err(ServerError::api(
            AUTHENTICATION_ERROR,
            "Consumer key or secret is missing.",
            401,
        )),
    }
}
