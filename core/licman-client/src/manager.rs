//! The client-side license state machine.

use crate::config::{CacheMode, CheckOrigin, ManagerConfig};
use crate::error::{
    ClientError, ClientResult, DEBUG_MODE_DISABLED, DEBUG_MODE_NOT_ALLOWED, LICENSE_DATA_INVALID,
    LICENSE_EXPIRED, NO_INSERT_DATA_FOUND,
};
use crate::expiry::parse_expiry;
use crate::form::{self, FieldRule, FormSubmission, FormView, ValidatedForm};
use crate::record::{LicenseData, LicenseRecord, ProductMetadata};
use crate::store::LicenseStore;
use crate::update::UpdateDescriptor;
use crate::version::compare_versions;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use licman_http::{HttpClient, HttpError};
use licman_types::{ApiError, ErrorSet, FormState, LicenseStatus, Method, Params, SiteKey};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of the last server round trip, kept for [`LicenseManager::notice`].
#[derive(Debug, Clone)]
enum Outcome {
    Success(Value),
    Failure(ApiError),
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A plain-text message describing the last outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Drives activation, deactivation, re-validation and update checks for
/// one installed product.
pub struct LicenseManager {
    config: ManagerConfig,
    client: HttpClient,
    store: Arc<dyn LicenseStore>,
    site_key: SiteKey,
    rules: Vec<FieldRule>,
    parameters: Params,
    license: String,
    form: Option<ValidatedForm>,
    errors: ErrorSet,
    transport_errors: Vec<ApiError>,
    last: Option<Outcome>,
}

impl LicenseManager {
    /// Creates a manager for the product in `config`.
    ///
    /// # Errors
    ///
    /// Fails if `config.site_url` has no host.
    pub fn new(
        config: ManagerConfig,
        client: HttpClient,
        store: Arc<dyn LicenseStore>,
    ) -> ClientResult<Self> {
        let site_key = SiteKey::from_url(&config.site_url)?;
        debug!(%site_key, product = %config.product.dirname, "license manager ready");
        Ok(Self {
            config,
            client,
            store,
            site_key,
            rules: Vec::new(),
            parameters: Params::new(),
            license: String::new(),
            form: None,
            errors: ErrorSet::new(),
            transport_errors: Vec::new(),
            last: None,
        })
    }

    /// Registers the fields the form validates, in order.
    pub fn set_validation(&mut self, rules: Vec<FieldRule>) -> &mut Self {
        self.rules = rules;
        self
    }

    /// Extra query parameters sent with every form request.
    pub fn set_parameters(&mut self, parameters: Params) -> &mut Self {
        self.parameters = parameters;
        self
    }

    /// License key or generator ID used by [`request_with`](Self::request_with).
    pub fn set_key_or_id(&mut self, value: impl Into<String>) -> &mut Self {
        self.license = value.into();
        self
    }

    #[must_use]
    pub fn site_key(&self) -> &SiteKey {
        &self.site_key
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Field errors of the last submission.
    #[must_use]
    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    /// Transport failures since the last form submission.
    #[must_use]
    pub fn transport_errors(&self) -> &[ApiError] {
        &self.transport_errors
    }

    // ── Form ────────────────────────────────────────────────────────

    /// Validates a submitted form. Returns true when the request may proceed.
    ///
    /// Always true in debug mode; false when the hidden form markers are
    /// missing or any registered field is empty. Every field error is
    /// collected, not just the first.
    pub fn submit_form(&mut self, submission: &FormSubmission) -> bool {
        self.errors.clear();
        self.transport_errors.clear();
        self.form = None;

        if self.config.debug {
            return true;
        }
        if submission.form_state.is_none() || submission.token.is_none() {
            debug!("license form markers missing");
            return false;
        }

        let (validated, errors) = form::validate(submission, &self.rules);
        self.license = validated.license_key.clone();
        self.errors = errors;
        let valid = self.errors.is_empty() && validated.form_state.is_some();
        if valid {
            self.form = Some(validated);
        } else {
            debug!(fields = ?self.errors.fields().collect::<Vec<_>>(), "license form invalid");
        }
        valid
    }

    /// Sends the validated form to the server and persists the result.
    pub async fn process(&mut self) -> ClientResult<Value> {
        if self.config.debug {
            return Err(self.fail(ClientError::rejected(
                DEBUG_MODE_NOT_ALLOWED,
                "Using license form is not allowed in debug mode.",
            )));
        }
        if !self.transport_errors.is_empty() {
            return Err(ClientError::invalid_request(
                "A previous request could not reach the license server.",
            ));
        }
        let Some(form) = self.form.clone() else {
            return Err(ClientError::InvalidForm(self.errors.clone()));
        };
        let form_state = form.form_state.unwrap_or(FormState::Activate);

        if let Some(record) = self.license()? {
            if record.key == self.site_key.as_str() {
                if form_state != FormState::Deactivate && record.status.is_active() {
                    info!(%form_state, "license already active, request rejected locally");
                    return Err(self.fail(ClientError::invalid_request(
                        "Oops! The license for this site has already been activated.",
                    )));
                }
                if form_state == FormState::Deactivate && !record.status.is_active() {
                    info!(%form_state, "license not active, request rejected locally");
                    return Err(self.fail(ClientError::invalid_request(
                        "Oops! The license for this site is not active yet. Activate your license first.",
                    )));
                }
            }
        }

        if form.license_key.is_empty() {
            return Err(self.fail(ClientError::invalid_request(form::LICENSE_KEY_REQUIRED)));
        }

        let endpoint = format!("licenses/{form_state}/{}", form.license_key);
        let mut query = self.parameters.clone();
        query.insert("form_state", form_state.as_str());
        for (key, value) in &form.params {
            query.insert(key.as_str(), value.as_str());
        }

        let mut headers = self.base_headers();
        headers.insert(
            "Authorization".to_string(),
            format!("TWS {}", STANDARD.encode(form.token.as_bytes())),
        );
        if let Some(email) = &form.email {
            headers.insert("From".to_string(), email.clone());
        }

        info!(%form_state, %endpoint, "submitting license form");
        let result = self
            .client
            .request(&endpoint, Method::Get, None, query, headers)
            .await;
        self.handle_response(result.map_err(ClientError::from))
    }

    // ── Background checks ───────────────────────────────────────────

    /// Re-validates the persisted license with the server.
    ///
    /// Does nothing for expired or never-activated licenses. Failures are
    /// logged, not returned; the (possibly updated) status is returned.
    pub async fn check_license_status(&mut self) -> ClientResult<LicenseStatus> {
        let Some(record) = self.license()? else {
            return Ok(LicenseStatus::Unset);
        };
        if record.status == LicenseStatus::Expired {
            debug!("license expired, skipping status check");
            return Ok(LicenseStatus::Expired);
        }

        let flag = Params::new().with("flag", "status");
        let result = self.validate_license(flag).await;
        if let Err(e) = self.handle_response(result) {
            warn!(error = %e, "background license check failed");
        }
        Ok(self.license()?.map(|r| r.status).unwrap_or_default())
    }

    /// Looks for a newer product version.
    ///
    /// A pending descriptor from an earlier check is reused while the license
    /// is active and its version is still newer than the installed one. Product
    /// metadata comes from the cache when it is fresh, caching is on and the
    /// check does not come from the core update screen; otherwise from the
    /// server.
    pub async fn check_for_update(
        &mut self,
        origin: CheckOrigin,
    ) -> ClientResult<Option<UpdateDescriptor>> {
        let update_key = self.config.product.update_key();
        if let Some(pending) = self.load_json::<UpdateDescriptor>(&update_key)? {
            let active = self.license()?.is_some_and(|r| r.status.is_active());
            if active && self.is_newer(pending.new_version()) {
                return Ok(Some(pending));
            }
            debug!(pending = pending.new_version(), "dropping stale update descriptor");
            self.store.delete(&update_key)?;
        }

        let meta = match self.cached_metadata(origin)? {
            Some(meta) => meta,
            None => match self.fetch_metadata(origin).await? {
                Some(meta) => meta,
                None => return Ok(None),
            },
        };

        if !self.is_newer(&meta.version) {
            debug!(available = %meta.version, installed = %self.config.installed_version, "no update");
            return Ok(None);
        }

        let descriptor = UpdateDescriptor::for_product(&self.config.product, &meta);
        info!(new_version = descriptor.new_version(), "update available");
        self.save_json(&update_key, &descriptor)?;
        Ok(Some(descriptor))
    }

    fn is_newer(&self, version: &str) -> bool {
        compare_versions(version, &self.config.installed_version) == Ordering::Greater
    }

    fn cached_metadata(&self, origin: CheckOrigin) -> ClientResult<Option<ProductMetadata>> {
        let CacheMode::Ttl(ttl) = self.config.cache else {
            return Ok(None);
        };
        if origin == CheckOrigin::CoreUpdateScreen {
            return Ok(None);
        }
        let active = self.license()?.is_some_and(|r| r.status.is_active());
        let meta = self
            .product()?
            .filter(|meta| active && meta.is_fresh(ttl, chrono::Utc::now()));
        Ok(meta)
    }

    async fn fetch_metadata(&mut self, origin: CheckOrigin) -> ClientResult<Option<ProductMetadata>> {
        let flag = Params::new().with("flag", origin.flag());
        let value = match self.validate_license(flag).await {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "update check could not validate license");
                self.note_transport(&e);
                return Ok(None);
            }
        };

        let Some(data) = value.get("data").cloned() else {
            return Ok(None);
        };
        let data: LicenseData = serde_json::from_value(data)?;
        if data.state != LicenseStatus::Active {
            if data.state == LicenseStatus::Expired {
                self.expire(None)?;
            }
            return Ok(None);
        }

        match data.product_meta {
            Some(meta) if !meta.is_empty() => Ok(Some(self.cache_metadata(meta)?)),
            _ => Ok(None),
        }
    }

    // ── Server calls ────────────────────────────────────────────────

    /// Asks the server to re-validate the persisted license.
    ///
    /// `params` are merged over `form_state=validate`.
    pub async fn validate_license(&self, params: Params) -> ClientResult<Value> {
        let record = self.license()?.filter(|r| {
            !r.key.is_empty()
                && !r.license_key.is_empty()
                && r.purchased_on.as_deref().is_some_and(|p| !p.is_empty())
        });
        let Some(record) = record else {
            return Err(ClientError::rejected(
                LICENSE_DATA_INVALID,
                "Validation failed due to invalid or no license data.",
            ));
        };

        let mut query = Params::new().with("form_state", FormState::Validate.as_str());
        query.extend(params);

        let token = format!(
            "{}:{}",
            record.key,
            record.purchased_on.as_deref().unwrap_or_default()
        );
        let mut headers = self.base_headers();
        headers.insert(
            "Authorization".to_string(),
            format!("TWS {}", STANDARD.encode(token.as_bytes())),
        );
        if let Some(email) = record.email.filter(|e| !e.is_empty()) {
            headers.insert("From".to_string(), email);
        }

        let endpoint = format!("licenses/validate/{}", record.license_key);
        Ok(self
            .client
            .request(&endpoint, Method::Get, None, query, headers)
            .await?)
    }

    /// Raw call against `licenses[/key]` or `generators[/id]`. Debug mode only.
    pub async fn request_with(
        &mut self,
        license: bool,
        method: Method,
        data: Option<Value>,
    ) -> ClientResult<Value> {
        if !self.config.debug {
            return Err(ClientError::rejected(
                DEBUG_MODE_DISABLED,
                "request_with can only be used when debug mode is on.",
            ));
        }

        let mut endpoint = if license { "licenses" } else { "generators" }.to_string();
        if !self.license.is_empty() {
            endpoint = format!("{endpoint}/{}", self.license);
        }

        let body = match method {
            Method::Post | Method::Put => match data {
                Some(data) if !is_empty_json(&data) => Some(data),
                _ => {
                    return Err(ClientError::rejected(
                        NO_INSERT_DATA_FOUND,
                        "Insert data was not found for making request.",
                    ));
                }
            },
            _ => None,
        };

        debug!(%method, %endpoint, "debug request");
        let result = self
            .client
            .request(&endpoint, method, body.as_ref(), self.parameters.clone(), BTreeMap::new())
            .await;
        match result {
            Ok(value) => {
                self.last = Some(Outcome::Success(value.clone()));
                Ok(value)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The persisted license record.
    pub fn license(&self) -> ClientResult<Option<LicenseRecord>> {
        self.load_json(&self.config.product.license_key())
    }

    /// One field of the persisted license as text (`""` when unset).
    pub fn license_field(&self, name: &str) -> ClientResult<String> {
        let Some(record) = self.license()? else {
            return Ok(String::new());
        };
        Ok(match serde_json::to_value(record)?.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    /// The cached product metadata.
    pub fn product(&self) -> ClientResult<Option<ProductMetadata>> {
        self.load_json(&self.config.product.product_key())
    }

    /// Drops the cached product metadata.
    pub fn purge_product_cache(&self) -> ClientResult<()> {
        self.store.delete(&self.config.product.product_key())
    }

    /// Describes the last outcome, or `None` before any request.
    #[must_use]
    pub fn notice(&self, show_count: bool) -> Option<Notice> {
        let outcome = self.last.as_ref()?;
        let value = match outcome {
            Outcome::Failure(e) => {
                return Some(Notice {
                    kind: NoticeKind::Error,
                    message: e.message.clone(),
                });
            }
            Outcome::Success(value) => value,
        };

        let data = value
            .get("data")
            .and_then(|d| serde_json::from_value::<LicenseData>(d.clone()).ok())
            .filter(|d| d.state != LicenseStatus::Unset);
        let Some(data) = data else {
            return Some(Notice {
                kind: NoticeKind::Error,
                message: "Something went wrong. Please contact plugin support.".to_string(),
            });
        };

        let mut message = format!(
            "{} - License Key is now {}.",
            data.license_key,
            data.state.as_str().to_uppercase()
        );
        let max = data.times_activated_max.unwrap_or(0);
        if show_count && max > 1 {
            let remaining = max.saturating_sub(data.times_activated.unwrap_or(0));
            message.push_str(&format!(
                " {remaining} out of {max} activation remaining for this license."
            ));
        }
        Some(Notice {
            kind: NoticeKind::Success,
            message,
        })
    }

    /// Render state for the form at `step`.
    pub fn form_view(&self, step: FormState) -> ClientResult<FormView> {
        let record = self.license()?.unwrap_or_default();
        let status = record.status;
        let to_activate = step != FormState::Deactivate;
        let registered = |field: &str| self.rules.iter().any(|r| r.field == field);

        let (form_state, button_label, disabled, back_link) = if to_activate {
            (
                FormState::Activate,
                "Activate",
                status == LicenseStatus::Active && self.config.disable_form,
                None,
            )
        } else {
            let back = if status == LicenseStatus::Inactive { "Activate" } else { "Cancel" };
            (
                FormState::Deactivate,
                "Deactivate",
                status == LicenseStatus::Inactive && self.config.disable_form,
                Some(back.to_string()),
            )
        };

        let license_key = if self.license.is_empty() {
            record.license_key.clone()
        } else {
            self.license.clone()
        };

        Ok(FormView {
            form_state,
            status,
            status_label: if status == LicenseStatus::Unset {
                "Not Activated".to_string()
            } else {
                status.as_str().to_string()
            },
            disabled,
            button_label: button_label.to_string(),
            show_deactivate_link: to_activate && status == LicenseStatus::Active,
            back_link,
            license_key,
            email: registered("email").then(|| record.email.clone().unwrap_or_default()),
            order_id: registered("order_id")
                .then(|| record.order_id.map(|id| id.to_string()).unwrap_or_default()),
            slug: self
                .rules
                .iter()
                .find(|r| r.field == "slug")
                .map(|r| r.message.clone()),
            logo: self.product()?.map(|p| p.logo).filter(|l| !l.is_empty()),
            errors: self.errors.clone(),
        })
    }

    // ── Internals ───────────────────────────────────────────────────

    fn base_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("Referer".to_string(), self.config.site_url.clone())])
    }

    fn handle_response(&mut self, result: ClientResult<Value>) -> ClientResult<Value> {
        match result {
            Ok(value) => {
                let success = value.get("success").and_then(Value::as_bool) == Some(true);
                if success {
                    if let Some(data) = value.get("data") {
                        self.persist(data)?;
                    }
                }
                self.last = Some(Outcome::Success(value.clone()));
                Ok(value)
            }
            Err(e) => {
                if e.code() == LICENSE_EXPIRED {
                    let message = e.api_error().map(|a| a.message.clone()).unwrap_or_default();
                    self.expire(parse_expiry(&message))?;
                }
                Err(self.fail(e))
            }
        }
    }

    fn persist(&mut self, data: &Value) -> ClientResult<()> {
        let data: LicenseData = serde_json::from_value(data.clone())?;
        let mut record = LicenseRecord::from_data(&data);
        if record.key.is_empty() {
            record.key = self.site_key.to_string();
        }
        if record.license_key.is_empty() {
            record.license_key = self.license.clone();
        }
        info!(status = %record.status, "license state saved");
        self.save_json(&self.config.product.license_key(), &record)?;

        if let Some(meta) = data.product_meta.filter(|m| !m.is_empty()) {
            self.cache_metadata(meta)?;
        }
        self.store.delete(&self.config.product.update_key())
    }

    fn cache_metadata(&self, mut meta: ProductMetadata) -> ClientResult<ProductMetadata> {
        meta.cached_at = Some(chrono::Utc::now());
        self.save_json(&self.config.product.product_key(), &meta)?;
        Ok(meta)
    }

    /// Moves the local license to `expired`, once. Without a persisted
    /// license there is nothing to expire.
    fn expire(&mut self, expires_at: Option<String>) -> ClientResult<()> {
        let Some(mut record) = self.license()? else {
            debug!("expiry reported for a license that was never activated");
            return Ok(());
        };
        if record.status == LicenseStatus::Expired {
            return Ok(());
        }

        record.status = LicenseStatus::Expired;
        if let Some(date) = expires_at {
            record.expires_at = Some(date);
        }
        warn!(expires_at = ?record.expires_at, "license expired");
        self.save_json(&self.config.product.license_key(), &record)?;
        self.store.delete(&self.config.product.update_key())?;
        self.purge_product_cache()
    }

    fn fail(&mut self, error: ClientError) -> ClientError {
        self.note_transport(&error);
        if let Some(api) = error.api_error() {
            self.last = Some(Outcome::Failure(api.clone()));
        }
        error
    }

    fn note_transport(&mut self, error: &ClientError) {
        if let ClientError::Http(HttpError::Transport { transport, .. }) = error {
            self.transport_errors.push(transport.clone());
        }
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        match self.store.load(key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    fn save_json<T: serde::Serialize>(&self, key: &str, value: &T) -> ClientResult<()> {
        self.store.save(key, &serde_json::to_string(value)?)
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
