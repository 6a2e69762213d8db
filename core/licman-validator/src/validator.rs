//! Pre-dispatch validation and response rewriting.

use crate::config::ValidatorConfig;
use crate::error::{ValidatorError, ValidatorResult};
use crate::repository::{LicenseRepository, ServerLicense, SiteMeta, STATUS_ACTIVE, STATUS_INACTIVE};
use crate::request::InboundRequest;
use crate::transient::{transient_key, Transient, TransientStore};
use licman_types::{leading_int, FormState, SiteKey};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const OUTSIDE_FORM: &str = "Request was made outside of license form.";

/// Guards the license routes of one server.
pub struct ServerValidator {
    config: ValidatorConfig,
    repository: Arc<dyn LicenseRepository>,
    transients: Arc<dyn TransientStore>,
}

impl ServerValidator {
    pub fn new(
        config: ValidatorConfig,
        repository: Arc<dyn LicenseRepository>,
        transients: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            config,
            repository,
            transients,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Checks `request` before it is dispatched.
    ///
    /// Outside debug mode the request must come from the client license
    /// form, target the route matching its `form_state`, name a known
    /// license and not repeat the site's current state. Registered
    /// `slug` / `order_id` / `email` values must match the license's
    /// records. On success the request context is stashed for
    /// [`rewrite_response`](Self::rewrite_response).
    ///
    /// # Errors
    ///
    /// [`ValidatorError::Rejected`] with a 400, 401 or 404 status.
    pub fn validate_request(&self, request: &InboundRequest) -> ValidatorResult<()> {
        let form_state = request.form_state();
        let token = request.auth_token();
        let form_token = token.as_deref() == Some(self.config.form_token.as_str());
        let validating = form_state == Some(FormState::Validate.as_str());

        let mut prefix = format!("{}/", self.config.base_route);
        if !self.config.debug {
            if !form_token && !validating {
                return Err(reject(OUTSIDE_FORM, 401, None));
            }
            let Some(state) = form_state else {
                return Err(reject(
                    "License form must only be used to activate/deactivate license.",
                    401,
                    Some(json!(request.params)),
                ));
            };
            prefix = format!("{}/{state}/", self.config.base_route);
            if !request.route.starts_with(&prefix) {
                return Err(reject(
                    "The request route did not match for further processing.",
                    401,
                    Some(json!({
                        "request_route": request.route,
                        "remote_route": prefix,
                        "parameters": request.params,
                    })),
                ));
            }
        } else if let Some(state) = form_state {
            prefix = format!("{}/{state}/", self.config.base_route);
        }

        let license_key = request
            .route
            .strip_prefix(&prefix)
            .map(|rest| rest.trim_matches('/'))
            .filter(|key| !key.is_empty());
        let license = match license_key {
            Some(key) => self.repository.license(key)?,
            None => None,
        };
        let Some(license) = license else {
            if self.config.debug {
                debug!(route = %request.route, "unknown license accepted in debug mode");
                return Ok(());
            }
            let message = self
                .config
                .messages
                .license_key
                .clone()
                .unwrap_or_else(|| "License key not found".to_string());
            return Err(reject(
                message,
                404,
                Some(json!({"request_route": request.route, "remote_route": prefix})),
            ));
        };

        let client_url = request.referer.clone().unwrap_or_default();
        let site_key = SiteKey::from_url(&client_url).map_err(|_| reject(OUTSIDE_FORM, 401, None))?;

        if !self.config.debug && !form_token {
            let expected = format!(
                "{site_key}:{}",
                license.created_at.as_deref().unwrap_or_default()
            );
            if token.as_deref() != Some(expected.as_str()) {
                return Err(reject(OUTSIDE_FORM, 401, None));
            }
        }

        let email = request.from.clone().filter(|e| !e.is_empty());
        let saved = self
            .repository
            .site_meta(license.id, site_key.as_str())?
            .unwrap_or_default();
        let same_site = saved.url == client_url
            && email.as_ref().is_none_or(|e| saved.email.as_ref() == Some(e));
        let duplicate = match form_state {
            Some("activate") => same_site && saved.status == "active",
            Some("deactivate") => same_site && saved.status == "inactive",
            _ => false,
        };
        if duplicate {
            let state = form_state.unwrap_or_default();
            info!(%site_key, form_state = state, "duplicate license request rejected");
            return Err(reject(
                format!("The license for this site has already been <b>{state}d</b>."),
                400,
                None,
            ));
        }

        self.check_records(&license, request, email.as_deref())?;

        let transient = Transient {
            key: site_key.to_string(),
            url: client_url,
            email,
        };
        self.transients
            .set(&transient_key(&license.license_key), transient)?;
        debug!(%site_key, "license request validated");
        Ok(())
    }

    fn check_records(
        &self,
        license: &ServerLicense,
        request: &InboundRequest,
        email: Option<&str>,
    ) -> ValidatorResult<()> {
        let messages = &self.config.messages;

        if let Some(slug) = request.params.get("slug") {
            let product = match license.product_id {
                Some(id) => self.repository.product(id)?,
                None => None,
            };
            if product.is_none_or(|p| &p.slug != slug) {
                return Err(field_error(&messages.slug, "Product not found."));
            }
        }

        if let Some(order_id) = request.params.get("order_id") {
            let matches = match license.order_id {
                Some(id) => absint(order_id) == id && self.repository.order_exists(id)?,
                None => false,
            };
            if !matches {
                return Err(field_error(&messages.order_id, "Order not found."));
            }
        }

        if let Some(email) = email.or(request.params.get("email").map(String::as_str)) {
            let user = match license.user_id {
                Some(id) => self.repository.user(id)?,
                None => None,
            };
            if user.is_none_or(|u| u.email != email) {
                return Err(field_error(&messages.email, "Email not found."));
            }
        }

        Ok(())
    }

    /// Augments a successful response body for `request`.
    ///
    /// Activate / deactivate: flips the stored status of single-activation
    /// licenses, saves the site metadata and adds `key`, `email` and `state`.
    /// Validate: reports the site's stored state, or `expired`. The transient
    /// is always consumed. Bodies for other routes pass through untouched.
    pub fn rewrite_response(&self, request: &InboundRequest, mut data: Value) -> ValidatorResult<Value> {
        if self.config.debug {
            return Ok(data);
        }
        let Some(form_state) = request.form_state().and_then(|s| s.parse::<FormState>().ok())
        else {
            return Ok(data);
        };
        if !request
            .route
            .starts_with(&format!("{}/{form_state}/", self.config.base_route))
        {
            return Ok(data);
        }
        let Some(license_key) = data.get("licenseKey").and_then(Value::as_str).map(str::to_string)
        else {
            return Ok(data);
        };
        let Some(license) = self.repository.license(&license_key)? else {
            return Ok(data);
        };

        let handle = transient_key(&license_key);
        let transient = self.transients.get(&handle)?;
        self.transients.delete(&handle)?;

        let state = match form_state {
            FormState::Validate => {
                let stored = match &transient {
                    Some(t) => self.repository.site_meta(license.id, &t.key)?,
                    None => None,
                };
                if license.is_expired() {
                    "expired".to_string()
                } else {
                    stored.map(|m| m.status).unwrap_or_default()
                }
            }
            FormState::Activate | FormState::Deactivate => {
                let (number, text) = if form_state == FormState::Activate {
                    (STATUS_ACTIVE, "active")
                } else {
                    (STATUS_INACTIVE, "inactive")
                };
                if self.config.update_status && data.get("timesActivatedMax") == Some(&json!(1)) {
                    self.repository.update_status(license.id, number)?;
                    data["status"] = json!(number);
                }
                if let Some(t) = &transient {
                    let meta = SiteMeta {
                        status: text.to_string(),
                        url: t.url.clone(),
                        email: t.email.clone(),
                        data: self.config.activation_data.clone(),
                    };
                    self.repository.save_site_meta(license.id, &t.key, meta)?;
                }
                info!(license_id = license.id, state = text, "site license state saved");
                text.to_string()
            }
        };

        if let Some(t) = transient {
            data["key"] = json!(t.key);
            if let Some(email) = t.email {
                data["email"] = json!(email);
            }
        }
        data["state"] = json!(state);
        Ok(data)
    }
}

fn reject(message: impl Into<String>, status: u16, data: Option<Value>) -> ValidatorError {
    ValidatorError::rejected(message, status, data)
}

fn field_error(custom: &Option<String>, fallback: &str) -> ValidatorError {
    reject(custom.clone().unwrap_or_else(|| fallback.to_string()), 404, None)
}

/// Absolute value of the leading integer, so `-42` names order 42.
fn absint(value: &str) -> i64 {
    leading_int(value).saturating_abs()
}
