//! License form input: rules, submissions, sanitizers and the render state.

use licman_types::{leading_int, ErrorSet, FormState, LicenseStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message used when a license key rule was not registered.
pub(crate) const LICENSE_KEY_REQUIRED: &str =
    "The License key was invalid or no license key was given.";

/// One field to validate, with the message shown when it is empty.
///
/// For the `slug` field the message doubles as the product slug sent in a
/// hidden input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub message: String,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Fields extracted from a submitted license form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    /// The hidden `form_state` marker (`activate` / `deactivate`).
    pub form_state: Option<String>,
    /// The hidden one-time form token.
    pub token: Option<String>,
    /// Product-scoped fields (`license_key`, `email`, ...).
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl FormSubmission {
    pub fn new(form_state: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            form_state: Some(form_state.into()),
            token: Some(token.into()),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Values validated out of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ValidatedForm {
    pub form_state: Option<FormState>,
    pub token: String,
    pub license_key: String,
    pub email: Option<String>,
    /// Everything else that goes out as query parameters.
    pub params: BTreeMap<String, String>,
}

/// Runs `rules` over `submission` in one pass, collecting every error.
pub(crate) fn validate(
    submission: &FormSubmission,
    rules: &[FieldRule],
) -> (ValidatedForm, ErrorSet) {
    let mut form = ValidatedForm {
        form_state: submission
            .form_state
            .as_deref()
            .and_then(|s| sanitize_key(s).parse().ok())
            .filter(|state| *state != FormState::Validate),
        token: submission.token.clone().unwrap_or_default(),
        ..ValidatedForm::default()
    };
    let mut errors = ErrorSet::new();

    let raw_key = submission.fields.get("license_key").map(String::as_str).unwrap_or("");
    form.license_key = sanitize_text_field(raw_key);
    if form.license_key.is_empty() {
        let message = rules
            .iter()
            .find(|r| r.field == "license_key")
            .map_or(LICENSE_KEY_REQUIRED, |r| r.message.as_str());
        errors.insert("license_key", message);
    }

    for rule in rules.iter().filter(|r| r.field != "license_key") {
        let raw = submission.fields.get(&rule.field).map(String::as_str);
        match rule.field.as_str() {
            "email" => {
                let email = sanitize_email(raw.unwrap_or(""));
                if email.is_empty() {
                    errors.insert("email", &rule.message);
                } else {
                    form.email = Some(email);
                }
            }
            "order_id" => {
                let order_id = raw.map(leading_int).unwrap_or(0);
                if order_id == 0 {
                    errors.insert("order_id", &rule.message);
                } else {
                    form.params.insert("order_id".to_string(), order_id.to_string());
                }
            }
            "slug" => {
                let slug = sanitize_title(raw.unwrap_or(&rule.message));
                if !slug.is_empty() {
                    form.params.insert("slug".to_string(), slug);
                }
            }
            other => {
                let value = sanitize_text_field(raw.unwrap_or(""));
                if value.is_empty() {
                    errors.insert(other, &rule.message);
                } else {
                    form.params.insert(other.to_string(), value);
                }
            }
        }
    }

    (form, errors)
}

/// Trims, drops tags and control characters, collapses whitespace.
#[must_use]
pub fn sanitize_text_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for c in value.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_whitespace() => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Keeps the characters valid in an address; empty unless `local@domain`.
#[must_use]
pub fn sanitize_email(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.@-".contains(*c))
        .collect();
    match cleaned.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            cleaned
        }
        _ => String::new(),
    }
}

/// Lower-case `[a-z0-9_-]` only.
#[must_use]
pub fn sanitize_key(value: &str) -> String {
    value
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Slug form of a title: lower-case words joined by single dashes.
#[must_use]
pub fn sanitize_title(value: &str) -> String {
    let mut slug = String::new();
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-' || c == '.') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Everything an external renderer needs to draw the license form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    /// Step the form submits (`activate` / `deactivate`).
    pub form_state: FormState,
    pub status: LicenseStatus,
    /// `Not Activated` when no license was ever activated.
    pub status_label: String,
    /// Fields are locked.
    pub disabled: bool,
    pub button_label: String,
    /// Show the link to the deactivation step.
    pub show_deactivate_link: bool,
    /// Label of the link back to the activation step, if shown.
    pub back_link: Option<String>,
    pub license_key: String,
    /// `Some` when an email field is registered.
    pub email: Option<String>,
    /// `Some` when an order ID field is registered.
    pub order_id: Option<String>,
    /// Hidden product slug, if registered.
    pub slug: Option<String>,
    pub logo: Option<String>,
    pub errors: ErrorSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_strips_tags_and_whitespace() {
        assert_eq!(sanitize_text_field("  <b>ABC</b>\n -123\t "), "ABC -123");
    }

    #[test]
    fn email_requires_local_and_domain() {
        assert_eq!(sanitize_email(" buyer@example.com "), "buyer@example.com");
        assert_eq!(sanitize_email("buyer(at)example.com"), "");
        assert_eq!(sanitize_email("@example.com"), "");
    }

    #[test]
    fn title_becomes_slug() {
        assert_eq!(sanitize_title("My Great  Plugin"), "my-great-plugin");
        assert_eq!(sanitize_title("already-a-slug"), "already-a-slug");
    }
}
