//! License status and form state.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The locally persisted status of a license.
///
/// Transitions: `unset → active → (inactive | expired)`, `inactive → active`,
/// `expired → active` (only through a successful server activation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LicenseStatus {
    /// Never activated on this site.
    #[default]
    Unset,
    /// Activated for this site.
    Active,
    /// Deactivated for this site.
    Inactive,
    /// Expired. Terminal until a renewed key is activated.
    Expired,
}

impl LicenseStatus {
    /// Returns the wire string (`""` for unset).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }

    /// Parses a server-supplied state string. Unknown strings map to `Unset`.
    #[must_use]
    pub fn from_wire(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "expired" => Self::Expired,
            _ => Self::Unset,
        }
    }

    /// Returns true if the license is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true if a request for `form_state` would be a duplicate
    /// transition (`active → active` or `inactive → inactive`).
    #[must_use]
    pub fn rejects(&self, form_state: FormState) -> bool {
        matches!(
            (self, form_state),
            (Self::Active, FormState::Activate) | (Self::Inactive, FormState::Deactivate)
        )
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LicenseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LicenseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_wire).unwrap_or_default())
    }
}

/// The step a license form submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormState {
    /// Activate the license for this site.
    Activate,
    /// Deactivate the license for this site.
    Deactivate,
    /// Background re-validation (never submitted by the form itself).
    Validate,
}

impl FormState {
    /// Returns the route segment for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Validate => "validate",
        }
    }

    /// Returns the status a successful request for this state leads to.
    #[must_use]
    pub fn target_status(&self) -> Option<LicenseStatus> {
        match self {
            Self::Activate => Some(LicenseStatus::Active),
            Self::Deactivate => Some(LicenseStatus::Inactive),
            Self::Validate => None,
        }
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            "validate" => Ok(Self::Validate),
            other => Err(Error::UnknownFormState(other.to_string())),
        }
    }
}
