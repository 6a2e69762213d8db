use std::collections::BTreeMap;

/// The parts of an inbound license request the validator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// Route without the API prefix, e.g. `/lmfwc/v2/licenses/activate/KEY`.
    pub route: String,
    /// Decoded query parameters.
    pub params: BTreeMap<String, String>,
    pub authorization: Option<String>,
    pub from: Option<String>,
    pub referer: Option<String>,
}

impl InboundRequest {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    #[must_use]
    pub fn from_email(mut self, value: impl Into<String>) -> Self {
        self.from = Some(value.into());
        self
    }

    #[must_use]
    pub fn referer(mut self, value: impl Into<String>) -> Self {
        self.referer = Some(value.into());
        self
    }

    /// The `form_state` parameter, if present and non-empty.
    #[must_use]
    pub fn form_state(&self) -> Option<&str> {
        self.params
            .get("form_state")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Decodes a `<scheme> <base64>` authorization header.
    ///
    /// Returns `None` if the header is missing, has no token part or is not
    /// valid base64 / UTF-8.
    #[must_use]
    pub fn auth_token(&self) -> Option<String> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let raw = self.authorization.as_deref()?;
        let encoded = raw.split(' ').nth(1)?;
        let bytes = STANDARD.decode(encoded.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }
}
