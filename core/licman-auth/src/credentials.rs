use std::fmt;

/// Consumer credentials for one connection. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Secret shared with the product's own license form, if any.
    pub product_secret: Option<String>,
}

impl Credentials {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            product_secret: None,
        }
    }

    #[must_use]
    pub fn with_product_secret(mut self, secret: impl Into<String>) -> Self {
        self.product_secret = Some(secret.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("product_secret", &self.product_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
