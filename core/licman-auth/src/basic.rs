use crate::Credentials;
use licman_types::{BasicCredentials, Params};

/// Basic authentication for SSL targets.
#[derive(Debug, Clone)]
pub struct BasicSigner {
    credentials: Credentials,
    query_string_auth: bool,
}

impl BasicSigner {
    pub fn new(credentials: Credentials, query_string_auth: bool) -> Self {
        Self {
            credentials,
            query_string_auth,
        }
    }

    /// With query-string auth the consumer pair is appended to `params`;
    /// otherwise `params` pass through and transport credentials are returned.
    pub fn sign(&self, mut params: Params) -> (Params, Option<BasicCredentials>) {
        if self.query_string_auth {
            params.insert("consumer_key", &self.credentials.consumer_key);
            params.insert("consumer_secret", &self.credentials.consumer_secret);
            return (params, None);
        }

        let basic = BasicCredentials {
            username: self.credentials.consumer_key.clone(),
            password: self.credentials.consumer_secret.clone(),
        };
        (params, Some(basic))
    }
}
