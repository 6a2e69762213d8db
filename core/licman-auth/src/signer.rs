//! Scheme selection.

use crate::basic::BasicSigner;
use crate::error::AuthResult;
use crate::oauth::OAuthSigner;
use crate::Credentials;
use licman_types::{ApiError, BasicCredentials, Method, Params};
use serde_json::json;
use tracing::{debug, warn};

/// Warning code raised when basic auth would travel over plain HTTP.
pub const BASICAUTH_SSL_NOT_INSTALLED: &str = "basicauth_ssl_not_installed";

/// Authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    OAuth,
    Basic,
}

impl Scheme {
    /// `https` targets use basic auth, everything else OAuth.
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        if is_ssl(url) { Self::Basic } else { Self::OAuth }
    }
}

/// Connection-level knobs the signers read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignerOptions {
    pub query_string_auth: bool,
    pub verify_ssl: bool,
    pub oauth_timestamp: Option<i64>,
}

/// Output of one signing call.
#[derive(Debug, Clone, Default)]
pub struct SignedParams {
    /// Parameters to send as the query string.
    pub params: Params,
    /// Transport-level credentials, when basic auth is not in the query.
    pub basic_auth: Option<BasicCredentials>,
    /// Non-fatal findings the caller must branch on before sending.
    pub warnings: Vec<ApiError>,
}

impl SignedParams {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A signer chosen once per connection.
#[derive(Debug, Clone)]
pub enum Signer {
    OAuth(OAuthSigner),
    Basic {
        signer: BasicSigner,
        verify_ssl: bool,
    },
}

impl Signer {
    /// Picks the scheme for `base_url`.
    pub fn for_url(base_url: &str, credentials: Credentials, options: SignerOptions) -> Self {
        let scheme = Scheme::for_url(base_url);
        debug!(?scheme, base_url, "selected signing scheme");
        Self::with_scheme(scheme, credentials, options)
    }

    /// Builds a signer for an explicit scheme.
    pub fn with_scheme(scheme: Scheme, credentials: Credentials, options: SignerOptions) -> Self {
        match scheme {
            Scheme::OAuth => {
                Self::OAuth(OAuthSigner::new(credentials).with_timestamp(options.oauth_timestamp))
            }
            Scheme::Basic => Self::Basic {
                signer: BasicSigner::new(credentials, options.query_string_auth),
                verify_ssl: options.verify_ssl,
            },
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::OAuth(_) => Scheme::OAuth,
            Self::Basic { .. } => Scheme::Basic,
        }
    }

    /// Authenticates `params` for a request to `url` (without query).
    pub fn sign(&self, method: Method, url: &str, params: Params) -> AuthResult<SignedParams> {
        match self {
            Self::OAuth(signer) => Ok(SignedParams {
                params: signer.sign(method, url, params)?,
                ..SignedParams::default()
            }),
            Self::Basic { signer, verify_ssl } => {
                let (params, basic_auth) = signer.sign(params);
                let mut warnings = Vec::new();
                if !is_ssl(url) && *verify_ssl {
                    warn!(url, "basic auth requested for a non-SSL target");
                    let data = serde_json::to_value(&params).unwrap_or(json!({}));
                    warnings.push(
                        ApiError::new(
                            BASICAUTH_SSL_NOT_INSTALLED,
                            "SSL is not installed on this site for Basic Authentication.",
                        )
                        .with_data(data),
                    );
                }
                Ok(SignedParams {
                    params,
                    basic_auth,
                    warnings,
                })
            }
        }
    }
}

fn is_ssl(url: &str) -> bool {
    url.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https://"))
}
