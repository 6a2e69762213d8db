use licman_auth::AuthError;
use licman_types::ApiError;
use thiserror::Error;

/// HTTP client errors.
///
/// Every variant that came out of a call carries an [`ApiError`] with the
/// request (and response, when one arrived) attached for diagnostics.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The connection is misconfigured; no request was attempted.
    #[error("{0}")]
    Config(ApiError),

    /// The signer refused the request before it was sent.
    #[error("{0}")]
    Rejected(ApiError),

    /// The server answered with a non-success status.
    #[error("{0}")]
    Api(ApiError),

    /// The body was not valid JSON.
    #[error("{0}")]
    InvalidJson(ApiError),

    /// The server could not be reached. `protocol` holds the outcome of
    /// processing the (empty) response, reported independently.
    #[error("{transport}")]
    Transport {
        transport: ApiError,
        protocol: Option<ApiError>,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HttpError {
    /// The primary error payload, if the variant carries one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Config(e) | Self::Rejected(e) | Self::Api(e) | Self::InvalidJson(e) => Some(e),
            Self::Transport { transport, .. } => Some(transport),
            Self::Auth(_) | Self::Serialization(_) => None,
        }
    }

    /// The error code, or an empty string for local failures.
    #[must_use]
    pub fn code(&self) -> &str {
        self.api_error().map_or("", |e| e.code.as_str())
    }

    /// The protocol-channel error: what the server (or its absence) said.
    #[must_use]
    pub fn protocol_error(&self) -> Option<&ApiError> {
        match self {
            Self::Transport { protocol, .. } => protocol.as_ref(),
            Self::Auth(_) | Self::Serialization(_) => None,
            Self::Config(e) | Self::Rejected(e) | Self::Api(e) | Self::InvalidJson(e) => Some(e),
        }
    }

    /// The transport-channel error, if the server was unreachable.
    #[must_use]
    pub fn transport_error(&self) -> Option<&ApiError> {
        match self {
            Self::Transport { transport, .. } => Some(transport),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;
