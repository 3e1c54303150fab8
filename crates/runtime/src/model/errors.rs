use thiserror::Error;

/// Errors from LLM provider calls.
///
/// Every variant is fatal to the current turn; none is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The provider rejected the credential.
    #[error("authentication: {0}")]
    Auth(String),

    /// The provider throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider could not be reached, timed out, or failed server-side.
    #[error("network: {0}")]
    Network(String),

    /// The provider returned any other error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Classify a non-success HTTP response.
    pub(crate) fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::Network(format!("{status}: {message}")),
            _ => Self::Api(format!("{status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
