use thiserror::Error;

/// Failures raised while talking to a backing API.
///
/// Conversion itself never produces these: recoverable data defects
/// (malformed tool arguments, missing identifiers) are repaired with
/// fallbacks at the conversion layer. Callers that want the uniform
/// canonical shape use `Provider::generate`, which folds these into an
/// error response.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("server error: {0}")]
    Server(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Stable code carried on canonical error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Api { .. } => "api_error",
            ProviderError::Server(_) => "server_error",
            ProviderError::Http(_) => "network_error",
            ProviderError::MalformedResponse(_) => "malformed_response",
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
