//! Error type for the DeepSeek client boundary.
//!
//! [`DeepSeekError`] carries the parsed HTTP status and error body so that
//! retry decisions can branch on structure instead of message text.

use thiserror::Error;

use super::types::ErrorBody;

/// Failures that can occur while exchanging one request with the API.
///
/// - [`Api`](DeepSeekError::Api): the server answered with a non-2xx status
/// - [`Network`](DeepSeekError::Network): connection, TLS or timeout failure
/// - [`Decode`](DeepSeekError::Decode): a 2xx body that is not valid JSON
/// - [`MissingCompletion`](DeepSeekError::MissingCompletion): valid JSON
///   without a usable first-choice message
#[derive(Debug, Error)]
pub enum DeepSeekError {
    /// Non-success status. `body` is the decoded `{"error": {...}}` envelope
    /// when the server sent one; `message` is a printable summary.
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        body: Option<ErrorBody>,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("undecodable response body: {0}")]
    Decode(String),

    #[error("response has no completion text")]
    MissingCompletion,
}

impl DeepSeekError {
    /// HTTP status of an [`Api`](DeepSeekError::Api) error.
    pub fn status(&self) -> Option<u16> {
        match self {
            DeepSeekError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server refused the request because it does not know the model.
    pub fn is_unknown_model(&self) -> bool {
        match self {
            DeepSeekError::Api {
                status: 400 | 404,
                body: Some(body),
                ..
            } => body.rejects_model(),
            _ => false,
        }
    }
}
