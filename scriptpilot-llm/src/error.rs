//! Provider error types
//!
//! Re-exports scriptpilot-error and maps provider failures onto model-fault kinds.

pub use scriptpilot_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        let error = match err {
            ProviderError::Network(_) => Error::new(ErrorKind::NetworkFailed, message),
            ProviderError::Api { status, .. } => {
                let kind = if status >= 500 {
                    ErrorKind::ProviderUnavailable
                } else {
                    ErrorKind::InferenceFailed
                };
                Error::new(kind, message).with_context("status", status.to_string())
            }
            ProviderError::Parse(_) => Error::parse_failed(message),
            ProviderError::RateLimited { retry_after } => {
                let err = Error::new(ErrorKind::RateLimited, message);
                match retry_after {
                    Some(secs) => err.with_context("retry_after", secs.to_string()),
                    None => err,
                }
            }
            ProviderError::InvalidRequest(_) | ProviderError::Other(_) => {
                Error::inference_failed(message).permanent()
            }
            ProviderError::AuthenticationFailed => {
                Error::new(ErrorKind::AuthenticationFailed, message)
            }
        };
        error.with_operation("provider::complete")
    }
}

/// Create an InferenceFailed error for a response that carried no text
pub fn empty_response(model: impl Into<String>) -> Error {
    Error::inference_failed("model returned an empty response").with_context("model", model)
}
