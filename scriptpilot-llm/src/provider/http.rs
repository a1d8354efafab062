//! Request plumbing shared by the HTTP providers.

use super::{ProviderConfig, ProviderError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub(crate) fn client(config: &ProviderConfig) -> Result<Client, ProviderError> {
    let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()
        .map_err(|e| ProviderError::Other(format!("cannot build HTTP client: {}", e)))
}

/// Send `request` with the configured extra headers and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    config: &ProviderConfig,
) -> Result<T, ProviderError> {
    let request = config
        .headers
        .iter()
        .fold(request, |request, (name, value)| request.header(name, value));

    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let retry = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, retry, &body));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::BAD_REQUEST => ProviderError::InvalidRequest(error_message(body)),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

/// Both vendors wrap failures as `{"error": {"message": ...}}`; anything else is kept raw.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
