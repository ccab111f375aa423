//! Shared HTTP plumbing for market data providers.

use std::time::Duration;

use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ProviderError;

const USER_AGENT: &str = concat!("tierwatch/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with the given request timeout.
pub(crate) fn client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "Failed to build HTTP client, using defaults");
            HttpClient::new()
        })
}

/// Send `request` and decode a JSON body, mapping failures to
/// [`ProviderError`].
pub(crate) async fn get_json<T>(request: RequestBuilder, provider: &str) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    check_status(provider, response.status())?;

    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, &e))?;
    decode(provider, &body)
}

pub(crate) fn check_status(provider: &str, status: StatusCode) -> Result<(), ProviderError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited {
            provider: provider.to_string(),
        }),
        StatusCode::NOT_FOUND => Err(ProviderError::NotFound {
            provider: provider.to_string(),
        }),
        s => Err(ProviderError::Status {
            provider: provider.to_string(),
            status: s.as_u16(),
        }),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

fn transport_error(provider: &str, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_string(),
        }
    } else if err.is_decode() {
        ProviderError::Decode {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    } else {
        ProviderError::Request {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    }
}
