//! Shared request plumbing for both remote services.

use codeset_core::{GatewayError, GatewayResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Issue a GET and decode the JSON body.
///
/// Not-found is normalized to `Ok(None)`; absence of a resource is a valid
/// terminal state for ancestor/descendant/attribute lookups and callers
/// decide whether it is an error for their operation.
pub(crate) async fn get_optional<T: DeserializeOwned>(
    http: &Client,
    url: &str,
) -> GatewayResult<Option<T>> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status { status, message });
    }

    response
        .json::<T>()
        .await
        .map(Some)
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Append a query parameter to a URL that may or may not already carry a
/// query string.
pub(crate) fn with_query(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{key}={value}")
}
