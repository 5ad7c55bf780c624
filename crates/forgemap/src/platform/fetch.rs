use serde::de::DeserializeOwned;

use crate::http::{HttpHeaders, HttpRequest, HttpTransport, header_get};

use super::errors::{PlatformError, Result};

/// A decoded JSON body with the response headers kept for pagination.
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    pub body: T,
    pub headers: HttpHeaders,
}

impl<T> JsonResponse<T> {
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// Send a GET request and decode a successful JSON response.
///
/// Non-2xx statuses are classified by [`PlatformError::from_response`];
/// `resource` names the requested entity for not-found errors.
pub async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    resource: &str,
) -> Result<JsonResponse<T>> {
    let url = request.url.clone();
    let response = transport.send(request).await?;

    if !response.is_success() {
        tracing::debug!(url = %url, status = response.status, "provider request failed");
        return Err(PlatformError::from_response(&response, resource));
    }

    let body = serde_json::from_slice(&response.body).map_err(|e| {
        PlatformError::internal(format!("failed to decode response from {}: {}", url, e))
    })?;

    Ok(JsonResponse {
        body,
        headers: response.headers,
    })
}
