//! Replacing issued access tokens with opaque handles.

use axum::{body::Body, http::header, response::Response};
use serde_json::{Map, Value};
use tokveil_cache::TokenStore;

use crate::error::{ProxyError, Result};
use crate::forward::strip_hop_by_hop;

/// JSON field carrying the issued token.
const ACCESS_TOKEN_FIELD: &str = "access_token";

/// Swap the `access_token` in a token response body for a new handle.
///
/// The real token is stored under the handle before the body is returned.
/// Every other field is carried over as is.
pub fn rewrite_token_body(body: &[u8], store: &TokenStore) -> Result<Vec<u8>> {
    let mut object: Map<String, Value> = serde_json::from_slice(body)
        .map_err(|e| ProxyError::Forwarding(format!("token response is not a JSON object: {}", e)))?;

    let Some(Value::String(real_token)) = object.get(ACCESS_TOKEN_FIELD) else {
        return Err(ProxyError::Forwarding(
            "token response has no string access_token".to_string(),
        ));
    };

    let handle = store.mint(real_token)?;
    object.insert(ACCESS_TOKEN_FIELD.to_string(), Value::String(handle.clone()));

    serde_json::to_vec(&object).map_err(|e| {
        store.delete(&handle);
        ProxyError::Forwarding(format!("failed to serialize token response: {}", e))
    })
}

/// Read a token-issuing response and return it with the token replaced.
///
/// Status and headers are kept, apart from `content-length` which no longer
/// matches the body.
pub async fn rewrite_token_response(
    upstream: reqwest::Response,
    store: &TokenStore,
) -> Result<Response> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Forwarding(format!("failed to read token response: {}", e)))?;

    let rewritten = rewrite_token_body(&body, store)?;
    tracing::info!(status = %status.as_u16(), "Issued token wrapped in opaque handle");

    let mut response = Response::new(Body::from(rewritten));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
