//! Middleware wrapped around the proxy handler.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{ProxyError, Result};
use crate::print::print_request;
use crate::state::ProxyState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

// ─────────────────────────────────────────────────────────────────────────────
// Client IP
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the client IP of a request.
///
/// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// TCP peer address.
pub fn client_ip(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();

    if let Some(first) = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.split(',').next())
    {
        return Some(first.trim().to_string());
    }

    if let Some(real_ip) = headers
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(real_ip.to_string());
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// IP Allow-list
// ─────────────────────────────────────────────────────────────────────────────

/// Reject clients whose IP is not on the configured allow-list.
pub async fn ip_filter_middleware(
    State(state): State<ProxyState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let Some(allowed) = state.config.allowed_ips.as_deref() else {
        return Ok(next.run(request).await);
    };

    let ip = client_ip(&request).unwrap_or_default();
    if !allowed.iter().any(|a| *a == ip) {
        tracing::info!(ip = %ip, allowed = ?allowed, "Client IP not allowed");
        return Err(ProxyError::ClientNotAllowed(ip));
    }

    Ok(next.run(request).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Printing
// ─────────────────────────────────────────────────────────────────────────────

/// Print each request at the configured print level.
pub async fn print_request_middleware(
    State(state): State<ProxyState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let config = &state.config;
    if !config.print_level.is_enabled() {
        return Ok(next.run(request).await);
    }

    let request = print_request(request, config.print_level, config.max_body_size).await?;
    Ok(next.run(request).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Structured request logging middleware.
///
/// Logs method, path, status and duration once per request.
pub async fn request_logging_middleware(
    State(state): State<ProxyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request rejected"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request ok"
        );
    }

    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use tokveil_cache::{StoreConfig, TokenStore};
    use tower::ServiceExt;

    fn create_test_state(config: ProxyConfig) -> ProxyState {
        ProxyState::new(config, TokenStore::new(StoreConfig::default())).unwrap()
    }

    fn create_test_router(state: ProxyState) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                ip_filter_middleware,
            ))
            .with_state(state)
    }

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/ok");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let req = request(&[
            ("x-forwarded-for", " 10.0.0.1 , 10.0.0.2"),
            ("x-real-ip", "10.0.0.3"),
        ]);
        assert_eq!(client_ip(&req).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let req = request(&[("x-real-ip", "10.0.0.3")]);
        assert_eq!(client_ip(&req).as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut req = request(&[]);
        assert_eq!(client_ip(&req), None);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 53211))));
        assert_eq!(client_ip(&req).as_deref(), Some("192.168.1.20"));
    }

    #[tokio::test]
    async fn test_allowed_ip_passes() {
        let state = create_test_state(
            ProxyConfig::default().with_allowed_ips(vec!["10.0.0.1".to_string()]),
        );
        let app = create_test_router(state);

        let response = app
            .oneshot(request(&[("x-forwarded-for", "10.0.0.1")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unlisted_ip_is_unauthorized() {
        let state = create_test_state(
            ProxyConfig::default().with_allowed_ips(vec!["10.0.0.1".to_string()]),
        );
        let app = create_test_router(state);

        let response = app
            .oneshot(request(&[("x-forwarded-for", "10.0.0.99")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_ip_is_unauthorized() {
        let state = create_test_state(
            ProxyConfig::default().with_allowed_ips(vec!["10.0.0.1".to_string()]),
        );
        let app = create_test_router(state);

        let response = app.oneshot(request(&[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_filter_disabled_passes_everyone() {
        let state = create_test_state(ProxyConfig::default());
        let app = create_test_router(state);

        let response = app
            .oneshot(request(&[("x-forwarded-for", "203.0.113.5")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_logging_passes_response_through() {
        let state = create_test_state(ProxyConfig::default());
        let app = Router::new()
            .route("/ok", get(|| async { (StatusCode::CREATED, "made") }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                request_logging_middleware,
            ))
            .with_state(state);

        let response = app.oneshot(request(&[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
