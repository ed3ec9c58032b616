//! HTTP proxy server in front of an OAuth token endpoint.
//!
//! Every method and path is accepted and forwarded to the upstream base URL.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Request, State},
    middleware,
    response::Response,
};
use tokio::net::TcpListener;
use tokveil_cache::TokenStore;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::forward::pass_through;
use crate::intercept::intercept;
use crate::middleware::{
    ip_filter_middleware, print_request_middleware, request_logging_middleware,
};
use crate::rewrite::rewrite_token_response;
use crate::state::ProxyState;

/// The token proxy server.
pub struct ProxyServer {
    state: ProxyState,
}

impl ProxyServer {
    /// Create a proxy serving tokens out of `store`.
    pub fn new(config: ProxyConfig, store: TokenStore) -> Result<Self> {
        Ok(Self {
            state: ProxyState::new(config, store)?,
        })
    }

    /// Shared state.
    pub fn state(&self) -> &ProxyState {
        &self.state
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(handle_proxy)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                print_request_middleware,
            ))
            // IP filter (runs before printing and the handler)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ip_filter_middleware,
            ))
            // Request logging (outermost, sees every final status)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the proxy server until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, upstream = %self.state.forwarder.upstream(), "Starting token proxy");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }

    /// Run in the background with graceful shutdown, returning the bound address.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, upstream = %self.state.forwarder.upstream(), "Starting token proxy");

        let router = self.router();
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown)
            .await
            .ok();
        });
        Ok(local_addr)
    }
}

/// Forward any request, swapping handles and issued tokens on the way.
async fn handle_proxy(State(state): State<ProxyState>, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();

    let interception = intercept(&parts.headers, &state.store)?;

    let upstream = state
        .forwarder
        .forward(parts.method, &parts.uri, interception.headers, body)
        .await?;

    if interception.awaits_token {
        rewrite_token_response(upstream, &state.store).await
    } else {
        Ok(pass_through(upstream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::sync::{Arc, Mutex};
    use tokveil_cache::StoreConfig;
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    fn unreachable_server(config: ProxyConfig) -> ProxyServer {
        let config = ProxyConfig {
            upstream: "http://127.0.0.1:1".to_string(),
            ..config
        };
        ProxyServer::new(config, TokenStore::new(StoreConfig::default())).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_header_never_forwarded() {
        let router = unreachable_server(ProxyConfig::default()).router();

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/realms/demo/protocol/openid-connect/userinfo")
                    .header("Authorization", "Bearer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // An attempted forward would have produced 502
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let router = unreachable_server(ProxyConfig::default()).router();

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/token")
                    .body(Body::from("grant_type=client_credentials"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_ip_filter_runs_before_handler() {
        let router = unreachable_server(
            ProxyConfig::default().with_allowed_ips(vec!["10.0.0.1".to_string()]),
        )
        .router();

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/token")
                    .header("X-Real-IP", "10.0.0.2")
                    .header("Authorization", "Bearer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_rejected_client_gets_request_log_line() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = unreachable_server(
            ProxyConfig::default().with_allowed_ips(vec!["10.0.0.1".to_string()]),
        )
        .router();

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/realms/demo/token")
                    .header("X-Forwarded-For", "10.9.9.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let output = logs.contents();
        assert!(output.contains("Request rejected"), "{output}");
        assert!(output.contains("method=POST"), "{output}");
        assert!(output.contains("path=/realms/demo/token"), "{output}");
        assert!(output.contains("status=401"), "{output}");
    }

    #[test]
    fn test_state_shares_store() {
        let store = TokenStore::new(StoreConfig::default());
        let server = ProxyServer::new(ProxyConfig::default(), store.clone()).unwrap();

        let handle = server.state().store.mint("real").unwrap();
        assert!(store.has(&handle));
    }
}
