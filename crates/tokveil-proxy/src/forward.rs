//! Forwarding requests to the upstream server.

use axum::{
    body::{Body, HttpBody},
    http::{HeaderMap, HeaderName, Method, Uri, header},
    response::Response,
};
use futures::StreamExt;
use reqwest::{Client, redirect};

use crate::error::{ProxyError, Result};

/// Headers that only apply to a single connection.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    header::PROXY_AUTHENTICATE,
];

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Sends requests to one upstream base URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    upstream: String,
}

impl Forwarder {
    /// Create a forwarder for `upstream`. Redirects are returned to the client.
    pub fn new(upstream: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, upstream))
    }

    /// Use a preconfigured client.
    pub fn with_client(client: Client, upstream: &str) -> Self {
        Self {
            client,
            upstream: upstream.trim_end_matches('/').to_string(),
        }
    }

    /// Upstream base URL without trailing slash.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Upstream URL for an inbound request URI.
    pub fn target_url(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{}", self.upstream, path_and_query)
    }

    /// Send a request upstream with `headers` and a streamed `body`.
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        mut headers: HeaderMap,
        body: Body,
    ) -> Result<reqwest::Response> {
        let url = self.target_url(uri);

        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut request = self.client.request(method, &url).headers(headers);
        if body.size_hint().exact() != Some(0) {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        request.send().await.map_err(|e| {
            if e.is_builder() {
                ProxyError::Forwarding(format!("Failed to build request to {}: {}", url, e))
            } else {
                ProxyError::UpstreamUnreachable(format!("{}: {}", url, e))
            }
        })
    }
}

/// Stream an upstream response to the client unchanged.
pub fn pass_through(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let stream = upstream
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
