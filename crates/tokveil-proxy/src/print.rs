//! Request printing for debugging traffic through the proxy.
//!
//! Levels:
//! - `0` nothing
//! - `1` request line, host and headers (`Authorization` cut short)
//! - `2` also the client IP
//! - `3` also the request body

use std::borrow::Cow;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, header::AUTHORIZATION},
};

use crate::error::{ProxyError, Result};
use crate::middleware::client_ip;

/// Header values are shown up to this many characters.
const VALUE_CUTOFF: usize = 40;

/// `Authorization` values at [`PrintLevel::Headers`] are cut to this.
const AUTH_VALUE_CUTOFF: usize = 10;

/// Values up to this many characters past the cutoff are shown whole.
const CUTOFF_SLACK: usize = 5;

/// How much of each request is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrintLevel {
    #[default]
    Off = 0,
    Headers = 1,
    ClientIp = 2,
    Body = 3,
}

impl PrintLevel {
    pub fn is_enabled(self) -> bool {
        self > PrintLevel::Off
    }

    pub fn shows_client_ip(self) -> bool {
        self >= PrintLevel::ClientIp
    }

    pub fn shows_body(self) -> bool {
        self >= PrintLevel::Body
    }

    /// Cutoff applied to values of header `name`.
    pub fn cutoff_for(self, name: &HeaderName) -> usize {
        if *name == AUTHORIZATION && !self.shows_client_ip() {
            AUTH_VALUE_CUTOFF
        } else {
            VALUE_CUTOFF
        }
    }
}

impl TryFrom<u8> for PrintLevel {
    type Error = ProxyError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(PrintLevel::Off),
            1 => Ok(PrintLevel::Headers),
            2 => Ok(PrintLevel::ClientIp),
            3 => Ok(PrintLevel::Body),
            other => Err(ProxyError::Config(format!(
                "print level must be between 0 and 3, got {}",
                other
            ))),
        }
    }
}

/// Shorten `value` to `cutoff` characters when it runs more than a few past it.
pub fn truncate_value(value: &str, cutoff: usize) -> Cow<'_, str> {
    let len = value.chars().count();
    if len <= cutoff + CUTOFF_SLACK {
        return Cow::Borrowed(value);
    }

    let head: String = value.chars().take(cutoff).collect();
    Cow::Owned(format!("{}... ({} more)", head, len - cutoff))
}

/// Render the request line, host and headers.
pub fn format_request_head(request: &Request, level: PrintLevel) -> Vec<String> {
    let mut lines = Vec::new();

    if level.shows_client_ip() {
        lines.push(format!(
            "client: {}",
            client_ip(request).unwrap_or_else(|| "unknown".to_string())
        ));
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    lines.push(format!(
        "{} {} {:?}",
        request.method(),
        target,
        request.version()
    ));

    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();
    lines.push(format!("Host: {}", host));

    for (name, value) in request.headers() {
        let value = String::from_utf8_lossy(value.as_bytes());
        lines.push(format!(
            "{}: {}",
            name,
            truncate_value(&value, level.cutoff_for(name))
        ));
    }

    lines
}

/// Print `request` at `level` and hand it back ready for forwarding.
///
/// At [`PrintLevel::Body`] the body is buffered (at most `max_body_size`
/// bytes) and re-attached.
pub async fn print_request(
    request: Request,
    level: PrintLevel,
    max_body_size: usize,
) -> Result<Request> {
    if !level.is_enabled() {
        return Ok(request);
    }

    let head = format_request_head(&request, level).join("\n");
    tracing::info!(target: "tokveil::request", "{}", head);

    if !level.shows_body() {
        return Ok(request);
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| ProxyError::RequestBody(e.to_string()))?;
    if !bytes.is_empty() {
        tracing::info!(target: "tokveil::request", "Body: {}", String::from_utf8_lossy(&bytes));
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}
