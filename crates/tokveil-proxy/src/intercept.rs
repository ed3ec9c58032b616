//! `Authorization` header inspection and handle substitution.
//!
//! A Basic credential marks the exchange as token-issuing so the response
//! can be rewritten. A Bearer credential is treated as an opaque handle and
//! swapped for the real token when the store knows it.

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use tokveil_cache::TokenStore;

use crate::error::{ProxyError, Result};

/// Parsed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential<'a> {
    /// Basic credentials presented to the token endpoint.
    Basic,
    /// A bearer credential. `scheme` keeps the client's spelling.
    Bearer { scheme: &'a str, handle: &'a str },
    /// Any other scheme.
    Other { scheme: &'a str },
}

impl<'a> Credential<'a> {
    /// Parse a header value of the form `<scheme> <credential>`.
    ///
    /// Exactly one space must separate the two parts.
    pub fn parse(value: &'a HeaderValue) -> Result<Self> {
        let value = value.to_str().map_err(|_| ProxyError::MalformedAuthHeader)?;

        let mut parts = value.split(' ');
        let (Some(scheme), Some(credential), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProxyError::MalformedAuthHeader);
        };

        Ok(if scheme.eq_ignore_ascii_case("basic") {
            Credential::Basic
        } else if scheme.eq_ignore_ascii_case("bearer") {
            Credential::Bearer {
                scheme,
                handle: credential,
            }
        } else {
            Credential::Other { scheme }
        })
    }
}

/// Outbound headers for a request, plus whether its response carries a new token.
#[derive(Debug, Clone)]
pub struct Interception {
    /// Headers to send upstream.
    pub headers: HeaderMap,
    /// The response should have its `access_token` replaced by a handle.
    pub awaits_token: bool,
}

/// Inspect inbound headers and build the outbound header set.
///
/// The inbound map is left untouched. A missing or empty `Authorization`
/// header passes through as is. A known handle is redeemed, which
/// also extends its record's expiry. Unknown handles go upstream as sent.
pub fn intercept(inbound: &HeaderMap, store: &TokenStore) -> Result<Interception> {
    let mut interception = Interception {
        headers: inbound.clone(),
        awaits_token: false,
    };

    // An empty header counts as absent.
    let Some(value) = inbound.get(AUTHORIZATION).filter(|v| !v.is_empty()) else {
        return Ok(interception);
    };

    match Credential::parse(value)? {
        Credential::Basic => {
            interception.awaits_token = true;
        }
        Credential::Bearer { scheme, handle } => match store.redeem(handle) {
            Some(real_token) => {
                let mut value = HeaderValue::from_str(&format!("{} {}", scheme, real_token))
                    .map_err(|_| {
                        ProxyError::Forwarding("cached token is not a valid header value".into())
                    })?;
                value.set_sensitive(true);
                interception.headers.insert(AUTHORIZATION, value);
                tracing::debug!("Substituted cached token for bearer handle");
            }
            None => {
                tracing::warn!("Bearer handle has no cached token, forwarding unchanged");
            }
        },
        Credential::Other { scheme } => {
            tracing::debug!(scheme, "Unhandled auth scheme, forwarding unchanged");
        }
    }

    Ok(interception)
}
