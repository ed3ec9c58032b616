//! Reverse proxy that keeps OAuth access tokens away from clients.
//!
//! Responses to Basic-authenticated token requests have their
//! `access_token` replaced by an opaque handle. Later requests presenting
//! that handle as a Bearer credential are forwarded with the real token.
//!
//! # Components
//!
//! - [`intercept`]: `Authorization` parsing and handle substitution
//! - [`rewrite`]: token response rewriting
//! - [`forward`]: upstream forwarding and pass-through responses
//! - [`middleware`]: IP allow-list, request printing, request logging
//! - [`proxy`]: Axum server

pub mod config;
pub mod error;
pub mod forward;
pub mod intercept;
pub mod middleware;
pub mod print;
pub mod proxy;
pub mod rewrite;
pub mod state;

pub use config::{DEFAULT_MAX_BODY_SIZE, DEFAULT_UPSTREAM, ProxyConfig};
pub use error::{ErrorResponse, ProxyError, Result};
pub use forward::Forwarder;
pub use intercept::{Credential, Interception, intercept};
pub use print::PrintLevel;
pub use proxy::ProxyServer;
pub use rewrite::{rewrite_token_body, rewrite_token_response};
pub use state::ProxyState;
