//! axum middleware that applies the rate limiter to every request.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error};

use super::headers::apply_quota_headers;
use crate::ratelimit::{ClientKey, RateLimiter};

/// Shared state for [`rate_limit`].
#[derive(Clone)]
pub struct RateLimitState {
    /// The limiter shared by all request handlers
    limiter: Arc<RateLimiter>,
    /// Whether `X-Forwarded-For` identifies the client
    trust_forwarded_for: bool,
}

impl RateLimitState {
    /// Create middleware state keyed on the peer address.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            trust_forwarded_for: false,
        }
    }

    /// Key clients on the first `X-Forwarded-For` entry when present.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// The limiter behind this middleware.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

/// Rate-limiting middleware.
///
/// Over-quota requests get 429 and never reach the inner service. A store
/// failure gets 500: the limiter fails closed. Allowed responses carry the
/// `X-RateLimit-*` headers.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request, state.trust_forwarded_for);

    match state.limiter.check(&client).await {
        Ok(decision) if decision.is_allowed() => {
            let mut response = next.run(request).await;
            apply_quota_headers(response.headers_mut(), &decision.status);
            response
        }
        Ok(decision) => {
            debug!(client = %client, count = decision.count, "Rejecting request over quota");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "message": "Rate limit exceeded" })),
            )
                .into_response()
        }
        Err(e) => {
            error!(client = %client, error = %e, "Rate limit check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

/// Derive the client key for a request.
fn client_key(request: &Request, trust_forwarded_for: bool) -> ClientKey {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_ip(request) {
            return ClientKey::from_ip(ip);
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientKey::from_ip(addr.ip()))
        .unwrap_or_else(ClientKey::unknown)
}

/// The leftmost `X-Forwarded-For` address, if it parses.
fn forwarded_ip(request: &Request) -> Option<IpAddr> {
    request
        .headers()
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
