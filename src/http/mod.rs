//! HTTP integration: middleware, response headers and the server.

mod headers;
mod middleware;
mod server;

pub use headers::{apply_quota_headers, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
pub use middleware::{rate_limit, RateLimitState};
pub use server::{router, HttpServer};
