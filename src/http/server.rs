//! HTTP server hosting rate-limited routes.

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::middleware::{rate_limit, RateLimitState};
use crate::error::{Result, TollgateError};

/// Build the service router.
///
/// Every route except `/health` passes through the rate limiter.
pub fn router(state: RateLimitState) -> Router {
    Router::new()
        .route("/", get(|| async { "OK" }))
        .layer(from_fn_with_state(state, rate_limit))
        .route("/health", get(|| async { "healthy" }))
}

/// HTTP server for rate-limited routes.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Middleware state shared by all connections
    state: RateLimitState,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: RateLimitState) -> Self {
        Self { addr, state }
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let config = self.state.limiter().config();
        info!(
            addr = %self.addr,
            max_requests = config.max_requests,
            window_seconds = config.window_seconds,
            "Starting HTTP server"
        );

        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(error = %e, addr = %self.addr, "Failed to bind listener");
            TollgateError::Io(e)
        })?;

        let app = router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TollgateError::Io(e)
        })
    }
}
