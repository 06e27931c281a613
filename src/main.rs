use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::{LoggingConfig, TollgateConfig};
use tollgate::http::{HttpServer, RateLimitState};
use tollgate::ratelimit::{LimiterConfig, MemoryStore, RateLimiter, ResetStrategy};

/// Fixed-window rate limiting HTTP service.
#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Requests allowed per client per window
    #[arg(long)]
    max_requests: Option<u64>,

    /// Window length in seconds
    #[arg(long)]
    window_seconds: Option<u64>,

    /// Report seconds left in the window instead of the window length
    #[arg(long)]
    reset_remaining: bool,

    /// Key clients on the first X-Forwarded-For address
    #[arg(long)]
    trust_forwarded_for: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut TollgateConfig) {
        if let Some(listen) = self.listen {
            config.server.listen_addr = listen;
        }
        if let Some(max_requests) = self.max_requests {
            config.rate_limiting.max_requests = max_requests;
        }
        if let Some(window_seconds) = self.window_seconds {
            config.rate_limiting.window_seconds = window_seconds;
        }
        if self.reset_remaining {
            config.rate_limiting.reset_strategy = ResetStrategy::Remaining;
        }
        if self.trust_forwarded_for {
            config.server.trust_forwarded_for = true;
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TollgateConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging);

    info!("Starting Tollgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    log_config(cli.config.as_deref(), &config);

    let store = Arc::new(MemoryStore::new());
    let sweeper = (config.store.sweep_interval_secs > 0).then(|| {
        store.clone().spawn_sweeper(
            Duration::from_secs(config.store.sweep_interval_secs),
            config.store.eviction_grace_secs,
        )
    });

    let rate_limiter = Arc::new(RateLimiter::new(
        store,
        LimiterConfig::from(&config.rate_limiting),
    )?);
    info!("Rate limiter initialized");

    let state = RateLimitState::new(rate_limiter)
        .trust_forwarded_for(config.server.trust_forwarded_for);

    // Run the server with graceful shutdown on Ctrl+C
    HttpServer::new(config.server.listen_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("Tollgate Rate Limiting Service stopped");
    Ok(())
}

/// Report where the configuration came from and what it resolved to.
/// Call only once the subscriber is installed.
fn log_config(path: Option<&Path>, config: &TollgateConfig) {
    if let Some(path) = path {
        info!(path = %path.display(), "Loaded configuration file");
    }
    info!(
        listen_addr = %config.server.listen_addr,
        max_requests = config.rate_limiting.max_requests,
        window_seconds = config.rate_limiting.window_seconds,
        "Configuration loaded"
    );
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
