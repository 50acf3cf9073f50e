//! Runtime - zero-boilerplate startup for a JALKI-instrumented service
//!
//! [`run`] wires the whole propagation stack around a user-supplied router:
//! config from env, tracing init, bridge installation, the session filter at
//! the edge, graceful shutdown, bridge removal. The bridge is installed
//! before the listener binds and removed only after the server has stopped,
//! so no request is ever served without diagnostic propagation.
//!
//! # Quick start
//!
//! ```ignore
//! use axum::{Router, routing::get};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     jalki_web::run(Router::new().route("/", get(|| async { "Ok" }))).await
//! }
//! ```

use crate::config::{Config, LogFormat};
use crate::filter::SessionFilterLayer;
use crate::layer::DiagnosticLayer;
use axum::Router;
use jalki_pipeline::bridge;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run a router with session propagation and default settings
///
/// Blocks until SIGINT/SIGTERM.
pub async fn run(app: Router) -> anyhow::Result<()> {
    RuntimeBuilder::new().serve(app).await
}

/// Power-user builder for controlling runtime behaviour
///
/// ```ignore
/// RuntimeBuilder::new()
///     .http_addr("127.0.0.1:3000".parse()?)
///     .serve(app)
///     .await
/// ```
pub struct RuntimeBuilder {
    http_addr: Option<SocketAddr>,
    init_tracing: bool,
}

impl RuntimeBuilder {
    /// Create a builder with defaults from environment variables
    pub fn new() -> Self {
        Self {
            http_addr: None,
            init_tracing: true,
        }
    }

    /// Override the HTTP listen address
    ///
    /// Default: loaded from `JALKI_HTTP_ADDR`, or `0.0.0.0:8080`.
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = Some(addr);
        self
    }

    /// Skip tracing initialisation
    ///
    /// For embedders that already installed a global subscriber.
    pub fn skip_tracing_init(mut self) -> Self {
        self.init_tracing = false;
        self
    }

    /// Serve the router to completion
    ///
    /// This is the terminal method - it blocks until shutdown.
    pub async fn serve(self, app: Router) -> anyhow::Result<()> {
        let config = Config::from_env()?;

        if self.init_tracing {
            init_tracing(&config);
        }

        // The bridge must be live before any request can be accepted
        bridge::install();

        let app = app.layer(SessionFilterLayer::with_header(
            config.session_header.clone(),
        ));

        let addr = self.http_addr.unwrap_or(config.http_addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, session_header = %config.session_header, "JALKI listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // No residual interception after shutdown
        bridge::uninstall();
        info!("JALKI shutdown complete");

        Ok(())
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialise the tracing subscriber based on config
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry.with(DiagnosticLayer::stdout()).init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
