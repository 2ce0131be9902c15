//! RSVP Server - Main entry point.
//!
//! This binary starts the RSVP API server with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`rsvp_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Development mode (volatile in-memory store)
//! RSVP_ADMIN_TOKEN=admin RSVP_USER_TOKEN=user cargo run --bin rsvp-server
//!
//! # Production mode
//! RSVP_ADMIN_TOKEN="..." \
//! RSVP_USER_TOKEN="..." \
//! RSVP_STORE_URL="http://kv.internal:9000" \
//! PORT=8080 \
//! cargo run --release --bin rsvp-server
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use rsvp_server::config::Config;
use rsvp_server::routes::{create_router, AppState};
use rsvp_server::store::{HttpKvStore, KvStore, MemoryStore};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    init_logging();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Required environment variables:");
            eprintln!("  RSVP_ADMIN_TOKEN - Shared secret for the admin role");
            eprintln!("  RSVP_USER_TOKEN  - Shared secret for the user role");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  RSVP_STORE_URL   - Key-value store base URL (in-memory if unset)");
            eprintln!("  RSVP_STORE_TOKEN - Bearer token for the store service");
            eprintln!("  PORT             - HTTP server port (default: 8080)");
            eprintln!("  RUST_LOG         - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    // Build the store backend
    let store: Arc<dyn KvStore> = match &config.store_url {
        Some(url) => {
            let store = match HttpKvStore::new(url.clone(), config.store_token.clone()) {
                Ok(store) => store,
                Err(err) => {
                    error!(error = %err, "Failed to create store client");
                    return ExitCode::from(1);
                }
            };
            info!(store_url = %store.base_url(), "Using HTTP key-value store");
            Arc::new(store)
        }
        None => {
            warn!(
                "RSVP_STORE_URL is not set - using a volatile in-memory store. \
                 Data will not survive a restart!"
            );
            Arc::new(MemoryStore::new())
        }
    };

    info!(port = config.port, "RSVP server starting");

    // Create application state and router
    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    // Bind to address
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    // Start server with graceful shutdown
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// Configures JSON-formatted output with environment-based log level
/// filtering via RUST_LOG and a default level of `info`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Creates a future that resolves when a shutdown signal is received.
///
/// Listens for:
/// - SIGTERM (container orchestrator shutdown)
/// - SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
