//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Opens the configured record store and seeds the first admin
//! - Starts the HTTP server with graceful shutdown support

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dynaqr::config::Config;
use dynaqr::handler::user::bootstrap_admin;
use dynaqr::route::create_app;
use dynaqr::state::AppState;
use dynaqr::store::Store;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dynaqr=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load().expect("Invalid configuration");
    let port = config.port;

    let store = Store::open(&config.storage).expect("Failed to open record store");
    let state = AppState::new(config, store);

    match bootstrap_admin(&state).await {
        Ok(true) => tracing::info!("bootstrap admin account created"),
        Ok(false) => {}
        Err(err) => tracing::error!(error = %err, "could not create bootstrap admin"),
    }

    let app = create_app(state.clone()).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");

    tracing::info!(
        %addr,
        backend = state.store.backend_name(),
        public_base_url = %state.config.public_base_url,
        "server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Lets in-flight requests finish and closes the store cleanly instead of
/// dropping the process mid-write.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping server");
}
