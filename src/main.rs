//! Process entry point: loads configuration, wires the application state,
//! and serves the HTTP surface.

use kortix_gateway::config::Config;
use kortix_gateway::{build_router, build_state};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    log::info!("starting kortix-gateway in {} mode on port {}", config.env_mode.as_str(), config.port);

    if config.api_key_secret.is_none() {
        log::warn!("API_KEY_SECRET is unset; credential-backed auth is disabled, only the test token and legacy fallback apply");
    }

    let state = build_state(&config);
    let router = build_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap_or_else(|e| panic!("failed to bind port {}: {e}", config.port));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server loop exited unexpectedly");
}

/// Waits for `SIGINT`/`SIGTERM` so in-flight streaming responses are
/// allowed to drain instead of being cut off mid-stream.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining in-flight requests");
}
