mod config;
mod controller;
mod errors;
mod feeds;
mod models;
mod server;
mod state;

use crate::feeds::quote_api::ChartQuoteClient;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("option pricer starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let quotes = ChartQuoteClient::new(
        &cfg.quote_api_base_url,
        std::time::Duration::from_secs(cfg.quote_timeout_secs),
        &cfg.quote_user_agent,
    );
    tracing::info!(base_url = %cfg.quote_api_base_url, "quote client ready");

    let app_state = AppState::new(&cfg.default_ticker, quotes);
    let app = server::router(app_state, "static");

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
