//! The REST API server for giftledger.

use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use giftledger::{AppState, Config, build_router, graceful_shutdown};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let connection =
        Connection::open(&config.db_path).expect("Could not open the database file.");
    let state =
        AppState::new(connection, &config).expect("Could not initialize the application.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    tracing::info!("HTTP server listening on {}", config.address);
    axum_server::bind(config.address)
        .handle(handle)
        .serve(build_router(state).into_make_service())
        .await
        .expect("The server failed to start.");
}
