// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly Wrapped Server
//!
//! Serves the Spotify sign-in flow and runs the weekly batch that stores
//! each registered user's top artists and songs.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weekly_wrapped::{
    config::Config,
    services::{schedule, BatchRefresher, WeeklySchedule},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Weekly Wrapped");

    let weekly = WeeklySchedule::new(config.batch_weekday, config.batch_hour)
        .expect("Invalid batch schedule");

    // Open the credential store and wire services
    let state = Arc::new(AppState::from_config(config.clone()).expect("Failed to initialize services"));
    tracing::info!(database = %config.database_url, "Credential store opened");

    // Weekly batch shares only the store with the HTTP side
    let batch = Arc::new(BatchRefresher::new(
        state.store.clone(),
        state.lifecycle.clone(),
        state.spotify.clone(),
        config.batch_concurrency,
    ));
    let scheduler = tokio::spawn(schedule::run_weekly(batch, weekly));

    // Build router
    let app = weekly_wrapped::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weekly_wrapped=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
