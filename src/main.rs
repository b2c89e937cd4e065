use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use poddo_bot::api::{self, AppState};
use poddo_bot::config::Config;
use poddo_bot::db::Database;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    if config.token.is_none() {
        tracing::warn!("DISCORD_BOT_TOKEN is not set; the gateway host will not be able to connect");
    }

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    let port = config.port;
    let state = AppState::new(db, config);
    let app = api::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {port}: {e}"));

    state.mark_ready();
    let banner = "-".repeat(25);
    tracing::info!(
        "\n{banner}\nBot Ready!\n{} v{} ({})\nCurrent Prefix: {}\nListening on port {port}\n{banner}",
        state.config.bot_name,
        state.config.version,
        state.config.environment,
        state.config.prefix,
    );

    let shutdown = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown.shutdown_requested() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            tracing::info!("Shutting down");
        })
        .await
        .expect("Failed to start server");
}
