use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use portal_backend::config::{get_config, init_config};
use portal_backend::routes::app_router;
use portal_backend::services::notification_service::SmtpMailer;
use portal_backend::storage::PgStore;
use portal_backend::AppState;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let store = Arc::new(PgStore::connect().await?);
    let mailer = Arc::new(SmtpMailer::from_config(config)?);
    let app_state = AppState::new(
        store.clone(),
        store,
        mailer,
        config.mail_from.clone(),
        Duration::from_millis(config.email_retry_delay_ms),
    );

    let app = app_router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
