use std::net::SocketAddr;

use anyhow::Context;
use tracing::{Level, info};

use rollcall_server::config::AppConfig;
use rollcall_server::state::AppState;
use rollcall_server::{build_router, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    if config.checkin.token_secret.is_none() {
        info!("checkin.token_secret is not set, QR payloads are unsigned session ids");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;
    let app = build_router(AppState::new(db, config));

    info!("Server running at http://{}", addr);
    info!("API reference at http://{}/scalar", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
