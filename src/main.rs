use std::net::SocketAddr;

use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info, warn};

use civictrack::config::Config;
use civictrack::state::AppState;
use civictrack::web;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    // Auth settings are mandatory; nothing works without them.
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Connecting to database: {}", config.database_url);
    let pool = match SqlitePoolOptions::new().connect(&config.database_url).await {
        Ok(p) => p,
        Err(e) => {
            error!("Cannot connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let host = config.host.clone();
    let port = config.port;

    let state = match AppState::new(pool, config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Cannot prepare database schema: {}", e);
            std::process::exit(1);
        }
    };

    let app = web::app(state);

    let listener = match bind(&host, port).await {
        Ok(l) => l,
        Err(e) => {
            warn!("⚠️  Could not bind {}:{}: {}. Trying {}:{}", host, port, e, host, port.saturating_add(1));
            match bind(&host, port.saturating_add(1)).await {
                Ok(l) => l,
                Err(e) => {
                    error!("Cannot bind fallback port: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    if let Ok(addr) = listener.local_addr() {
        info!("🚀 CivicTrack running on http://{}", addr);
        info!("📍 Open http://{}/login to start", addr);
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn bind(host: &str, port: u16) -> std::io::Result<tokio::net::TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    tokio::net::TcpListener::bind(addr).await
}
