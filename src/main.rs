use std::net::SocketAddr;

use oasis_api::config::{config, AppConfig};
use oasis_api::{app, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, SUPABASE_*, etc.
    let _ = dotenvy::dotenv();

    let config = config();
    init_tracing(config);
    tracing::info!("Starting OASIS API in {:?} mode", config.environment);

    let state = match AppState::from_config(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("OASIS API listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Human-readable logs in development, JSON lines everywhere else
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oasis_api=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.is_production_like() {
        builder.json().init();
    } else {
        builder.init();
    }
}
