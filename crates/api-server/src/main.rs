use std::net::SocketAddr;

use api_server::http::{AppState, build_router};
use shared::config::ProxyConfig;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,axum=info,tower_http=info".to_string()),
        )
        .init();

    let config = match ProxyConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid PROXY_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let app = build_router(AppState::from_config(&config, reqwest::Client::new()));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "completion proxy listening on {}",
        listener.local_addr().unwrap_or(addr)
    );

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
    });

    if let Err(err) = server.await {
        error!("server stopped with error: {err}");
        std::process::exit(1);
    }
}
