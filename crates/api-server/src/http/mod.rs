use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use shared::config::ProxyConfig;
use shared::llm::{CompletionBackend, GeminiGateway, GeminiGatewayConfig};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

mod completion;
mod errors;
mod health;

#[derive(Clone)]
pub struct AppState {
    /// `None` when the upstream credential is not configured; every completion
    /// request then answers with a configuration error.
    pub completion_backend: Option<Arc<dyn CompletionBackend>>,
}

impl AppState {
    pub fn from_config(config: &ProxyConfig, http_client: reqwest::Client) -> Self {
        let completion_backend = match GeminiGatewayConfig::from_proxy_config(config)
            .and_then(|gateway_config| GeminiGateway::new(http_client, gateway_config))
        {
            Ok(gateway) => Some(Arc::new(gateway) as Arc<dyn CompletionBackend>),
            Err(err) => {
                warn!("completion requests will fail until restarted: {err}");
                None
            }
        };

        Self { completion_backend }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/completion", post(completion::complete))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
