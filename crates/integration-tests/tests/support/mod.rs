#![allow(dead_code)]

pub mod upstream;

use api_server::http::{AppState, build_router};
use shared::config::ProxyConfig;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const TEST_API_KEY: &str = "integration-test-gemini-key";

pub fn proxy_config(upstream_url: &str, api_key: Option<&str>) -> ProxyConfig {
    ProxyConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        gemini_api_key: api_key.map(str::to_string),
        gemini_api_url: upstream_url.to_string(),
    }
}

pub fn build_test_router(config: &ProxyConfig) -> axum::Router {
    build_router(AppState::from_config(config, reqwest::Client::new()))
}

/// A proxy router served on an ephemeral port.
pub struct RunningProxy {
    pub completion_url: String,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl RunningProxy {
    pub async fn start(config: &ProxyConfig) -> Self {
        let (base_url, shutdown_tx, server_task) = serve(build_test_router(config)).await;
        Self {
            completion_url: format!("{base_url}/api/completion"),
            shutdown_tx,
            server_task,
        }
    }

    pub async fn stop(self) {
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
    }
}

pub async fn serve(
    app: axum::Router,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}
