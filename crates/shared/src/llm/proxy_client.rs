use tracing::{debug, warn};

use super::gateway::{CompletionBackend, CompletionError, CompletionFuture};
use super::messages::CompletionMessage;
use crate::models::{CompletionRequest, CompletionResponse, ErrorResponse};

pub const EMPTY_RESPONSE_CODE: &str = "empty_response";

/// Client side of the completion proxy: posts `{messages}` and reads `{text}`.
#[derive(Clone)]
pub struct ProxyCompletionClient {
    client: reqwest::Client,
    completion_url: String,
}

impl ProxyCompletionClient {
    pub fn new(client: reqwest::Client, completion_url: impl Into<String>) -> Self {
        Self {
            client,
            completion_url: completion_url.into(),
        }
    }

    pub fn completion_url(&self) -> &str {
        &self.completion_url
    }

    async fn send(&self, messages: Vec<CompletionMessage>) -> Result<String, CompletionError> {
        debug!(message_count = messages.len(), "posting completion request to proxy");

        let response = self
            .client
            .post(&self.completion_url)
            .json(&CompletionRequest { messages })
            .send()
            .await
            .map_err(|err| {
                warn!("completion proxy unreachable: {err}");
                CompletionError::Transport
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            warn!("completion proxy body could not be read: {err}");
            CompletionError::Transport
        })?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<ErrorResponse>(&body).ok();
            if parsed
                .as_ref()
                .and_then(|error| error.code.as_deref())
                .is_some_and(|code| code == EMPTY_RESPONSE_CODE)
            {
                return Err(CompletionError::EmptyResponse);
            }

            return Err(CompletionError::Upstream {
                message: parsed
                    .map(|error| error.error)
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| format!("Upstream error {}", status.as_u16())),
                status: status.as_u16(),
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|err| {
            warn!("completion proxy returned an unparseable body: {err}");
            CompletionError::Transport
        })?;

        if parsed.text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        Ok(parsed.text)
    }
}

impl CompletionBackend for ProxyCompletionClient {
    fn complete<'a>(&'a self, messages: Vec<CompletionMessage>) -> CompletionFuture<'a> {
        Box::pin(self.send(messages))
    }
}
