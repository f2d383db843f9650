use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::gateway::{CompletionBackend, CompletionError, CompletionFuture};
use super::messages::CompletionMessage;
use crate::config::{GEMINI_API_KEY_VAR, ProxyConfig};

/// Sampling parameters sent with every upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiGatewayConfig {
    pub api_url: String,
    pub api_key: String,
    pub generation: GenerationConfig,
}

impl GeminiGatewayConfig {
    pub fn from_proxy_config(config: &ProxyConfig) -> Result<Self, CompletionError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| CompletionError::Configuration(GEMINI_API_KEY_VAR.to_string()))?;

        Ok(Self {
            api_url: config.gemini_api_url.clone(),
            api_key,
            generation: GenerationConfig::default(),
        })
    }
}

#[derive(Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    endpoint: Url,
    generation: GenerationConfig,
}

impl GeminiGateway {
    pub fn new(
        client: reqwest::Client,
        config: GeminiGatewayConfig,
    ) -> Result<Self, CompletionError> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionError::Configuration(GEMINI_API_KEY_VAR.to_string()));
        }

        let mut endpoint = Url::parse(&config.api_url)
            .map_err(|_| CompletionError::Configuration("GEMINI_API_URL".to_string()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("key", config.api_key.trim());

        Ok(Self {
            client,
            endpoint,
            generation: config.generation,
        })
    }

    async fn send(&self, messages: Vec<CompletionMessage>) -> Result<String, CompletionError> {
        let request_body = GenerateContentRequest {
            contents: messages,
            generation_config: self.generation,
        };
        debug!(
            message_count = request_body.contents.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                warn!("gemini request failed before a response: {}", err.without_url());
                CompletionError::Transport
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            warn!("gemini response body could not be read: {}", err.without_url());
            CompletionError::Transport
        })?;

        if !status.is_success() {
            return Err(CompletionError::Upstream {
                message: parse_provider_error_message(&body)
                    .unwrap_or_else(|| format!("Upstream error {}", status.as_u16())),
                status: status.as_u16(),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|_| {
            CompletionError::InvalidPayload("response_json_parse_failed".to_string())
        })?;

        first_candidate_text(parsed).ok_or(CompletionError::EmptyResponse)
    }
}

impl CompletionBackend for GeminiGateway {
    fn complete<'a>(&'a self, messages: Vec<CompletionMessage>) -> CompletionFuture<'a> {
        Box::pin(self.send(messages))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<CompletionMessage>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.text)
}

fn parse_provider_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        message: Option<String>,
    }

    serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|message| !message.trim().is_empty())
}
