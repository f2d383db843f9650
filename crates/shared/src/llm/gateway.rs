use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::messages::CompletionMessage;

pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Failed to get response from AI. Please check your connection and try again.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "No response from the model.";

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Server mis-configuration: {0} is missing.")]
    Configuration(String),
    #[error("{message}")]
    Upstream { message: String, status: u16 },
    #[error("No response from the model.")]
    EmptyResponse,
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Failed to get response from AI. Please check your connection and try again.")]
    Transport,
}

impl CompletionError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A single request/response exchange with a language model. Implemented by the
/// upstream provider gateway and by the client that talks to the proxy.
pub trait CompletionBackend: Send + Sync {
    fn complete<'a>(&'a self, messages: Vec<CompletionMessage>) -> CompletionFuture<'a>;
}
