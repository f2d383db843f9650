pub mod gateway;
pub mod gemini;
pub mod messages;
pub mod prompts;
pub mod proxy_client;

pub use gateway::{
    CompletionBackend, CompletionError, CompletionFuture, EMPTY_RESPONSE_MESSAGE,
    TRANSPORT_FAILURE_MESSAGE,
};
pub use gemini::{GeminiGateway, GeminiGatewayConfig, GenerationConfig};
pub use messages::{CompletionMessage, CompletionRole, InlineData, Part};
pub use prompts::{PlanRequest, WriteTemplate, WriteTemplateId, write_template};
pub use proxy_client::{EMPTY_RESPONSE_CODE, ProxyCompletionClient};
