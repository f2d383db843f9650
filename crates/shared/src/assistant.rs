//! Tool orchestration: builds completion requests for each tool, records
//! successful exchanges in history and optionally reads replies aloud.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::assistant_planner::{
    DailyPlan, parse_plan_response, spoken_plan_summary, truncate_chars,
};
use crate::llm::prompts::{document_question_prompt, summary_prompt};
use crate::llm::{
    CompletionBackend, CompletionError, CompletionMessage, Part, PlanRequest, WriteTemplateId,
    write_template,
};
use crate::media::InlineImage;
use crate::models::{ChatMessage, ChatRole, NewPromptEntry, PromptKind};
use crate::storage::{ChatHistory, PersistentStore, PromptHistoryLog, StorageError};
use crate::voice::VoiceBridge;

/// Most recent chat messages sent as context with each turn.
pub const CHAT_CONTEXT_WINDOW: usize = 10;
pub const MAX_IMAGES_PER_MESSAGE: usize = 5;

const DOCUMENT_LABEL_CHARS: usize = 100;
const SPOKEN_DOCUMENT_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Enter a message or attach an image first")]
    EmptyInput,
    #[error("Please provide {0}")]
    MissingInput(&'static str),
    #[error("Please fill in: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("failed to save history: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct Assistant {
    backend: Arc<dyn CompletionBackend>,
    prompt_history: PromptHistoryLog,
    chat_history: ChatHistory,
    voice: Option<Arc<VoiceBridge>>,
}

impl Assistant {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: PersistentStore) -> Self {
        Self {
            backend,
            prompt_history: PromptHistoryLog::new(store.clone()),
            chat_history: ChatHistory::new(store),
            voice: None,
        }
    }

    /// Replies are spoken through `voice` after every successful tool call.
    pub fn with_voice(mut self, voice: Arc<VoiceBridge>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn prompt_history(&self) -> &PromptHistoryLog {
        &self.prompt_history
    }

    pub fn chat_history(&self) -> &ChatHistory {
        &self.chat_history
    }

    pub fn speaks_replies(&self) -> bool {
        self.voice.is_some()
    }

    pub async fn chat(
        &self,
        text: &str,
        images: Vec<InlineImage>,
    ) -> Result<ChatMessage, AssistantError> {
        if text.trim().is_empty() && images.is_empty() {
            return Err(AssistantError::EmptyInput);
        }

        let images = images
            .into_iter()
            .take(MAX_IMAGES_PER_MESSAGE)
            .collect::<Vec<_>>();
        let previous = self.chat_history.read_all();
        let sent_at = next_timestamp(previous.last().map(|message| message.timestamp));
        let user_message = ChatMessage {
            id: sent_at.to_string(),
            role: ChatRole::User,
            content: text.to_string(),
            timestamp: sent_at,
            images: (!images.is_empty())
                .then(|| images.iter().map(|image| image.source.clone()).collect()),
        };

        let mut transcript = previous.clone();
        transcript.push(user_message.clone());

        let response = self
            .backend
            .complete(build_chat_request(&transcript, &images))
            .await?;

        let replied_at = next_timestamp(Some(sent_at));
        let assistant_message = ChatMessage {
            id: replied_at.to_string(),
            role: ChatRole::Assistant,
            content: response.clone(),
            timestamp: replied_at,
            images: None,
        };
        transcript.push(assistant_message.clone());

        self.chat_history.save(&transcript)?;
        if let Err(err) = self.prompt_history.append(NewPromptEntry::new(
            PromptKind::Chat,
            user_message.content,
            response.clone(),
        )) {
            if let Err(rollback_err) = self.chat_history.save(&previous) {
                warn!("could not roll back chat history: {rollback_err}");
            }
            return Err(err.into());
        }
        info!(messages = transcript.len(), "chat turn completed");

        self.speak(&response).await;
        Ok(assistant_message)
    }

    pub async fn write(
        &self,
        template_id: WriteTemplateId,
        fields: &HashMap<String, String>,
    ) -> Result<String, AssistantError> {
        let template = write_template(template_id);
        let missing = template.missing_fields(fields);
        if !missing.is_empty() {
            return Err(AssistantError::MissingFields(missing));
        }

        let prompt = template.render(fields);
        let label = format!("{}: {prompt}", template.name);
        let response = self
            .complete_and_record(
                vec![CompletionMessage::user_text(prompt)],
                PromptKind::Write,
                label,
            )
            .await?;

        self.speak(&response).await;
        Ok(response)
    }

    pub async fn plan(&self, request: &PlanRequest) -> Result<DailyPlan, AssistantError> {
        if request.goals.trim().is_empty() {
            return Err(AssistantError::MissingInput("your goals for the day"));
        }

        let response = self
            .complete_and_record(
                vec![CompletionMessage::user_text(request.prompt())],
                PromptKind::Planner,
                format!("Daily Plan: {}", request.goals),
            )
            .await?;

        let plan = parse_plan_response(&response);
        self.speak(&spoken_plan_summary(&plan)).await;
        Ok(plan)
    }

    pub async fn analyze_image(
        &self,
        image: &InlineImage,
        question: &str,
    ) -> Result<String, AssistantError> {
        if question.trim().is_empty() {
            return Err(AssistantError::MissingInput("a question about the image"));
        }

        let response = self
            .complete_and_record(
                vec![CompletionMessage::user(vec![
                    Part::text(question),
                    image.to_part(),
                ])],
                PromptKind::Image,
                format!("Image Analysis: {question}"),
            )
            .await?;

        self.speak(&response).await;
        Ok(response)
    }

    pub async fn summarize(&self, text: &str) -> Result<String, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::MissingInput("text to summarize"));
        }

        let response = self
            .complete_and_record(
                vec![CompletionMessage::user_text(summary_prompt(text))],
                PromptKind::Docs,
                format!(
                    "Document Summary: {}...",
                    truncate_chars(text, DOCUMENT_LABEL_CHARS)
                ),
            )
            .await?;

        self.speak(&spoken_excerpt(&response)).await;
        Ok(response)
    }

    pub async fn ask_document(&self, text: &str, question: &str) -> Result<String, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::MissingInput("the document text"));
        }
        if question.trim().is_empty() {
            return Err(AssistantError::MissingInput("a question about the document"));
        }

        let response = self
            .complete_and_record(
                vec![CompletionMessage::user_text(document_question_prompt(
                    text, question,
                ))],
                PromptKind::Docs,
                format!("Document Q&A: {question}"),
            )
            .await?;

        self.speak(&response).await;
        Ok(response)
    }

    pub fn clear_all_history(&self) -> Result<(), StorageError> {
        self.prompt_history.clear()?;
        self.chat_history.clear()
    }

    async fn complete_and_record(
        &self,
        messages: Vec<CompletionMessage>,
        kind: PromptKind,
        label: String,
    ) -> Result<String, AssistantError> {
        let response = self.backend.complete(messages).await?;
        self.prompt_history
            .append(NewPromptEntry::new(kind, label, response.clone()))?;
        info!(kind = kind.as_str(), "tool request completed");
        Ok(response)
    }

    async fn speak(&self, text: &str) {
        let Some(voice) = &self.voice else {
            return;
        };

        if let Err(err) = voice.speak(text).await {
            warn!("could not speak response: {err}");
        }
    }
}

/// Maps the tail of the transcript onto provider messages. Only the newest
/// message carries image data; earlier image references are not re-sent.
pub fn build_chat_request(
    transcript: &[ChatMessage],
    current_images: &[InlineImage],
) -> Vec<CompletionMessage> {
    let window_start = transcript.len().saturating_sub(CHAT_CONTEXT_WINDOW);
    let last_index = transcript.len().saturating_sub(1);

    transcript[window_start..]
        .iter()
        .enumerate()
        .filter_map(|(offset, message)| match message.role {
            ChatRole::Assistant => Some(CompletionMessage::model_text(message.content.clone())),
            ChatRole::User => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(Part::text(message.content.clone()));
                }
                if window_start + offset == last_index {
                    parts.extend(current_images.iter().map(InlineImage::to_part));
                }
                (!parts.is_empty()).then(|| CompletionMessage::user(parts))
            }
        })
        .collect()
}

/// Current time in epoch millis, kept strictly after `after` so message ids
/// stay unique and ordered.
fn next_timestamp(after: Option<i64>) -> i64 {
    let now = Utc::now().timestamp_millis();
    after.map_or(now, |after| now.max(after + 1))
}

fn spoken_excerpt(text: &str) -> String {
    let excerpt = truncate_chars(text, SPOKEN_DOCUMENT_CHARS);
    if excerpt.len() < text.len() {
        format!("{excerpt}...")
    } else {
        excerpt.to_string()
    }
}
