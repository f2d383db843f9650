use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::assistant::{Assistant, AssistantError};
use shared::assistant_planner::DailyPlan;
use shared::config::ClientConfig;
use shared::llm::ProxyCompletionClient;
use shared::media::{BlobError, BlobReader};
use shared::storage::{FileStore, PersistentStore, StorageError};
use shared::voice::{SpeechOutcome, VoiceBridge, VoiceError};
use thiserror::Error;
use tracing::{info, warn};

use crate::cli::{Command, HistoryCommand};
use crate::speech::ProcessSpeechEngine;

const LISTED_RESPONSE_CHARS: usize = 120;
const VOICE_TEST_PHRASE: &str =
    "Hello! This is a test of the voice feature. I'm your AI assistant and I'm ready to help you.";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Voice(#[from] VoiceError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Everything a command may need: the assistant and the speech bridge it
/// shares with the voice commands.
pub struct Session {
    pub assistant: Assistant,
    pub voice: Arc<VoiceBridge>,
}

impl Session {
    /// Replies are spoken only when requested and synthesis is available.
    pub fn new(assistant: Assistant, voice: Arc<VoiceBridge>, speak_replies: bool) -> Self {
        let assistant = match (speak_replies, voice.is_synthesis_supported()) {
            (true, true) => assistant.with_voice(Arc::clone(&voice)),
            (true, false) => {
                warn!("speech synthesis is not available here; replies will only be printed");
                assistant
            }
            (false, _) => assistant,
        };

        Self { assistant, voice }
    }
}

pub fn build_session(config: &ClientConfig, speak: bool) -> Result<Session, StorageError> {
    let store = FileStore::open(&config.data_dir)?;
    let backend = ProxyCompletionClient::new(reqwest::Client::new(), config.proxy_url.clone());
    let assistant = Assistant::new(Arc::new(backend), PersistentStore::new(Arc::new(store)));
    let voice = VoiceBridge::new(Arc::new(ProcessSpeechEngine::from_config(config)));
    info!(
        data_dir = %config.data_dir.display(),
        proxy_url = %config.proxy_url,
        synthesis = voice.is_synthesis_supported(),
        recognition = voice.is_recognition_supported(),
        "assistant ready"
    );

    Ok(Session::new(
        assistant,
        Arc::new(voice),
        speak || config.speak_responses,
    ))
}

pub async fn run(
    command: Command,
    session: &Session,
    reader: &dyn BlobReader,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let assistant = &session.assistant;
    match command {
        Command::Chat { text, images } => {
            let mut inline_images = Vec::with_capacity(images.len());
            for path in &images {
                inline_images.push(reader.read_inline_image(path).await?);
            }
            let reply = assistant.chat(&text, inline_images).await?;
            writeln!(out, "{}", reply.content)?;
        }
        Command::Write { template, fields } => {
            let response = assistant.write(template, &fields).await?;
            writeln!(out, "{response}")?;
        }
        Command::Plan(request) => {
            let plan = assistant.plan(&request).await?;
            print_plan(&plan, out)?;
        }
        Command::Image { path, question } => {
            let image = reader.read_inline_image(&path).await?;
            let response = assistant.analyze_image(&image, &question).await?;
            writeln!(out, "{response}")?;
        }
        Command::Summarize { path } => {
            let text = reader.read_text(&path).await?;
            let response = assistant.summarize(&text).await?;
            writeln!(out, "{response}")?;
        }
        Command::AskDocument { path, question } => {
            let text = reader.read_text(&path).await?;
            let response = assistant.ask_document(&text, &question).await?;
            writeln!(out, "{response}")?;
        }
        Command::History(history) => run_history(history, assistant, out)?,
        Command::Listen { send_to_chat } => {
            let transcript = listen(&session.voice).await?;
            if send_to_chat {
                writeln!(out, "You said: {transcript}")?;
                let reply = assistant.chat(&transcript, Vec::new()).await?;
                writeln!(out, "{}", reply.content)?;
            } else {
                writeln!(out, "{transcript}")?;
            }
        }
        Command::VoiceTest => match session.voice.speak(VOICE_TEST_PHRASE).await? {
            SpeechOutcome::Finished => writeln!(out, "Voice test completed successfully.")?,
            SpeechOutcome::Superseded => writeln!(out, "Voice test was interrupted.")?,
        },
    }

    Ok(())
}

async fn listen(voice: &VoiceBridge) -> Result<String, VoiceError> {
    info!("listening, press Ctrl-C to stop");
    tokio::select! {
        transcript = voice.start_listening() => transcript,
        _ = tokio::signal::ctrl_c() => {
            voice.stop_listening();
            Err(VoiceError::ListeningStopped)
        }
    }
}

fn run_history(
    command: HistoryCommand,
    assistant: &Assistant,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let history = assistant.prompt_history();
    match command {
        HistoryCommand::List => {
            let entries = history.read_all();
            if entries.is_empty() {
                writeln!(out, "No history yet.")?;
            }
            for entry in entries {
                writeln!(
                    out,
                    "[{}] {} {}",
                    entry.kind.as_str(),
                    format_timestamp(entry.timestamp),
                    entry.prompt
                )?;
                writeln!(out, "  {}", preview(&entry.response))?;
            }
        }
        HistoryCommand::Stats => {
            let stats = history.stats();
            writeln!(out, "Entries: {}", stats.entries)?;
            writeln!(out, "Response characters: {}", stats.total_response_chars)?;
        }
        HistoryCommand::Export { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let path = history.export_to(&dir, Utc::now())?;
            writeln!(out, "Exported history to {}", path.display())?;
        }
        HistoryCommand::Clear => {
            assistant.clear_all_history()?;
            writeln!(out, "History cleared.")?;
        }
    }

    Ok(())
}

fn print_plan(plan: &DailyPlan, out: &mut dyn Write) -> std::io::Result<()> {
    for (index, task) in plan.tasks.iter().enumerate() {
        let priority = task.priority.as_str();
        if task.estimated_time.is_empty() {
            writeln!(out, "{}. [{priority}] {}", index + 1, task.title)?;
        } else {
            writeln!(
                out,
                "{}. [{priority}] {} ({})",
                index + 1,
                task.title,
                task.estimated_time
            )?;
        }
        if !task.description.is_empty() {
            writeln!(out, "   {}", task.description)?;
        }
    }

    if !plan.suggestions.is_empty() {
        if !plan.tasks.is_empty() {
            writeln!(out)?;
        }
        writeln!(out, "{}", plan.suggestions)?;
    }

    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn preview(response: &str) -> String {
    let flattened = response.split_whitespace().collect::<Vec<_>>().join(" ");
    match flattened.char_indices().nth(LISTED_RESPONSE_CHARS) {
        Some((index, _)) => format!("{}...", &flattened[..index]),
        None => flattened,
    }
}
