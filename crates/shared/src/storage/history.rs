use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{PersistentStore, StorageError};
use crate::models::{ChatMessage, NewPromptEntry, PromptHistoryEntry};

pub const PROMPT_HISTORY_KEY: &str = "prompt-history";
pub const CHAT_HISTORY_KEY: &str = "chat-history";
pub const PROMPT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub entries: usize,
    pub total_response_chars: usize,
}

/// Newest-first log of completed requests, capped at
/// [`PROMPT_HISTORY_CAPACITY`] entries.
#[derive(Clone)]
pub struct PromptHistoryLog {
    store: PersistentStore,
}

impl PromptHistoryLog {
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    pub fn read_all(&self) -> Vec<PromptHistoryEntry> {
        self.store.load(PROMPT_HISTORY_KEY, Vec::new())
    }

    pub fn append(&self, entry: NewPromptEntry) -> Result<PromptHistoryEntry, StorageError> {
        self.append_at(entry, Utc::now())
    }

    pub fn append_at(
        &self,
        entry: NewPromptEntry,
        now: DateTime<Utc>,
    ) -> Result<PromptHistoryEntry, StorageError> {
        let millis = now.timestamp_millis();
        let stored = PromptHistoryEntry {
            id: millis.to_string(),
            prompt: entry.prompt,
            response: entry.response,
            timestamp: millis,
            kind: entry.kind,
        };

        let mut history = self.read_all();
        history.insert(0, stored.clone());
        history.truncate(PROMPT_HISTORY_CAPACITY);
        self.store.save(PROMPT_HISTORY_KEY, &history)?;

        debug!(kind = stored.kind.as_str(), len = history.len(), "prompt history appended");
        Ok(stored)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store
            .save(PROMPT_HISTORY_KEY, &Vec::<PromptHistoryEntry>::new())
    }

    pub fn stats(&self) -> HistoryStats {
        let history = self.read_all();
        HistoryStats {
            entries: history.len(),
            total_response_chars: history
                .iter()
                .map(|entry| entry.response.chars().count())
                .sum(),
        }
    }

    pub fn export_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&self.read_all()).map_err(|source| StorageError::Serialize {
            key: PROMPT_HISTORY_KEY.to_string(),
            source,
        })
    }

    /// Writes the export into `dir` and returns the file path.
    pub fn export_to(&self, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf, StorageError> {
        let path = dir.join(export_file_name(now));
        let json = self.export_json()?;
        fs::write(&path, json).map_err(|source| StorageError::Io {
            key: PROMPT_HISTORY_KEY.to_string(),
            source,
        })?;
        Ok(path)
    }
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("history-{}.json", now.format("%Y-%m-%d"))
}

/// Full conversation transcript. Unlike prompt history this collection is not
/// capped.
#[derive(Clone)]
pub struct ChatHistory {
    store: PersistentStore,
}

impl ChatHistory {
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    pub fn read_all(&self) -> Vec<ChatMessage> {
        self.store.load(CHAT_HISTORY_KEY, Vec::new())
    }

    pub fn save(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
        self.store.save(CHAT_HISTORY_KEY, messages)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.save(&[])
    }
}
