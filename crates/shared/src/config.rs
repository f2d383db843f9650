use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_bool_env, require_http_url, string_env_or_default,
};

pub const DEFAULT_PROXY_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_PROXY_COMPLETION_URL: &str = "http://127.0.0.1:8080/api/completion";
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: String,
    /// Absent keys are tolerated at startup; every completion request then fails
    /// with a configuration error.
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proxy_url: String,
    pub data_dir: PathBuf,
    pub speak_responses: bool,
    /// Text-to-speech program line; the text to speak is appended as the last
    /// argument. `None` picks the platform default.
    pub speech_command: Option<String>,
    /// Program line that records one utterance and prints its transcript.
    pub dictation_command: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: string_env_or_default("PROXY_BIND_ADDR", DEFAULT_PROXY_BIND_ADDR),
            gemini_api_key: optional_trimmed_env(GEMINI_API_KEY_VAR),
            gemini_api_url: require_http_url("GEMINI_API_URL", DEFAULT_GEMINI_API_URL)?,
        })
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            proxy_url: require_http_url("ASSISTANT_PROXY_URL", DEFAULT_PROXY_COMPLETION_URL)?,
            data_dir: optional_trimmed_env("ASSISTANT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            speak_responses: parse_bool_env("ASSISTANT_SPEAK_RESPONSES", false)?,
            speech_command: optional_trimmed_env("ASSISTANT_SPEECH_COMMAND"),
            dictation_command: optional_trimmed_env("ASSISTANT_DICTATION_COMMAND"),
        })
    }
}

fn default_data_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("ai-services"),
        _ => PathBuf::from(".ai-services"),
    }
}
