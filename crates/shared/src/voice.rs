//! Speech synthesis and one-shot recognition over a platform [`SpeechEngine`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

pub const SPEECH_RATE: f32 = 0.9;
pub const SPEECH_PITCH: f32 = 1.1;
pub const SPEECH_VOLUME: f32 = 0.8;
pub const RECOGNITION_LANG: &str = "en-US";

const PREFERRED_VOICE_NAMES: [&str; 5] = ["female", "samantha", "karen", "susan", "allison"];

/// Engine futures resolve with an engine-specific failure reason.
pub type SpeechFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Female,
    Male,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
    pub gender: Option<VoiceGender>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` leaves the platform default voice in place.
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub lang: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            lang: RECOGNITION_LANG.to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// Platform speech capability. `speak` resolves when the utterance ends (or
/// fails, including when cancelled); `recognize` resolves with the first final
/// transcript.
pub trait SpeechEngine: Send + Sync {
    fn supports_synthesis(&self) -> bool;
    fn supports_recognition(&self) -> bool;
    fn voices(&self) -> Vec<Voice>;
    fn speak(&self, utterance: Utterance) -> SpeechFuture<()>;
    fn cancel_speech(&self);
    fn recognize(&self, options: RecognitionOptions) -> SpeechFuture<String>;
    fn stop_recognition(&self);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("{0} not supported")]
    Unsupported(&'static str),
    #[error("Speech error: {0}")]
    Synthesis(String),
    #[error("Speech recognition error: {0}")]
    Recognition(String),
    #[error("Already listening")]
    AlreadyListening,
    #[error("Listening was stopped")]
    ListeningStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    /// A later `speak` or `stop_speaking` cancelled this utterance.
    Superseded,
}

struct ListeningSession {
    id: u64,
    stop: oneshot::Sender<()>,
}

pub struct VoiceBridge {
    engine: Arc<dyn SpeechEngine>,
    speech_generation: AtomicU64,
    next_session_id: AtomicU64,
    listening: Mutex<Option<ListeningSession>>,
}

impl VoiceBridge {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            speech_generation: AtomicU64::new(0),
            next_session_id: AtomicU64::new(0),
            listening: Mutex::new(None),
        }
    }

    pub fn is_synthesis_supported(&self) -> bool {
        self.engine.supports_synthesis()
    }

    pub fn is_recognition_supported(&self) -> bool {
        self.engine.supports_recognition()
    }

    pub fn is_listening(&self) -> bool {
        self.listening_slot().is_some()
    }

    pub async fn speak(&self, text: &str) -> Result<SpeechOutcome, VoiceError> {
        if !self.engine.supports_synthesis() {
            return Err(VoiceError::Unsupported("Speech synthesis"));
        }

        let generation = self.speech_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.engine.cancel_speech();

        let utterance = Utterance {
            text: text.to_string(),
            voice: select_voice(&self.engine.voices()),
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
            volume: SPEECH_VOLUME,
        };
        debug!(
            chars = utterance.text.chars().count(),
            voice = utterance.voice.as_ref().map(|voice| voice.name.as_str()),
            "speaking utterance"
        );

        let result = self.engine.speak(utterance).await;
        if self.speech_generation.load(Ordering::SeqCst) != generation {
            return Ok(SpeechOutcome::Superseded);
        }

        result
            .map(|()| SpeechOutcome::Finished)
            .map_err(VoiceError::Synthesis)
    }

    pub fn stop_speaking(&self) {
        self.speech_generation.fetch_add(1, Ordering::SeqCst);
        self.engine.cancel_speech();
    }

    /// Listens for a single utterance. A second call while a session is pending
    /// fails immediately and leaves the pending session untouched.
    pub async fn start_listening(&self) -> Result<String, VoiceError> {
        if !self.engine.supports_recognition() {
            return Err(VoiceError::Unsupported("Speech recognition"));
        }

        let (session_id, stop_rx) = {
            let mut slot = self.listening_slot();
            if slot.is_some() {
                return Err(VoiceError::AlreadyListening);
            }
            let (stop_tx, stop_rx) = oneshot::channel();
            let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
            *slot = Some(ListeningSession { id, stop: stop_tx });
            (id, stop_rx)
        };
        let _session = SessionGuard {
            bridge: self,
            id: session_id,
        };

        let recognition = self.engine.recognize(RecognitionOptions::default());
        tokio::select! {
            result = recognition => result.map_err(VoiceError::Recognition),
            _ = stop_rx => Err(VoiceError::ListeningStopped),
        }
    }

    pub fn stop_listening(&self) {
        let session = self.listening_slot().take();
        if let Some(session) = session {
            self.engine.stop_recognition();
            let _ = session.stop.send(());
        }
    }

    fn listening_slot(&self) -> MutexGuard<'_, Option<ListeningSession>> {
        self.listening
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the listening flag when a session ends, however it ends.
struct SessionGuard<'a> {
    bridge: &'a VoiceBridge,
    id: u64,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.bridge.listening_slot();
        if slot.as_ref().is_some_and(|session| session.id == self.id) {
            *slot = None;
        }
    }
}

/// Prefers a voice whose name matches a known female voice, then any voice
/// reporting a female gender.
pub fn select_voice(voices: &[Voice]) -> Option<Voice> {
    voices
        .iter()
        .find(|voice| {
            let name = voice.name.to_lowercase();
            PREFERRED_VOICE_NAMES
                .iter()
                .any(|preferred| name.contains(preferred))
        })
        .or_else(|| {
            voices
                .iter()
                .find(|voice| voice.gender == Some(VoiceGender::Female))
        })
        .cloned()
}

/// Engine for environments without speech support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSpeechEngine;

impl SpeechEngine for UnsupportedSpeechEngine {
    fn supports_synthesis(&self) -> bool {
        false
    }

    fn supports_recognition(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&self, _utterance: Utterance) -> SpeechFuture<()> {
        Box::pin(async { Err("speech synthesis not supported".to_string()) })
    }

    fn cancel_speech(&self) {}

    fn recognize(&self, _options: RecognitionOptions) -> SpeechFuture<String> {
        Box::pin(async { Err("speech recognition not supported".to_string()) })
    }

    fn stop_recognition(&self) {}
}
