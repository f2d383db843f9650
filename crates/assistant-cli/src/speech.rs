//! Speech engine backed by external programs: a text-to-speech command such as
//! `espeak-ng` or `say`, and an optional dictation command that prints one
//! transcript to stdout.

use std::env;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::{Mutex, PoisonError};

use shared::config::ClientConfig;
use shared::voice::{RecognitionOptions, SpeechEngine, SpeechFuture, Utterance, Voice};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[cfg(target_os = "macos")]
const DEFAULT_SPEECH_PROGRAM: &str = "say";
#[cfg(not(target_os = "macos"))]
const DEFAULT_SPEECH_PROGRAM: &str = "espeak-ng";

const BASE_WORDS_PER_MINUTE: f32 = 180.0;
const ESPEAK_BASE_PITCH: f32 = 50.0;
const ESPEAK_BASE_AMPLITUDE: f32 = 100.0;

/// Environment variable handed to the dictation program with the wanted language.
pub const DICTATION_LANG_VAR: &str = "ASSISTANT_DICTATION_LANG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Splits on whitespace; the first word is the program.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn is_installed(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }

        env::var_os("PATH").is_some_and(|paths| {
            env::split_paths(&paths).any(|dir| dir.join(program).is_file())
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SynthesizerKind {
    Espeak,
    Say,
    /// Unknown program: only the text is appended.
    Generic,
}

impl SynthesizerKind {
    fn detect(line: &CommandLine) -> Self {
        match line.program_name() {
            "espeak-ng" | "espeak" => Self::Espeak,
            "say" => Self::Say,
            _ => Self::Generic,
        }
    }

    fn args(self, utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().to_string();
        let mut args = match self {
            Self::Espeak => vec![
                "-s".to_string(),
                words_per_minute,
                "-p".to_string(),
                (ESPEAK_BASE_PITCH * utterance.pitch).round().to_string(),
                "-a".to_string(),
                (ESPEAK_BASE_AMPLITUDE * utterance.volume).round().to_string(),
            ],
            Self::Say => vec!["-r".to_string(), words_per_minute],
            Self::Generic => Vec::new(),
        };

        if let (Some(voice), Self::Espeak | Self::Say) = (&utterance.voice, self) {
            args.push("-v".to_string());
            args.push(voice.name.clone());
        }
        args.push(utterance.text.clone());
        args
    }
}

#[derive(Debug)]
struct Synthesizer {
    line: CommandLine,
    kind: SynthesizerKind,
}

type CancelSlot = Mutex<Option<oneshot::Sender<()>>>;

pub struct ProcessSpeechEngine {
    synthesizer: Option<Synthesizer>,
    recognizer: Option<CommandLine>,
    speech_cancel: CancelSlot,
    recognition_cancel: CancelSlot,
}

impl ProcessSpeechEngine {
    pub fn new(speech_command: Option<&str>, dictation_command: Option<&str>) -> Self {
        let synthesizer = match speech_command {
            Some(line) => installed_or_warn(line, "ASSISTANT_SPEECH_COMMAND"),
            None => CommandLine::parse(DEFAULT_SPEECH_PROGRAM).filter(CommandLine::is_installed),
        }
        .map(|line| Synthesizer {
            kind: SynthesizerKind::detect(&line),
            line,
        });
        let recognizer = dictation_command
            .and_then(|line| installed_or_warn(line, "ASSISTANT_DICTATION_COMMAND"));

        debug!(
            synthesizer = synthesizer.as_ref().map(|synth| synth.line.program.as_str()),
            recognizer = recognizer.as_ref().map(|line| line.program.as_str()),
            "speech programs resolved"
        );

        Self {
            synthesizer,
            recognizer,
            speech_cancel: Mutex::new(None),
            recognition_cancel: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.speech_command.as_deref(),
            config.dictation_command.as_deref(),
        )
    }
}

impl SpeechEngine for ProcessSpeechEngine {
    fn supports_synthesis(&self) -> bool {
        self.synthesizer.is_some()
    }

    fn supports_recognition(&self) -> bool {
        self.recognizer.is_some()
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&self, utterance: Utterance) -> SpeechFuture<()> {
        let Some(synthesizer) = &self.synthesizer else {
            return Box::pin(async { Err("speech synthesis not supported".to_string()) });
        };

        let mut command = synthesizer.line.command();
        command
            .args(synthesizer.kind.args(&utterance))
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let program = synthesizer.line.program.clone();
        let cancelled = arm(&self.speech_cancel);

        Box::pin(async move {
            let output = run_until_cancelled(command, &program, cancelled)
                .await?
                .ok_or_else(|| "speech cancelled".to_string())?;
            check_status(&program, &output)
        })
    }

    fn cancel_speech(&self) {
        fire(&self.speech_cancel);
    }

    fn recognize(&self, options: RecognitionOptions) -> SpeechFuture<String> {
        let Some(recognizer) = &self.recognizer else {
            return Box::pin(async { Err("speech recognition not supported".to_string()) });
        };

        let mut command = recognizer.command();
        command
            .env(DICTATION_LANG_VAR, &options.lang)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let program = recognizer.program.clone();
        let cancelled = arm(&self.recognition_cancel);

        Box::pin(async move {
            let output = run_until_cancelled(command, &program, cancelled)
                .await?
                .ok_or_else(|| "recognition stopped".to_string())?;
            check_status(&program, &output)?;

            let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if transcript.is_empty() {
                return Err("no speech detected".to_string());
            }
            Ok(transcript)
        })
    }

    fn stop_recognition(&self) {
        fire(&self.recognition_cancel);
    }
}

fn installed_or_warn(line: &str, var: &str) -> Option<CommandLine> {
    let parsed = CommandLine::parse(line)?;
    if parsed.is_installed() {
        return Some(parsed);
    }
    warn!("{var} program {} was not found", parsed.program);
    None
}

/// Registers a new cancel signal. Replacing an older sender drops it, which
/// also cancels whatever run was still waiting on it.
fn arm(slot: &CancelSlot) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    rx
}

fn fire(slot: &CancelSlot) {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
}

/// `Ok(None)` when cancelled. The child is killed when its future is dropped.
async fn run_until_cancelled(
    mut command: Command,
    program: &str,
    cancelled: oneshot::Receiver<()>,
) -> Result<Option<Output>, String> {
    let child = command
        .spawn()
        .map_err(|err| format!("could not start {program}: {err}"))?;

    tokio::select! {
        output = child.wait_with_output() => output
            .map(Some)
            .map_err(|err| format!("{program} failed: {err}")),
        _ = cancelled => Ok(None),
    }
}

fn check_status(program: &str, output: &Output) -> Result<(), String> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code().unwrap_or(-1);
    Err(format!("{program} exited with code {code}: {}", stderr.trim()))
}
