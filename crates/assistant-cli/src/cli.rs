use std::collections::HashMap;
use std::path::PathBuf;

use shared::llm::{PlanRequest, WriteTemplateId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    List,
    Stats,
    Export { dir: Option<PathBuf> },
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat {
        text: String,
        images: Vec<PathBuf>,
    },
    Write {
        template: WriteTemplateId,
        fields: HashMap<String, String>,
    },
    Plan(PlanRequest),
    Image {
        path: PathBuf,
        question: String,
    },
    Summarize {
        path: PathBuf,
    },
    AskDocument {
        path: PathBuf,
        question: String,
    },
    History(HistoryCommand),
    /// Dictate one utterance, optionally sending it as a chat message.
    Listen {
        send_to_chat: bool,
    },
    VoiceTest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub command: Command,
    pub speak: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing command")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("invalid --field value (expected name=value): {0}")]
    InvalidField(String),
    #[error("unknown template: {0} (expected blog, social, email, resume or cover)")]
    UnknownTemplate(String),
    #[error("help requested")]
    HelpRequested,
}

/// Flags that take a value; anything else starting with `--` is rejected.
const VALUE_FLAGS: [&str; 6] = [
    "--image",
    "--field",
    "--goals",
    "--time",
    "--priorities",
    "--constraints",
];

/// Flags without a value that only some commands accept.
const SWITCHES: [&str; 1] = ["--chat"];

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut speak = false;
        let mut positionals = Vec::new();
        let mut flags = Vec::new();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--speak" => speak = true,
                switch if SWITCHES.contains(&switch) => {
                    flags.push((switch.to_string(), String::new()));
                }
                flag if VALUE_FLAGS.contains(&flag) => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    flags.push((flag.to_string(), value));
                }
                unknown if unknown.starts_with("--") => {
                    return Err(CliError::UnknownArgument(unknown.to_string()));
                }
                _ => positionals.push(arg),
            }
        }

        let mut args = ParsedArgs { positionals, flags };
        let name = args.next_positional().ok_or(CliError::MissingCommand)?;
        let command = match name.as_str() {
            "chat" => parse_chat(&mut args)?,
            "write" => parse_write(&mut args)?,
            "plan" => parse_plan(&mut args)?,
            "image" => parse_image(&mut args)?,
            "docs" => parse_docs(&mut args)?,
            "history" => parse_history(&mut args)?,
            "listen" => Command::Listen {
                send_to_chat: !args.take_all("--chat").is_empty(),
            },
            "voice" => parse_voice(&mut args)?,
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };
        args.finish()?;

        Ok(Self { command, speak })
    }
}

struct ParsedArgs {
    positionals: Vec<String>,
    flags: Vec<(String, String)>,
}

impl ParsedArgs {
    fn next_positional(&mut self) -> Option<String> {
        (!self.positionals.is_empty()).then(|| self.positionals.remove(0))
    }

    /// Joins the remaining positionals so unquoted sentences work.
    fn rest_joined(&mut self) -> String {
        self.positionals.drain(..).collect::<Vec<_>>().join(" ")
    }

    fn take_all(&mut self, flag: &str) -> Vec<String> {
        let (matching, rest) = self
            .flags
            .drain(..)
            .partition::<Vec<_>, _>(|(name, _)| name == flag);
        self.flags = rest;
        matching.into_iter().map(|(_, value)| value).collect()
    }

    fn take_last(&mut self, flag: &str) -> Option<String> {
        self.take_all(flag).pop()
    }

    fn finish(self) -> Result<(), CliError> {
        if let Some((flag, _)) = self.flags.into_iter().next() {
            return Err(CliError::UnknownArgument(flag));
        }
        if let Some(extra) = self.positionals.into_iter().next() {
            return Err(CliError::UnknownArgument(extra));
        }
        Ok(())
    }
}

fn parse_chat(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let images = args
        .take_all("--image")
        .into_iter()
        .map(PathBuf::from)
        .collect::<Vec<_>>();
    let text = args.rest_joined();
    if text.trim().is_empty() && images.is_empty() {
        return Err(CliError::MissingArgument("message text or --image"));
    }

    Ok(Command::Chat { text, images })
}

fn parse_write(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let template = args
        .next_positional()
        .ok_or(CliError::MissingArgument("template name"))?;
    let template = template
        .parse::<WriteTemplateId>()
        .map_err(CliError::UnknownTemplate)?;

    let fields = args
        .take_all("--field")
        .into_iter()
        .map(|raw| match raw.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(CliError::InvalidField(raw)),
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(Command::Write { template, fields })
}

fn parse_plan(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let goals = args
        .take_last("--goals")
        .ok_or(CliError::MissingArgument("--goals"))?;

    Ok(Command::Plan(PlanRequest {
        goals,
        time_available: args.take_last("--time"),
        priorities: args.take_last("--priorities"),
        constraints: args.take_last("--constraints"),
    }))
}

fn parse_image(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let path = args
        .next_positional()
        .ok_or(CliError::MissingArgument("image path"))?;
    let question = args.rest_joined();
    if question.trim().is_empty() {
        return Err(CliError::MissingArgument("question about the image"));
    }

    Ok(Command::Image {
        path: PathBuf::from(path),
        question,
    })
}

fn parse_docs(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let action = args
        .next_positional()
        .ok_or(CliError::MissingArgument("docs action (summarize or ask)"))?;
    let path = args
        .next_positional()
        .map(PathBuf::from)
        .ok_or(CliError::MissingArgument("document path"))?;

    match action.as_str() {
        "summarize" => Ok(Command::Summarize { path }),
        "ask" => {
            let question = args.rest_joined();
            if question.trim().is_empty() {
                return Err(CliError::MissingArgument("question about the document"));
            }
            Ok(Command::AskDocument { path, question })
        }
        other => Err(CliError::UnknownCommand(format!("docs {other}"))),
    }
}

fn parse_history(args: &mut ParsedArgs) -> Result<Command, CliError> {
    let action = args.next_positional().unwrap_or_else(|| "list".to_string());
    let command = match action.as_str() {
        "list" => HistoryCommand::List,
        "stats" => HistoryCommand::Stats,
        "export" => HistoryCommand::Export {
            dir: args.next_positional().map(PathBuf::from),
        },
        "clear" => HistoryCommand::Clear,
        other => return Err(CliError::UnknownCommand(format!("history {other}"))),
    };

    Ok(Command::History(command))
}

fn parse_voice(args: &mut ParsedArgs) -> Result<Command, CliError> {
    match args.next_positional().as_deref() {
        Some("test") => Ok(Command::VoiceTest),
        Some(other) => Err(CliError::UnknownCommand(format!("voice {other}"))),
        None => Err(CliError::MissingArgument("voice action (test)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, CliError> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn chat_joins_words_and_collects_images() {
        let options = parse(&["chat", "what", "is", "this?", "--image", "a.png", "--speak"])
            .expect("chat should parse");

        assert!(options.speak);
        assert_eq!(
            options.command,
            Command::Chat {
                text: "what is this?".to_string(),
                images: vec![PathBuf::from("a.png")],
            }
        );
    }

    #[test]
    fn chat_needs_text_or_image() {
        assert!(matches!(
            parse(&["chat"]),
            Err(CliError::MissingArgument(_))
        ));
        assert!(parse(&["chat", "--image", "only.png"]).is_ok());
    }

    #[test]
    fn write_parses_template_and_fields() {
        let options = parse(&[
            "write",
            "Blog",
            "--field",
            "topic=Rust async",
            "--field",
            "tone=Casual",
        ])
        .expect("write should parse");

        let Command::Write { template, fields } = options.command else {
            panic!("expected write command");
        };
        assert_eq!(template, WriteTemplateId::Blog);
        assert_eq!(fields.get("topic").map(String::as_str), Some("Rust async"));
        assert_eq!(fields.get("tone").map(String::as_str), Some("Casual"));
    }

    #[test]
    fn write_rejects_unknown_template_and_malformed_field() {
        assert!(matches!(
            parse(&["write", "poem"]),
            Err(CliError::UnknownTemplate(ref name)) if name == "poem"
        ));
        assert!(matches!(
            parse(&["write", "email", "--field", "recipient"]),
            Err(CliError::InvalidField(_))
        ));
    }

    #[test]
    fn plan_requires_goals_and_keeps_optional_inputs() {
        assert!(matches!(
            parse(&["plan", "--time", "4 hours"]),
            Err(CliError::MissingArgument("--goals"))
        ));

        let options = parse(&["plan", "--goals", "Ship release", "--time", "4 hours"])
            .expect("plan should parse");
        assert_eq!(
            options.command,
            Command::Plan(PlanRequest {
                goals: "Ship release".to_string(),
                time_available: Some("4 hours".to_string()),
                priorities: None,
                constraints: None,
            })
        );
    }

    #[test]
    fn docs_and_history_subcommands() {
        assert_eq!(
            parse(&["docs", "ask", "notes.txt", "who", "attended?"])
                .expect("docs ask should parse")
                .command,
            Command::AskDocument {
                path: PathBuf::from("notes.txt"),
                question: "who attended?".to_string(),
            }
        );
        assert_eq!(
            parse(&["history", "export", "out"])
                .expect("history export should parse")
                .command,
            Command::History(HistoryCommand::Export {
                dir: Some(PathBuf::from("out")),
            })
        );
        assert_eq!(
            parse(&["history"]).expect("history should parse").command,
            Command::History(HistoryCommand::List)
        );
    }

    #[test]
    fn voice_commands() {
        assert_eq!(
            parse(&["listen"]).expect("listen should parse").command,
            Command::Listen {
                send_to_chat: false
            }
        );
        assert_eq!(
            parse(&["listen", "--chat", "--speak"])
                .expect("listen --chat should parse")
                .command,
            Command::Listen { send_to_chat: true }
        );
        assert_eq!(
            parse(&["voice", "test"]).expect("voice test should parse").command,
            Command::VoiceTest
        );
        assert!(matches!(
            parse(&["voice"]),
            Err(CliError::MissingArgument(_))
        ));
        assert!(matches!(
            parse(&["chat", "hi", "--chat"]),
            Err(CliError::UnknownArgument(ref arg)) if arg == "--chat"
        ));
    }

    #[test]
    fn rejects_unknown_and_misplaced_arguments() {
        assert!(matches!(parse(&[]), Err(CliError::MissingCommand)));
        assert!(matches!(
            parse(&["translate", "hola"]),
            Err(CliError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse(&["chat", "hi", "--verbose"]),
            Err(CliError::UnknownArgument(ref arg)) if arg == "--verbose"
        ));
        assert!(matches!(
            parse(&["history", "stats", "--image", "x.png"]),
            Err(CliError::UnknownArgument(ref arg)) if arg == "--image"
        ));
        assert!(matches!(
            parse(&["plan", "--goals"]),
            Err(CliError::MissingValue(_))
        ));
        assert!(matches!(
            parse(&["history", "--help"]),
            Err(CliError::HelpRequested)
        ));
    }
}
