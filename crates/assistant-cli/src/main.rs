mod cli;
mod commands;
mod speech;

use cli::{CliError, CliOptions};
use shared::config::ClientConfig;
use shared::media::FsBlobReader;
use tracing::error;

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "assistant_cli=info,shared=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match ClientConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let session = match commands::build_session(&config, options.speak) {
        Ok(session) => session,
        Err(err) => {
            error!("failed to open data directory: {err}");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout();
    if let Err(err) = commands::run(options.command, &session, &FsBlobReader, &mut stdout).await
    {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        "Usage: assistant [--speak] <command> [args]\n\
         \n\
         Commands:\n\
         - chat <text> [--image PATH]...                 Chat with the assistant (up to 5 images)\n\
         - write <blog|social|email|resume|cover> --field name=value...\n\
         - plan --goals TEXT [--time TEXT] [--priorities TEXT] [--constraints TEXT]\n\
         - image <PATH> <question>                       Ask about an image\n\
         - docs summarize <PATH>                         Summarize a text file\n\
         - docs ask <PATH> <question>                    Ask about a text file\n\
         - history [list|stats|export [DIR]|clear]\n\
         - listen [--chat]                               Dictate a message, optionally sending it to chat\n\
         - voice test                                    Speak a sample sentence\n\
         \n\
         Options:\n\
         - --speak  Read replies aloud when speech synthesis is available\n\
         - --help   Show this help text\n\
         \n\
         Environment: ASSISTANT_PROXY_URL, ASSISTANT_DATA_DIR, ASSISTANT_SPEAK_RESPONSES,\n\
         ASSISTANT_SPEECH_COMMAND (default espeak-ng or say), ASSISTANT_DICTATION_COMMAND"
    );
}
