use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use nutrichat::api::config::normalize_base_url;
use nutrichat::api::types::ApiError;
use nutrichat::api::{ClientConfig, HttpBackend};
use nutrichat::controller::ConversationController;
use nutrichat::media::{CaptureError, FileRecorder, ImageAttachment};
use nutrichat::repl::{self, Flow};
use nutrichat::shell::PanelShell;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{}", .0.alert_message())]
    Capture(#[from] CaptureError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Send(#[from] nutrichat::controller::SendError),
}

#[derive(Parser, Debug)]
#[command(name = "nutrichat", about = "Chat with the nutrition assistant and log meals")]
struct Cli {
    #[arg(long, env = "NUTRICHAT_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "NUTRICHAT_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    #[arg(long, help = "Override the recompute debounce window in milliseconds")]
    debounce_ms: Option<u64>,

    #[arg(long, help = "Audio file used as the recording when /voice stops")]
    voice_clip: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (default).
    Chat,
    /// Send one message and print the reply.
    Send {
        message: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Print conversation history.
    History,
    /// Delete conversation history.
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let backend = Arc::new(HttpBackend::new(&config)?);
    let mut ctl = ConversationController::new(backend, &config);
    if let Some(clip) = &cli.voice_clip {
        ctl = ctl.with_recorder(Box::new(FileRecorder::new(clip)));
    }
    let mut shell = PanelShell::default();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&mut ctl, &mut shell).await,
        Command::Send { message, image } => {
            let image = match image {
                Some(path) => Some(ImageAttachment::from_path(&path).await?),
                None => None,
            };
            let before = ctl.log().len();
            ctl.send(&message, image).await?;
            if ctl.engine().is_computing() {
                tracing::info!("send: waiting for panel totals");
                ctl.engine().settled().await;
            }

            let mut out = String::new();
            for turn in ctl.log().turns().iter().skip(before + 1) {
                repl::write_turn(&mut out, turn);
            }
            if let Some(view) = shell.sync(ctl.engine()) {
                let _ = write!(out, "{view}");
            }
            print!("{out}");
            Ok(())
        }
        Command::History => {
            let mut out = String::new();
            repl::execute(&mut ctl, &mut shell, repl::Command::History, &mut out).await;
            print!("{out}");
            Ok(())
        }
        Command::ClearHistory => {
            ctl.clear_history().await?;
            println!("history cleared");
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig, ApiError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = normalize_base_url(base_url)?;
    }
    if let Some(cookie) = &cli.session_cookie {
        config.session_cookie = Some(cookie.clone());
    }
    if let Some(ms) = cli.debounce_ms {
        config.recompute_debounce = Duration::from_millis(ms);
    }
    Ok(config)
}

async fn run_chat(ctl: &mut ConversationController, shell: &mut PanelShell) -> Result<(), CliError> {
    let mut out = String::new();
    if let Err(e) = ctl.load_history().await {
        tracing::warn!(error = %e, "chat: history unavailable");
    }
    for turn in ctl.log().turns() {
        repl::write_turn(&mut out, turn);
    }
    out.push_str("(type /help for commands)\n");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        out.push_str("> ");
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
        out.clear();

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let command = match repl::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                let _ = writeln!(out, "{e}");
                continue;
            }
        };
        if repl::execute(ctl, shell, command, &mut out).await == Flow::Quit {
            return Ok(());
        }
    }
}
