//! Nebula interactive shell.
//!
//! Stands in for the web front end: one session, page switching through
//! slash commands, everything else is a chat message for the current page.

use anyhow::Context;
use clap::Parser;
use nebula_core::actors::supervisor::SupervisorHandle;
use nebula_core::actors::traits::ChatService;
use nebula_core::chatbot::{self, DocumentChatbot};
use nebula_core::config::{AppConfig, DocumentStrategy, IntentStrategy};
use nebula_core::corpus::IntentSet;
use nebula_core::fs_manager::PortablePathManager;
use nebula_core::history::ChatLog;
use nebula_core::session::{View, ABOUT_TEXT};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

// ── CLI ─────────────────────────────────────────────────────────────

/// Intent chatbot and PDF question answering in the terminal.
#[derive(Parser, Debug)]
#[command(name = "nebula", version, about)]
struct Cli {
    /// Data directory for indexes, the model cache and the chat log.
    #[arg(long, env = "NEBULA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON intents file.
    #[arg(long, env = "NEBULA_INTENTS_PATH")]
    intents: Option<PathBuf>,

    /// Notebook holding an `intents = [...]` cell, used instead of --intents.
    #[arg(long, env = "NEBULA_NOTEBOOK_PATH")]
    notebook: Option<PathBuf>,

    /// `rule` or `classifier`.
    #[arg(long, env = "NEBULA_INTENT_STRATEGY")]
    intent_strategy: Option<IntentStrategy>,

    /// `ngram`, `classifier` or `embedding`.
    #[arg(long, env = "NEBULA_DOCUMENT_STRATEGY")]
    document_strategy: Option<DocumentStrategy>,

    /// Persist document indexes between runs.
    #[arg(long, env = "NEBULA_PERSIST_INDEX")]
    persist_index: bool,

    /// Seed for response selection.
    #[arg(long, env = "NEBULA_SEED")]
    seed: Option<u64>,

    /// Document to load before the first prompt.
    #[arg(long)]
    document: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
        if let Some(dir) = self.data_dir {
            config.set_data_dir(dir);
        }
        if let Some(path) = self.intents {
            config.intents_path = path;
        }
        if self.notebook.is_some() {
            config.notebook_path = self.notebook;
        }
        if let Some(strategy) = self.intent_strategy {
            config.intent_strategy = strategy;
        }
        if let Some(strategy) = self.document_strategy {
            config.document_strategy = strategy;
        }
        config.persist_index |= self.persist_index;
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().context("invalid configuration")?;
        Ok((config, self.document))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nebula_core=info,nebula=info"));
    let json = std::env::var("NEBULA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_intents(config: &AppConfig) -> IntentSet {
    let loaded = match &config.notebook_path {
        Some(path) => IntentSet::load_notebook(path),
        None => IntentSet::load_json(&config.intents_path),
    };
    match loaded {
        Ok(intents) => intents,
        Err(e) => {
            warn!("No intents loaded ({}); every Home reply will be the fallback", e);
            IntentSet::default()
        }
    }
}

async fn upload_file<S: ChatService>(service: &S, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let summary = service.upload_document(file_name, bytes).await?;
    println!(
        "Loaded {} ({} units, {:?}).",
        summary.name, summary.units, summary.source
    );
    Ok(())
}

async fn show_page<S: ChatService>(service: &S, session: Uuid, view: View) -> anyhow::Result<()> {
    service.navigate(session, view).await?;
    println!("── {} ──", view);
    match view {
        View::Home => println!(
            "Welcome to the chatbot. Please type a message and press Enter to start the conversation."
        ),
        View::PdfChat => println!("Upload a document with /upload <path>, then ask about it."),
        View::About => println!("{}", ABOUT_TEXT),
        View::ConversationHistory => {
            for entry in service.chat_log().await? {
                println!("User: {}", entry.user_input);
                println!("Chatbot: {}", entry.response);
                println!("Timestamp: {}", entry.timestamp);
                println!("---");
            }
        }
    }
    Ok(())
}

const HELP: &str = "\
Commands:
  /page <home|history|about|pdf>  switch page
  /upload <path>                  load a PDF (or text) document
  /session                        show this session's messages
  /help                           show this help
  /quit                           leave";

/// Reads stdin until `/quit`, EOF or a goodbye.
async fn repl<S: ChatService>(service: &S, session: Uuid) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));
            let outcome = match name {
                "quit" | "exit" => break,
                "help" => {
                    println!("{}", HELP);
                    Ok(())
                }
                "page" => match arg.parse::<View>() {
                    Ok(view) => show_page(service, session, view).await,
                    Err(e) => Err(e.into()),
                },
                "history" => show_page(service, session, View::ConversationHistory).await,
                "about" => show_page(service, session, View::About).await,
                "upload" if !arg.is_empty() => upload_file(service, Path::new(arg)).await,
                "session" => {
                    for turn in service.session_history(session).await? {
                        println!("{}: {}", turn.sender, turn.message);
                    }
                    Ok(())
                }
                _ => {
                    println!("{}", HELP);
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                println!("Error: {:#}", e);
            }
            continue;
        }

        match service.send_message(session, line.to_string()).await {
            Ok(turn) => {
                println!("Nebula: {}", turn.response);
                if let Some(farewell) = turn.farewell {
                    println!("{}", farewell);
                    break;
                }
            }
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Flags fall back to the same variables, so `.env` must be loaded first.
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let (config, document) = cli.apply(config)?;

    PortablePathManager::init(&config.data_dir).context("failed to create data directory")?;
    info!(
        "Starting with intent strategy {} and document strategy {}",
        config.intent_strategy, config.document_strategy
    );

    let intent_bot = chatbot::intent_responder(&config, load_intents(&config));
    let document_bot = Arc::new(
        DocumentChatbot::from_config(&config).context("failed to prepare document chatbot")?,
    );
    if config.persist_index && document_bot.resume() {
        info!("Answering from the last persisted document until a new upload");
    }
    let chat_log = match &config.chat_log_path {
        Some(path) => match ChatLog::open(path) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!("Chat log disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let supervisor = SupervisorHandle::new(intent_bot, document_bot, chat_log);
    let session = supervisor.create_session().await?;

    if let Some(path) = document {
        if let Err(e) = upload_file(&supervisor, &path).await {
            warn!("Initial document not loaded: {:#}", e);
        }
    }

    show_page(&supervisor, session, View::Home).await?;
    println!("Type /help for commands.");
    repl(&supervisor, session).await?;

    supervisor.end_session(session).await.ok();
    supervisor.shutdown().await.ok();
    Ok(())
}
