use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use lundo_core::widget::ASSISTANT_NAME;
use lundo_core::{
    ChatMode, ChatStore, Config, Position, RagClient, SearchStore, SendOutcome,
    WidgetController,
};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const LOG_ENV: &str = "LUNDO_LOG";

#[derive(Parser)]
#[command(name = "lundo")]
#[command(about = "Chat with the Lundo portfolio assistant", version)]
struct Cli {
    /// Backend base URL (overrides RAG_API_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Use plain RAG chat instead of the tool-using agent
    #[arg(long, global = true)]
    simple: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat widget (default)
    Chat {
        /// Start with the panel open
        #[arg(long)]
        open: bool,
    },
    /// Probe the backend once
    Health,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        message: String,
    },
    /// Search the indexed documents
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat { open: false });

    init_logging(matches!(command, Commands::Chat { .. }))?;

    let config = Config::load().context("failed to load config")?;
    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let mode = if cli.simple { ChatMode::Simple } else { config.chat_mode() };
    tracing::debug!(%base_url, mode = mode.as_str(), "resolved settings");

    let client = RagClient::new(&base_url);

    match command {
        Commands::Chat { open } => run_tui(client, &config, mode, open).await,
        Commands::Health => health(client).await,
        Commands::Ask { message } => ask(client, mode, &message).await,
        Commands::Search { query, limit } => search(client, &query, limit).await,
    }
}

/// The TUI owns the terminal, so it only logs to a file and only when asked
fn init_logging(tui: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    );

    if !tui {
        builder.with_writer(std::io::stderr).init();
        return Ok(());
    }

    if std::env::var_os(LOG_ENV).is_none() {
        builder.with_writer(std::io::sink).init();
        return Ok(());
    }

    let dir = dirs::cache_dir()
        .context("could not determine cache directory")?
        .join("lundo");
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("lundo.log"))?;
    builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    Ok(())
}

async fn run_tui(client: RagClient, config: &Config, mode: ChatMode, open: bool) -> Result<()> {
    let store = ChatStore::start(client);
    store.set_mode(mode);

    let mut widget = WidgetController::uncontrolled(open || config.default_open.unwrap_or(false));
    if let Some(position) = config.position.as_deref().and_then(Position::from_str) {
        widget = widget.with_position(position);
    }
    if let Some(welcome) = &config.welcome_message {
        widget = widget.with_welcome(welcome.clone());
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    events.watch_chat(store.subscribe());

    let mut app = App::new(store, widget);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event)?;
        }
    }

    tui::restore()?;
    Ok(())
}

async fn health(client: RagClient) -> Result<()> {
    println!("{} {}", "Checking".dimmed(), client.base_url());

    let store = ChatStore::new(client);
    store.check_health().await;
    let state = store.snapshot();

    if state.is_ready {
        println!("{} {} is ready", "✓".green().bold(), ASSISTANT_NAME);
    } else {
        let reason = state.error.unwrap_or_else(|| "not ready".to_string());
        println!("{} {}", "✗".red().bold(), reason.red());
    }
    if let Some(quota) = state.rate_limit_info {
        println!(
            "{}",
            format!("  {}/{} requests remaining", quota.remaining, quota.limit).dimmed()
        );
    }
    Ok(())
}

async fn ask(client: RagClient, mode: ChatMode, message: &str) -> Result<()> {
    let store = ChatStore::new(client);
    store.set_mode(mode);

    // Live progress lines only; the tool calls come back with the turn
    let mut updates = store.subscribe();
    let progress = tokio::spawn(async move {
        let mut last_status: Option<String> = None;
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().agent_status.status_message.clone();
            if status.is_some() && status != last_status {
                if let Some(text) = &status {
                    eprintln!("{} {}", "…".dimmed(), text.dimmed());
                }
                last_status = status;
            }
        }
    });

    let result = store.send_turn(message).await;
    let state = store.snapshot();
    // Dropping the store closes the channel and ends the progress task
    drop(store);
    let _ = progress.await;

    let tool_calls = match result {
        Ok(turn) => turn.tool_calls,
        Err(SendOutcome::Ignored) => {
            println!("{}", "Nothing to ask.".yellow());
            return Ok(());
        }
        Err(_) => {
            let reason = state.error.unwrap_or_else(|| "Request failed".to_string());
            anyhow::bail!(reason);
        }
    };

    if let Some(answer) = state.messages.last() {
        println!("\n{}", format!("{}:", ASSISTANT_NAME).yellow().bold());
        println!("{}", answer.content);
    }

    if !tool_calls.is_empty() {
        println!("\n{}", "Tools:".bold());
        for call in &tool_calls {
            let display = lundo_core::tool_display(&call.tool);
            match &call.message {
                Some(message) => println!("  {} {}", display.label.cyan(), message.dimmed()),
                None => println!("  {}", display.label.cyan()),
            }
        }
    }

    if !state.citations.is_empty() {
        println!("\n{}", "Sources:".bold());
        for (i, citation) in state.citations.iter().enumerate() {
            let location = citation.url.as_deref().or(citation.filepath.as_deref()).unwrap_or("");
            println!("  {}. {} {}", i + 1, citation.title, location.dimmed());
        }
    }
    Ok(())
}

async fn search(client: RagClient, query: &str, limit: usize) -> Result<()> {
    let store = SearchStore::new(client);
    store.search(query).await;
    let state = store.snapshot();

    if let Some(error) = state.search_error {
        anyhow::bail!(error);
    }

    if state.results.is_empty() {
        println!("{}", "No results found".yellow());
        return Ok(());
    }

    println!("\n{} results for: {}\n", state.results.len().min(limit), query.cyan().bold());
    for (i, result) in state.results.iter().take(limit).enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            result.title.green().bold(),
            format!("({:.2})", result.score).dimmed()
        );
        let preview: String = result.content.chars().take(200).collect();
        println!("   {}", preview);
        if !result.url.is_empty() {
            println!("   {}", result.url.blue());
        }
        println!();
    }
    Ok(())
}
