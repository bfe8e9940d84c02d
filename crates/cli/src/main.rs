//! OathLink CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway
//! - `write`    — Store a memory
//! - `search`   — Substring search over memories
//! - `compose`  — Build a prompt from memories
//! - `settings` — Read or write a stored setting
//! - `config`   — Show the effective configuration
//! - `doctor`   — Diagnose config and store health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "oathlink",
    about = "OathLink — memory-augmented prompt composition",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $OATHLINK_CONFIG or ./oathlink.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Store a memory and print its id
    Write {
        content: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Search memories by substring
    Search {
        query: String,

        /// Maximum results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Compose a prompt from matching memories
    Compose {
        input: String,

        /// Tag to prefix to the search query (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Maximum memories in the context block
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Read or write stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Print the effective configuration (secrets redacted)
    Config,

    /// Diagnose configuration and store health
    Doctor,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print a setting
    Get { key: String },

    /// Store a setting; the value is parsed as JSON, else kept as text
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Write { content, tags } => commands::memory::write(config, &content, &tags).await?,
        Commands::Search { query, top_k } => commands::memory::search(config, &query, top_k).await?,
        Commands::Compose { input, tags, top_k } => {
            commands::compose::run(config, &input, &tags, top_k).await?
        }
        Commands::Settings { action } => match action {
            SettingsAction::Get { key } => commands::settings::get(config, &key).await?,
            SettingsAction::Set { key, value } => commands::settings::set(config, &key, &value).await?,
        },
        Commands::Config => commands::config_cmd::show(config)?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
