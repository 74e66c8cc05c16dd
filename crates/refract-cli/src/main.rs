//! Refract CLI: fetch a page and render it through the reader template or
//! the configured composer endpoint, and manage persisted settings.
//!
//! The process itself acts as the UI context: it drains the dispatch queue
//! from the main task while the fetch runs in the background, exactly as a
//! widget toolkit's event loop would.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use refract_app::RenderMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod surface;

#[derive(Parser)]
#[command(name = "refract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch web pages and re-render them as reader or composed views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and write the rendered HTML to stdout or a file
    Fetch(FetchArgs),

    /// Update and persist composer settings
    Configure(ConfigureArgs),

    /// Print the effective settings (persisted values plus environment overrides)
    Show,
}

#[derive(Args)]
struct FetchArgs {
    /// Absolute URL to fetch
    url: String,

    /// Rendering mode; defaults to the configured preference
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Write the rendered HTML to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum)]
enum ModeArg {
    /// Deterministic reader template, no external call
    Reader,
    /// HTML composed by the configured LLM endpoint
    Composed,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Reader => RenderMode::Template,
            ModeArg::Composed => RenderMode::Composed,
        }
    }
}

#[derive(Args)]
struct ConfigureArgs {
    /// Composer endpoint base, e.g. https://api.openai.com or http://localhost:11434
    #[arg(long)]
    base_url: Option<String>,

    /// Model identifier, e.g. gpt-4o-mini or llama3
    #[arg(long)]
    model: Option<String>,

    /// Bearer credential for the endpoint
    #[arg(long)]
    api_key: Option<String>,

    /// Use the composer by default for plain navigations
    #[arg(long)]
    prefer_composed: Option<bool>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for rendered HTML.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch(args) => commands::fetch(args).await,
        Commands::Configure(args) => commands::configure(args),
        Commands::Show => commands::show(),
    }
}
