//! Researcher CLI — deep research companion generator for playgrounds.
//!
//! Dispatches long-running deep research jobs across providers, resumes
//! interrupted runs from partial results, and writes the synthesized
//! companion documents into the playground's `research/` directory.

mod commands;
mod progress;
mod review;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Deep research companion generator for playgrounds
#[derive(Parser, Debug)]
#[command(name = "researcher", version, about, long_about = None)]
struct Cli {
    /// Playground slug name (e.g. hsp90-canalization)
    playground: Option<String>,

    /// Comma-separated list of providers to use
    #[arg(long, default_value = "openai,gemini")]
    providers: String,

    /// Optional focus area to steer research query generation
    #[arg(long)]
    focus: Option<String>,

    /// Override the deep research model for the OpenAI provider
    #[arg(short, long)]
    model: Option<String>,

    /// Resume from partial results (skip already-completed providers)
    #[arg(long)]
    resume: bool,

    /// Skip interactive query review and accept every generated query
    #[arg(short, long)]
    yes: bool,

    /// Project root directory (default: auto-detect)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List all available playgrounds
    List,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show stored partial results for a playground
    Partials {
        /// Playground slug name
        playground: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "researcher", "researcher")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "researcher.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let project_root = commands::resolve_project_root(cli.project_root.clone())?;

    // API keys live in the target project's .env.local
    let _ = dotenvy::from_path(project_root.join(".env.local"));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &project_root).await;
    }

    let Some(playground) = cli.playground.clone() else {
        anyhow::bail!("Please provide a playground name, or use the `list` subcommand.");
    };

    commands::handle_run(
        commands::RunArgs {
            playground,
            providers: cli.providers.clone(),
            focus: cli.focus.clone(),
            model: cli.model.clone(),
            resume: cli.resume,
            yes: cli.yes,
        },
        &project_root,
    )
    .await
}
