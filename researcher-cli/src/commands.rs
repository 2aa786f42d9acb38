//! CLI subcommand handlers.

use std::path::{Path, PathBuf};

use researcher_core::config::{self, load_config};
use researcher_core::pipeline::{ResearchPipeline, RunOptions};
use researcher_core::progress::ProgressSink;
use researcher_core::queries::{ApproveAll, QueryReviewer};
use researcher_core::{PartialStore, find_playground, list_playgrounds};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Commands;
use crate::ConfigAction;
use crate::progress::{print_summary, render_progress};
use crate::review::InteractiveReviewer;

/// Resolve the target project root: the explicit flag wins, otherwise walk
/// up from the current directory, falling back to the current directory
/// itself so config subcommands stay usable outside a project.
pub fn resolve_project_root(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.canonicalize().unwrap_or(root));
    }
    match researcher_core::detect_project_root() {
        Ok(root) => Ok(root),
        Err(_) => Ok(std::env::current_dir()?),
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, project_root: &Path) -> anyhow::Result<()> {
    match command {
        Commands::List => handle_list(project_root),
        Commands::Config { action } => handle_config(action, project_root),
        Commands::Partials { playground } => handle_partials(&playground, project_root),
    }
}

fn handle_list(project_root: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(project_root), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let playgrounds = list_playgrounds(project_root, &config.project.playgrounds_dir);
    if playgrounds.is_empty() {
        println!(
            "No playgrounds found under {}",
            project_root.join(&config.project.playgrounds_dir).display()
        );
        return Ok(());
    }

    println!("Available playgrounds ({}):", playgrounds.len());
    for entry in &playgrounds {
        println!("  {}/{}  {}", entry.year, entry.month, entry.name);
    }
    Ok(())
}

fn handle_config(action: ConfigAction, project_root: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = config::project_config_path(project_root);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let default_config = researcher_core::ResearcherConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(project_root), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn handle_partials(playground: &str, project_root: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(project_root), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let playground_dir = find_playground(playground, project_root, &config.project.playgrounds_dir)?;
    let store = PartialStore::new(&playground_dir);

    let providers = store.list();
    if providers.is_empty() {
        println!("No partial results for '{}'.", playground);
        return Ok(());
    }

    println!("Partial results for '{}':", playground);
    for provider in &providers {
        let chars = store
            .load(provider)?
            .map(|content| content.len())
            .unwrap_or(0);
        println!("  {} ({} chars)", provider, chars);
    }
    if let Some(manifest) = store.load_manifest()? {
        println!(
            "Last run {} started {} with providers: {}",
            manifest.run_id,
            manifest.started_at.format("%Y-%m-%d %H:%M UTC"),
            manifest.providers.join(", ")
        );
    }
    Ok(())
}

/// Arguments for a research run, already parsed.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub playground: String,
    pub providers: String,
    pub focus: Option<String>,
    pub model: Option<String>,
    pub resume: bool,
    pub yes: bool,
}

/// Run the full research pipeline for one playground.
pub async fn handle_run(args: RunArgs, project_root: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(project_root), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let playground_dir = find_playground(
        &args.playground,
        project_root,
        &config.project.playgrounds_dir,
    )?;

    let providers = parse_provider_list(&args.providers);
    if providers.is_empty() {
        anyhow::bail!("No providers given. Use e.g. --providers openai,gemini");
    }
    info!(
        playground = %args.playground,
        providers = providers.join(","),
        resume = args.resume,
        "starting research run"
    );

    println!("\n  Playground Researcher\n");
    println!("  Playground: {}", args.playground);
    println!("  Directory:  {}", playground_dir.display());
    println!("  Providers:  {}", providers.join(", "));
    println!(
        "  Focus:      {}",
        args.focus.as_deref().unwrap_or("(none)")
    );
    println!("  Resume:     {}\n", args.resume);

    let pipeline = ResearchPipeline::new(config, playground_dir, project_root.to_path_buf());
    let ctx = pipeline.build_context()?;

    let options = RunOptions {
        providers: providers.clone(),
        focus: args.focus,
        model_override: args.model,
        resume: args.resume,
    };

    let reviewer: Box<dyn QueryReviewer> = if args.yes {
        Box::new(ApproveAll)
    } else {
        Box::new(InteractiveReviewer)
    };

    // Ctrl-C cancels every in-flight provider job; each one then reports
    // itself as failed instead of leaving orphaned remote work unrecorded.
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  Interrupt received, cancelling research jobs...");
            ctrl_c_cancel.cancel();
        }
    });

    let (sink, rx) = ProgressSink::channel();
    let renderer = tokio::spawn(render_progress(providers.clone(), rx));

    let run = pipeline.run(&ctx, &options, reviewer.as_ref(), &cancel, &sink).await;

    drop(sink);
    let _ = renderer.await;
    ctrl_c.abort();

    let outcome = run?;
    print_summary(&outcome.results);

    println!("\n  Research complete!\n");
    println!(
        "  content.md:     {}",
        outcome.research_dir.join("content.md").display()
    );
    println!(
        "  suggestions.md: {}",
        outcome.research_dir.join("suggestions.md").display()
    );
    println!(
        "  page.tsx:       {}",
        outcome.research_dir.join("page.tsx").display()
    );
    println!("\n  View at: /playgrounds/{}/research", ctx.name);
    println!("\n  To link from the playground, add to PlaygroundLayout:");
    println!("    researchUrl=\"/playgrounds/{}/research\"\n", ctx.name);

    Ok(())
}

/// Split the `--providers` value into trimmed, non-empty names.
fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
