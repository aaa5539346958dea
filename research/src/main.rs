mod approve;
mod config;
mod console;
mod git;
mod prompts;
mod workflow;
mod workspace;

use agent::ConversationEngine;
use agent::llm::{Ollama, SamplingOptions};
use agent::tools::ToolSet;
use anyhow::{Context, Result, bail};
use clap::Parser;
use config::{ConfigStore, ResearchConfig};
use console::{Console, ConsoleReporter, Interaction};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use workflow::Workflow;
use workspace::Workspace;

#[derive(Parser)]
#[command(name = "research", about = "LLM-assisted research workflow over a local Ollama backend")]
struct Args {
    /// Research topic. Prompted for interactively when omitted.
    topic: Option<String>,

    /// Project directory. Defaults to the current directory.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Ollama base URL, overriding the saved config.
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let project_dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };

    let mut ui = Console;
    ui.notice("╔══════════════════════════════════════╗");
    ui.notice("║        Research Assistant            ║");
    ui.notice("╚══════════════════════════════════════╝");

    let workspace = Workspace::new(project_dir.clone());
    check_environment(&mut ui, &workspace)?;

    let store = ConfigStore::new(&project_dir);
    let base_url = args
        .url
        .clone()
        .unwrap_or_else(|| config::DEFAULT_OLLAMA_URL.to_string());
    let mut config = load_or_create_config(&mut ui, &store, &base_url).await?;
    if let Some(url) = args.url {
        apply_url_override(&mut config, url)?;
    }

    let (reachable, detail) = Ollama::probe(&config.ollama_url).await;
    if !reachable {
        ui.warn(&format!("Cannot reach Ollama at {}: {detail}", config.ollama_url));
        ui.notice("Start the server with `ollama serve` and try again.");
        bail!("Ollama is not reachable");
    }
    ui.notice(&format!("✓ Connected to Ollama at {}", config.ollama_url));

    let topic = match args.topic {
        Some(topic) => topic,
        None => ui.prompt("Enter research topic")?,
    };
    if topic.trim().is_empty() {
        bail!("No research topic provided");
    }

    let llm = Ollama::new(
        &config.ollama_url,
        config.model.clone(),
        SamplingOptions {
            temperature: config.temperature,
            top_p: config.top_p,
            num_ctx: config.num_ctx,
        },
    )?;
    let tools = ToolSet::new()?;
    let engine = ConversationEngine::new(llm, tools, Box::new(ConsoleReporter));
    let mut workflow = Workflow::new(engine, Console, workspace);

    tokio::select! {
        result = workflow.run(topic.trim()) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            Console.notice("Research cancelled.");
        }
    }

    Ok(())
}

/// The override goes through the same validation as a persisted config, so
/// a malformed URL is rejected before any client is built.
fn apply_url_override(config: &mut ResearchConfig, url: String) -> Result<()> {
    config.ollama_url = url;
    config
        .validate()
        .context("invalid --url override")?;
    Ok(())
}

/// Git and workspace checks, each offering to fix what is missing.
fn check_environment(ui: &mut Console, workspace: &Workspace) -> Result<()> {
    if !git::installed() {
        ui.warn("git is not installed; research artifacts will not be version controlled");
    } else if !git::is_repo(workspace.project_dir()) {
        let answer = ui.prompt("Not a git repository. Initialize one? [y/N]")?;
        if matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            git::init(workspace.project_dir())?;
            ui.notice("✓ Initialized git repository");
        }
    }

    if !workspace.is_initialized() {
        let answer = ui.prompt("No .researchkit workspace found. Create one? [y/N]")?;
        if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            bail!("A .researchkit workspace is required");
        }
        workspace.init()?;
        ui.notice("✓ Created .researchkit workspace");
    }

    Ok(())
}

async fn load_or_create_config(
    ui: &mut Console,
    store: &ConfigStore,
    base_url: &str,
) -> Result<ResearchConfig> {
    if store.exists() {
        return store.load();
    }

    ui.notice("\nNo configuration found. Setting up Ollama backend...");

    let models = Ollama::list_models(base_url, true).await?;
    if models.is_empty() {
        ui.warn("No tool-capable models installed");
        ui.notice("Install one with e.g. `ollama pull llama3.2` and run again.");
        bail!("no usable models available");
    }

    ui.notice("\nAvailable tool-capable models:");
    for (index, model) in models.iter().enumerate() {
        ui.notice(&format!("  {}. {model}", index + 1));
    }

    let model = loop {
        let answer = ui.prompt(&format!("Select a model [1-{}]", models.len()))?;
        match answer.parse::<usize>() {
            Ok(choice) if choice >= 1 && choice <= models.len() => {
                break models[choice - 1].clone();
            }
            _ => ui.warn("Invalid selection"),
        }
    };

    let mut config = ResearchConfig {
        model,
        ollama_url: base_url.to_string(),
        created_at: chrono::Local::now().to_rfc3339(),
        ..ResearchConfig::default()
    };
    store.save(&mut config)?;
    ui.notice(&format!("✓ Saved config to {}", store.path().display()));

    if let Some(project_dir) = store.path().ancestors().nth(3) {
        git::commit(
            project_dir,
            &[store.path()],
            "chore: Initialize Ollama agent config",
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResearchConfig {
        ResearchConfig {
            model: "llama3.2".to_string(),
            ..ResearchConfig::default()
        }
    }

    #[test]
    fn test_url_override_rejects_missing_scheme() {
        let mut config = config();
        assert!(apply_url_override(&mut config, "localhost:11434".to_string()).is_err());
    }

    #[test]
    fn test_url_override_accepts_http_url() {
        let mut config = config();
        apply_url_override(&mut config, "http://remote:11434".to_string()).unwrap();
        assert_eq!(config.ollama_url, "http://remote:11434");
    }
}
