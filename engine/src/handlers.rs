//! Command handlers for CLI operations
//!
//! - agent / ask: agent mode through the orchestrator
//! - generate: project-builder mode (optional run and zip)
//! - history / forget: conversation record
//! - projects: artifact store listing
//! - serve: HTTP front end
//! - doctor: configuration and dependency checks
//! - setup: interactive wizard

use anyhow::{Context, Result};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::agent::{ConversationStore, Orchestrator, RequestOutcome};
use crate::config::Config;
use crate::llm::build_provider;
use crate::projects::{zip_project, ArtifactStore};
use crate::secrets::{SecretCache, SecretManager, GEMINI_API_KEY, GITHUB_TOKEN, SERVICE_NAME};
use crate::server::{self, ServerState};
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn secret_cache() -> SecretCache {
    SecretCache::new(Arc::new(SecretManager::new(SERVICE_NAME)))
}

fn print_outcome(outcome: &RequestOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if outcome.fallback {
                println!(
                    "(no valid action detected; defaulted to {})",
                    outcome.action
                );
            }
            println!("Action: {}", outcome.action);
            println!();
            println!("{}", outcome.output);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
    }
    Ok(())
}

/// Send one request through the orchestrator.
pub async fn handle_ask(prompt: String, config: &Config, format: OutputFormat) -> Result<()> {
    let mut orchestrator = Orchestrator::from_config(config, secret_cache())
        .context("Failed to initialize agent")?;

    let outcome = orchestrator.handle_request(&prompt).await;
    print_outcome(&outcome, format)
}

/// Interactive agent loop; `exit` or EOF ends the session.
pub async fn handle_agent(config: &Config, format: OutputFormat) -> Result<()> {
    let mut orchestrator = Orchestrator::from_config(config, secret_cache())
        .context("Failed to initialize agent")?;

    println!("Kiln agent. Ask to generate, edit, run or push a project.");
    println!("Type 'exit' to quit.");
    if !orchestrator.memory().is_empty() {
        println!(
            "(continuing conversation with {} earlier turns)",
            orchestrator.memory().len()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n>>> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") {
            break;
        }

        let outcome = orchestrator.handle_request(prompt).await;
        print_outcome(&outcome, format)?;
    }

    Ok(())
}

/// Project-builder mode.
pub async fn handle_generate(
    prompt: String,
    run: bool,
    zip: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let secrets = secret_cache();
    let provider = build_provider(config, secrets.clone())?;
    let tools = ToolRegistry::new(config, provider, secrets);

    let report = tools
        .build(&prompt, run)
        .await
        .context("Project generation failed")?;

    if let Some(zip_path) = &zip {
        let bytes = zip_project(&report.project_dir)?;
        std::fs::write(zip_path, bytes)
            .with_context(|| format!("Failed to write {}", zip_path.display()))?;
    }

    match format {
        OutputFormat::Text => {
            println!("Project created at: {}", report.project_dir.display());
            if let Some(main) = &report.main_file {
                println!("Main file: {}", main);
            }
            if let Some(zip_path) = &zip {
                println!("Archive: {}", zip_path.display());
            }
            if let Some(output) = &report.run_output {
                println!();
                println!("Run output:");
                println!("{}", output);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "project_dir": report.project_dir,
                "main_file": report.main_file,
                "archive": zip,
                "run_output": report.run_output,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the last `limit` conversation turns.
pub async fn handle_history(limit: usize, config: &Config, format: OutputFormat) -> Result<()> {
    let memory = ConversationStore::open(config.memory_file());
    let turns = memory.turns();
    let start = turns.len().saturating_sub(limit);

    match format {
        OutputFormat::Text => {
            if turns.is_empty() {
                println!("No conversation history");
                return Ok(());
            }

            println!("Conversation (last {} of {} turns):", turns.len() - start, turns.len());
            println!();
            for turn in &turns[start..] {
                println!("[{}]", turn.role);
                println!("{}", turn.text);
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "turns": &turns[start..],
                "count": turns.len() - start,
                "total": turns.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Clear the persisted conversation.
pub async fn handle_forget(config: &Config, format: OutputFormat) -> Result<()> {
    let mut memory = ConversationStore::open(config.memory_file());
    let removed = memory.len();
    memory.clear().context("Failed to clear conversation")?;

    match format {
        OutputFormat::Text => println!("Forgot {} turns.", removed),
        OutputFormat::Json => println!("{}", json!({ "removed": removed })),
    }
    Ok(())
}

/// List generated projects with their file counts.
pub async fn handle_projects(config: &Config, format: OutputFormat) -> Result<()> {
    let store = ArtifactStore::new(config.projects_dir());
    let projects = store.projects()?;

    let entries: Vec<(PathBuf, usize)> = projects
        .into_iter()
        .map(|dir| {
            let files = ArtifactStore::new(&dir).list_files().len();
            (dir, files)
        })
        .collect();

    match format {
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No generated projects in {}", store.root().display());
                return Ok(());
            }
            println!("Generated projects in {}:", store.root().display());
            for (dir, files) in &entries {
                let name = dir.file_name().unwrap_or_default().to_string_lossy();
                println!("  {:<16} {} files", name, files);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "root": store.root(),
                "projects": entries.iter().map(|(dir, files)| json!({
                    "dir": dir,
                    "files": files,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Run the HTTP API until Ctrl+C.
pub async fn handle_serve(addr: SocketAddr, config: &Config) -> Result<()> {
    let secrets = secret_cache();
    let provider = build_provider(config, secrets.clone())?;
    let tools = Arc::new(ToolRegistry::new(config, Arc::clone(&provider), secrets.clone()));
    let orchestrator = Orchestrator::from_config(config, secrets)
        .context("Failed to initialize agent")?
        .shared();

    let state = ServerState {
        orchestrator,
        tools,
        provider,
    };

    println!("Serving on http://{}", addr);
    server::serve(addr, state).await?;
    Ok(())
}

/// Validate configuration and check external dependencies.
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    if config.core.workspace.is_dir() {
        checks.push(("Workspace directory", "Exists".to_string()));
    } else {
        checks.push(("Workspace directory", "Missing".to_string()));
        issues.push(format!(
            "Workspace directory does not exist: {:?}",
            config.core.workspace
        ));
    }

    let store = ArtifactStore::new(config.projects_dir());
    match store.projects() {
        Ok(projects) => checks.push(("Generated projects", projects.len().to_string())),
        Err(e) => {
            checks.push(("Generated projects", "Unreadable".to_string()));
            issues.push(format!("Cannot read {:?}: {}", store.root(), e));
        }
    }

    let memory = ConversationStore::open(config.memory_file());
    checks.push(("Conversation turns", memory.len().to_string()));

    let secrets = secret_cache();
    match build_provider(config, secrets.clone()) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("LLM provider", format!("{} (ready)", provider.name())));
            } else {
                checks.push(("LLM provider", format!("{} (not ready)", provider.name())));
                issues.push(if provider.is_local() {
                    format!(
                        "Ollama is not reachable at {}. Start Ollama to use the local model.",
                        config.llm.ollama.base_url
                    )
                } else {
                    "Gemini API key not configured. Set GEMINI_API_KEY or run 'kiln setup'."
                        .to_string()
                });
            }
        }
        Err(e) => {
            checks.push(("LLM provider", "Error".to_string()));
            issues.push(format!("Cannot initialize provider: {}", e));
        }
    }

    if secrets.has_secret(GITHUB_TOKEN) {
        checks.push(("GitHub token", "Configured".to_string()));
    } else {
        checks.push(("GitHub token", "Not configured".to_string()));
    }

    match which("git", &["--version"]) {
        Some(version) => checks.push(("git", version)),
        None => {
            checks.push(("git", "Not found".to_string()));
            issues.push("git is not installed; pushing projects will fail.".to_string());
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Kiln System Diagnostics");
            println!("=======================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// First line of `program args` output, if it runs successfully.
fn which(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

/// Run the interactive setup wizard
///
/// Prompts for the workspace, the default provider, and credentials (stored
/// in the OS keychain), then writes the configuration file.
pub async fn handle_setup(config_path: Option<&Path>) -> Result<()> {
    use std::io::{self, Write};

    fn ask(question: &str) -> Result<String> {
        print!("{}", question);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }

    println!("=== Kiln Setup Wizard ===");
    println!();

    // 1. Workspace directory
    let workspace = ask("Workspace directory [~/kiln]: ")?;
    let workspace = if workspace.is_empty() {
        "~/kiln".to_string()
    } else {
        workspace
    };

    // 2. Default LLM provider
    println!();
    println!("Available LLM providers:");
    println!("  1. gemini (cloud, requires API key)");
    println!("  2. ollama (local, free)");
    let provider = match ask("Default provider [1]: ")?.as_str() {
        "2" => "ollama",
        _ => "gemini",
    };

    // 3. Credentials
    let secret_manager = SecretManager::new(SERVICE_NAME);

    println!();
    println!("Configure credentials (press Enter to skip):");

    let key = ask("  Gemini API key: ")?;
    if !key.is_empty() {
        secret_manager
            .set_secret(GEMINI_API_KEY, &key)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        println!("    Stored in keychain.");
    }

    let token = ask("  GitHub token (for publishing): ")?;
    if !token.is_empty() {
        secret_manager
            .set_secret(GITHUB_TOKEN, &token)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        println!("    Stored in keychain.");
    }

    let username = ask("  GitHub username: ")?;

    // 4. Write config file
    let mut config = Config::default_config();
    config.core.workspace = PathBuf::from(&workspace);
    config.llm.default_provider = provider.to_string();
    config.github.username = (!username.is_empty()).then_some(username);

    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    config.save_to_path(&config_path)?;
    println!();
    println!("Configuration written to {}", config_path.display());

    // 5. Create workspace directory
    let expanded_workspace = crate::config::expand_path(Path::new(&workspace))?;
    std::fs::create_dir_all(&expanded_workspace)?;
    println!("Workspace directory: {}", expanded_workspace.display());

    println!();
    println!("Setup complete! Run 'kiln doctor' to verify your configuration.");

    Ok(())
}
