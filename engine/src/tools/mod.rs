pub mod editor;
pub mod git;
pub mod terminal;

pub use editor::FileEditor;
pub use git::GitPublisher;
pub use terminal::TerminalTool;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use sdk::errors::EngineError;
use sdk::types::ActionOutput;

use crate::config::Config;
use crate::llm::LLMProvider;
use crate::projects::{ArtifactStore, ProjectGenerator};
use crate::secrets::SecretCache;

/// Commit message used when the request did not supply one
pub const DEFAULT_COMMIT_MESSAGE: &str = "Auto commit by AI Agent";

/// The four action handlers the orchestrator dispatches to.
///
/// Every handler reports failure through `Err`; the orchestrator turns that
/// into a diagnostic for the caller.
#[async_trait]
pub trait Toolbox: Send + Sync {
    /// Rewrite `path` according to `instruction`.
    async fn edit_file(&self, path: &Path, instruction: &str) -> Result<ActionOutput, EngineError>;

    /// Run a shell command. Command failures are reported in the text, not as `Err`.
    async fn run_command(&self, command: &str) -> Result<ActionOutput, EngineError>;

    /// Commit and publish the latest generated project.
    async fn push_remote(
        &self,
        message: &str,
        remote_url: Option<&str>,
    ) -> Result<ActionOutput, EngineError>;

    /// Generate and materialize a new project for `request`.
    async fn generate_project(&self, request: &str) -> Result<ActionOutput, EngineError>;
}

/// Result of project-builder mode
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub project_dir: PathBuf,
    pub main_file: Option<String>,

    /// Output of running the main file, when requested
    pub run_output: Option<String>,
}

/// Production toolbox backed by the model, the shell, git and the artifact store.
pub struct ToolRegistry {
    pub editor: FileEditor,
    pub terminal: TerminalTool,
    pub git: GitPublisher,
    pub generator: ProjectGenerator,
}

impl ToolRegistry {
    pub fn new(config: &Config, provider: Arc<dyn LLMProvider>, secrets: SecretCache) -> Self {
        let store = ArtifactStore::new(config.projects_dir());
        Self {
            editor: FileEditor::new(Arc::clone(&provider)),
            terminal: TerminalTool::new(
                config.core.workspace.clone(),
                Duration::from_secs(config.terminal.timeout_secs),
            ),
            git: GitPublisher::new(store.clone(), config.github.clone(), secrets),
            generator: ProjectGenerator::new(provider, store),
        }
    }
}

impl ToolRegistry {
    /// Project-builder mode: generate a project and optionally run its main file.
    pub async fn build(&self, request: &str, auto_run: bool) -> Result<BuildReport, EngineError> {
        let project = self.generator.generate(request).await?;

        let run_output = match (auto_run, project.main_path()) {
            (true, Some(main)) => Some(self.terminal.run_file(&main).await),
            (true, None) => Some("ERROR: Project has no main file to run".to_string()),
            (false, _) => None,
        };

        Ok(BuildReport {
            project_dir: project.dir,
            main_file: project.main_file,
            run_output,
        })
    }
}

#[async_trait]
impl Toolbox for ToolRegistry {
    async fn edit_file(&self, path: &Path, instruction: &str) -> Result<ActionOutput, EngineError> {
        debug!("Dispatching edit_file for {}", path.display());
        self.editor.edit(path, instruction).await.map(ActionOutput::Text)
    }

    async fn run_command(&self, command: &str) -> Result<ActionOutput, EngineError> {
        debug!("Dispatching run_command");
        Ok(ActionOutput::Text(self.terminal.execute(command).await))
    }

    async fn push_remote(
        &self,
        message: &str,
        remote_url: Option<&str>,
    ) -> Result<ActionOutput, EngineError> {
        debug!("Dispatching push_remote");
        let message = if message.trim().is_empty() {
            DEFAULT_COMMIT_MESSAGE
        } else {
            message
        };
        self.git.publish_latest(message, remote_url).await
    }

    async fn generate_project(&self, request: &str) -> Result<ActionOutput, EngineError> {
        debug!("Dispatching generate_project");
        let project = self.generator.generate(request).await?;
        Ok(ActionOutput::Text(format!(
            "Project created at: {}. Main file: {}",
            project.dir.display(),
            project.main_file.as_deref().unwrap_or_default()
        )))
    }
}
