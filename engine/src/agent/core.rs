//! Orchestrator
//!
//! Entry point for agent-mode requests. Each call to `handle_request` runs the
//! same sequence to completion:
//!
//! 1. Received: record the user turn
//! 2. Classified: ask the model for an action (fallback: `generate_project`)
//! 3. Resolved: for `edit_file`, locate the target in the artifact store
//! 4. Executed: invoke exactly one handler
//! 5. Recorded: record the assistant turn and persist the conversation
//!
//! Handler failures, unresolved edit targets and persistence failures all end
//! up in the returned text or the log; `handle_request` itself cannot fail.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use sdk::errors::EngineError;
use sdk::types::ActionOutput;

use super::classifier::{ActionClassifier, ActionDecision, ActionKind};
use super::memory::{ConversationStore, Role};
use super::resolver::ReferenceResolver;
use crate::config::Config;
use crate::llm::{build_provider, LLMProvider};
use crate::secrets::{scrub, SecretCache};
use crate::tools::{ToolRegistry, Toolbox};

/// Maximum number of artifact files listed in an unresolved-edit diagnostic
const MAX_LISTED_FILES: usize = 20;

/// Orchestrator shared between concurrent callers; the mutex serializes
/// whole requests so turns are never interleaved.
pub type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

/// Result of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    /// Action that was dispatched
    pub action: ActionKind,

    /// Handler result or diagnostic
    pub output: ActionOutput,

    /// True when classification failed and the default action was used
    pub fallback: bool,
}

pub struct Orchestrator {
    classifier: ActionClassifier,
    toolbox: Arc<dyn Toolbox>,
    memory: ConversationStore,
    resolver: ReferenceResolver,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        toolbox: Arc<dyn Toolbox>,
        memory: ConversationStore,
        resolver: ReferenceResolver,
    ) -> Self {
        Self {
            classifier: ActionClassifier::new(provider),
            toolbox,
            memory,
            resolver,
        }
    }

    /// Wire up the configured provider, the production toolbox, the persisted
    /// conversation and the artifact store.
    pub fn from_config(config: &Config, secrets: SecretCache) -> Result<Self, EngineError> {
        let provider = build_provider(config, secrets.clone())?;
        let toolbox = Arc::new(ToolRegistry::new(config, Arc::clone(&provider), secrets));
        let memory = ConversationStore::open(config.memory_file());
        let resolver =
            ReferenceResolver::new(config.projects_dir()).with_workspace(&config.core.workspace);

        Ok(Self::new(provider, toolbox, memory, resolver))
    }

    pub fn shared(self) -> SharedOrchestrator {
        Arc::new(Mutex::new(self))
    }

    pub fn memory(&self) -> &ConversationStore {
        &self.memory
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub async fn handle_request(&mut self, prompt: &str) -> RequestOutcome {
        info!("Handling request ({} chars)", prompt.len());

        self.memory.append(Role::User, prompt);
        self.persist();

        let history = self.memory.render();
        let (decision, fallback) = match self.classifier.classify(prompt, &history).await {
            Some(decision) => (decision, false),
            None => {
                warn!(
                    "No valid action detected; defaulting to {}",
                    ActionKind::GenerateProject
                );
                (ActionDecision::GenerateProject, true)
            }
        };

        let action = decision.kind();
        info!("Selected action: {}", action);

        let output = match self.dispatch(prompt, decision).await {
            Ok(output) => output,
            Err(e) => {
                error!("Action {} failed: {}", action, e);
                ActionOutput::Text(format!("ERROR: {}", scrub(&e.to_string())))
            }
        };

        self.memory.append(
            Role::Assistant,
            format!("Used tool: {}\nResult: {}", action, output),
        );
        self.persist();

        RequestOutcome {
            action,
            output,
            fallback,
        }
    }

    async fn dispatch(
        &self,
        prompt: &str,
        decision: ActionDecision,
    ) -> Result<ActionOutput, EngineError> {
        match decision {
            ActionDecision::EditFile {
                file_path,
                instruction,
            } => {
                let instruction = if instruction.is_empty() {
                    prompt.to_string()
                } else {
                    instruction
                };

                let target = self.resolver.resolve(&file_path, &instruction);
                if !target.is_resolved() {
                    warn!("Edit target '{}' not found; skipping edit", file_path);
                    return Ok(ActionOutput::Text(self.unresolved_diagnostic(&file_path)));
                }

                self.toolbox.edit_file(&target.path, &instruction).await
            }
            ActionDecision::RunCommand { command } => self.toolbox.run_command(&command).await,
            ActionDecision::PushRemote {
                message,
                remote_url,
            } => {
                self.toolbox
                    .push_remote(&message, remote_url.as_deref())
                    .await
            }
            ActionDecision::GenerateProject => self.toolbox.generate_project(prompt).await,
        }
    }

    fn unresolved_diagnostic(&self, file_path: &str) -> String {
        let store = self.resolver.store();
        let mut text = if file_path.is_empty() {
            "ERROR: No file to edit was named.".to_string()
        } else {
            format!("ERROR: File not found: '{}'.", file_path)
        };
        text.push_str(&format!(
            " Provide a full path like '{}'.",
            store.root().join("project_1").join("app.py").display()
        ));

        let files = store.list_files();
        if files.is_empty() {
            text.push_str(" No generated projects exist yet.");
            return text;
        }

        text.push_str("\nKnown files:");
        for file in files.iter().take(MAX_LISTED_FILES) {
            text.push_str(&format!("\n  - {}", file.display()));
        }
        if files.len() > MAX_LISTED_FILES {
            text.push_str(&format!(
                "\n  ... and {} more",
                files.len() - MAX_LISTED_FILES
            ));
        }
        text
    }

    fn persist(&self) {
        if let Err(e) = self.memory.save() {
            warn!("Failed to save conversation; continuing in memory: {}", e);
        }
    }
}
