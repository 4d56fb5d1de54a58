//! Action Classifier
//!
//! Asks the model to pick exactly one action for a request and decodes its
//! reply into the closed [`ActionDecision`] type. Anything the decoder does not
//! recognise is rejected here, before dispatch.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{extract_json, LLMProvider};

/// Tag of an [`ActionDecision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    EditFile,
    RunCommand,
    PushRemote,
    GenerateProject,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::EditFile,
        ActionKind::RunCommand,
        ActionKind::PushRemote,
        ActionKind::GenerateProject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::EditFile => "edit_file",
            ActionKind::RunCommand => "run_command",
            ActionKind::PushRemote => "push_remote",
            ActionKind::GenerateProject => "generate_project",
        }
    }

    /// One-line description embedded in the classification prompt
    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::EditFile => "modify an existing file of a generated project",
            ActionKind::RunCommand => "execute a shell or terminal command",
            ActionKind::PushRemote => "commit the latest project and push it to a remote repository",
            ActionKind::GenerateProject => "create a new project from scratch",
        }
    }

    /// Accepts both the canonical names and the older tool names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "edit_file" | "file_editor" => Some(ActionKind::EditFile),
            "run_command" | "command_runner" => Some(ActionKind::RunCommand),
            "push_remote" | "git_manager" => Some(ActionKind::PushRemote),
            "generate_project" | "project_generator" => Some(ActionKind::GenerateProject),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single action chosen for a request, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDecision {
    EditFile {
        /// Possibly partial or empty; see `ReferenceResolver`
        file_path: String,
        instruction: String,
    },
    RunCommand {
        command: String,
    },
    PushRemote {
        message: String,
        remote_url: Option<String>,
    },
    GenerateProject,
}

impl ActionDecision {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionDecision::EditFile { .. } => ActionKind::EditFile,
            ActionDecision::RunCommand { .. } => ActionKind::RunCommand,
            ActionDecision::PushRemote { .. } => ActionKind::PushRemote,
            ActionDecision::GenerateProject => ActionKind::GenerateProject,
        }
    }

    /// Decode a structured reply.
    ///
    /// The action name is read from `action` (or `tool`), arguments from the
    /// `args` object. Returns `None` for non-objects and unknown actions.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj
            .get("action")
            .or_else(|| obj.get("tool"))
            .and_then(Value::as_str)?;
        let kind = ActionKind::parse(name)?;

        let empty = Map::new();
        let args = obj.get("args").and_then(Value::as_object).unwrap_or(&empty);

        Some(match kind {
            ActionKind::EditFile => ActionDecision::EditFile {
                file_path: arg(args, &["file_path", "path"]).unwrap_or_default(),
                instruction: arg(args, &["modification_prompt", "instruction"])
                    .unwrap_or_default(),
            },
            ActionKind::RunCommand => ActionDecision::RunCommand {
                command: arg(args, &["cmd", "command"]).unwrap_or_default(),
            },
            ActionKind::PushRemote => ActionDecision::PushRemote {
                message: arg(args, &["message"]).unwrap_or_default(),
                remote_url: arg(args, &["remote_url"]).filter(|url| !url.is_empty()),
            },
            ActionKind::GenerateProject => ActionDecision::GenerateProject,
        })
    }
}

/// First present, non-null argument among `keys`, trimmed.
/// Non-string values are rendered as JSON text.
fn arg(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| args.get(*key))
        .find(|value| !value.is_null())
        .map(|value| match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
}

/// Model-backed request classifier
pub struct ActionClassifier {
    provider: Arc<dyn LLMProvider>,
}

impl ActionClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Classification prompt: action vocabulary, history, then the request.
    pub fn build_prompt(request: &str, history: &str) -> String {
        let actions = ActionKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{}. {} - {}", i + 1, kind.as_str(), kind.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let names = ActionKind::ALL
            .iter()
            .map(|kind| format!("\"{}\"", kind.as_str()))
            .collect::<Vec<_>>()
            .join(" | ");

        format!(
            r#"You are the controller of a coding assistant with memory.

You can take exactly one of these actions:
{actions}

Previous conversation:
{history}

Decide which ONE action best satisfies this request:
"{request}"

Respond with JSON only:
{{
    "action": {names},
    "args": {{
        "file_path": "file to edit, if editing",
        "modification_prompt": "the change to make, if editing",
        "cmd": "the command, if running a command",
        "message": "commit message, if pushing",
        "remote_url": "optional remote repository url, if pushing"
    }}
}}
"#
        )
    }

    /// Returns `None` when the model is unreachable, replies without a
    /// structured object, or names an unknown action. No retry.
    pub async fn classify(&self, request: &str, history: &str) -> Option<ActionDecision> {
        let prompt = Self::build_prompt(request, history);

        let reply = match self.provider.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Classification request to {} failed: {}", self.provider.name(), e);
                return None;
            }
        };

        let Some(value) = extract_json(&reply) else {
            warn!("Could not parse action choice from model reply");
            debug!("Unparseable classification reply: {}", reply);
            return None;
        };

        let decision = ActionDecision::from_value(&value);
        if decision.is_none() {
            warn!("Model chose an unknown action: {}", value);
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_vocabulary() {
        let decision = ActionDecision::from_value(&json!({
            "action": "edit_file",
            "args": {"file_path": "app.py", "modification_prompt": "add a /health route"}
        }))
        .unwrap();

        assert_eq!(
            decision,
            ActionDecision::EditFile {
                file_path: "app.py".to_string(),
                instruction: "add a /health route".to_string(),
            }
        );
        assert_eq!(decision.kind(), ActionKind::EditFile);
    }

    #[test]
    fn test_legacy_vocabulary() {
        let decision =
            ActionDecision::from_value(&json!({"tool": "command_runner", "args": {"cmd": "ls -la"}}))
                .unwrap();
        assert_eq!(
            decision,
            ActionDecision::RunCommand {
                command: "ls -la".to_string()
            }
        );

        let decision = ActionDecision::from_value(&json!({"tool": "git_manager"})).unwrap();
        assert_eq!(
            decision,
            ActionDecision::PushRemote {
                message: String::new(),
                remote_url: None
            }
        );
    }

    #[test]
    fn test_argument_aliases() {
        let decision = ActionDecision::from_value(&json!({
            "action": "file_editor",
            "args": {"path": "templates/index.html", "instruction": "dark theme"}
        }))
        .unwrap();
        assert_eq!(
            decision,
            ActionDecision::EditFile {
                file_path: "templates/index.html".to_string(),
                instruction: "dark theme".to_string(),
            }
        );

        let decision = ActionDecision::from_value(&json!({
            "action": "push_remote",
            "args": {"message": "init", "remote_url": "https://example.test/r.git"}
        }))
        .unwrap();
        assert_eq!(
            decision,
            ActionDecision::PushRemote {
                message: "init".to_string(),
                remote_url: Some("https://example.test/r.git".to_string()),
            }
        );
    }

    #[test]
    fn test_non_string_arguments_are_stringified() {
        let decision =
            ActionDecision::from_value(&json!({"action": "run_command", "args": {"cmd": 42}}))
                .unwrap();
        assert_eq!(
            decision,
            ActionDecision::RunCommand {
                command: "42".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(ActionDecision::from_value(&json!({"action": "delete_everything"})).is_none());
        assert!(ActionDecision::from_value(&json!({"args": {}})).is_none());
        assert!(ActionDecision::from_value(&json!({"action": 3})).is_none());
        assert!(ActionDecision::from_value(&json!(["edit_file"])).is_none());
    }

    #[test]
    fn test_prompt_contains_vocabulary_and_history() {
        let prompt = ActionClassifier::build_prompt("run the tests", "User: hi\nAI: hello");
        for kind in ActionKind::ALL {
            assert!(prompt.contains(kind.as_str()));
        }
        assert!(prompt.contains("User: hi\nAI: hello"));
        assert!(prompt.contains("\"run the tests\""));
    }
}
