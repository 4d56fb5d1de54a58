//! Conversation Store
//!
//! Append-only log of user and assistant turns, persisted as a human-readable
//! JSON array of `{role, content}` records. The in-memory log is authoritative:
//! a missing or malformed record loads as an empty store, and a failed save is
//! reported to the caller without touching the turns already held.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use sdk::errors::EngineError;

/// Who produced a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,

    /// Older records call this role `ai`
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    /// Prefix used when rendering a transcript for a prompt
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One recorded utterance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,

    #[serde(rename = "content")]
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered conversation history backed by a single JSON record.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    /// Backing record; `None` keeps the store in memory only
    path: Option<PathBuf>,

    turns: Vec<ConversationTurn>,
}

impl ConversationStore {
    /// A store that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the record at `path`.
    ///
    /// Absent or unparseable records produce an empty store; the latter is
    /// logged at warn level.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let turns = match Self::load(&path) {
            Ok(Some(turns)) => {
                info!("Loaded {} turns from {}", turns.len(), path.display());
                turns
            }
            Ok(None) => {
                debug!("No conversation record at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable conversation record {}: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        Self {
            path: Some(path),
            turns,
        }
    }

    fn load(path: &Path) -> Result<Option<Vec<ConversationTurn>>, EngineError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| EngineError::Config(format!("malformed conversation record: {}", e)))
    }

    /// Path of the backing record, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            text: text.into(),
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Transcript with `User:` / `AI:` prefixes, one turn per line.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.prefix(), turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Overwrite the backing record with the full log.
    ///
    /// The record is written to a sibling temp file and renamed into place so
    /// an interrupted save leaves the previous record intact.
    pub fn save(&self) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.turns)
            .map_err(|e| EngineError::Config(format!("failed to encode conversation: {}", e)))?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        debug!("Saved {} turns to {}", self.turns.len(), path.display());
        Ok(())
    }

    /// Drop every turn and persist the empty log.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        self.turns.clear();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_prefixes() {
        let mut store = ConversationStore::in_memory();
        store.append(Role::User, "make a todo app");
        store.append(Role::Assistant, "Used tool: generate_project\nResult: ok");

        assert_eq!(
            store.render(),
            "User: make a todo app\nAI: Used tool: generate_project\nResult: ok"
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_save_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory").join("agent_memory.json");

        let mut store = ConversationStore::open(&path);
        assert!(store.is_empty());
        store.append(Role::User, "hello");
        store.append(Role::Assistant, "hi");
        store.save().unwrap();

        let reopened = ConversationStore::open(&path);
        assert_eq!(reopened.turns(), store.turns());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_record_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent_memory.json");

        let mut store = ConversationStore::open(&path);
        store.append(Role::User, "hello");
        store.save().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([{"role": "user", "content": "hello"}]));
    }

    #[test]
    fn test_legacy_ai_role() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent_memory.json");
        std::fs::write(
            &path,
            r#"[{"role": "user", "content": "a"}, {"role": "ai", "content": "b"}]"#,
        )
        .unwrap();

        let store = ConversationStore::open(&path);
        assert_eq!(
            store.turns(),
            &[ConversationTurn::user("a"), ConversationTurn::assistant("b")]
        );
    }

    #[test]
    fn test_malformed_record_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent_memory.json");
        std::fs::write(&path, "{ not a list").unwrap();

        let mut store = ConversationStore::open(&path);
        assert!(store.is_empty());

        // the next save replaces the broken record
        store.append(Role::User, "fresh");
        store.save().unwrap();
        assert_eq!(ConversationStore::open(&path).len(), 1);
    }

    #[test]
    fn test_save_failure_keeps_turns() {
        let temp_dir = TempDir::new().unwrap();
        // a directory where the record should be makes the rename fail
        let path = temp_dir.path().join("agent_memory.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let mut store = ConversationStore::open(&path);
        store.append(Role::User, "still here");
        assert!(store.save().is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent_memory.json");

        let mut store = ConversationStore::open(&path);
        store.append(Role::User, "x");
        store.save().unwrap();
        store.clear().unwrap();

        assert!(ConversationStore::open(&path).is_empty());
    }
}
