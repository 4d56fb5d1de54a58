//! Reference Resolver
//!
//! Turns the classifier's (often partial) file reference into a concrete path
//! inside the artifact store. The first step that succeeds wins:
//!
//! 1. `explicit_ref` names an existing file → `Exact`
//! 2. the base name of `explicit_ref` is found in the store → `Resolved`
//! 3. `explicit_ref` has several whitespace-separated tokens and the last one
//!    is found in the store → `Resolved`
//! 4. `explicit_ref` is empty and `free_text` mentions a filename that is
//!    found in the store → `Resolved`
//! 5. `explicit_ref` is empty and `free_text` mentions a common entry point
//!    (`app.py`, `main.py`, `index.html`) found in the store → `Resolved`
//! 6. otherwise `Unresolved`
//!
//! Same-named files in different projects are disambiguated only by the
//! store's fixed traversal order, never by content.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::projects::ArtifactStore;

/// How a target was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Exact,
    Resolved,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub confidence: Confidence,
}

impl ResolvedTarget {
    pub fn is_resolved(&self) -> bool {
        self.confidence != Confidence::Unresolved
    }
}

static FILENAME_PATTERN: OnceLock<Regex> = OnceLock::new();
static ENTRY_POINT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn filename_pattern() -> &'static Regex {
    // json before js, yaml before yml: alternation is leftmost-first
    FILENAME_PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9_\-]+\.(?:py|html|css|json|js|md|txt|ts|rs|toml|yaml|yml)\b")
            .expect("Invalid filename pattern")
    })
}

fn entry_point_pattern() -> &'static Regex {
    ENTRY_POINT_PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:templates/index\.html|app\.py|main\.py|index\.html)\b")
            .expect("Invalid entry point pattern")
    })
}

pub struct ReferenceResolver {
    store: ArtifactStore,

    /// Base for relative explicit references; `None` uses the process cwd
    workspace: Option<PathBuf>,
}

impl ReferenceResolver {
    pub fn new(artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            store: ArtifactStore::new(artifact_root),
            workspace: None,
        }
    }

    /// Resolve relative explicit references against `workspace`.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn resolve(&self, explicit_ref: &str, free_text: &str) -> ResolvedTarget {
        let explicit_ref = explicit_ref.trim();

        if !explicit_ref.is_empty() {
            let candidate = self.absolute(Path::new(explicit_ref));
            if candidate.is_file() {
                debug!("Using exact path: {}", candidate.display());
                return ResolvedTarget {
                    path: candidate,
                    confidence: Confidence::Exact,
                };
            }

            if let Some(found) = Path::new(explicit_ref)
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.store.find_file(name))
            {
                return resolved(explicit_ref, found);
            }

            let tokens: Vec<&str> = explicit_ref.split_whitespace().collect();
            if tokens.len() > 1 {
                if let Some(found) = tokens
                    .last()
                    .and_then(|last| Path::new(last).file_name())
                    .and_then(|name| name.to_str())
                    .and_then(|name| self.store.find_file(name))
                {
                    return resolved(explicit_ref, found);
                }
            }
        } else {
            for m in filename_pattern().find_iter(free_text) {
                if let Some(found) = self.store.find_file(m.as_str()) {
                    return resolved(m.as_str(), found);
                }
            }

            for m in entry_point_pattern().find_iter(free_text) {
                let name = m.as_str().rsplit('/').next().unwrap_or(m.as_str());
                if let Some(found) = self.store.find_file(name) {
                    return resolved(m.as_str(), found);
                }
            }
        }

        debug!("Could not resolve file reference '{}'", explicit_ref);
        ResolvedTarget {
            path: PathBuf::from(explicit_ref),
            confidence: Confidence::Unresolved,
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        match &self.workspace {
            Some(workspace) if path.is_relative() => workspace.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn resolved(reference: &str, path: PathBuf) -> ResolvedTarget {
    debug!("Auto-resolved '{}' -> '{}'", reference, path.display());
    ResolvedTarget {
        path,
        confidence: Confidence::Resolved,
    }
}
