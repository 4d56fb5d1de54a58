//! Action output types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Links returned after publishing a project to a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBundle {
    pub repo_url: String,
    pub zip_url: String,
    pub codespaces_url: String,
}

impl LinkBundle {
    /// Build the bundle for a GitHub-style repository.
    ///
    /// `web_base` is the host's web root (e.g. `https://github.com`).
    pub fn for_repository(
        web_base: &str,
        repo_url: impl Into<String>,
        owner: &str,
        repo: &str,
    ) -> Self {
        let web_base = web_base.trim_end_matches('/');
        Self {
            repo_url: repo_url.into(),
            zip_url: format!("{}/{}/{}/archive/refs/heads/main.zip", web_base, owner, repo),
            codespaces_url: format!("{}/codespaces/new?repo={}/{}", web_base, owner, repo),
        }
    }
}

/// Output of a single dispatched action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActionOutput {
    /// Plain text result (success message or diagnostic)
    Text(String),

    /// Structured link bundle from a publish
    Links(LinkBundle),
}

impl ActionOutput {
    /// Create a text output
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the text if this is a text output
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Links(_) => None,
        }
    }

    /// Returns the links if this is a link bundle
    pub fn as_links(&self) -> Option<&LinkBundle> {
        match self {
            Self::Links(links) => Some(links),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ActionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Links(links) => write!(
                f,
                "Repository: {}\nZIP download: {}\nCodespaces: {}",
                links.repo_url, links.zip_url, links.codespaces_url
            ),
        }
    }
}

impl From<String> for ActionOutput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ActionOutput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<LinkBundle> for ActionOutput {
    fn from(links: LinkBundle) -> Self {
        Self::Links(links)
    }
}
