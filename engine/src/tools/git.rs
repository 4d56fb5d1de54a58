//! Publishing generated projects to a remote git host.
//!
//! Without an explicit remote, a repository named after the project directory
//! is created through the GitHub REST API and the project is force-pushed to
//! its `main` branch. All git commands run with `current_dir` set to the
//! project; the process working directory is never changed.

use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use sdk::errors::EngineError;
use sdk::types::{ActionOutput, LinkBundle};

use crate::config::GithubConfig;
use crate::projects::ArtifactStore;
use crate::secrets::{scrub, SecretCache, GITHUB_TOKEN};

/// Subset of the repository object returned by `POST /user/repos`
#[derive(Debug, Deserialize)]
struct CreatedRepo {
    clone_url: String,
    html_url: String,
    owner: RepoOwner,
}

#[derive(Debug, Deserialize)]
struct RepoOwner {
    login: String,
}

pub struct GitPublisher {
    store: ArtifactStore,
    config: GithubConfig,
    secrets: SecretCache,
    client: reqwest::Client,
}

impl GitPublisher {
    pub fn new(store: ArtifactStore, config: GithubConfig, secrets: SecretCache) -> Self {
        Self {
            store,
            config,
            secrets,
            client: reqwest::Client::new(),
        }
    }

    /// Commit the most recent project and push it.
    pub async fn publish_latest(
        &self,
        message: &str,
        remote_url: Option<&str>,
    ) -> Result<ActionOutput, EngineError> {
        let project = self.store.latest()?;
        let repo_name = project
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| EngineError::Git(format!("bad project path {}", project.display())))?;

        if let Some(url) = remote_url.filter(|u| !u.trim().is_empty()) {
            commit_and_push(&project, message, url, None).await?;
            info!("Pushed {} to {}", repo_name, scrub(url));
            return Ok(ActionOutput::Text(format!(
                "Pushed {} to {}",
                project.display(),
                scrub(url)
            )));
        }

        let token = self.secrets.get_secret(GITHUB_TOKEN)?;
        let repo = self.create_repository(&repo_name, token.unsecure()).await?;
        let owner = self
            .config
            .username
            .clone()
            .unwrap_or_else(|| repo.owner.login.clone());

        let push_url = with_credentials(&repo.clone_url, token.unsecure());
        commit_and_push(&project, message, &repo.clone_url, Some(&push_url)).await?;
        info!("Code pushed to {}", repo.html_url);

        Ok(ActionOutput::Links(LinkBundle::for_repository(
            &self.config.web_base,
            repo.html_url,
            &owner,
            &repo_name,
        )))
    }

    async fn create_repository(&self, name: &str, token: &str) -> Result<CreatedRepo, EngineError> {
        let url = format!("{}/user/repos", self.config.api_base.trim_end_matches('/'));
        debug!("Creating repository '{}' via {}", name, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "kiln")
            .json(&json!({
                "name": name,
                "description": "Repo created by kiln",
                "private": self.config.private,
            }))
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Repository creation failed ({})", status);
            return Err(EngineError::RemoteHost(format!(
                "repository creation failed ({}): {}",
                status,
                scrub(&body)
            )));
        }

        response
            .json::<CreatedRepo>()
            .await
            .map_err(|e| EngineError::RemoteHost(format!("unexpected repository response: {}", e)))
    }
}

/// `https://host/...` → `https://x-access-token:<token>@host/...`; other URLs unchanged.
fn with_credentials(clone_url: &str, token: &str) -> String {
    match clone_url.strip_prefix("https://") {
        Some(rest) if !rest.contains('@') => format!("https://x-access-token:{}@{}", token, rest),
        _ => clone_url.to_string(),
    }
}

/// Commit everything in `dir` and force-push it to `main`.
///
/// `origin` is always recorded as `remote`. A credentialed `push_url` is only
/// passed on the push command line and never written to `.git/config`.
async fn commit_and_push(
    dir: &Path,
    message: &str,
    remote: &str,
    push_url: Option<&str>,
) -> Result<(), EngineError> {
    git(dir, &["init"]).await?;
    git(dir, &["add", "."]).await?;

    let mut commit: Vec<&str> = Vec::new();
    if git(dir, &["config", "user.email"]).await.is_err() {
        commit.extend(["-c", "user.name=kiln", "-c", "user.email=kiln@localhost"]);
    }
    commit.extend(["commit", "-m", message]);
    if let Err(e) = git(dir, &commit).await {
        // re-publishing an unchanged project
        if !e.to_string().contains("nothing to commit") {
            return Err(e);
        }
        debug!("Nothing new to commit in {}", dir.display());
    }

    if let Err(e) = git(dir, &["branch", "-M", "main"]).await {
        debug!("Ignoring branch rename failure: {}", e);
    }
    if git(dir, &["remote", "remove", "origin"]).await.is_err() {
        debug!("No existing origin in {}", dir.display());
    }
    git(dir, &["remote", "add", "origin", remote]).await?;
    match push_url {
        Some(url) => git(dir, &["push", "--force", url, "main:main"]).await?,
        None => git(dir, &["push", "-u", "origin", "main", "--force"]).await?,
    };
    Ok(())
}

async fn git(dir: &Path, args: &[&str]) -> Result<String, EngineError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| EngineError::Git(format!("failed to run git: {}", e)))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let verb = args.iter().find(|a| !a.starts_with('-') && !a.contains('=')).unwrap_or(&"");
    Err(EngineError::Git(scrub(&format!(
        "git {} failed ({}): {}{}",
        verb,
        output.status,
        stdout.trim(),
        stderr.trim()
    ))))
}
