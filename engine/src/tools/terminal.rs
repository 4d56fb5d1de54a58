//! Terminal Tool
//!
//! Runs commands through the platform shell (`sh -c`, or `cmd /C` on Windows)
//! in the workspace directory. The result is always text: a command that fails,
//! times out or cannot start is described in the returned string rather than
//! raised, so the caller can record it like any other output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::secrets::scrub;

#[derive(Debug, Clone)]
pub struct TerminalTool {
    work_dir: PathBuf,
    timeout: Duration,
}

impl TerminalTool {
    pub fn new(work_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout,
        }
    }

    fn shell(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }

    /// Execute `command` and describe what happened.
    pub async fn execute(&self, command: &str) -> String {
        let command = command.trim();
        if command.is_empty() {
            return "ERROR: No command provided".to_string();
        }

        info!("Executing terminal command: {}", scrub(command));
        let mut cmd = Self::shell(command);
        cmd.current_dir(&self.work_dir);
        self.capture(cmd).await
    }

    /// Run a generated project's main file with an interpreter picked by its
    /// extension.
    pub async fn run_file(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let program = match extension.as_str() {
            "py" if cfg!(windows) => "python",
            "py" => "python3",
            "js" => "node",
            "sh" => "sh",
            "rb" => "ruby",
            _ => {
                return format!(
                    "ERROR: Don't know how to run '{}'; open it directly",
                    path.display()
                );
            }
        };

        info!("Running {} with {}", path.display(), program);
        let mut cmd = Command::new(program);
        cmd.arg(path);
        if let Some(dir) = path.parent() {
            cmd.current_dir(dir);
        }
        self.capture(cmd).await
    }

    async fn capture(&self, mut cmd: Command) -> String {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Failed to start command: {}", e);
                return format!("ERROR: Failed to start command: {}", e);
            }
            Err(_) => {
                warn!("Command timed out after {}s", self.timeout.as_secs());
                return format!(
                    "ERROR: Command timed out after {} seconds",
                    self.timeout.as_secs()
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let text = if output.status.success() {
            debug!("Command succeeded");
            match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
                (true, true) => "Command completed with no output".to_string(),
                (false, true) => stdout.into_owned(),
                (true, false) => stderr.into_owned(),
                (false, false) => format!("{}\nErrors:\n{}", stdout, stderr),
            }
        } else {
            warn!("Command failed with status: {}", output.status);
            format!(
                "Command failed with status: {}\nStdout: {}\nStderr: {}",
                output.status, stdout, stderr
            )
        };

        scrub(&text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tool(dir: &Path) -> TerminalTool {
        TerminalTool::new(dir, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_captures_stdout_in_work_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();

        let output = tool(temp_dir.path()).execute("ls").await;
        assert!(output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_failure_is_text() {
        let temp_dir = TempDir::new().unwrap();
        let output = tool(temp_dir.path())
            .execute("echo oops >&2; exit 3")
            .await;
        assert!(output.starts_with("Command failed with status"));
        assert!(output.contains("oops"));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            tool(temp_dir.path()).execute("   ").await,
            "ERROR: No command provided"
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let terminal = TerminalTool::new(temp_dir.path(), Duration::from_millis(200));
        let output = terminal.execute("sleep 5").await;
        assert!(output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_run_file_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let output = tool(temp_dir.path())
            .run_file(&temp_dir.path().join("index.html"))
            .await;
        assert!(output.starts_with("ERROR: Don't know how to run"));
    }

    #[tokio::test]
    async fn test_run_shell_file() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("main.sh");
        std::fs::write(&script, "echo generated").unwrap();

        let output = tool(temp_dir.path()).run_file(&script).await;
        assert_eq!(output.trim(), "generated");
    }
}
