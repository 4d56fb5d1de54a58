//! Model-driven file rewrite.

use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use sdk::errors::EngineError;

use crate::llm::{strip_code_fences, LLMProvider};

pub struct FileEditor {
    provider: Arc<dyn LLMProvider>,
}

impl FileEditor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    pub fn build_prompt(instruction: &str, original: &str) -> String {
        format!(
            "Modify the following code according to the user's request.\n\
             Keep the same structure and language.\n\n\
             Request: {instruction}\n\n\
             Original Code:\n```\n{original}\n```\n\
             Return only the modified code (no explanations, no markdown).\n"
        )
    }

    /// Replace the contents of `path` with the model's rewrite.
    ///
    /// An empty rewrite is refused so a bad reply cannot blank the file.
    pub async fn edit(&self, path: &Path, instruction: &str) -> Result<String, EngineError> {
        let original = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        info!("Editing {} ({} bytes)", path.display(), original.len());

        let reply = self
            .provider
            .complete(&Self::build_prompt(instruction, &original))
            .await?;

        let rewritten = strip_code_fences(&reply);
        if rewritten.trim().is_empty() {
            return Err(EngineError::ToolError(format!(
                "model returned an empty rewrite for {}",
                path.display()
            )));
        }

        fs::write(path, &rewritten).await?;
        debug!("Wrote {} bytes to {}", rewritten.len(), path.display());

        Ok(format!(
            "File '{}' updated successfully ({} bytes written)",
            path.display(),
            rewritten.len()
        ))
    }
}
