//! Project generation: prompt the model for a files map and write it out.

use std::sync::Arc;
use tracing::{debug, info, warn};

use sdk::errors::EngineError;

use super::{ArtifactStore, GeneratedProject, ProjectSpec};
use crate::llm::{extract_json, LLMProvider};

pub struct ProjectGenerator {
    provider: Arc<dyn LLMProvider>,
    store: ArtifactStore,
}

impl ProjectGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, store: ArtifactStore) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn build_prompt(request: &str) -> String {
        format!(
            r##"You are an expert code generator.
Generate ONLY valid JSON (no markdown, no text outside the JSON).

Example format:
{{
    "files": {{
        "app.py": "# Flask app code...",
        "templates/index.html": "<html>...</html>",
        "static/script.js": "// JS code..."
    }},
    "main_file": "app.py"
}}

Task: {request}
"##
        )
    }

    /// Ask the model for a project and materialize it.
    ///
    /// # Errors
    /// `GenerationFailed` if the reply holds no decodable `{files, main_file}`
    /// object; provider and I/O errors pass through.
    pub async fn generate(&self, request: &str) -> Result<GeneratedProject, EngineError> {
        let reply = self
            .provider
            .complete(&Self::build_prompt(request))
            .await?;

        let value = extract_json(&reply).ok_or_else(|| {
            debug!("Unparseable generation reply: {}", reply);
            EngineError::GenerationFailed("model reply contained no JSON object".to_string())
        })?;

        let spec: ProjectSpec = serde_json::from_value(value)
            .map_err(|e| EngineError::GenerationFailed(format!("unexpected project shape: {}", e)))?;

        if spec.files.is_empty() {
            warn!("Model returned a project without files");
        }

        let project = self.store.materialize(&spec)?;
        info!("Generated project at {}", project.dir.display());
        Ok(project)
    }
}
