//! LLM provider abstraction
//!
//! The assistant only ever needs single-shot text completion: a prompt goes in,
//! free text comes out. Structured data is pulled out of that text by
//! [`extract`]. Providers are selected by `llm.default_provider` in config.

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::sync::Arc;

use crate::config::Config;
use crate::secrets::SecretCache;

pub mod extract;
pub mod gemini;
pub mod ollama;

pub use extract::{extract_json, strip_code_fences};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::NetworkError(msg) => EngineError::Network(msg),
            other => EngineError::LLMProvider(other.to_string()),
        }
    }
}

/// Text-completion backend.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Provider name as used in config (`gemini`, `ollama`)
    fn name(&self) -> &str;

    /// True for providers running on the local machine
    fn is_local(&self) -> bool;

    /// Send `prompt` as a single user turn and return the model's raw text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Cheap readiness probe used by `kiln doctor` and `/api/status`.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the provider named by `config.llm.default_provider`.
pub fn build_provider(
    config: &Config,
    secrets: SecretCache,
) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    match config.llm.default_provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(
            config.llm.gemini.clone(),
            secrets,
        ))),
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
        )?)),
        other => Err(EngineError::Config(format!(
            "Unknown LLM provider '{}'",
            other
        ))),
    }
}
