use super::{LLMError, LLMProvider};
use crate::config::GeminiConfig;
use crate::secrets::{SecretCache, GEMINI_API_KEY};
use async_trait::async_trait;
use serde_json::json;

pub struct GeminiProvider {
    config: GeminiConfig,
    secret_cache: SecretCache,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, secret_cache: SecretCache) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            api_key
        )
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret(GEMINI_API_KEY)
    }

    async fn complete(&self, prompt: &str) -> super::Result<String> {
        let api_key = self
            .secret_cache
            .get_secret(GEMINI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        });

        tracing::debug!(
            "Gemini request: model={}, prompt_chars={}",
            self.config.model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint(api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    // reqwest includes the URL, which carries the key
                    LLMError::NetworkError(e.without_url().to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                400 | 404 => LLMError::InvalidRequest(text),
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::ProviderUnavailable(format!(
                    "Gemini API error ({}): {}",
                    status, text
                )),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let parts = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::ParseError("No candidate content in response".to_string()))?;

        let full_text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect();

        Ok(full_text)
    }
}
