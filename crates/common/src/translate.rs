//! Machine translation abstraction
//!
//! Fills memory gaps with a chat-completions model when no stored pair
//! matches. The trait keeps handlers testable without network access.

use crate::config::TranslatorConfig;
use crate::errors::{AppError, Result};
use crate::languages;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a single text between two language codes
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Chat-completions translation client
pub struct ChatTranslator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatTranslator {
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create translator HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Replace the configured key with one stored in settings
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = api_key;
        self
    }

    async fn request_with_retry(&self, prompt: &str, instruction: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries.max(1) {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(prompt, instruction).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Translation request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Translation {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, prompt: &str, instruction: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Translation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Translation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ChatResponse =
            response.json().await.map_err(|e| AppError::Translation {
                message: format!("Failed to parse response: {}", e),
            })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| AppError::Translation {
                message: "Empty response".to_string(),
            })
    }
}

/// Build the system prompt for one language pair. Language codes are
/// expanded to display names so the model is not guessing at ISO codes.
fn translation_instruction(source_language: &str, target_language: &str) -> String {
    let source = languages::name_for(source_language).unwrap_or(source_language);
    let target = languages::name_for(target_language).unwrap_or(target_language);
    format!(
        "You are a professional translator. Translate the user's text from {} to {}. \
         Respond with the translation only, no commentary.",
        source, target
    )
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let instruction = translation_instruction(source_language, target_language);
        self.request_with_retry(text, &instruction).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock translator for testing
pub struct MockTranslator;

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        Ok(format!("[{}] {}", target_language, text))
    }

    fn model_name(&self) -> &str {
        "mock-translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_translator() {
        let translator = MockTranslator;
        let out = translator.translate("Bonjour", "fr", "en").await.unwrap();
        assert_eq!(out, "[en] Bonjour");
    }

    #[test]
    fn test_instruction_expands_language_names() {
        let instruction = translation_instruction("fr", "tr");
        assert!(instruction.contains("from French to Turkish"));
    }

    #[test]
    fn test_instruction_passes_unknown_codes_through() {
        let instruction = translation_instruction("xx", "en");
        assert!(instruction.contains("from xx to English"));
    }
}
