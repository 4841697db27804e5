//! Text-generation provider abstraction and implementations.
//!
//! Defines the [`TextGenerator`] trait and concrete backends:
//! - **[`OllamaGenerator`]** — calls a local Ollama instance's `/api/generate` endpoint.
//! - **[`GeminiGenerator`]** — calls the Google Gemini `generateContent` API.
//! - **[`DisabledGenerator`]** — returns errors; retrieval still works without a backend.
//!
//! Use [`create_generator`] to instantiate the configured backend once at
//! startup. Calls are not retried: a failed generation fails the query.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::answer::Language;
use crate::config::LlmConfig;

/// Persian system guidance prepended to Gemini prompts when the app
/// language is Persian.
const GEMINI_FA_PREAMBLE: &str = "لطفاً فقط به زبان فارسی، روان و خلاصه پاسخ بده. اگر پاسخ در متن موجود نبود، صریح بگو که اطلاعات کافی در متن موجود نیست.\n\n";

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Returns the model identifier (e.g. `"llama3"`, `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;
}

// ============ Disabled Generator ============

/// A no-op generator that always returns errors.
///
/// Used when `llm.provider = "disabled"`; document ingestion and source
/// search still work, only question answering is unavailable.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Text generation is disabled; configure llm.provider to answer questions")
    }

    fn model_name(&self) -> &str {
        "disabled"
    }
}

// ============ Ollama Generator ============

/// Generator backed by a local Ollama instance.
///
/// Calls `POST /api/generate` with `stream: false` and returns the
/// `response` field.
pub struct OllamaGenerator {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { model, url, client })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============ Gemini Generator ============

/// Generator backed by the Google Gemini API.
///
/// Calls `POST models/{model}:generateContent` with the API key from the
/// `GOOGLE_API_KEY` environment variable. Multi-part candidate responses
/// are joined with newlines.
pub struct GeminiGenerator {
    model: String,
    api_key: String,
    language: Language,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &LlmConfig, language: Language) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Google provider"))?;
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            api_key,
            language,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let prompt = if self.language == Language::Fa {
            format!("{}{}", GEMINI_FA_PREAMBLE, prompt)
        } else {
            prompt.to_string()
        };

        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
        });

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            bail!("Gemini error: {}", message);
        }

        parse_gemini_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extracts the first candidate's text parts, joined with newlines.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Gemini returned empty response"))?;

    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if texts.is_empty() {
        bail!("Gemini returned empty response");
    }

    Ok(texts.join("\n"))
}

/// Creates the configured [`TextGenerator`].
///
/// | Config value | Backend |
/// |--------------|---------|
/// | `"disabled"` | [`DisabledGenerator`] |
/// | `"ollama"`   | [`OllamaGenerator`] |
/// | `"google"`   | [`GeminiGenerator`] |
pub fn create_generator(
    config: &LlmConfig,
    language: Language,
) -> Result<Box<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        "google" => Ok(Box::new(GeminiGenerator::new(config, language)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
