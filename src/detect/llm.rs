//! Classifier backed by a hosted chat-completion style API.

use crate::detect::Classifier;
use crate::error::{PipelineError, Result};
use crate::retry::with_retry;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// LLM-backed implementation of `Classifier`. One HTTP call per batch; the
/// strict-format parsing and the retry/fallback ladder live in
/// `LanguageDetector`, not here — this type's only job is turning a
/// numbered list of texts into the model's raw text response.
pub struct LlmClassifier {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl LlmClassifier {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_prompt(&self, numbered_texts: &[String], remind_format: bool) -> String {
        let reminder = if remind_format {
            "\n\nYour previous response did not follow the required format. \
             You MUST return exactly one line per input, formatted EXACTLY as \
             `<number>: <Language>` with no other text."
        } else {
            ""
        };

        format!(
            "Classify the primary spoken language of each of the following {} \
             numbered subtitle lines. Respond with exactly {} lines, one per \
             input, each formatted as `<number>: <Language>` where <Language> \
             is one of English, German, Hebrew, or Unknown. Loanwords, proper \
             nouns, and short quoted spans in another language do not change \
             the primary label.{}\n\n{}",
            numbered_texts.len(),
            numbered_texts.len(),
            reminder,
            numbered_texts.join("\n")
        )
    }

    async fn call(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status.is_client_error() {
                return Err(PipelineError::ProviderContractViolation(format!(
                    "classifier request rejected ({}): {}",
                    status, body
                )));
            }
            return Err(PipelineError::ProviderTransient(format!(
                "classifier returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text = parsed
            .candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .into_iter()
            .flatten()
            .next()
            .and_then(|p| p.text)
            .unwrap_or_default();

        let preview: String = text.chars().take(200).collect();
        debug!("classifier response: {}", preview);
        Ok(text)
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, numbered_texts: &[String], remind_format: bool) -> Result<String> {
        let prompt = self.build_prompt(numbered_texts, remind_format);
        with_retry("classify", || self.call(prompt.clone())).await
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_reminder_only_on_retry() {
        let classifier = LlmClassifier::new("key".to_string());
        let numbered = vec!["1: Hello".to_string()];
        let plain = classifier.build_prompt(&numbered, false);
        let reminded = classifier.build_prompt(&numbered, true);
        assert!(!plain.contains("did not follow"));
        assert!(reminded.contains("did not follow"));
    }
}
