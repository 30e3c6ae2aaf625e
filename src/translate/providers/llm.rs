//! LLM-emulated translation adapter (capability matrix row C): batch is
//! emulated by joining inputs on a sentinel delimiter and asking the model
//! to preserve it, since the underlying API has no native batch endpoint.

use crate::error::{PipelineError, Result};
use crate::retry::with_retry;
use crate::subtitle::Language;
use crate::translate::{translate_chunked, ProviderCapabilities, ProviderId, Translator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const MAX_CHARS: usize = 24_000;
/// Single-line, unlikely to occur in natural text, so item ordering
/// survives the round trip even if the model reflows whitespace.
const DELIMITER: &str = "<<<SCRIBE_SYNC_SEP>>>";

fn language_name(lang: Language) -> &'static str {
    match lang {
        Language::En => "English",
        Language::De => "German",
        Language::He => "Hebrew",
        Language::Unknown => "English",
    }
}

pub struct LlmMtTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl LlmMtTranslator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn single_prompt(text: &str, target: Language) -> String {
        format!(
            "Translate the following text to {}. Return ONLY the translation, \
             preserving line breaks and not adding commentary.\n\n{}",
            language_name(target),
            text
        )
    }

    fn batch_prompt(texts: &[String], target: Language) -> String {
        format!(
            "Translate each of the following {} sections to {}. Sections are \
             separated by the exact line `{}`. Return the same number of \
             sections separated by the exact same delimiter line, in the same \
             order, with no extra commentary before, between, or after them.\n\n{}",
            texts.len(),
            language_name(target),
            DELIMITER,
            texts.join(&format!("\n{}\n", DELIMITER))
        )
    }

    async fn call(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status.is_client_error() {
                return Err(PipelineError::ProviderContractViolation(format!(
                    "LLM provider rejected request ({}): {}",
                    status, body
                )));
            }
            return Err(PipelineError::ProviderTransient(format!(
                "LLM provider returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Translator for LlmMtTranslator {
    fn id(&self) -> ProviderId {
        ProviderId::LlmMt
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_batch: true,
            supports_hebrew: true,
            max_chars_per_request: MAX_CHARS,
        }
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        translate_chunked(text, MAX_CHARS, |chunk| async move {
            let prompt = Self::single_prompt(&chunk, target);
            let response = with_retry("llm-translate", || self.call(prompt.clone())).await?;
            Ok(response.trim().to_string())
        })
        .await
    }

    async fn translate_batch(&self, texts: &[String], target: Language) -> Result<Vec<Option<String>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() == 1 {
            return Ok(vec![self.translate(&texts[0], target).await.ok()]);
        }

        let prompt = Self::batch_prompt(texts, target);
        let response = with_retry("llm-translate-batch", || self.call(prompt.clone())).await;

        match response {
            Ok(text) => {
                let parts: Vec<String> = text
                    .split(DELIMITER)
                    .map(|p| p.trim().to_string())
                    .collect();
                if parts.len() == texts.len() {
                    Ok(parts.into_iter().map(Some).collect())
                } else {
                    warn!(
                        "LLM batch returned {} sections for {} inputs, falling back to per-item",
                        parts.len(),
                        texts.len()
                    );
                    Ok(self.translate_each(texts, target).await)
                }
            }
            Err(_) => {
                warn!("LLM batch call failed, falling back to per-item");
                Ok(self.translate_each(texts, target).await)
            }
        }
    }
}

impl LlmMtTranslator {
    async fn translate_each(&self, texts: &[String], target: Language) -> Vec<Option<String>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            match self.translate(text, target).await {
                Ok(t) => out.push(Some(t)),
                Err(e) => {
                    warn!("per-item fallback translation failed: {}", e);
                    out.push(None);
                }
            }
        }
        out
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
