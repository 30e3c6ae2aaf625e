//! Bulk machine-translation adapter (capability matrix row A): native
//! batch endpoint, very large per-request character cap, no Hebrew.

use crate::error::{PipelineError, Result};
use crate::retry::with_retry;
use crate::subtitle::Language;
use crate::translate::{translate_chunked, ProviderCapabilities, ProviderId, Translator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://api.bulk-translate.example.com/v2/translate";
const MAX_CHARS: usize = 100_000;

pub struct BulkMtTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl BulkMtTranslator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn normalize_code(target: Language) -> &'static str {
        match target {
            Language::En => "EN-US",
            Language::De => "DE",
            Language::He => "HE",
            Language::Unknown => "EN-US",
        }
    }

    async fn call(&self, texts: Vec<String>, target: Language) -> Result<Vec<String>> {
        let request = BulkRequest {
            text: texts,
            target_lang: Self::normalize_code(target).to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status.is_client_error() {
                return Err(PipelineError::ProviderContractViolation(format!(
                    "bulk provider rejected request ({}): {}",
                    status, body
                )));
            }
            return Err(PipelineError::ProviderTransient(format!(
                "bulk provider returned {}: {}",
                status, body
            )));
        }

        let parsed: BulkResponse = serde_json::from_str(&body)?;
        Ok(parsed.translations.into_iter().map(|t| t.text).collect())
    }
}

#[async_trait]
impl Translator for BulkMtTranslator {
    fn id(&self) -> ProviderId {
        ProviderId::BulkMt
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_batch: true,
            supports_hebrew: false,
            max_chars_per_request: MAX_CHARS,
        }
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        translate_chunked(text, MAX_CHARS, |chunk| async move {
            let results = with_retry("bulk-translate", || self.call(vec![chunk.clone()], target)).await?;
            Ok(results.into_iter().next().unwrap_or_default())
        })
        .await
    }

    async fn translate_batch(&self, texts: &[String], target: Language) -> Result<Vec<Option<String>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let owned = texts.to_vec();
        match with_retry("bulk-translate-batch", || self.call(owned.clone(), target)).await {
            Ok(results) if results.len() == texts.len() => Ok(results.into_iter().map(Some).collect()),
            Ok(results) => {
                warn!(
                    "bulk provider returned {} results for {} inputs, falling back to per-item",
                    results.len(),
                    texts.len()
                );
                Ok(self.translate_each(texts, target).await)
            }
            Err(_) => {
                warn!("bulk provider batch call failed, falling back to per-item");
                Ok(self.translate_each(texts, target).await)
            }
        }
    }
}

impl BulkMtTranslator {
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
struct BulkRequest {
    text: Vec<String>,
    target_lang: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    translations: Vec<BulkTranslation>,
}

#[derive(Deserialize)]
struct BulkTranslation {
    text: String,
}
