//! Cloud machine-translation adapter (capability matrix row B): native
//! array-of-strings batch endpoint, Hebrew-capable, ~10,000 char cap.

use crate::error::{PipelineError, Result};
use crate::retry::with_retry;
use crate::subtitle::Language;
use crate::translate::{translate_chunked, ProviderCapabilities, ProviderId, Translator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com/translate";
const MAX_CHARS: usize = 10_000;

pub struct CloudMtTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl CloudMtTranslator {
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
            Language::En => "en",
            Language::De => "de",
            Language::He => "he",
            Language::Unknown => "en",
        }
    }

    async fn call(&self, texts: Vec<String>, target: Language) -> Result<Vec<String>> {
        let url = format!(
            "{}?api-version=3.0&to={}",
            self.endpoint,
            Self::normalize_code(target)
        );
        let body: Vec<CloudRequestItem> = texts.into_iter().map(|t| CloudRequestItem { text: t }).collect();

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.is_client_error() {
                return Err(PipelineError::ProviderContractViolation(format!(
                    "cloud provider rejected request ({}): {}",
                    status, text
                )));
            }
            return Err(PipelineError::ProviderTransient(format!(
                "cloud provider returned {}: {}",
                status, text
            )));
        }

        let parsed: Vec<CloudResponseItem> = serde_json::from_str(&text)?;
        Ok(parsed
            .into_iter()
            .map(|item| {
                item.translations
                    .into_iter()
                    .next()
                    .map(|t| t.text)
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[async_trait]
impl Translator for CloudMtTranslator {
    fn id(&self) -> ProviderId {
        ProviderId::CloudMt
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
            let results = with_retry("cloud-translate", || self.call(vec![chunk.clone()], target)).await?;
            Ok(results.into_iter().next().unwrap_or_default())
        })
        .await
    }

    async fn translate_batch(&self, texts: &[String], target: Language) -> Result<Vec<Option<String>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let owned = texts.to_vec();
        match with_retry("cloud-translate-batch", || self.call(owned.clone(), target)).await {
            Ok(results) if results.len() == texts.len() => Ok(results.into_iter().map(Some).collect()),
            Ok(results) => {
                warn!(
                    "cloud provider returned {} results for {} inputs, falling back to per-item",
                    results.len(),
                    texts.len()
                );
                Ok(self.translate_each(texts, target).await)
            }
            Err(_) => {
                warn!("cloud provider batch call failed, falling back to per-item");
                Ok(self.translate_each(texts, target).await)
            }
        }
    }
}

impl CloudMtTranslator {
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
struct CloudRequestItem {
    #[serde(rename = "Text")]
    text: String,
}

#[derive(Deserialize)]
struct CloudResponseItem {
    translations: Vec<CloudTranslation>,
}

#[derive(Deserialize)]
struct CloudTranslation {
    text: String,
}
