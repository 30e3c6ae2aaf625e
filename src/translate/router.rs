use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::subtitle::Language;
use crate::translate::providers::{cloud::CloudMtTranslator, bulk::BulkMtTranslator, llm::LlmMtTranslator};
use crate::translate::{ProviderId, Translator};
use std::collections::HashMap;

/// Immutable registry of available translators, built once from
/// configured credentials, plus the routing rules that pick one per job.
pub struct Router {
    providers: HashMap<ProviderId, Box<dyn Translator>>,
}

impl Router {
    pub fn new(providers: Vec<Box<dyn Translator>>) -> Self {
        let providers = providers.into_iter().map(|p| (p.id(), p)).collect();
        Self { providers }
    }

    /// Builds a registry from whichever provider credentials are present
    /// in `config`. A provider with no credential is simply absent from
    /// the registry, not an error — `validate()` already ensured at least
    /// one exists.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn Translator>> = Vec::new();
        if let Some(key) = &config.provider_a_api_key {
            providers.push(Box::new(BulkMtTranslator::new(key.clone())));
        }
        if let Some(key) = &config.provider_b_api_key {
            providers.push(Box::new(CloudMtTranslator::new(key.clone())));
        }
        if let Some(key) = &config.provider_c_api_key {
            providers.push(Box::new(LlmMtTranslator::new(key.clone())));
        }
        Self::new(providers)
    }

    /// Picks a provider for `target`, honoring `hint` when it's available
    /// and capable, subject to the Hebrew routing rule always taking
    /// precedence: Hebrew jobs never route to the bulk provider
    /// regardless of hint, preferring the LLM provider over the cloud
    /// provider when both are present.
    pub fn select(&self, target: Language, hint: Option<ProviderId>) -> Result<&dyn Translator> {
        if target == Language::He {
            if let Some(id) = hint {
                if id != ProviderId::BulkMt {
                    if let Some(p) = self.capable(id, target) {
                        return Ok(p);
                    }
                }
            }
            for id in [ProviderId::LlmMt, ProviderId::CloudMt] {
                if let Some(p) = self.capable(id, target) {
                    return Ok(p);
                }
            }
            return Err(PipelineError::NoCapableProvider(
                "no Hebrew-capable provider configured".to_string(),
            ));
        }

        if let Some(id) = hint {
            if let Some(p) = self.capable(id, target) {
                return Ok(p);
            }
        }

        for id in [ProviderId::BulkMt, ProviderId::CloudMt, ProviderId::LlmMt] {
            if let Some(p) = self.capable(id, target) {
                return Ok(p);
            }
        }

        Err(PipelineError::NoCapableProvider(format!(
            "no provider configured for target language {}",
            target
        )))
    }

    fn capable(&self, id: ProviderId, target: Language) -> Option<&dyn Translator> {
        self.providers
            .get(&id)
            .filter(|p| p.capabilities().supports(target))
            .map(|p| p.as_ref())
    }
}
