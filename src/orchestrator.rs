//! Decides which segments need translation, translates each unique text
//! exactly once, reassembles a subtitle file with identical timing and
//! indices, and validates the boundary invariant before handing the
//! result back to the caller.

use crate::error::{PipelineError, Result};
use crate::subtitle::{Language, Segment, SubtitleFile};
use crate::translate::{ProviderId, Router};
use std::collections::HashMap;
use tracing::warn;

pub struct Orchestrator<'a> {
    router: &'a Router,
    translate_batch_size: usize,
}

/// Result of translating one file to one target language.
pub struct TranslationOutcome {
    pub file: SubtitleFile,
    /// Dedup keys whose translation failed even after fallback; those
    /// segments were preserved verbatim rather than emptied.
    pub preserved_keys: Vec<String>,
}

/// Diagnostic summary of a job before it runs (not load-bearing — it has
/// no effect on translation, only on what gets logged/reported).
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEstimate {
    pub total_candidates: usize,
    pub unique_texts: usize,
    pub dedup_efficiency_pct: f64,
}

fn should_translate(segment: &Segment, target: Language) -> bool {
    segment.is_translation_candidate() && segment.detected_language != target
}

impl<'a> Orchestrator<'a> {
    pub fn new(router: &'a Router, translate_batch_size: usize) -> Self {
        Self {
            router,
            translate_batch_size,
        }
    }

    /// Computes unique-text count and dedup efficiency for a file/target
    /// pair without performing any translation.
    pub fn estimate(&self, source: &SubtitleFile, target: Language) -> TranslationEstimate {
        let mut seen = std::collections::HashSet::new();
        let mut total_candidates = 0;
        for segment in &source.segments {
            if should_translate(segment, target) {
                total_candidates += 1;
                seen.insert(segment.unique_text_key());
            }
        }
        let unique_texts = seen.len();
        let dedup_efficiency_pct = if total_candidates == 0 {
            0.0
        } else {
            100.0 * (1.0 - (unique_texts as f64 / total_candidates as f64))
        };
        TranslationEstimate {
            total_candidates,
            unique_texts,
            dedup_efficiency_pct,
        }
    }

    pub async fn translate_file(
        &self,
        source: &SubtitleFile,
        target: Language,
        provider_hint: Option<ProviderId>,
    ) -> Result<TranslationOutcome> {
        let mut unique_keys: Vec<String> = Vec::new();
        let mut key_to_slot: HashMap<String, usize> = HashMap::new();

        for segment in &source.segments {
            if should_translate(segment, target) {
                let key = segment.unique_text_key();
                key_to_slot.entry(key.clone()).or_insert_with(|| {
                    unique_keys.push(key);
                    unique_keys.len() - 1
                });
            }
        }

        let mut translations: Vec<Option<String>> = vec![None; unique_keys.len()];

        if !unique_keys.is_empty() {
            let provider = self.router.select(target, provider_hint)?;

            let indices: Vec<usize> = (0..unique_keys.len()).collect();
            for chunk in indices.chunks(self.translate_batch_size) {
                let texts: Vec<String> = chunk.iter().map(|&i| unique_keys[i].clone()).collect();
                let results = provider.translate_batch(&texts, target).await?;
                for (&i, result) in chunk.iter().zip(results) {
                    translations[i] = result;
                }
            }
        }

        let mut preserved_keys = Vec::new();
        let mut out_segments = Vec::with_capacity(source.segments.len());

        for segment in &source.segments {
            let mut out = segment.clone();
            if should_translate(segment, target) {
                let key = segment.unique_text_key();
                let slot = key_to_slot[&key];
                match &translations[slot] {
                    Some(translated) => out.text = translated.trim().to_string(),
                    None => {
                        if !preserved_keys.contains(&key) {
                            warn!("translation failed for key {:?}, preserving original text", key);
                            preserved_keys.push(key);
                        }
                    }
                }
            }
            out_segments.push(out);
        }

        let out_file = SubtitleFile::new(source.source_path.clone(), out_segments);

        if !source.has_same_boundaries_as(&out_file) {
            return Err(PipelineError::BoundaryViolation(format!(
                "segment boundaries changed while translating {}",
                source.source_path.display()
            )));
        }

        Ok(TranslationOutcome {
            file: out_file,
            preserved_keys,
        })
    }
}
