pub mod llm;

use crate::error::{PipelineError, Result};
use crate::subtitle::{Language, SubtitleFile};
use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

pub use llm::LlmClassifier;

/// A backend that turns a numbered list of texts into a raw classifier
/// response. `remind_format` is set on the single retry the detector
/// grants a batch that failed to parse.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, numbered_texts: &[String], remind_format: bool) -> Result<String>;
}

fn parse_strict(response: &str, n: usize) -> Option<Vec<Language>> {
    let line_re = Regex::new(r"^(\d+):\s*(English|German|Hebrew|Unknown)\s*$").unwrap();
    let lines: Vec<&str> = response.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() != n {
        return None;
    }

    let mut result = Vec::with_capacity(n);
    for (i, line) in lines.iter().enumerate() {
        let caps = line_re.captures(line)?;
        let num: usize = caps[1].parse().ok()?;
        if num != i + 1 {
            return None;
        }
        result.push(match &caps[2] {
            "English" => Language::En,
            "German" => Language::De,
            "Hebrew" => Language::He,
            "Unknown" => Language::Unknown,
            _ => return None,
        });
    }
    Some(result)
}

/// Assigns `detected_language` to every candidate segment of a file.
/// Segments that are empty, non-verbal, or shorter than 3
/// characters are left `Unknown` without ever being sent to the
/// classifier.
pub struct LanguageDetector<C: Classifier> {
    classifier: C,
    batch_size: usize,
}

impl<C: Classifier> LanguageDetector<C> {
    pub fn new(classifier: C, batch_size: usize) -> Self {
        Self {
            classifier,
            batch_size,
        }
    }

    pub async fn detect(&self, file: &mut SubtitleFile) -> Result<()> {
        let candidate_indices: Vec<usize> = file
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_translation_candidate())
            .map(|(i, _)| i)
            .collect();

        for batch in candidate_indices.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|&i| file.segments[i].text.clone()).collect();
            let langs = self.classify_batch(&texts).await;
            for (&idx, lang) in batch.iter().zip(langs.into_iter()) {
                file.segments[idx].detected_language = lang;
            }
        }

        Ok(())
    }

    async fn classify_batch(&self, texts: &[String]) -> Vec<Language> {
        let numbered = Self::number(texts);

        if let Ok(langs) = self.classify_once(&numbered, texts.len(), false).await {
            return langs;
        }

        warn!(
            "classifier response unparseable for batch of {}, retrying with format reminder",
            texts.len()
        );
        if let Ok(langs) = self.classify_once(&numbered, texts.len(), true).await {
            return langs;
        }

        warn!(
            "classifier batch of {} still unparseable after reprompt, falling back to per-segment",
            texts.len()
        );
        let mut langs = Vec::with_capacity(texts.len());
        for text in texts {
            let single = Self::number(std::slice::from_ref(text));
            match self.classify_once(&single, 1, false).await {
                Ok(mut v) => langs.push(v.pop().unwrap_or(Language::Unknown)),
                Err(_) => langs.push(Language::Unknown),
            }
        }
        langs
    }

    async fn classify_once(
        &self,
        numbered: &[String],
        n: usize,
        remind_format: bool,
    ) -> Result<Vec<Language>> {
        let response = self.classifier.classify(numbered, remind_format).await?;
        parse_strict(&response, n)
            .ok_or_else(|| PipelineError::Detection(format!("expected {} lines, got unparseable response", n)))
    }

    fn number(texts: &[String]) -> Vec<String> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}: {}", i + 1, t))
            .collect()
    }
}
