pub mod providers;
pub mod router;

use crate::subtitle::Language;
use async_trait::async_trait;
use std::future::Future;

pub use router::Router;

/// Identifies one of the three adapter kinds recognized by the router: a
/// bulk machine-translation provider with no Hebrew support, a cloud
/// machine-translation provider, and an LLM that emulates batch
/// translation via a delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    BulkMt,
    CloudMt,
    LlmMt,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderId::BulkMt => "bulk-mt",
            ProviderId::CloudMt => "cloud-mt",
            ProviderId::LlmMt => "llm-mt",
        };
        write!(f, "{}", name)
    }
}

/// Static capability description for one provider. `max_chars_per_request`
/// drives chunking of long single-text calls; it never splits batch
/// items, which are segment-sized.
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    pub supports_batch: bool,
    pub supports_hebrew: bool,
    pub max_chars_per_request: usize,
}

impl ProviderCapabilities {
    pub fn supports(&self, lang: Language) -> bool {
        match lang {
            Language::He => self.supports_hebrew,
            _ => true,
        }
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn id(&self) -> ProviderId;
    fn capabilities(&self) -> ProviderCapabilities;

    async fn translate(&self, text: &str, target: Language) -> crate::error::Result<String>;

    /// Translates a batch. The returned vector always has the same length
    /// as `texts`; an entry is `None` when that item's translation failed
    /// even after the per-item fallback — the caller treats
    /// a `None` as "preserve the original text", not as an error.
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Language,
    ) -> crate::error::Result<Vec<Option<String>>>;
}

/// Splits `text` so each chunk fits under `max_chars`, preferring
/// paragraph boundaries and falling back to sentence boundaries within an
/// over-long paragraph. Chunks target 95% of the cap to leave headroom
/// for provider-side overhead.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let target = (max_chars as f64 * 0.95) as usize;
    if text.chars().count() <= target {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let pieces: Vec<String> = if paragraph.chars().count() > target {
            split_into_sentences(paragraph, target)
        } else {
            vec![paragraph.to_string()]
        };

        for piece in pieces {
            let candidate_len = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 2 + piece.chars().count()
            };

            if candidate_len > target && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }

            if current.is_empty() {
                current = piece;
            } else {
                current.push_str("\n\n");
                current.push_str(&piece);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_into_sentences(paragraph: &str, target: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = paragraph.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if (c == b'.' || c == b'!' || c == b'?')
            && bytes.get(i + 1).is_some_and(|b| b.is_ascii_whitespace())
        {
            sentences.push(paragraph[start..=i].trim().to_string());
            start = i + 1;
        }
        i += 1;
    }
    if start < paragraph.len() {
        sentences.push(paragraph[start..].trim().to_string());
    }
    sentences.retain(|s| !s.is_empty());

    // Group adjacent sentences back up to the target so we don't emit one
    // chunk per sentence when several fit together.
    let mut grouped = Vec::new();
    let mut current = String::new();
    for s in sentences {
        let candidate_len = if current.is_empty() {
            s.chars().count()
        } else {
            current.chars().count() + 1 + s.chars().count()
        };
        if candidate_len > target && !current.is_empty() {
            grouped.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            current = s;
        } else {
            current.push(' ');
            current.push_str(&s);
        }
    }
    if !current.is_empty() {
        grouped.push(current);
    }
    grouped
}

/// Runs a single-text translation through chunking: short texts make one
/// call, long ones are split, translated chunk by chunk, and rejoined
/// with the paragraph separator.
pub async fn translate_chunked<F, Fut>(
    text: &str,
    max_chars: usize,
    mut call: F,
) -> crate::error::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = crate::error::Result<String>>,
{
    let chunks = split_into_chunks(text, max_chars);
    if chunks.len() == 1 {
        return call(chunks.into_iter().next().expect("non-empty")).await;
    }
    let mut translated = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        translated.push(call(chunk).await?);
    }
    Ok(translated.join("\n\n"))
}

/// Post-condition check used by the Hebrew-routing test: asserts the
/// output actually contains Hebrew script rather than trusting the
/// provider blindly.
pub fn validate_hebrew(text: &str) -> bool {
    text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c))
}
