pub mod srt;
pub mod vtt;

use std::time::Duration;

/// A detected or target language. `Unknown` is the default, not an absent
/// value — segments that are empty, non-verbal, or too short to classify
/// stay `Unknown` rather than becoming an `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Language {
    En,
    De,
    He,
    #[default]
    Unknown,
}

impl Language {
    /// Parses a language code, folding common aliases onto the same
    /// variant (`en`/`eng`/`english` all become `Language::En`).
    pub fn from_code(code: &str) -> Language {
        match code.to_lowercase().as_str() {
            "en" | "eng" | "english" => Language::En,
            "de" | "deu" | "ger" | "german" => Language::De,
            "he" | "heb" | "hebrew" => Language::He,
            _ => Language::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::He => "he",
            Language::Unknown => "unknown",
        }
    }

    pub fn is_equivalent(&self, other: Language) -> bool {
        *self == other
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fixed, closed set of non-translatable sound cues. Extensible only by
/// editing this array at compile time.
pub const NON_VERBAL_VOCABULARY: &[&str] = &[
    "\u{266a}",
    "\u{266a}\u{266a}",
    "[Music]",
    "[Applause]",
    "[Laughter]",
    "[Silence]",
    "...",
    "***",
    "--",
];

pub fn is_non_verbal(text: &str) -> bool {
    NON_VERBAL_VOCABULARY.contains(&text.trim())
}

/// Collapses runs of whitespace to a single space and trims the ends.
/// Used both as the dedup key and to normalize whitespace before writing
/// an `.orig.srt` back out.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One subtitle cue. `index`, `start`, and `end` are immutable after parse;
/// only `text` and `detected_language` are ever mutated downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
    pub detected_language: Language,
}

impl Segment {
    pub fn new(index: u32, start: Duration, end: Duration, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text,
            detected_language: Language::Unknown,
        }
    }

    /// Whitespace-normalized form of `text`, used as the dedup key.
    pub fn unique_text_key(&self) -> String {
        normalize_whitespace(&self.text)
    }

    /// Whether this segment is a candidate for translation at all,
    /// excluding the target-language comparison (callers combine this
    /// with a `detected_language != target` check since the predicate
    /// needs a target to be meaningful).
    pub fn is_translation_candidate(&self) -> bool {
        let trimmed = self.text.trim();
        !trimmed.is_empty() && !is_non_verbal(trimmed) && trimmed.chars().count() >= 3
    }
}

/// An ordered sequence of segments plus the path they were parsed from.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub source_path: std::path::PathBuf,
    pub segments: Vec<Segment>,
}

impl SubtitleFile {
    pub fn new(source_path: std::path::PathBuf, segments: Vec<Segment>) -> Self {
        Self {
            source_path,
            segments,
        }
    }

    /// Boundary check: same count, same index/start/end at every
    /// position, in the same order.
    pub fn has_same_boundaries_as(&self, other: &SubtitleFile) -> bool {
        if self.segments.len() != other.segments.len() {
            return false;
        }
        self.segments.iter().zip(other.segments.iter()).all(|(a, b)| {
            a.index == b.index && a.start == b.start && a.end == b.end
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_code_folds_aliases() {
        assert_eq!(Language::from_code("en"), Language::En);
        assert_eq!(Language::from_code("eng"), Language::En);
        assert_eq!(Language::from_code("English"), Language::En);
        assert_eq!(Language::from_code("fr"), Language::Unknown);
    }

    #[test]
    fn non_verbal_set_matches_exact_strings() {
        assert!(is_non_verbal("[Music]"));
        assert!(is_non_verbal("  [Music]  "));
        assert!(!is_non_verbal("[music]"));
    }

    #[test]
    fn normalize_whitespace_collapses_runs() {
        assert_eq!(normalize_whitespace("In   die   Wehrmacht"), "In die Wehrmacht");
        assert_eq!(normalize_whitespace("In die Wehrmacht"), "In die Wehrmacht");
    }

    #[test]
    fn translation_candidate_excludes_short_and_non_verbal() {
        let short = Segment::new(1, Duration::ZERO, Duration::ZERO, "Hi".to_string());
        assert!(!short.is_translation_candidate());

        let nonverbal = Segment::new(2, Duration::ZERO, Duration::ZERO, "♪♪".to_string());
        assert!(!nonverbal.is_translation_candidate());

        let real = Segment::new(3, Duration::ZERO, Duration::ZERO, "How are you?".to_string());
        assert!(real.is_translation_candidate());
    }

    #[test]
    fn boundary_check_detects_timing_drift() {
        let a = SubtitleFile::new(
            "a.srt".into(),
            vec![Segment::new(1, Duration::from_secs(0), Duration::from_secs(1), "x".into())],
        );
        let mut b = a.clone();
        b.segments[0].end = Duration::from_secs(2);
        assert!(!a.has_same_boundaries_as(&b));
    }
}
