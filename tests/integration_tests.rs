//! Integration tests exercising the subtitle codec, the translation
//! orchestrator, the provider router, and the batch reprocessor together,
//! without requiring network access or real provider credentials.

use async_trait::async_trait;
use scribe_sync::batch::registry::FsInterviewRegistry;
use scribe_sync::batch::reprocessor::{Reprocessor, ReprocessorOptions};
use scribe_sync::detect::{Classifier, LanguageDetector};
use scribe_sync::error::Result;
use scribe_sync::orchestrator::Orchestrator;
use scribe_sync::subtitle::{srt, vtt, Language, Segment, SubtitleFile};
use scribe_sync::translate::{ProviderCapabilities, ProviderId, Router, Translator};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

fn seg(index: u32, start_s: u64, end_s: u64, text: &str, lang: Language) -> Segment {
    let mut s = Segment::new(index, Duration::from_secs(start_s), Duration::from_secs(end_s), text.to_string());
    s.detected_language = lang;
    s
}

struct GermanTranslator;

#[async_trait]
impl Translator for GermanTranslator {
    fn id(&self) -> ProviderId {
        ProviderId::LlmMt
    }
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_batch: true,
            supports_hebrew: true,
            max_chars_per_request: 50_000,
        }
    }
    async fn translate(&self, text: &str, _target: Language) -> Result<String> {
        Ok(format!("[DE] {}", text))
    }
    async fn translate_batch(&self, texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
        Ok(texts.iter().map(|t| Some(format!("[DE] {}", t))).collect())
    }
}

// ============================================================================
// Seed scenarios from the translation pipeline behavior
// ============================================================================

mod seed_scenario_tests {
    use super::*;

    #[tokio::test]
    async fn mixed_en_de_preservation() {
        let file = SubtitleFile::new(
            "x.srt".into(),
            vec![
                seg(1, 0, 3, "In die Wehrmacht gekommen?", Language::De),
                seg(2, 3, 6, "How did you feel?", Language::En),
            ],
        );

        let router = Router::new(vec![Box::new(GermanTranslator)]);
        let orchestrator = Orchestrator::new(&router, 100);
        let outcome = orchestrator.translate_file(&file, Language::De, None).await.unwrap();

        assert_eq!(outcome.file.segments[0].text, "In die Wehrmacht gekommen?");
        assert_eq!(outcome.file.segments[0].start, file.segments[0].start);
        assert_eq!(outcome.file.segments[0].end, file.segments[0].end);
        assert_eq!(outcome.file.segments[1].text, "[DE] How did you feel?");
        assert!(file.has_same_boundaries_as(&outcome.file));
    }

    #[tokio::test]
    async fn non_verbal_segment_is_never_sent_to_a_provider() {
        struct PanicsOnCall;
        #[async_trait]
        impl Translator for PanicsOnCall {
            fn id(&self) -> ProviderId {
                ProviderId::LlmMt
            }
            fn capabilities(&self) -> ProviderCapabilities {
                ProviderCapabilities {
                    supports_batch: true,
                    supports_hebrew: true,
                    max_chars_per_request: 50_000,
                }
            }
            async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
                panic!("should never be called for non-verbal segments");
            }
            async fn translate_batch(&self, _texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
                panic!("should never be called for non-verbal segments");
            }
        }

        let file = SubtitleFile::new("x.srt".into(), vec![seg(1, 0, 2, "\u{266a}\u{266a}", Language::Unknown)]);
        let router = Router::new(vec![Box::new(PanicsOnCall)]);
        let orchestrator = Orchestrator::new(&router, 100);
        let outcome = orchestrator.translate_file(&file, Language::De, None).await.unwrap();
        assert_eq!(outcome.file.segments[0].text, "\u{266a}\u{266a}");
    }

    #[tokio::test]
    async fn whitespace_variants_dedup_to_one_translation_request() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingEcho {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl Translator for CountingEcho {
            fn id(&self) -> ProviderId {
                ProviderId::LlmMt
            }
            fn capabilities(&self) -> ProviderCapabilities {
                ProviderCapabilities {
                    supports_batch: true,
                    supports_hebrew: true,
                    max_chars_per_request: 50_000,
                }
            }
            async fn translate(&self, text: &str, _target: Language) -> Result<String> {
                Ok(text.to_string())
            }
            async fn translate_batch(&self, texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(texts.len(), 1, "dedup should collapse both segments into one unique key");
                Ok(texts.iter().map(|t| Some(t.clone())).collect())
            }
        }

        let file = SubtitleFile::new(
            "x.srt".into(),
            vec![
                seg(1, 0, 2, "In   die   Wehrmacht", Language::De),
                seg(2, 2, 4, "In die Wehrmacht", Language::De),
            ],
        );
        let translator = CountingEcho { calls: AtomicUsize::new(0) };
        let router = Router::new(vec![Box::new(translator)]);
        let orchestrator = Orchestrator::new(&router, 100);
        let outcome = orchestrator.translate_file(&file, Language::En, None).await.unwrap();
        assert_eq!(outcome.file.segments[0].text, outcome.file.segments[1].text);
    }

    #[test]
    fn hebrew_routing_overrides_hint_and_selects_a_hebrew_capable_provider() {
        struct HebrewProvider;
        #[async_trait]
        impl Translator for HebrewProvider {
            fn id(&self) -> ProviderId {
                ProviderId::LlmMt
            }
            fn capabilities(&self) -> ProviderCapabilities {
                ProviderCapabilities {
                    supports_batch: true,
                    supports_hebrew: true,
                    max_chars_per_request: 50_000,
                }
            }
            async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
                Ok("\u{05e9}\u{05dc}\u{05d5}\u{05dd}".to_string())
            }
            async fn translate_batch(&self, texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
                Ok(texts.iter().map(|_| Some("\u{05e9}\u{05dc}\u{05d5}\u{05dd}".to_string())).collect())
            }
        }
        struct BulkNoHebrew;
        #[async_trait]
        impl Translator for BulkNoHebrew {
            fn id(&self) -> ProviderId {
                ProviderId::BulkMt
            }
            fn capabilities(&self) -> ProviderCapabilities {
                ProviderCapabilities {
                    supports_batch: true,
                    supports_hebrew: false,
                    max_chars_per_request: 50_000,
                }
            }
            async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
                unreachable!("bulk provider must never be selected for Hebrew")
            }
            async fn translate_batch(&self, _texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
                unreachable!("bulk provider must never be selected for Hebrew")
            }
        }

        let router = Router::new(vec![Box::new(BulkNoHebrew), Box::new(HebrewProvider)]);
        let selected = router.select(Language::He, Some(ProviderId::BulkMt)).unwrap();
        assert_ne!(selected.id(), ProviderId::BulkMt);
        assert!(selected.capabilities().supports(Language::He));
    }

    #[tokio::test]
    async fn boundary_sabotage_is_contained_within_a_single_cue() {
        struct SabotageTranslator;
        #[async_trait]
        impl Translator for SabotageTranslator {
            fn id(&self) -> ProviderId {
                ProviderId::LlmMt
            }
            fn capabilities(&self) -> ProviderCapabilities {
                ProviderCapabilities {
                    supports_batch: true,
                    supports_hebrew: true,
                    max_chars_per_request: 50_000,
                }
            }
            async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
                Ok("line one\n\nline two".to_string())
            }
            async fn translate_batch(&self, texts: &[String], _target: Language) -> Result<Vec<Option<String>>> {
                Ok(texts.iter().map(|_| Some("line one\n\nline two".to_string())).collect())
            }
        }

        let file = SubtitleFile::new(
            "x.srt".into(),
            vec![
                seg(1, 0, 3, "Hello there", Language::En),
                seg(2, 3, 6, "Goodbye", Language::En),
            ],
        );
        let router = Router::new(vec![Box::new(SabotageTranslator)]);
        let orchestrator = Orchestrator::new(&router, 100);
        let outcome = orchestrator.translate_file(&file, Language::De, None).await.unwrap();

        assert_eq!(outcome.file.segments.len(), 2);
        assert!(file.has_same_boundaries_as(&outcome.file));
        assert!(outcome.file.segments[0].text.contains("\n\n"));

        // Rendering to SRT must not interpret the embedded blank lines as a
        // new cue: re-parsing must still see exactly two blocks.
        let rendered = srt::render(&outcome.file);
        let reparsed_path = std::env::temp_dir().join(format!(
            "scribe-sync-boundary-sabotage-{}.srt",
            std::process::id()
        ));
        std::fs::write(&reparsed_path, &rendered).unwrap();
        let reparsed = srt::parse(&reparsed_path).unwrap();
        std::fs::remove_file(&reparsed_path).ok();
        assert_eq!(reparsed.segments.len(), 2);
        assert_eq!(reparsed.segments[0].text, "line one\n\nline two");
    }
}

// ============================================================================
// Subtitle codec round trips
// ============================================================================

mod codec_tests {
    use super::*;

    #[test]
    fn srt_round_trips_through_parse_and_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.srt");
        std::fs::write(
            &path,
            "1\n00:00:01,500 --> 00:00:04,000\nHello, welcome.\n\n\
             2\n00:00:04,500 --> 00:00:07,000\nToday we learn.\n",
        )
        .unwrap();

        let file = srt::parse(&path).unwrap();
        assert_eq!(file.segments.len(), 2);
        let rendered = srt::render(&file);
        let out_path = dir.path().join("out.srt");
        std::fs::write(&out_path, &rendered).unwrap();
        let reparsed = srt::parse(&out_path).unwrap();
        assert_eq!(reparsed.segments, file.segments);
    }

    #[test]
    fn vtt_timing_matches_srt_timing_modulo_separator() {
        let file = SubtitleFile::new(
            "x.srt".into(),
            vec![Segment::new(1, Duration::from_millis(1500), Duration::from_millis(4000), "Hi".to_string())],
        );
        let srt_text = srt::render(&file);
        let vtt_text = vtt::render(&file);
        assert!(vtt_text.starts_with("WEBVTT\n\n"));
        let srt_timing = srt_text.lines().nth(1).unwrap().replace(',', ".");
        let vtt_timing = vtt_text.lines().nth(2).unwrap();
        assert_eq!(srt_timing, vtt_timing);
    }
}

// ============================================================================
// Batch reprocessor fleet-level behavior
// ============================================================================

mod reprocessor_fleet_tests {
    use super::*;

    struct AlwaysGermanClassifier;
    #[async_trait]
    impl Classifier for AlwaysGermanClassifier {
        async fn classify(&self, numbered_texts: &[String], _remind_format: bool) -> Result<String> {
            Ok(numbered_texts
                .iter()
                .enumerate()
                .map(|(i, _)| format!("{}: German", i + 1))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }

    fn interviews_fixture(n: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..n {
            let sub = dir.path().join(format!("interview-{}", i));
            std::fs::create_dir_all(&sub).unwrap();
            std::fs::write(
                sub.join("source.srt"),
                format!(
                    "1\n00:00:00,000 --> 00:00:03,000\nHow are you doing today, number {}?\n",
                    i
                ),
            )
            .unwrap();
        }
        dir
    }

    fn reprocessor(
        interviews_dir: PathBuf,
        backup_root: PathBuf,
        progress_dir: PathBuf,
        force_all: bool,
    ) -> Reprocessor<AlwaysGermanClassifier> {
        let registry = Arc::new(FsInterviewRegistry::new(interviews_dir));
        let router = Router::new(vec![Box::new(GermanTranslator)]);
        let detector = LanguageDetector::new(AlwaysGermanClassifier, 50);
        let options = ReprocessorOptions {
            batch_id: "fleet-batch".to_string(),
            backup_root,
            progress_dir,
            target_languages: vec![Language::En],
            translate_batch_size: 100,
            limit: None,
            start_from: 0,
            force_all,
            workers: 2,
            low_success_rate_threshold: 0.8,
            show_progress: false,
        };
        Reprocessor::new(registry, router, detector, options)
    }

    #[tokio::test]
    async fn resume_after_a_crash_only_processes_the_remaining_interview() {
        let interviews = interviews_fixture(3);
        let backup_root = tempfile::tempdir().unwrap();
        let progress_dir = tempfile::tempdir().unwrap();
        let cancel = AtomicBool::new(false);

        // First run stands in for a crash after 2 of 3 interviews: mark
        // the first two as already processed directly, then run.
        for i in 0..2 {
            let output_dir = interviews.path().join(format!("interview-{}", i));
            std::fs::write(
                output_dir.join(".preservation_fix_applied"),
                r#"{"processed_at":0,"languages":["en"],"success":true}"#,
            )
            .unwrap();
        }

        let r = reprocessor(
            interviews.path().to_path_buf(),
            backup_root.path().to_path_buf(),
            progress_dir.path().to_path_buf(),
            false,
        );
        let results = r.run(&cancel).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_id, "interview-2");
        assert!(interviews.path().join("interview-2/en.srt").exists());
    }

    #[tokio::test]
    async fn rollback_restores_every_backed_up_interview_in_the_fleet() {
        let interviews = interviews_fixture(2);
        let backup_root = tempfile::tempdir().unwrap();
        let progress_dir = tempfile::tempdir().unwrap();
        let cancel = AtomicBool::new(false);

        for i in 0..2 {
            let output_dir = interviews.path().join(format!("interview-{}", i));
            std::fs::write(output_dir.join("en.srt"), "stale translation").unwrap();
        }

        let r = reprocessor(
            interviews.path().to_path_buf(),
            backup_root.path().to_path_buf(),
            progress_dir.path().to_path_buf(),
            false,
        );
        r.run(&cancel).await.unwrap();

        for i in 0..2 {
            let content =
                std::fs::read_to_string(interviews.path().join(format!("interview-{}/en.srt", i))).unwrap();
            assert_ne!(content, "stale translation");
        }

        r.rollback().await.unwrap();

        for i in 0..2 {
            let content =
                std::fs::read_to_string(interviews.path().join(format!("interview-{}/en.srt", i))).unwrap();
            assert_eq!(content, "stale translation");
        }
    }
}
