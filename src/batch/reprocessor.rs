//! Ties discovery, backup, translation, validation, and progress
//! reporting together into one fleet-level run across many interviews and
//! target languages.

use crate::batch::backup::{backup_interview, rollback as rollback_backups};
use crate::batch::progress::ProgressTracker;
use crate::batch::registry::InterviewRegistry;
use crate::batch::{write_atomic, Interview, InterviewResult, LanguageOutcome};
use crate::detect::{Classifier, LanguageDetector};
use crate::error::{PipelineError, Result};
use crate::orchestrator::Orchestrator;
use crate::subtitle::{normalize_whitespace, srt, vtt, Language, SubtitleFile};
use crate::translate::Router;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

pub struct ReprocessorOptions {
    pub batch_id: String,
    pub backup_root: PathBuf,
    pub progress_dir: PathBuf,
    pub target_languages: Vec<Language>,
    pub translate_batch_size: usize,
    pub limit: Option<usize>,
    pub start_from: usize,
    pub force_all: bool,
    pub workers: usize,
    /// Interview success rate below which a warning is logged; the batch
    /// is never halted automatically.
    pub low_success_rate_threshold: f64,
    /// Whether to render a terminal progress bar over the run; disabled
    /// for `--quiet` runs and in tests.
    pub show_progress: bool,
}

pub struct Reprocessor<C: Classifier> {
    registry: Arc<dyn InterviewRegistry>,
    router: Router,
    detector: LanguageDetector<C>,
    options: ReprocessorOptions,
}

fn spacing_backup_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".spacing_backup");
    PathBuf::from(name)
}

impl<C: Classifier> Reprocessor<C> {
    pub fn new(
        registry: Arc<dyn InterviewRegistry>,
        router: Router,
        detector: LanguageDetector<C>,
        options: ReprocessorOptions,
    ) -> Self {
        Self {
            registry,
            router,
            detector,
            options,
        }
    }

    async fn work_set(&self) -> Result<Vec<Interview>> {
        let records = self.registry.enumerate_completed_interviews(None).await?;
        let interviews: Vec<Interview> = records
            .into_iter()
            .map(|r| Interview {
                file_id: r.file_id,
                source_srt_path: r.source_path,
                output_dir: r.output_dir,
            })
            .skip(self.options.start_from)
            .filter(|iv| self.options.force_all || !iv.preservation_marker_present())
            .collect();

        Ok(match self.options.limit {
            Some(limit) => interviews.into_iter().take(limit).collect(),
            None => interviews,
        })
    }

    /// Runs the batch to completion or until `cancel` is observed between
    /// interviews. Interviews already in flight are never interrupted.
    pub async fn run(&self, cancel: &AtomicBool) -> Result<Vec<InterviewResult>> {
        let interviews = self.work_set().await?;
        let tracker = ProgressTracker::new(
            self.options.batch_id.clone(),
            interviews.len(),
            self.options.progress_dir.clone(),
        );

        let progress_bar = if self.options.show_progress {
            let pb = ProgressBar::new(interviews.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} interviews ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let workers = self.options.workers.max(1);
        let mut results = Vec::with_capacity(interviews.len());

        for chunk in interviews.chunks(workers) {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            let futures: Vec<_> = chunk
                .iter()
                .map(|interview| self.process_interview(interview, &tracker))
                .collect();
            results.extend(futures::future::join_all(futures).await);
            if let Some(pb) = &progress_bar {
                pb.set_position(tracker.snapshot().processed as u64);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        self.warn_if_low_success_rate(&results);
        Ok(results)
    }

    pub async fn rollback(&self) -> Result<()> {
        let records = self.registry.enumerate_completed_interviews(None).await?;
        let interviews: Vec<Interview> = records
            .into_iter()
            .map(|r| Interview {
                file_id: r.file_id,
                source_srt_path: r.source_path,
                output_dir: r.output_dir,
            })
            .collect();
        rollback_backups(&self.options.backup_root, &self.options.batch_id, &interviews)
    }

    async fn process_interview(&self, interview: &Interview, tracker: &ProgressTracker) -> InterviewResult {
        let start = Instant::now();
        tracker.start_interview(&interview.file_id);

        let all_failed = |reason: String| InterviewResult {
            file_id: interview.file_id.clone(),
            languages: self
                .options
                .target_languages
                .iter()
                .map(|&lang| (lang, LanguageOutcome::Failed(reason.clone())))
                .collect(),
        };

        if let Err(e) = backup_interview(
            interview,
            &self.options.target_languages,
            &self.options.backup_root,
            &self.options.batch_id,
        ) {
            warn!("backup failed for {}: {}", interview.file_id, e);
            let result = all_failed(format!("backup failed: {}", e));
            let _ = tracker.finish_interview(&interview.file_id, false, start.elapsed().as_secs_f64());
            return result;
        }

        let mut source = match self.normalize_source(interview) {
            Ok(s) => s,
            Err(e) => {
                warn!("spacing normalization failed for {}: {}", interview.file_id, e);
                let result = all_failed(format!("spacing normalization failed: {}", e));
                let _ = tracker.finish_interview(&interview.file_id, false, start.elapsed().as_secs_f64());
                return result;
            }
        };

        if let Err(e) = self.detector.detect(&mut source).await {
            warn!("language detection failed for {}: {}", interview.file_id, e);
            let result = all_failed(format!("language detection failed: {}", e));
            let _ = tracker.finish_interview(&interview.file_id, false, start.elapsed().as_secs_f64());
            return result;
        }

        let mut languages = Vec::with_capacity(self.options.target_languages.len());
        for &lang in &self.options.target_languages {
            let _ = tracker.write_language_status(&interview.file_id, lang, "in_progress");
            let outcome = self.process_language(interview, &source, lang).await;
            let status = if outcome == LanguageOutcome::Succeeded { "succeeded" } else { "failed" };
            let _ = tracker.write_language_status(&interview.file_id, lang, status);
            languages.push((lang, outcome));
        }

        let result = InterviewResult {
            file_id: interview.file_id.clone(),
            languages,
        };

        if result.all_succeeded() {
            if let Err(e) = self.write_marker(interview) {
                warn!("failed to write preservation marker for {}: {}", interview.file_id, e);
            }
        }

        let _ = tracker.finish_interview(&interview.file_id, result.all_succeeded(), start.elapsed().as_secs_f64());
        result
    }

    /// Normalizes whitespace in every segment's text, saving the source's
    /// pre-normalization bytes once so the fix can be told apart from a
    /// file that never needed it.
    fn normalize_source(&self, interview: &Interview) -> Result<SubtitleFile> {
        let backup_path = spacing_backup_path(&interview.source_srt_path);
        if !backup_path.exists() {
            std::fs::copy(&interview.source_srt_path, &backup_path)?;
        }

        let mut file = srt::parse(&interview.source_srt_path)?;
        for segment in &mut file.segments {
            segment.text = normalize_whitespace(&segment.text);
        }
        srt::write(&file, &interview.source_srt_path)?;
        Ok(file)
    }

    async fn process_language(&self, interview: &Interview, source: &SubtitleFile, lang: Language) -> LanguageOutcome {
        let orchestrator = Orchestrator::new(&self.router, self.options.translate_batch_size);
        let outcome = match orchestrator.translate_file(source, lang, None).await {
            Ok(o) => o,
            Err(e) => return LanguageOutcome::Failed(format!("translation failed: {}", e)),
        };

        let srt_path = interview.output_dir.join(format!("{}.srt", lang.code()));
        if let Err(e) = srt::write(&outcome.file, &srt_path) {
            return LanguageOutcome::Failed(format!("failed to write srt: {}", e));
        }

        let vtt_path = interview.output_dir.join(format!("{}.vtt", lang.code()));
        if let Err(e) = vtt::write(&outcome.file, &vtt_path) {
            return LanguageOutcome::Failed(format!("failed to write vtt: {}", e));
        }

        if let Err(e) = Self::validate_output(&srt_path) {
            return LanguageOutcome::Failed(format!("validation failed: {}", e));
        }

        LanguageOutcome::Succeeded
    }

    fn validate_output(path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() == 0 {
            return Err(PipelineError::Validation(format!("{} is empty", path.display())));
        }
        let file = srt::parse(path)?;
        if file.segments.is_empty() {
            return Err(PipelineError::Validation(format!(
                "{} parses but has no timing lines",
                path.display()
            )));
        }
        Ok(())
    }

    fn write_marker(&self, interview: &Interview) -> Result<()> {
        let processed_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let codes: Vec<String> = self
            .options
            .target_languages
            .iter()
            .map(|l| format!("\"{}\"", l.code()))
            .collect();
        let json = format!(
            "{{\"processed_at\":{},\"languages\":[{}],\"success\":true}}",
            processed_at,
            codes.join(",")
        );
        write_atomic(&interview.preservation_marker_path(), &json)
    }

    fn warn_if_low_success_rate(&self, results: &[InterviewResult]) {
        if results.is_empty() {
            return;
        }
        let succeeded = results.iter().filter(|r| r.all_succeeded()).count();
        let rate = succeeded as f64 / results.len() as f64;
        if rate < self.options.low_success_rate_threshold {
            warn!(
                "batch {}: {}/{} interviews succeeded ({:.1}%), below the {:.1}% threshold",
                self.options.batch_id,
                succeeded,
                results.len(),
                rate * 100.0,
                self.options.low_success_rate_threshold * 100.0
            );
        }
    }
}
