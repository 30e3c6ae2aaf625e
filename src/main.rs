use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_sync::batch::backup;
use scribe_sync::batch::registry::{FsInterviewRegistry, InterviewRegistry};
use scribe_sync::batch::reprocessor::{Reprocessor, ReprocessorOptions};
use scribe_sync::detect::LlmClassifier;
use scribe_sync::detect::LanguageDetector;
use scribe_sync::subtitle::Language;
use scribe_sync::translate::Router;
use scribe_sync::{BatchOptions, Config};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scribe-sync")]
#[command(version, about = "Translate code-switched oral-history subtitles while preserving segment timing")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress the terminal progress bar
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Reprocess a fleet of interviews, translating each to the given
    /// target languages.
    Reprocess {
        /// Directory whose immediate subdirectories are interviews, each
        /// containing a source.srt.
        #[arg(long)]
        interviews_dir: PathBuf,

        /// Directory backups and progress files are written under.
        #[arg(long)]
        backup_root: PathBuf,

        /// Identifier for this run; also names the backup/progress subdir.
        #[arg(long)]
        batch_id: String,

        /// Comma-separated target language codes (e.g. de,he).
        #[arg(long, default_value = "de,he")]
        languages: String,

        #[arg(long, default_value_t = 100)]
        batch_size: usize,

        #[arg(long, default_value_t = 50)]
        detect_batch_size: usize,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        start_from: usize,

        #[arg(long, default_value_t = false)]
        force_all: bool,

        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
    /// Restore every file a prior run backed up under the given batch id.
    Rollback {
        #[arg(long)]
        interviews_dir: PathBuf,

        #[arg(long)]
        backup_root: PathBuf,

        #[arg(long)]
        batch_id: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn parse_languages(spec: &str) -> Result<Vec<Language>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|code| match Language::from_code(code) {
            Language::Unknown => Err(anyhow::anyhow!("unrecognized target language: {}", code)),
            lang => Ok(lang),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("configuration validation failed")?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();
    ctrlc::set_handler(move || {
        if cancelled_clone.load(Ordering::Relaxed) {
            std::process::exit(1);
        }
        eprintln!("\nReceived Ctrl+C, finishing the in-flight interview then stopping...");
        cancelled_clone.store(true, Ordering::Relaxed);
    })
    .ok();

    match cli.command {
        Command::Reprocess {
            interviews_dir,
            backup_root,
            batch_id,
            languages,
            batch_size,
            detect_batch_size,
            limit,
            start_from,
            force_all,
            workers,
        } => {
            let batch_opts = BatchOptions {
                batch_size,
                detect_batch_size,
                limit,
                start_from,
                force_all,
                workers,
            };

            let target_languages = parse_languages(&languages)?;
            let progress_dir = backup_root.join(&batch_id);

            let registry = Arc::new(FsInterviewRegistry::new(interviews_dir));
            let router = Router::from_config(&config);

            let classifier_key = config
                .provider_c_api_key
                .clone()
                .context("language detection requires PROVIDER_C_API_KEY")?;
            let detector =
                LanguageDetector::new(LlmClassifier::new(classifier_key), batch_opts.detect_batch_size);

            let options = ReprocessorOptions {
                batch_id: batch_id.clone(),
                backup_root,
                progress_dir,
                target_languages,
                translate_batch_size: batch_opts.batch_size,
                limit: batch_opts.limit,
                start_from: batch_opts.start_from,
                force_all: batch_opts.force_all,
                workers: batch_opts.workers,
                low_success_rate_threshold: 0.8,
                show_progress: !cli.quiet,
            };

            let reprocessor = Reprocessor::new(registry, router, detector, options);
            let results = reprocessor.run(&cancelled).await?;

            let succeeded = results.iter().filter(|r| r.all_succeeded()).count();
            info!("batch {}: {}/{} interviews succeeded", batch_id, succeeded, results.len());

            if succeeded < results.len() {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Rollback {
            interviews_dir,
            backup_root,
            batch_id,
        } => {
            let registry = Arc::new(FsInterviewRegistry::new(interviews_dir));
            let records = registry.enumerate_completed_interviews(None).await?;
            let interviews: Vec<_> = records
                .into_iter()
                .map(|r| scribe_sync::batch::Interview {
                    file_id: r.file_id,
                    source_srt_path: r.source_path,
                    output_dir: r.output_dir,
                })
                .collect();

            match backup::rollback(&backup_root, &batch_id, &interviews) {
                Ok(()) => {
                    info!("rollback of batch {} complete", batch_id);
                    Ok(())
                }
                Err(e) => {
                    error!("rollback of batch {} failed: {}", batch_id, e);
                    Err(anyhow::anyhow!("{}", e))
                }
            }
        }
    }
}
