//! Tracks and publishes the state of an in-flight reprocessing run: a
//! snapshot file for external pollers, an append-only log for replay, and
//! per-language heartbeat files interviews can be checked against.

use crate::batch::write_atomic;
use crate::error::Result;
use crate::subtitle::Language;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DURATION_WINDOW: usize = 10;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub batch_id: String,
    pub processed: usize,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub current_file_id: Option<String>,
    pub last_duration_s: Option<f64>,
    pub avg_duration_s: Option<f64>,
    pub elapsed_s: f64,
    pub eta_s: Option<f64>,
    pub processing_rate: Option<f64>,
    pub progress_pct: f64,
    /// Unix timestamp, in seconds, of when this snapshot was written.
    pub updated_at: u64,
}

struct State {
    processed: usize,
    successful: usize,
    failed: usize,
    current_file_id: Option<String>,
    recent_durations: VecDeque<f64>,
}

pub struct ProgressTracker {
    batch_id: String,
    total: usize,
    started_at: Instant,
    state: Mutex<State>,
    progress_dir: PathBuf,
}

impl ProgressTracker {
    pub fn new(batch_id: impl Into<String>, total: usize, progress_dir: impl Into<PathBuf>) -> Self {
        Self {
            batch_id: batch_id.into(),
            total,
            started_at: Instant::now(),
            state: Mutex::new(State {
                processed: 0,
                successful: 0,
                failed: 0,
                current_file_id: None,
                recent_durations: VecDeque::with_capacity(DURATION_WINDOW),
            }),
            progress_dir: progress_dir.into(),
        }
    }

    pub fn start_interview(&self, file_id: &str) {
        self.state.lock().unwrap().current_file_id = Some(file_id.to_string());
    }

    /// Records one interview's completion and writes a fresh snapshot plus
    /// a log line. `succeeded` reflects the interview as a whole, not any
    /// single language within it.
    pub fn finish_interview(&self, file_id: &str, succeeded: bool, duration_s: f64) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.processed += 1;
            if succeeded {
                state.successful += 1;
            } else {
                state.failed += 1;
            }
            if state.recent_durations.len() == DURATION_WINDOW {
                state.recent_durations.pop_front();
            }
            state.recent_durations.push_back(duration_s);
            state.current_file_id = None;
        }

        let snapshot = self.snapshot();
        self.write_snapshot(&snapshot)?;
        self.append_log(file_id, succeeded, duration_s)?;
        Ok(())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock().unwrap();
        let elapsed_s = self.started_at.elapsed().as_secs_f64();
        let last_duration_s = state.recent_durations.back().copied();
        let avg_duration_s = if state.recent_durations.is_empty() {
            None
        } else {
            Some(state.recent_durations.iter().sum::<f64>() / state.recent_durations.len() as f64)
        };
        let remaining = self.total.saturating_sub(state.processed);
        let eta_s = avg_duration_s.map(|avg| avg * remaining as f64);
        let processing_rate = if elapsed_s > 0.0 {
            Some(state.processed as f64 / elapsed_s)
        } else {
            None
        };
        let progress_pct = if self.total == 0 {
            100.0
        } else {
            100.0 * state.processed as f64 / self.total as f64
        };

        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        StatusSnapshot {
            batch_id: self.batch_id.clone(),
            processed: state.processed,
            total: self.total,
            successful: state.successful,
            failed: state.failed,
            current_file_id: state.current_file_id.clone(),
            last_duration_s,
            avg_duration_s,
            elapsed_s,
            eta_s,
            processing_rate,
            progress_pct,
            updated_at,
        }
    }

    fn write_snapshot(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.progress_dir.join("status.json"), &json)
    }

    fn append_log(&self, file_id: &str, succeeded: bool, duration_s: f64) -> Result<()> {
        std::fs::create_dir_all(&self.progress_dir)?;
        let line = format!(
            "{{\"file_id\":\"{}\",\"succeeded\":{},\"duration_s\":{:.3}}}\n",
            file_id, succeeded, duration_s
        );
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.progress_dir.join("progress.log"))?;
        f.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Writes a per-language heartbeat file an external poller can check
    /// without parsing the full snapshot.
    pub fn write_language_status(&self, file_id: &str, lang: Language, status: &str) -> Result<()> {
        let path = self
            .progress_dir
            .join(format!("language_status_{}.json", lang.code().to_lowercase()));
        let json = format!(
            "{{\"file_id\":\"{}\",\"language\":\"{}\",\"status\":\"{}\"}}",
            file_id,
            lang.code(),
            status
        );
        write_atomic(&path, &json)
    }
}
