pub mod backup;
pub mod progress;
pub mod registry;
pub mod reprocessor;

use crate::subtitle::Language;
use std::path::{Path, PathBuf};

pub use reprocessor::Reprocessor;

/// One interview known to the reprocessor. The marker's presence (not
/// content) controls whether a re-run skips it.
#[derive(Debug, Clone)]
pub struct Interview {
    pub file_id: String,
    pub source_srt_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Interview {
    pub fn preservation_marker_path(&self) -> PathBuf {
        self.output_dir.join(".preservation_fix_applied")
    }

    pub fn preservation_marker_present(&self) -> bool {
        self.preservation_marker_path().exists()
    }
}

/// Per-language result for one interview within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum LanguageOutcome {
    Succeeded,
    Failed(String),
}

/// Per-interview result for one run.
#[derive(Debug, Clone)]
pub struct InterviewResult {
    pub file_id: String,
    pub languages: Vec<(Language, LanguageOutcome)>,
}

impl InterviewResult {
    pub fn all_succeeded(&self) -> bool {
        self.languages
            .iter()
            .all(|(_, outcome)| matches!(outcome, LanguageOutcome::Succeeded))
    }
}

/// Writes `contents` to `path` via a temp file in the same directory
/// followed by a rename, so a crash mid-write never leaves a partial
/// file at `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> crate::error::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| crate::error::PipelineError::Io(e.error))?;
    Ok(())
}
