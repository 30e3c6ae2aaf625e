//! The interview registry is an external collaborator: the reprocessor
//! only needs to enumerate candidate interviews and,
//! optionally, report per-language status back. Everything else about
//! how interviews are tracked is out of scope.

use crate::error::Result;
use crate::subtitle::Language;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct InterviewRecord {
    pub file_id: String,
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
}

#[async_trait]
pub trait InterviewRegistry: Send + Sync {
    async fn enumerate_completed_interviews(&self, limit: Option<usize>) -> Result<Vec<InterviewRecord>>;

    /// Idempotent; the core never depends on its result.
    async fn mark_language_status(&self, _file_id: &str, _lang: Language, _status: &str) -> Result<()> {
        Ok(())
    }
}

/// Filesystem-backed registry: each immediate subdirectory of `root` is
/// one interview, named by its file id, expected to contain a
/// `source.srt`. Interviews are ordered by directory name, the closest
/// filesystem proxy for `created_at asc` available without a real
/// database.
pub struct FsInterviewRegistry {
    root: PathBuf,
}

impl FsInterviewRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl InterviewRegistry for FsInterviewRegistry {
    async fn enumerate_completed_interviews(&self, limit: Option<usize>) -> Result<Vec<InterviewRecord>> {
        let mut entries: Vec<std::fs::DirEntry> = std::fs::read_dir(&self.root)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|e| e.path().is_dir())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut records = Vec::new();
        for entry in entries {
            let output_dir = entry.path();
            let source_path = output_dir.join("source.srt");
            if !source_path.exists() {
                continue;
            }
            let file_id = entry.file_name().to_string_lossy().into_owned();
            records.push(InterviewRecord {
                file_id,
                source_path,
                output_dir,
            });
            if let Some(limit) = limit {
                if records.len() >= limit {
                    break;
                }
            }
        }
        Ok(records)
    }
}
