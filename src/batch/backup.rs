//! Backs up an interview's existing translated subtitle files before a
//! reprocessing run touches them, and can restore them afterward.

use crate::batch::{write_atomic, Interview};
use crate::error::Result;
use crate::subtitle::Language;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One file saved by `backup_interview`: its basename under the backup
/// directory plus the original path it was copied from, needed so
/// `rollback` can restore it even if the interview's output directory
/// moves between backup and rollback.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackedUpFile {
    pub basename: String,
    pub original_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub file_id: String,
    pub batch_id: String,
    pub files: Vec<BackedUpFile>,
    /// Unix timestamp, in seconds, of when the backup was taken.
    pub timestamp: u64,
}

fn interview_backup_dir(backup_root: &Path, batch_id: &str, file_id: &str) -> PathBuf {
    backup_root.join(batch_id).join(file_id)
}

/// Copies every existing `*.<lang-code>.srt` output for `interview` into
/// `<backup_root>/<batch_id>/<file_id>/` and records which files were
/// saved. A language with no existing output simply isn't backed up —
/// it's new work, not something to protect.
pub fn backup_interview(
    interview: &Interview,
    languages: &[Language],
    backup_root: &Path,
    batch_id: &str,
) -> Result<BackupMetadata> {
    let dest_dir = interview_backup_dir(backup_root, batch_id, &interview.file_id);
    std::fs::create_dir_all(&dest_dir)?;

    let mut saved = Vec::new();
    for lang in languages {
        let basename = format!("{}.srt", lang.code());
        let source = interview.output_dir.join(&basename);
        if source.exists() {
            std::fs::copy(&source, dest_dir.join(&basename))?;
            saved.push(BackedUpFile {
                basename,
                original_path: source,
            });
        }
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let metadata = BackupMetadata {
        file_id: interview.file_id.clone(),
        batch_id: batch_id.to_string(),
        files: saved,
        timestamp,
    };
    let json = serde_json::to_string_pretty(&metadata)?;
    write_atomic(&dest_dir.join("backup_metadata.json"), &json)?;
    Ok(metadata)
}

/// Restores every file named in each interview's `backup_metadata.json`
/// back to its original output directory. Safe to call more than once:
/// copying the same bytes back over themselves changes nothing.
pub fn rollback(backup_root: &Path, batch_id: &str, interviews: &[Interview]) -> Result<()> {
    let batch_dir = backup_root.join(batch_id);
    for interview in interviews {
        let dest_dir = interview_backup_dir(backup_root, batch_id, &interview.file_id);
        let metadata_path = dest_dir.join("backup_metadata.json");
        if !metadata_path.exists() {
            continue;
        }
        let raw = std::fs::read_to_string(&metadata_path)?;
        let metadata: BackupMetadata = serde_json::from_str(&raw)?;
        for file in &metadata.files {
            let backed_up = dest_dir.join(&file.basename);
            std::fs::copy(&backed_up, &file.original_path)?;
        }
    }
    let _ = batch_dir;
    Ok(())
}
