use crate::error::Result;
use crate::subtitle::srt::format_timestamp_vtt;
use crate::subtitle::SubtitleFile;
use std::path::Path;

/// Serializes segments to WebVTT: mandatory `WEBVTT` header, period-
/// millisecond timing, no cue identifiers or styling blocks. Text and
/// ordering are identical to the SRT renderer.
pub fn render(file: &SubtitleFile) -> String {
    let mut out = String::from("WEBVTT\n\n");
    let cues: Vec<String> = file
        .segments
        .iter()
        .map(|seg| {
            format!(
                "{} --> {}\n{}",
                format_timestamp_vtt(seg.start),
                format_timestamp_vtt(seg.end),
                seg.text
            )
        })
        .collect();
    out.push_str(&cues.join("\n\n"));
    out.push('\n');
    out
}

pub fn write(file: &SubtitleFile, path: &Path) -> Result<()> {
    std::fs::write(path, render(file))?;
    Ok(())
}
