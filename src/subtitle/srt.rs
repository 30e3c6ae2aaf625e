use crate::error::{PipelineError, Result};
use crate::subtitle::{Segment, SubtitleFile};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Rounds a duration to the nearest millisecond, breaking exact ties
/// (remainder of exactly 500,000ns) towards the even millisecond, so
/// repeated round-trips never drift.
fn millis_half_to_even(d: Duration) -> u64 {
    let nanos = d.as_nanos();
    let ms = nanos / 1_000_000;
    let rem = nanos % 1_000_000;
    let tie = 500_000u128;

    let rounded = if rem > tie || (rem == tie && ms % 2 == 1) {
        ms + 1
    } else {
        ms
    };
    rounded as u64
}

fn format_with_separator(d: Duration, separator: char) -> String {
    let total_millis = millis_half_to_even(d);
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, seconds, separator, millis
    )
}

/// `HH:MM:SS,mmm`.
pub fn format_timestamp(d: Duration) -> String {
    format_with_separator(d, ',')
}

/// `HH:MM:SS.mmm`.
pub fn format_timestamp_vtt(d: Duration) -> String {
    format_with_separator(d, '.')
}

pub fn parse_timestamp(s: &str, separator: char) -> Option<Duration> {
    let s = s.trim();
    let (hms, millis_str) = s.rsplit_once(separator)?;
    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let millis: u64 = millis_str.parse().ok()?;
    if millis_str.len() != 3 {
        return None;
    }
    let total_millis = ((hours * 3600 + minutes * 60 + seconds) * 1000) + millis;
    Some(Duration::from_millis(total_millis))
}

fn parse_timing_line(line: &str) -> Option<(Duration, Duration)> {
    let (start_str, end_str) = line.split_once("-->")?;
    let start = parse_timestamp(start_str, ',')?;
    let end = parse_timestamp(end_str, ',')?;
    Some((start, end))
}

fn is_index_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// True when `lines[i]` is a bare numeric index immediately followed by a
/// parseable timing line — the two-line signature of a new cue. Used as
/// a lookahead so a blank line found while collecting a cue's text is
/// only treated as a cue boundary when something that actually looks
/// like the next cue follows it, not whenever the translated text
/// happens to contain a blank line of its own.
fn looks_like_cue_start(lines: &[&str], i: usize) -> bool {
    is_index_line(lines[i]) && lines.get(i + 1).is_some_and(|l| parse_timing_line(l).is_some())
}

/// Parses an SRT file into a `SubtitleFile`. A blank line only ends the
/// current cue when the lines after it look like the next cue's index
/// and timing; otherwise it's kept as part of the current cue's text, so
/// a translated cue that itself contains a blank line round-trips
/// intact. Lines before the first recognizable cue are skipped with a
/// warning; a file with zero valid cues is not an error.
pub fn parse(path: &Path) -> Result<SubtitleFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    let contents = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    let normalized = contents.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().collect();
    let n = lines.len();

    let mut segments = Vec::new();
    let mut i = 0;

    while i < n && !looks_like_cue_start(&lines, i) {
        if !lines[i].trim().is_empty() {
            warn!(
                "{}: skipping unrecognized line before the first cue: {:?}",
                path.display(),
                lines[i]
            );
        }
        i += 1;
    }

    while i < n {
        let index: u32 = lines[i].trim().parse().unwrap();
        let (start, end) = parse_timing_line(lines[i + 1]).unwrap();
        i += 2;

        let mut text_lines: Vec<&str> = Vec::new();
        while i < n {
            if lines[i].trim().is_empty() {
                let mut j = i + 1;
                while j < n && lines[j].trim().is_empty() {
                    j += 1;
                }
                if j >= n || looks_like_cue_start(&lines, j) {
                    i = j;
                    break;
                }
                text_lines.push(lines[i]);
                i += 1;
            } else {
                text_lines.push(lines[i]);
                i += 1;
            }
        }

        let text = text_lines.join("\n");
        if text.trim().is_empty() {
            warn!("{}: cue {} has no text lines, skipping", path.display(), index);
        } else {
            segments.push(Segment::new(index, start, end, text));
        }
    }

    Ok(SubtitleFile::new(path.to_path_buf(), segments))
}

/// Serializes segments to SRT text: `index\ntiming\ntext\n`, blank line
/// between cues, no trailing blank line.
pub fn render(file: &SubtitleFile) -> String {
    file.segments
        .iter()
        .map(|seg| {
            format!(
                "{}\n{} --> {}\n{}",
                seg.index,
                format_timestamp(seg.start),
                format_timestamp(seg.end),
                seg.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        + "\n"
}

pub fn write(file: &SubtitleFile, path: &Path) -> Result<()> {
    std::fs::write(path, render(file))?;
    Ok(())
}
