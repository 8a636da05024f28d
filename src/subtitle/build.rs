//! Cue segmentation: turns ASR output into natural-length subtitles.

use tracing::{debug, info};

use super::sentence::split_into_sentences;
use super::{SrtDocument, SubtitleCue};

/// Characters that close a cue unconditionally.
const CUE_TERMINATORS: &[char] = &['.', '。', '!', '！', '?', '？', ';', '；'];
/// Characters that close a cue once it is long enough to read.
const NATURAL_BREAKS: &[char] = &[',', '，', '、'];

/// Close the pending cue once it reaches this many characters.
const MAX_CUE_CHARS: usize = 25;
/// Natural breaks only apply past this length.
const NATURAL_BREAK_MIN_CHARS: usize = 15;
/// Gap between adjacent characters that forces a cue boundary, ms.
const LONG_PAUSE_MS: i64 = 800;

/// Estimated reading speed when no duration is known, seconds per character.
const SECONDS_PER_CHAR: f64 = 0.3;

/// Build cues from transcript text.
///
/// With character-level timestamps the text is walked and split on sentence
/// punctuation, length and pauses; without them sentence boundaries are used
/// and durations are allocated proportionally to character counts.
pub fn build_cues(
    text: &str,
    timestamps: Option<&[[i64; 2]]>,
    total_duration: Option<f64>,
) -> SrtDocument {
    match timestamps {
        Some(ts) if !ts.is_empty() => {
            info!("Building cues from {} character timestamps", ts.len());
            cues_from_timestamps(text, ts)
        }
        _ => {
            info!("No timestamps available, estimating cue timings");
            cues_from_plain_text(text, total_duration)
        }
    }
}

fn cues_from_timestamps(text: &str, timestamps: &[[i64; 2]]) -> SrtDocument {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len().min(timestamps.len());
    if n == 0 {
        return SrtDocument::default();
    }

    let mut cues: Vec<SubtitleCue> = Vec::new();
    let mut current = String::new();
    let mut cue_start = timestamps[0][0];

    for i in 0..n {
        let ch = chars[i];
        let end = timestamps[i][1];
        current.push(ch);

        let count = current.chars().count();
        let is_sentence_end = CUE_TERMINATORS.contains(&ch);
        let is_too_long = count >= MAX_CUE_CHARS;
        let is_long_pause = i + 1 < n && timestamps[i + 1][0] - end > LONG_PAUSE_MS;
        let is_natural_break = NATURAL_BREAKS.contains(&ch) && count >= NATURAL_BREAK_MIN_CHARS;
        let is_last = i == n - 1;

        if is_sentence_end || is_too_long || is_long_pause || is_natural_break || is_last {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                debug!("Cue boundary at char {i} ({ch:?})");
                cues.push(SubtitleCue {
                    index: cues.len() + 1,
                    start: cue_start as f64 / 1000.0,
                    end: end as f64 / 1000.0,
                    text: trimmed.to_string(),
                });
            }
            current.clear();
            if i + 1 < n {
                cue_start = timestamps[i + 1][0];
            }
        }
    }

    let mut doc = SrtDocument::new(cues);
    fix_overlaps(&mut doc);
    doc
}

/// Estimate timings for timestamp-less text by splitting into sentences and
/// spreading the known (or estimated) duration by character count.
pub fn cues_from_plain_text(text: &str, total_duration: Option<f64>) -> SrtDocument {
    let sentences = split_into_sentences(text);
    if sentences.is_empty() {
        return SrtDocument::default();
    }

    let total_chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    let total = total_duration.unwrap_or_else(|| total_chars as f64 * SECONDS_PER_CHAR);

    let mut cues = Vec::with_capacity(sentences.len());
    let mut current_time = 0.0_f64;
    for sentence in sentences {
        let share = sentence.chars().count() as f64 / total_chars as f64;
        let end = (current_time + share * total).min(total);
        cues.push(SubtitleCue {
            index: cues.len() + 1,
            start: current_time,
            end,
            text: sentence,
        });
        current_time = end;
    }

    SrtDocument::new(cues)
}

/// Pull an earlier cue's end back when the next one starts before it, so the
/// emitted document never overlaps.
fn fix_overlaps(doc: &mut SrtDocument) {
    for i in 1..doc.cues.len() {
        let next_start = doc.cues[i].start;
        let prev = &mut doc.cues[i - 1];
        if next_start < prev.end {
            prev.end = next_start;
        }
    }
    doc.cues.retain(|c| c.start < c.end);
    doc.renumber();
}
