use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::time::{format_time, parse_time};
use super::{build, SrtDocument, SubtitleCue};

/// Render a document as canonical SRT: 1-based contiguous indices,
/// `HH:MM:SS,mmm` timestamps, LF line endings.
pub fn format_srt(doc: &SrtDocument) -> String {
    let mut out = String::new();
    for cue in &doc.cues {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_time(cue.start),
            format_time(cue.end),
            cue.text
        ));
    }
    out
}

fn timecode_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+:\d{2}:\d{2}").expect("valid regex"))
}

/// Parse SRT content into cues.
///
/// Malformed cues are logged and skipped while the index counter advances,
/// so later cues are still recovered. Content without any timecode is
/// treated as a plain transcript and routed through estimated timestamps.
pub fn parse_srt(content: &str) -> SrtDocument {
    if content.trim().is_empty() {
        return SrtDocument::default();
    }

    // Transcription output has no timeline at all.
    if !timecode_pattern().is_match(content) {
        info!("No timecodes found, treating input as plain transcript");
        return build::cues_from_plain_text(content, None);
    }

    let content = content.trim_start_matches('\u{feff}');
    let content = content.strip_prefix("WEBVTT").unwrap_or(content);

    let lines: Vec<&str> = content.lines().collect();
    let mut cues: Vec<SubtitleCue> = Vec::new();
    let mut expected_id = 1usize;
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        // Index line is optional; a bare timeline starts a cue too.
        let time_line = if let Ok(id) = line.parse::<usize>() {
            if id != expected_id {
                warn!("Non-consecutive subtitle id: expected {expected_id}, got {id}");
            }
            i += 1;
            match lines.get(i) {
                Some(l) => l.trim(),
                None => break,
            }
        } else if line.contains("-->") {
            line
        } else {
            debug!("Skipping unrecognized line: {line}");
            i += 1;
            continue;
        };

        match parse_time_line(time_line) {
            Some((start, end)) => {
                i += 1;
                let mut text_lines = Vec::new();
                while i < lines.len() && !lines[i].trim().is_empty() {
                    text_lines.push(lines[i].trim());
                    i += 1;
                }

                let text = text_lines.join(" ");
                if text.is_empty() {
                    warn!("Cue {expected_id} has no text, skipping");
                } else if start >= end {
                    warn!("Cue {expected_id} has non-positive duration, skipping");
                } else if cues.last().is_some_and(|prev| start < prev.end) {
                    warn!("Cue {expected_id} starts before previous cue ends, skipping");
                } else {
                    cues.push(SubtitleCue {
                        index: cues.len() + 1,
                        start,
                        end,
                        text,
                    });
                }
                expected_id += 1;
            }
            None => {
                warn!("Malformed timeline: {time_line}");
                // Skip the rest of this block so the next cue can recover.
                while i < lines.len() && !lines[i].trim().is_empty() {
                    i += 1;
                }
                expected_id += 1;
            }
        }
    }

    if cues.is_empty() {
        warn!("No valid cues parsed");
    } else {
        info!("Parsed {} cues", cues.len());
    }
    SrtDocument::new(cues)
}

fn parse_time_line(line: &str) -> Option<(f64, f64)> {
    let (start_str, end_str) = line.split_once("-->")?;
    // VTT-style cue settings after the end time are ignored.
    let end_str = end_str.trim().split_whitespace().next()?;
    let start = parse_time(start_str)?;
    let end = parse_time(end_str)?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start: f64, end: f64, text: &str) -> SubtitleCue {
        SubtitleCue {
            index,
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_basic() {
        let doc = SrtDocument::new(vec![
            cue(1, 1.5, 4.0, "Hello, world!"),
            cue(2, 4.5, 7.0, "Second line"),
        ]);
        let srt = format_srt(&doc);
        assert!(srt.starts_with("1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n"));
        assert!(srt.contains("2\n00:00:04,500 --> 00:00:07,000\nSecond line\n\n"));
    }

    #[test]
    fn test_parse_two_chinese_cues() {
        let srt = "1\n00:00:00,500 --> 00:00:02,000\n你好，世界\n\n2\n00:00:02,000 --> 00:00:03,500\n再见。\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 2);
        assert!((doc.cues[0].duration() - 1.5).abs() < 1e-9);
        assert!((doc.cues[1].duration() - 1.5).abs() < 1e-9);
        assert_eq!(doc.cues[0].text, "你好，世界");
        assert_eq!(doc.cues[1].text, "再见。");
    }

    #[test]
    fn test_round_trip() {
        let doc = SrtDocument::new(vec![
            cue(1, 0.0, 2.25, "first"),
            cue(2, 2.25, 4.0, "second line with words"),
            cue(3, 10.5, 12.0, "后面的句子"),
        ]);
        let parsed = parse_srt(&format_srt(&doc));
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_malformed_cue_skipped_and_recovered() {
        let srt = "1\n00:00:00,000 --> garbage\nbroken\n\n2\n00:00:05,000 --> 00:00:06,000\nrecovered\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.cues[0].text, "recovered");
        assert_eq!(doc.cues[0].index, 1);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let srt = "1\n00:00:05,000 --> 00:00:02,000\nbackwards\n\n2\n00:00:06,000 --> 00:00:07,000\nok\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.cues[0].text, "ok");
    }

    #[test]
    fn test_out_of_order_cue_rejected() {
        let srt = "1\n00:00:02,000 --> 00:00:05,000\nfirst\n\n2\n00:00:03,000 --> 00:00:06,000\noverlapping\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.cues[0].text, "first");
    }

    #[test]
    fn test_multiline_text_joined() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nline one\nline two\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.cues[0].text, "line one line two");
    }

    #[test]
    fn test_vtt_period_timestamps() {
        let srt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nvtt style\n";
        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 1);
        assert!((doc.cues[0].start - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_plain_text_routed_to_estimation() {
        let doc = parse_srt("这是第一句话。这是第二句话。");
        assert_eq!(doc.len(), 2);
        assert!(doc.cues[0].start < doc.cues[1].start);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("   \n  ").is_empty());
    }
}
