//! Integration tests for subpipe
//!
//! These validate the interplay of the subtitle engine, the merge logic and
//! the hotword post-processor without any network access.

use std::time::Duration;

use subpipe::asr::{merge_chunks, ChunkTranscript};
use subpipe::audio::{chunk::plan_chunks, ChunkLimits, ChunkPlan};
use subpipe::hotword::{apply_hotwords, PostProcessConfig};
use subpipe::subtitle::{build_cues, format_srt, parse_srt, SrtDocument, SubtitleCue};
use subpipe::translate::split_chunks;

// ============================================================================
// SRT parse / emit
// ============================================================================

mod srt_tests {
    use super::*;

    #[test]
    fn test_parse_short_chinese_srt() {
        let srt = "1\n00:00:00,500 --> 00:00:02,000\n你好，世界\n\n2\n00:00:02,000 --> 00:00:03,500\n再见。\n";
        let doc = parse_srt(srt);

        assert_eq!(doc.len(), 2);
        assert!((doc.cues[0].duration() - 1.5).abs() < 1e-9);
        assert!((doc.cues[1].duration() - 1.5).abs() < 1e-9);
        assert_eq!(doc.cues[0].text, "你好，世界");
        assert_eq!(doc.cues[1].text, "再见。");
    }

    #[test]
    fn test_emit_parse_round_trip() {
        let doc = SrtDocument::new(vec![
            SubtitleCue {
                index: 1,
                start: 0.5,
                end: 2.0,
                text: "first cue".to_string(),
            },
            SubtitleCue {
                index: 2,
                start: 2.0,
                end: 3.5,
                text: "第二条字幕".to_string(),
            },
            SubtitleCue {
                index: 3,
                start: 10.0,
                end: 12.345,
                text: "third".to_string(),
            },
        ]);

        let parsed = parse_srt(&format_srt(&doc));
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_document_invariants_after_parse() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\na b\n\n2\n00:00:01,000 --> 00:00:02,000\nc d\n\n3\n00:00:02,500 --> 00:00:04,000\ne f\n";
        let doc = parse_srt(srt);

        for (i, cue) in doc.cues.iter().enumerate() {
            assert_eq!(cue.index, i + 1);
            assert!(cue.start < cue.end);
        }
        for pair in doc.cues.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_empty_input_is_empty_document() {
        assert!(parse_srt("").is_empty());
        assert_eq!(format_srt(&SrtDocument::default()), "");
    }
}

// ============================================================================
// Cue segmentation
// ============================================================================

mod builder_tests {
    use super::*;

    #[test]
    fn test_timestamped_segmentation() {
        let text = "你好世界。再见！";
        let ts: Vec<[i64; 2]> = vec![
            [0, 100],
            [100, 200],
            [200, 300],
            [300, 400],
            [400, 500],
            [500, 1500],
            [1500, 1600],
            [1600, 1700],
        ];

        let doc = build_cues(text, Some(&ts), None);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.cues[0].text, "你好世界。");
        assert!((doc.cues[0].start - 0.0).abs() < 1e-9);
        assert!((doc.cues[0].end - 0.5).abs() < 1e-9);
        assert_eq!(doc.cues[1].text, "再见！");
        assert!((doc.cues[1].start - 0.5).abs() < 1e-9);
        assert!((doc.cues[1].end - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_plain_text_path_without_duration() {
        let doc = build_cues("第一句话结束。第二句话也结束。", None, None);
        assert_eq!(doc.len(), 2);
        assert!(doc.cues[0].start < doc.cues[1].start);
        assert!((doc.cues[0].end - doc.cues[1].start).abs() < 1e-9);
    }

    #[test]
    fn test_single_char_sentences_dropped() {
        let doc = build_cues("啊。这是一句完整的话。", None, None);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.cues[0].text, "这是一句完整的话。");
    }

    #[test]
    fn test_known_duration_is_respected() {
        let doc = build_cues("一句。两句啊。", None, Some(9.0));
        assert!(!doc.is_empty());
        let last = doc.cues.last().unwrap();
        assert!(last.end <= 9.0 + 1e-9);
    }
}

// ============================================================================
// Chunk merge (global timestamps)
// ============================================================================

mod merge_tests {
    use super::*;

    fn plan(index: usize, start: u64, dur: u64) -> ChunkPlan {
        ChunkPlan {
            index,
            start: Duration::from_secs(start),
            duration: Duration::from_secs(dur),
        }
    }

    #[test]
    fn test_two_chunk_900s_merge() {
        let plans = vec![plan(1, 0, 450), plan(2, 450, 450)];
        let results = vec![
            ChunkTranscript {
                index: 1,
                text: "A".to_string(),
                timestamps: Some(vec![[0, 200]]),
            },
            ChunkTranscript {
                index: 2,
                text: "B".to_string(),
                timestamps: Some(vec![[0, 300]]),
            },
        ];

        let merged = merge_chunks(&results, &plans, 0).unwrap();
        assert_eq!(merged.text, "A B");
        assert_eq!(merged.timestamps, Some(vec![[0, 200], [450_000, 450_300]]));
        assert!((merged.duration_seconds() - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_merged_timestamps_monotone_across_many_chunks() {
        let plans: Vec<ChunkPlan> = (0..6).map(|i| plan(i + 1, i as u64 * 120, 120)).collect();
        let results: Vec<ChunkTranscript> = (0..6)
            .map(|i| ChunkTranscript {
                index: i + 1,
                text: format!("chunk{i}"),
                timestamps: Some(vec![[0, 500], [500, 1200], [1200, 5000]]),
            })
            .collect();

        let merged = merge_chunks(&results, &plans, 0).unwrap();
        let ts = merged.timestamps.unwrap();
        for pair in ts.windows(2) {
            assert!(pair[1][0] >= pair[0][0], "starts must not go backwards");
        }
        for t in &ts {
            assert!(t[1] >= t[0]);
        }
    }

    #[test]
    fn test_merged_transcript_feeds_builder() {
        let plans = vec![plan(1, 0, 1), plan(2, 1, 1)];
        let results = vec![
            ChunkTranscript {
                index: 1,
                text: "你好。".to_string(),
                timestamps: Some(vec![[0, 200], [200, 400], [400, 600]]),
            },
            ChunkTranscript {
                index: 2,
                text: "再见。".to_string(),
                timestamps: Some(vec![[0, 200], [200, 400], [400, 600]]),
            },
        ];
        let merged = merge_chunks(&results, &plans, 0).unwrap();

        // The merged text contains the joining space, whose character has no
        // timestamp pair of its own; downstream cue boundaries must survive.
        let doc = build_cues(
            &merged.text,
            merged.timestamps.as_deref(),
            Some(merged.duration_seconds()),
        );
        assert!(!doc.is_empty());
        for pair in doc.cues.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
    }
}

// ============================================================================
// Chunk planning
// ============================================================================

mod planning_tests {
    use super::*;

    #[test]
    fn test_planned_durations_sum_exactly() {
        let limits = ChunkLimits::default();
        for secs in [30.0, 600.0, 601.5, 3600.0, 9999.25] {
            let total = Duration::from_secs_f64(secs);
            let plans = plan_chunks(total, 1, &limits);
            if plans.is_empty() {
                continue;
            }
            let sum: Duration = plans.iter().map(|p| p.duration).sum();
            let diff = if sum > total { sum - total } else { total - sum };
            assert!(
                diff <= Duration::from_millis(1),
                "{secs}s: sum off by {diff:?}"
            );
        }
    }

    #[test]
    fn test_limits_respected() {
        let limits = ChunkLimits::default();
        let plans = plan_chunks(Duration::from_secs(3000), 50 * 1024 * 1024, &limits);
        assert_eq!(plans.len(), 5);
        for plan in &plans {
            assert!(plan.duration <= limits.max_duration);
        }
    }
}

// ============================================================================
// Hotword correction
// ============================================================================

mod hotword_tests {
    use super::*;

    #[test]
    fn test_phonetic_and_fuzzy_corrections() {
        let hotwords = vec!["ultrathink".to_string(), "Python".to_string()];
        let report = apply_hotwords(
            "派森 非常 乌尔特拉 强",
            &hotwords,
            &PostProcessConfig::default(),
        );

        assert_eq!(report.text, "Python 非常 ultrathink 强");
        assert_eq!(report.corrections, 2);
        assert_eq!(report.hotwords_applied, 2);
    }

    #[test]
    fn test_no_similar_tokens_means_identity() {
        let hotwords = vec!["kubernetes".to_string(), "websocket".to_string()];
        let text = "完全无关的句子 with plain words";
        let report = apply_hotwords(text, &hotwords, &PostProcessConfig::default());

        assert_eq!(report.text, text);
        assert_eq!(report.corrections, 0);
    }
}

// ============================================================================
// Translation chunking
// ============================================================================

mod translation_split_tests {
    use super::*;

    #[test]
    fn test_below_target_stays_single() {
        for len in [1usize, 100, 1999, 2000] {
            let text = "x".repeat(len);
            assert_eq!(split_chunks(&text, 2000, 2400).len(), 1, "len {len}");
        }
    }

    #[test]
    fn test_long_text_reassembles_losslessly() {
        let text = "这是一个句子。And an English one. ".repeat(300);
        let chunks = split_chunks(&text, 2000, 2400);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }
}
