use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::ChunkPlan;
use crate::error::{Result, SubpipeError};

use super::{ChunkTranscript, MergedTranscript};

/// Merge per-chunk recognition results into one transcript.
///
/// Chunk texts are joined with single spaces in ordinal order. Timestamps
/// are shifted into global time by the cumulative *planned* durations of all
/// preceding chunks, never by durations reported back by the backend, so a
/// failed or skipped chunk cannot shift everything after it.
pub fn merge_chunks(
    results: &[ChunkTranscript],
    plans: &[ChunkPlan],
    failed_chunks: usize,
) -> Result<MergedTranscript> {
    let total_duration: Duration = plans.iter().map(|p| p.duration).sum();

    // Cumulative start offset per ordinal, in milliseconds.
    let mut offsets_ms: HashMap<usize, i64> = HashMap::with_capacity(plans.len());
    let mut acc = 0.0f64;
    for plan in plans {
        offsets_ms.insert(plan.index, acc.round() as i64);
        acc += plan.duration.as_secs_f64() * 1000.0;
    }

    let mut sorted: Vec<&ChunkTranscript> = results.iter().filter(|r| !r.text.is_empty()).collect();
    sorted.sort_by_key(|r| r.index);

    if sorted.is_empty() {
        return Err(SubpipeError::TranscriptionEmpty);
    }

    let text = sorted
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    // Timestamps survive only when every contributing chunk carried them;
    // a mixed set would leave holes in the character walk downstream.
    let all_timestamped = sorted.iter().all(|r| r.timestamps.is_some());
    let timestamps = if all_timestamped {
        let mut merged = Vec::new();
        for result in &sorted {
            let offset = offsets_ms.get(&result.index).copied().unwrap_or_else(|| {
                warn!("No planned offset for chunk {}, assuming 0", result.index);
                0
            });
            for pair in result.timestamps.as_ref().expect("checked above") {
                merged.push([pair[0] + offset, pair[1] + offset]);
            }
        }
        Some(merged)
    } else {
        if sorted.iter().any(|r| r.timestamps.is_some()) {
            warn!("Timestamps missing on some chunks, dropping all");
        }
        None
    };

    let partial = failed_chunks > 0;
    info!(
        "Merged {}/{} chunks into {} characters ({:.2}s{})",
        sorted.len(),
        plans.len(),
        text.chars().count(),
        total_duration.as_secs_f64(),
        if partial { ", partial" } else { "" }
    );

    Ok(MergedTranscript {
        text,
        timestamps,
        duration: total_duration,
        partial,
        chunks_total: plans.len(),
        chunks_succeeded: sorted.len(),
    })
}
