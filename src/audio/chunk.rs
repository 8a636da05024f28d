use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;

use super::convert::cut_segment;
use super::{AudioChunk, ChunkPlan};

/// Per-chunk bounds imposed by the ASR backends.
#[derive(Debug, Clone)]
pub struct ChunkLimits {
    /// Maximum chunk file size in bytes.
    pub max_bytes: u64,
    /// Maximum chunk duration.
    pub max_duration: Duration,
    /// Lead-in added when cutting so words are not clipped at boundaries.
    /// Never counted in the global timeline.
    pub overlap: Duration,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_bytes: 100 * 1024 * 1024,
            max_duration: Duration::from_secs(600),
            overlap: Duration::from_millis(500),
        }
    }
}

/// Plan chunk boundaries for an audio file.
///
/// A file within both limits yields a single chunk. Otherwise the count is
/// `max(ceil(duration/max_duration), ceil(size/max_bytes))` and the file is
/// split into equal-duration slices; the last slice absorbs rounding so the
/// planned durations sum exactly to the total.
pub fn plan_chunks(total_duration: Duration, file_size: u64, limits: &ChunkLimits) -> Vec<ChunkPlan> {
    if total_duration.is_zero() {
        return Vec::new();
    }

    if file_size <= limits.max_bytes && total_duration <= limits.max_duration {
        return vec![ChunkPlan {
            index: 1,
            start: Duration::ZERO,
            duration: total_duration,
        }];
    }

    let total_secs = total_duration.as_secs_f64();
    let by_duration = (total_secs / limits.max_duration.as_secs_f64()).ceil() as u64;
    let by_size = file_size.div_ceil(limits.max_bytes);
    let count = by_duration.max(by_size).max(1) as usize;

    let slice = total_secs / count as f64;
    info!(
        "Splitting {:.1}s / {} bytes into {} chunks of {:.1}s",
        total_secs, file_size, count, slice
    );

    let mut plans = Vec::with_capacity(count);
    for i in 0..count {
        let start = Duration::from_secs_f64(slice * i as f64);
        let duration = if i == count - 1 {
            total_duration.saturating_sub(start)
        } else {
            Duration::from_secs_f64(slice)
        };
        plans.push(ChunkPlan {
            index: i + 1,
            start,
            duration,
        });
    }
    plans
}

/// Cut planned chunks into WAV files under `output_dir`.
///
/// Chunks after the first are cut with `limits.overlap` of lead-in; the
/// plan's start/duration stay authoritative for offset accounting.
pub async fn create_chunks(
    source: &Path,
    plans: &[ChunkPlan],
    output_dir: &Path,
    limits: &ChunkLimits,
) -> Result<Vec<AudioChunk>> {
    std::fs::create_dir_all(output_dir)?;

    let mut chunks = Vec::with_capacity(plans.len());
    for plan in plans {
        let path = output_dir.join(format!("chunk_{:04}.wav", plan.index));

        let lead_in = if plan.index > 1 {
            limits.overlap.min(plan.start)
        } else {
            Duration::ZERO
        };
        let cut_start = plan.start - lead_in;
        let cut_duration = plan.duration + lead_in;

        debug!(
            "Cutting chunk {} at {:?} (+{:?} lead-in) for {:?}",
            plan.index, plan.start, lead_in, plan.duration
        );
        cut_segment(source, &path, cut_start, cut_duration).await?;

        chunks.push(AudioChunk {
            plan: plan.clone(),
            path,
        });
    }

    info!("Created {} audio chunks", chunks.len());
    Ok(chunks)
}

/// Remove chunk files after transcription.
pub fn cleanup_chunks(chunks: &[AudioChunk]) {
    for chunk in chunks {
        if chunk.path.exists() {
            if let Err(e) = std::fs::remove_file(&chunk.path) {
                tracing::warn!("Failed to remove chunk {}: {e}", chunk.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ChunkLimits {
        ChunkLimits::default()
    }

    #[test]
    fn test_small_file_single_chunk() {
        let plans = plan_chunks(Duration::from_secs(300), 10 * 1024 * 1024, &limits());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].index, 1);
        assert_eq!(plans[0].start, Duration::ZERO);
        assert_eq!(plans[0].duration, Duration::from_secs(300));
    }

    #[test]
    fn test_long_audio_split_by_duration() {
        let plans = plan_chunks(Duration::from_secs(900), 10 * 1024 * 1024, &limits());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].duration, Duration::from_secs(450));
        assert_eq!(plans[1].start, Duration::from_secs(450));
        assert_eq!(plans[1].duration, Duration::from_secs(450));
    }

    #[test]
    fn test_large_file_split_by_size() {
        let plans = plan_chunks(Duration::from_secs(120), 250 * 1024 * 1024, &limits());
        assert_eq!(plans.len(), 3);
    }

    #[test]
    fn test_count_takes_max_of_both_limits() {
        // 1500s forces 3 by duration, 150MB only 2 by size.
        let plans = plan_chunks(Duration::from_secs(1500), 150 * 1024 * 1024, &limits());
        assert_eq!(plans.len(), 3);
    }

    #[test]
    fn test_durations_sum_to_total() {
        for secs in [601.0, 900.0, 1234.567, 7200.25] {
            let total = Duration::from_secs_f64(secs);
            let plans = plan_chunks(total, 1, &limits());
            let sum: Duration = plans.iter().map(|p| p.duration).sum();
            let diff = if sum > total { sum - total } else { total - sum };
            assert!(diff <= Duration::from_millis(1), "{secs}: off by {diff:?}");
        }
    }

    #[test]
    fn test_chunks_are_contiguous() {
        let plans = plan_chunks(Duration::from_secs(2000), 1, &limits());
        assert!(plans.len() >= 4);
        for (i, pair) in plans.windows(2).enumerate() {
            let gap = pair[1].start.abs_diff(pair[0].end());
            assert!(gap <= Duration::from_millis(1), "gap after chunk {i}");
        }
        assert_eq!(plans[0].start, Duration::ZERO);
        for (i, plan) in plans.iter().enumerate() {
            assert_eq!(plan.index, i + 1);
        }
    }

    #[test]
    fn test_zero_duration_no_chunks() {
        assert!(plan_chunks(Duration::ZERO, 100, &limits()).is_empty());
    }
}
