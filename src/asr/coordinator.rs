use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::audio::{silence, AudioChunk, ChunkPlan};
use crate::error::{Result, SubpipeError};

use super::merge::merge_chunks;
use super::pool::BackendPool;
use super::{ChunkTranscript, MergedTranscript};

/// Drives chunk submission against the backend pool and merges the results.
///
/// Chunks are submitted sequentially in ordinal order; the pool's backends
/// are typically single-tenant GPU services, and sequential submission keeps
/// the offset bookkeeping trivially correct.
pub struct AsrCoordinator {
    pool: BackendPool,
}

impl AsrCoordinator {
    pub fn new(pool: BackendPool) -> Self {
        Self { pool }
    }

    /// Transcribe prepared chunks into one merged transcript.
    ///
    /// A transport or 5xx failure causes a failover to the next healthy
    /// backend only while no chunk has succeeded yet; afterwards a failing
    /// chunk is logged and skipped so one bad chunk cannot sink the request.
    pub async fn transcribe_chunks(
        &self,
        chunks: &[AudioChunk],
        hotwords: Option<&[String]>,
        cancelled: &AtomicBool,
    ) -> Result<MergedTranscript> {
        if chunks.is_empty() {
            return Err(SubpipeError::TranscriptionEmpty);
        }

        let backends = self.pool.ranked().await;
        if backends.is_empty() {
            return Err(SubpipeError::Transcription(
                "no available transcription backends".to_string(),
            ));
        }

        if let Some(words) = hotwords {
            if !words.is_empty() {
                info!("Using {} hotwords for recognition", words.len());
            }
        }

        let plans: Vec<ChunkPlan> = chunks.iter().map(|c| c.plan.clone()).collect();
        // Single-chunk audio bypasses the silence gate; short clips with a
        // single faint utterance would otherwise be dropped whole.
        let gate_silence = chunks.len() > 1;

        let mut backend_idx = 0usize;
        let mut results: Vec<ChunkTranscript> = Vec::new();
        let mut failed = 0usize;
        let mut any_success = false;

        for chunk in chunks {
            if cancelled.load(Ordering::Relaxed) {
                return Err(SubpipeError::Cancelled);
            }

            if gate_silence {
                match silence::is_silent_file(&chunk.path) {
                    Ok(true) => {
                        debug!("Skipping silent chunk {}", chunk.plan.index);
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => warn!(
                        "Silence check failed for chunk {}: {e}",
                        chunk.plan.index
                    ),
                }
            }

            loop {
                let backend = &backends[backend_idx];
                debug!(
                    "Submitting chunk {}/{} to {}",
                    chunk.plan.index,
                    chunks.len(),
                    backend.entry.name
                );

                match backend.client.recognize(&chunk.path, hotwords).await {
                    Ok(recognition) => {
                        any_success = true;
                        results.push(ChunkTranscript {
                            index: chunk.plan.index,
                            text: recognition.text,
                            timestamps: recognition.timestamps,
                        });
                        break;
                    }
                    Err(e) => {
                        let can_fail_over = !any_success
                            && e.is_backend_fault()
                            && backend_idx + 1 < backends.len();
                        if can_fail_over {
                            warn!(
                                "Backend {} failed before first success ({e}), failing over to {}",
                                backend.entry.name,
                                backends[backend_idx + 1].entry.name
                            );
                            backend_idx += 1;
                            continue;
                        }
                        warn!("Chunk {} failed: {e}", chunk.plan.index);
                        failed += 1;
                        break;
                    }
                }
            }
        }

        merge_chunks(&results, &plans, failed)
    }
}
