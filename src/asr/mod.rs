pub mod client;
pub mod coordinator;
pub mod merge;
pub mod pool;

pub use client::AsrClient;
pub use coordinator::AsrCoordinator;
pub use merge::merge_chunks;
pub use pool::BackendPool;

use std::time::Duration;

/// Response of a backend's `/health` endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub gpu_available: bool,
}

impl BackendHealth {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Normalized recognition result for one chunk, in chunk-local time.
#[derive(Debug, Clone)]
pub struct ChunkTranscript {
    /// Ordinal of the source chunk (1-based).
    pub index: usize,
    pub text: String,
    /// Character-level `[start_ms, end_ms]` pairs when the backend emits them.
    pub timestamps: Option<Vec<[i64; 2]>>,
}

/// A full transcript assembled from all chunks, timestamps in global time.
#[derive(Debug, Clone)]
pub struct MergedTranscript {
    pub text: String,
    pub timestamps: Option<Vec<[i64; 2]>>,
    /// Sum of planned chunk durations.
    pub duration: Duration,
    /// True when at least one chunk failed but the transcript is usable.
    pub partial: bool,
    pub chunks_total: usize,
    pub chunks_succeeded: usize,
}

impl MergedTranscript {
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
