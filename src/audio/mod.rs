pub mod chunk;
pub mod convert;
pub mod silence;

pub use chunk::{create_chunks, plan_chunks, ChunkLimits};
pub use convert::{check_ffmpeg, cut_segment, get_media_duration, prepare_wav, probe_wav};
pub use silence::is_silent_file;

use std::path::PathBuf;
use std::time::Duration;

/// Sample rate expected by the ASR backends.
pub const ASR_SAMPLE_RATE: u32 = 16_000;
/// Channel count expected by the ASR backends.
pub const ASR_CHANNELS: u16 = 1;

/// A prepared PCM WAV file.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

impl AudioBuffer {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    /// Whether the file already matches the ASR input format.
    pub fn is_asr_ready(&self) -> bool {
        self.sample_rate == ASR_SAMPLE_RATE && self.channels == ASR_CHANNELS
    }
}

/// A planned slice of the source audio. `start` and `duration` define the
/// chunk's place in the global timeline; any cut lead-in overlap is excluded
/// from both.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    /// 1-based, contiguous.
    pub index: usize,
    pub start: Duration,
    pub duration: Duration,
}

impl ChunkPlan {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// A chunk cut to its own file, ready for submission.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub plan: ChunkPlan,
    pub path: PathBuf,
}

impl AudioChunk {
    pub fn duration(&self) -> Duration {
        self.plan.duration
    }
}
