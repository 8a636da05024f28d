use std::path::Path;

use hound::WavReader;
use tracing::debug;

use crate::error::{Result, SubpipeError};

/// Peak amplitude below which a chunk may be silence.
const SILENCE_PEAK_THRESHOLD: f32 = 1e-4;
/// Mean energy below which a chunk may be silence.
const SILENCE_ENERGY_THRESHOLD: f64 = 1e-8;

/// Peak amplitude and mean energy of normalized samples.
pub fn silence_metrics(samples: &[f32]) -> (f32, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = 0.0f32;
    let mut energy_sum = 0.0f64;
    for &s in samples {
        peak = peak.max(s.abs());
        energy_sum += (s as f64) * (s as f64);
    }
    (peak, energy_sum / samples.len() as f64)
}

/// Conservative silence classification: both the peak and the mean energy
/// must be negligible, so quiet speech is not mistaken for noise.
pub fn is_silent(samples: &[f32]) -> bool {
    let (peak, energy) = silence_metrics(samples);
    peak < SILENCE_PEAK_THRESHOLD && energy < SILENCE_ENERGY_THRESHOLD
}

/// Classify a WAV file as silence.
pub fn is_silent_file(path: &Path) -> Result<bool> {
    let reader = WavReader::open(path)
        .map_err(|e| SubpipeError::AudioDecode(format!("Failed to open WAV file: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.unwrap_or(0) as f32 / i16::MAX as f32)
            .collect(),
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.unwrap_or(0.0))
            .collect(),
    };

    let silent = is_silent(&samples);
    if silent {
        let (peak, energy) = silence_metrics(&samples);
        debug!("Chunk classified as silence (peak={peak:.6e}, energy={energy:.6e})");
    }
    Ok(silent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_is_silent() {
        let samples = vec![0.0f32; 16000];
        assert!(is_silent(&samples));
    }

    #[test]
    fn test_speech_level_is_not_silent() {
        let samples: Vec<f32> = (0..16000)
            .map(|i| (i as f32 * 0.01).sin() * 0.1)
            .collect();
        assert!(!is_silent(&samples));
    }

    #[test]
    fn test_quiet_but_audible_is_not_silent() {
        // Peak just above the threshold keeps the chunk.
        let mut samples = vec![0.0f32; 16000];
        samples[100] = 2e-4;
        assert!(!is_silent(&samples));
    }

    #[test]
    fn test_empty_is_silent() {
        assert!(is_silent(&[]));
    }

    #[test]
    fn test_metrics() {
        let samples = [0.5f32, -0.5, 0.5, -0.5];
        let (peak, energy) = silence_metrics(&samples);
        assert!((peak - 0.5).abs() < 1e-6);
        assert!((energy - 0.25).abs() < 1e-9);
    }
}
