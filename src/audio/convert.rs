use std::path::Path;
use std::process::Command;
use std::time::Duration;

use hound::WavReader;
use tracing::{debug, info, warn};

use crate::error::{Result, SubpipeError};

use super::AudioBuffer;

/// Check that FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        SubpipeError::AudioDecode(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(SubpipeError::AudioDecode("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Get media duration using FFprobe; works for any decodable container.
pub fn get_media_duration(input: &Path) -> Result<Duration> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| SubpipeError::AudioDecode(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubpipeError::AudioDecode(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        SubpipeError::AudioDecode(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(Duration::from_secs_f64(duration_secs))
}

/// Read WAV header information without decoding samples.
pub fn probe_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .map_err(|e| SubpipeError::AudioDecode(format!("Failed to open WAV file: {e}")))?;
    let spec = reader.spec();
    let frames = reader.duration() as u64;

    Ok(AudioBuffer {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames,
    })
}

fn run_ffmpeg_to_wav(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| SubpipeError::AudioDecode(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(SubpipeError::AudioDecode(
            "FFmpeg audio conversion failed".to_string(),
        ));
    }
    if !output.exists() || std::fs::metadata(output)?.len() == 0 {
        return Err(SubpipeError::AudioDecode(
            "Converted file missing or empty".to_string(),
        ));
    }
    Ok(())
}

/// Convert any decodable media file to 16 kHz mono signed 16-bit PCM WAV.
///
/// When the output already exists in the right format the conversion is
/// skipped. When input and output are the same path the data is converted
/// into a uniquely named temp file first, the original is backed up, the
/// temp moved into place and the backup removed; any failure restores the
/// backup.
pub async fn prepare_wav(input: &Path, output: &Path) -> Result<AudioBuffer> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(SubpipeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            input.display().to_string(),
        )));
    }

    if input != output {
        info!("Converting {} -> {}", input.display(), output.display());
        run_ffmpeg_to_wav(input, output)?;
        return probe_wav(output);
    }

    // Same-path conversion.
    if let Ok(buffer) = probe_wav(input) {
        if buffer.is_asr_ready() {
            info!("Audio already 16kHz mono, skipping conversion");
            return Ok(buffer);
        }
    }

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix("convert_")
        .suffix(".wav")
        .tempfile_in(dir)?;
    let temp_path = temp.path().to_path_buf();

    info!(
        "In-place conversion of {} via {}",
        output.display(),
        temp_path.display()
    );
    run_ffmpeg_to_wav(input, &temp_path)?;

    let backup = output.with_extension("wav.bak");
    std::fs::rename(output, &backup)?;
    match temp.persist(output) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&backup) {
                warn!("Failed to remove backup {}: {e}", backup.display());
            }
        }
        Err(e) => {
            warn!("Failed to move converted file into place: {e}");
            std::fs::rename(&backup, output)?;
            return Err(SubpipeError::Io(e.error));
        }
    }

    probe_wav(output)
}

/// Cut a segment `[start, start + duration)` of a WAV file into `output`.
pub async fn cut_segment(
    input: &Path,
    output: &Path,
    start: Duration,
    duration: Duration,
) -> Result<()> {
    if duration.is_zero() {
        return Err(SubpipeError::AudioDecode(
            "Segment duration is zero".to_string(),
        ));
    }

    let start_secs = format!("{:.3}", start.as_secs_f64());
    let duration_secs = format!("{:.3}", duration.as_secs_f64());
    debug!("Cutting segment start={start_secs} duration={duration_secs}");

    let status = Command::new("ffmpeg")
        .args(["-y", "-ss"])
        .arg(&start_secs)
        .arg("-t")
        .arg(&duration_secs)
        .arg("-i")
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| SubpipeError::AudioDecode(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(SubpipeError::AudioDecode(
            "FFmpeg segment extraction failed".to_string(),
        ));
    }
    Ok(())
}
