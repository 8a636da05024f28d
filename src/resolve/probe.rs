//! Platform metadata and media download via the external prober (yt-dlp).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SubpipeError};

use super::{Platform, SubtitleTrack, VideoInfo};

/// Deadline for a metadata fetch.
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for a media download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Audio format selectors tried in order: audio-only first, then
/// progressively heavier video formats whose audio we strip later.
const FORMAT_FALLBACKS: &[&str] = &[
    "bestaudio[ext=m4a]/bestaudio",
    "worst[height<=360]/worstvideo+bestaudio",
    "best[height<=720]",
];

/// Raw shape of the prober's JSON dump; only the fields the resolver needs.
#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    /// YYYYMMDD as emitted by extractors.
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<SubtitleTrack>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<SubtitleTrack>>,
}

impl From<RawVideoInfo> for VideoInfo {
    fn from(raw: RawVideoInfo) -> Self {
        VideoInfo {
            id: raw.id,
            title: raw.title,
            uploader: raw.uploader,
            duration: raw.duration.unwrap_or(0.0).max(0.0),
            upload_date: raw.upload_date.map(|d| iso_date(&d)),
            language: raw.language.map(|l| l.to_lowercase()),
            manual_subtitles: raw.subtitles,
            auto_captions: raw.automatic_captions,
        }
    }
}

/// `20240131` -> `2024-01-31`; anything else passes through untouched.
fn iso_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

/// Shells out to yt-dlp for metadata and media, the way the audio tool is
/// shelled out to for decoding.
pub struct MediaProber {
    binary: String,
    cookies: Option<PathBuf>,
}

impl MediaProber {
    pub fn new(cookies: Option<PathBuf>) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            cookies,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn base_command(&self, platform: Platform) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--no-warnings").arg("--no-playlist");

        if let Some(origin) = platform.origin() {
            cmd.arg("--add-headers").arg(format!("Origin:{origin}"));
            cmd.arg("--add-headers").arg(format!("Referer:{origin}/"));
        }

        if let Some(cookies) = &self.cookies {
            if cookies.is_dir() {
                // A directory means a Firefox profile.
                cmd.arg("--cookies-from-browser")
                    .arg(format!("firefox:{}", cookies.display()));
            } else if cookies.is_file() {
                cmd.arg("--cookies").arg(cookies);
            } else {
                warn!(
                    "Configured cookie artifact missing: {}",
                    cookies.display()
                );
            }
        }
        cmd
    }

    /// Fetch platform metadata as a JSON dump. One retry in metadata-only
    /// mode is attempted before giving up.
    pub async fn fetch_metadata(&self, url: &str, platform: Platform) -> Result<VideoInfo> {
        match self.fetch_metadata_once(url, platform, false).await {
            Ok(info) => Ok(info),
            Err(first_error) => {
                if matches!(first_error, SubpipeError::AuthRequired(_)) {
                    return Err(first_error);
                }
                warn!("Metadata fetch failed ({first_error}), retrying metadata-only");
                self.fetch_metadata_once(url, platform, true).await
            }
        }
    }

    async fn fetch_metadata_once(
        &self,
        url: &str,
        platform: Platform,
        metadata_only: bool,
    ) -> Result<VideoInfo> {
        let mut cmd = self.base_command(platform);
        cmd.arg("-J").arg("--skip-download");
        if metadata_only {
            cmd.arg("--ignore-no-formats-error");
        }
        cmd.arg(url);

        debug!("Fetching metadata for {url}");
        let output = tokio::time::timeout(METADATA_TIMEOUT, cmd.output())
            .await
            .map_err(|_| SubpipeError::SourceUnavailable("metadata fetch timed out".to_string()))?
            .map_err(|e| SubpipeError::SourceUnavailable(format!("prober not runnable: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_prober_error(&stderr, &self.cookies));
        }

        let raw: RawVideoInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| SubpipeError::SourceUnavailable(format!("bad metadata JSON: {e}")))?;
        let info = VideoInfo::from(raw);
        info!(
            "Metadata: {} ({:.0}s, {} manual / {} auto subtitle languages)",
            info.title,
            info.duration,
            info.manual_subtitles.len(),
            info.auto_captions.len()
        );
        Ok(info)
    }

    /// Download the media's audio into `output_dir`, walking the format
    /// fallback chain when the preferred selector is rejected.
    pub async fn download_audio(
        &self,
        url: &str,
        platform: Platform,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let template = output_dir.join("source.%(ext)s");

        let mut last_error = None;
        for &selector in FORMAT_FALLBACKS {
            info!("Downloading media with format selector {selector:?}");
            let mut cmd = self.base_command(platform);
            cmd.args(["-f", selector, "-o"]).arg(&template).arg(url);

            let output = tokio::time::timeout(DOWNLOAD_TIMEOUT, cmd.output())
                .await
                .map_err(|_| {
                    SubpipeError::SourceUnavailable("media download timed out".to_string())
                })?
                .map_err(|e| {
                    SubpipeError::SourceUnavailable(format!("prober not runnable: {e}"))
                })?;

            if output.status.success() {
                if let Some(path) = find_downloaded_file(output_dir) {
                    info!("Downloaded media to {}", path.display());
                    return Ok(path);
                }
                last_error = Some(SubpipeError::SourceUnavailable(
                    "download reported success but produced no file".to_string(),
                ));
                continue;
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let error = classify_prober_error(&stderr, &self.cookies);
            if matches!(error, SubpipeError::AuthRequired(_)) {
                return Err(error);
            }
            warn!("Format {selector:?} failed: {error}");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| {
            SubpipeError::NoUsableSource("all format selectors rejected".to_string())
        }))
    }
}

/// Map prober stderr to the error taxonomy. Auth problems name the missing
/// cookie artifact so the operator knows what to refresh.
fn classify_prober_error(stderr: &str, cookies: &Option<PathBuf>) -> SubpipeError {
    let lowered = stderr.to_lowercase();
    let auth_markers = [
        "sign in",
        "login required",
        "cookies",
        "account",
        "private video",
        "members-only",
    ];
    if auth_markers.iter().any(|m| lowered.contains(m)) {
        let artifact = cookies
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no cookie file configured".to_string());
        return SubpipeError::AuthRequired(format!(
            "platform demands credentials (cookie artifact: {artifact})"
        ));
    }

    let summary: String = stderr.lines().rev().find(|l| !l.trim().is_empty()).map_or_else(
        || "unknown prober error".to_string(),
        |l| l.trim().to_string(),
    );
    SubpipeError::SourceUnavailable(summary)
}

fn find_downloaded_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s == "source")
                && p.extension().and_then(|e| e.to_str()) != Some("part")
        })
        .max_by_key(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_info_conversion() {
        let json = serde_json::json!({
            "id": "abc123",
            "title": "Test video",
            "uploader": "channel",
            "duration": 123.4,
            "upload_date": "20240131",
            "language": "EN",
            "subtitles": {"en": [{"ext": "vtt", "url": "https://x/sub.vtt"}]},
            "automatic_captions": {"en-orig": [{"ext": "json3", "url": "https://x/a.json3"}]}
        });
        let raw: RawVideoInfo = serde_json::from_value(json).unwrap();
        let info = VideoInfo::from(raw);

        assert_eq!(info.id, "abc123");
        assert_eq!(info.upload_date.as_deref(), Some("2024-01-31"));
        assert_eq!(info.language.as_deref(), Some("en"));
        assert!(info.manual_subtitles.contains_key("en"));
        assert!(info.auto_captions.contains_key("en-orig"));
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let raw: RawVideoInfo = serde_json::from_value(serde_json::json!({})).unwrap();
        let info = VideoInfo::from(raw);
        assert_eq!(info.duration, 0.0);
        assert!(info.manual_subtitles.is_empty());
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date("20231205"), "2023-12-05");
        assert_eq!(iso_date("2023-12-05"), "2023-12-05");
        assert_eq!(iso_date("unknown"), "unknown");
    }

    #[test]
    fn test_auth_error_classified_with_artifact() {
        let cookies = Some(PathBuf::from("/app/config/cookies.txt"));
        let error = classify_prober_error("ERROR: Sign in to confirm your age", &cookies);
        match error {
            SubpipeError::AuthRequired(msg) => assert!(msg.contains("cookies.txt")),
            other => panic!("expected AuthRequired, got {other}"),
        }
    }

    #[test]
    fn test_generic_error_is_source_unavailable() {
        let error = classify_prober_error("ERROR: Video unavailable", &None);
        assert!(matches!(error, SubpipeError::SourceUnavailable(_)));
    }

    #[test]
    fn test_find_downloaded_file_ignores_partials() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("source.m4a"), b"audio").unwrap();
        std::fs::write(dir.path().join("source.part"), b"partial").unwrap();

        let found = find_downloaded_file(dir.path()).unwrap();
        assert_eq!(found.extension().unwrap(), "m4a");
    }
}
