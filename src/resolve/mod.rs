pub mod language;
pub mod probe;
pub mod strategy;
pub mod subtitle_dl;
pub mod url;

pub use language::{detect_language, Lang};
pub use probe::MediaProber;
pub use strategy::choose_strategy;
pub use url::normalize_url;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, SubpipeError};

/// Platforms the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Youtube,
    Bilibili,
    Acfun,
    Upload,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Bilibili => "bilibili",
            Platform::Acfun => "acfun",
            Platform::Upload => "upload",
        }
    }

    /// Origin/Referer pair expected by the platform's CDN.
    pub fn origin(&self) -> Option<&'static str> {
        match self {
            Platform::Youtube => Some("https://www.youtube.com"),
            Platform::Bilibili => Some("https://www.bilibili.com"),
            Platform::Acfun => Some("https://www.acfun.cn"),
            Platform::Upload => None,
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = SubpipeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "bilibili" => Ok(Platform::Bilibili),
            "acfun" => Ok(Platform::Acfun),
            "upload" => Ok(Platform::Upload),
            other => Err(SubpipeError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller handed in: a platform URL or an uploaded local file.
#[derive(Debug, Clone)]
pub enum RequestSource {
    Url(String),
    File(PathBuf),
}

/// One processing request, immutable once constructed.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub source: RequestSource,
    pub platform: Option<Platform>,
    pub tags: Vec<String>,
    pub translate_to: Option<String>,
    pub hotwords: Vec<String>,
    pub max_hotwords: Option<usize>,
}

impl SourceRequest {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: RequestSource::Url(url.into()),
            platform: None,
            tags: Vec::new(),
            translate_to: None,
            hotwords: Vec::new(),
            max_hotwords: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: RequestSource::File(path.into()),
            platform: Some(Platform::Upload),
            tags: Vec::new(),
            translate_to: None,
            hotwords: Vec::new(),
            max_hotwords: None,
        }
    }
}

/// One downloadable subtitle track.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubtitleTrack {
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub url: String,
}

/// Platform metadata, normalized across extractors.
#[derive(Debug, Clone, Default)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub duration: f64,
    /// ISO-8601 date when known.
    pub upload_date: Option<String>,
    pub language: Option<String>,
    pub manual_subtitles: BTreeMap<String, Vec<SubtitleTrack>>,
    pub auto_captions: BTreeMap<String, Vec<SubtitleTrack>>,
}

/// Whether subtitles are downloaded or the audio is transcribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleMode {
    Subtitle,
    Transcribe,
}

/// What the resolver produced for the rest of the pipeline.
#[derive(Debug, Clone)]
pub enum ResolvedArtifact {
    SubtitleText(String),
    AudioFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub info: Option<VideoInfo>,
    pub platform: Platform,
    pub language: Option<Lang>,
    pub mode: SubtitleMode,
    pub lang_priority: Vec<String>,
    pub artifact: ResolvedArtifact,
}

/// Classifies requests and obtains either subtitle text or an audio file.
pub struct SourceResolver {
    prober: MediaProber,
    http: reqwest::Client,
}

impl SourceResolver {
    pub fn new(prober: MediaProber) -> Self {
        Self {
            prober,
            http: reqwest::Client::new(),
        }
    }

    /// Resolve a request into a concrete plan, downloading the chosen
    /// artifact into `work_dir`.
    pub async fn resolve(&self, request: &SourceRequest, work_dir: &Path) -> Result<ResolvedPlan> {
        let url = match &request.source {
            RequestSource::File(path) => {
                // Uploaded audio goes straight to transcription.
                if !path.exists() {
                    return Err(SubpipeError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        path.display().to_string(),
                    )));
                }
                return Ok(ResolvedPlan {
                    info: None,
                    platform: Platform::Upload,
                    language: None,
                    mode: SubtitleMode::Transcribe,
                    lang_priority: Vec::new(),
                    artifact: ResolvedArtifact::AudioFile(path.clone()),
                });
            }
            RequestSource::Url(url) => url,
        };

        let (platform, video_id) = normalize_url(&self.http, url).await?;
        if let Some(requested) = request.platform {
            if requested != platform {
                warn!("Requested platform {requested} but URL resolves to {platform}");
            }
        }
        info!("Resolved {url} -> {platform}:{video_id}");

        let info = self.prober.fetch_metadata(url, platform).await?;
        let language = detect_language(&info);
        let (mode, lang_priority) = choose_strategy(language, &info)?;
        info!(
            "Language {:?}, mode {:?}, priority {:?}",
            language, mode, lang_priority
        );

        let artifact = match mode {
            SubtitleMode::Subtitle => {
                match self
                    .download_subtitles(&info, language, &lang_priority, platform)
                    .await
                {
                    Ok(text) => ResolvedArtifact::SubtitleText(text),
                    Err(e) => {
                        // A dead subtitle URL should not sink the request
                        // while the audio is still there.
                        warn!("Subtitle download failed ({e}), falling back to transcription");
                        let audio = self.prober.download_audio(url, platform, work_dir).await?;
                        ResolvedArtifact::AudioFile(audio)
                    }
                }
            }
            SubtitleMode::Transcribe => {
                let audio = self.prober.download_audio(url, platform, work_dir).await?;
                ResolvedArtifact::AudioFile(audio)
            }
        };

        let mode = match &artifact {
            ResolvedArtifact::SubtitleText(_) => SubtitleMode::Subtitle,
            ResolvedArtifact::AudioFile(_) => SubtitleMode::Transcribe,
        };

        Ok(ResolvedPlan {
            info: Some(info),
            platform,
            language,
            mode,
            lang_priority,
            artifact,
        })
    }

    async fn download_subtitles(
        &self,
        info: &VideoInfo,
        language: Option<Lang>,
        priority: &[String],
        platform: Platform,
    ) -> Result<String> {
        // Chinese only trusts manual tracks; English may use auto captions.
        let selected = subtitle_dl::select_track(priority, &info.manual_subtitles).or_else(|| {
            if language == Some(Lang::En) {
                subtitle_dl::select_track(priority, &info.auto_captions)
            } else {
                None
            }
        });

        let Some((lang, track)) = selected else {
            return Err(SubpipeError::NoUsableSource(
                "no subtitle track matched the priority list".to_string(),
            ));
        };
        info!("Downloading {lang} subtitle track ({})", track.ext);
        subtitle_dl::download_track(&self.http, track, platform).await
    }
}
