use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::BackendHealth;

/// Timeout for health probes; kept short so a dead backend is skipped fast.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Error from a single recognize call, split so the coordinator can decide
/// whether a failover is warranted.
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned server error {0}")]
    Server(StatusCode),

    #[error("backend rejected request ({0}): {1}")]
    Rejected(StatusCode, String),

    #[error("unparseable backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RecognizeError {
    /// Transport and 5xx errors make the whole backend suspect.
    pub fn is_backend_fault(&self) -> bool {
        matches!(self, RecognizeError::Transport(_) | RecognizeError::Server(_))
    }
}

/// Normalized `/recognize` result in chunk-local time.
#[derive(Debug, Clone)]
pub struct ChunkRecognition {
    pub text: String,
    pub timestamps: Option<Vec<[i64; 2]>>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAudioInfo {
    #[serde(default)]
    duration_seconds: Option<f64>,
}

/// Wire shape of a recognize response. Backends differ in which field the
/// text lands in and whether timestamps are per character or per segment,
/// so everything is optional and normalized afterwards.
#[derive(Debug, Deserialize)]
struct RawRecognizeResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    sentence: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    audio_info: Option<RawAudioInfo>,
}

/// HTTP client for one ASR backend.
#[derive(Debug, Clone)]
pub struct AsrClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AsrClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(url),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET {base}/health`.
    pub async fn health(&self) -> Result<BackendHealth, reqwest::Error> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        response.json::<BackendHealth>().await
    }

    /// Submit one chunk to `POST {base}/recognize`.
    pub async fn recognize(
        &self,
        audio_path: &Path,
        hotwords: Option<&[String]>,
    ) -> Result<ChunkRecognition, RecognizeError> {
        let bytes = std::fs::read(audio_path)
            .map_err(|e| RecognizeError::Rejected(StatusCode::BAD_REQUEST, e.to_string()))?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(RecognizeError::Transport)?;
        let mut form = Form::new().part("audio", part);
        if let Some(words) = hotwords {
            if !words.is_empty() {
                form = form.text("hotwords", words.join(","));
            }
        }

        let url = format!("{}/recognize", self.base_url);
        debug!("Submitting chunk to {url}");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RecognizeError::Server(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Rejected(status, body));
        }

        let body = response.text().await?;
        let raw: RawRecognizeResponse = serde_json::from_str(&body)?;
        Ok(normalize_response(raw))
    }
}

/// Strip trailing slashes and a trailing `/asr` or `/recognize` path so
/// `{base}/health` and `{base}/recognize` compose correctly.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    for suffix in ["/recognize", "/asr"] {
        if let Some(base) = trimmed.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    trimmed.to_string()
}

fn normalize_response(raw: RawRecognizeResponse) -> ChunkRecognition {
    let text = raw
        .text
        .or(raw.result)
        .or(raw.sentence)
        .unwrap_or_default()
        .trim()
        .to_string();

    let timestamps = raw.timestamp.and_then(|v| flatten_timestamps(&v));
    if let Some(ref ts) = timestamps {
        debug!("Backend returned {} timestamp pairs", ts.len());
    }

    ChunkRecognition {
        text,
        timestamps,
        duration_seconds: raw.audio_info.and_then(|a| a.duration_seconds),
    }
}

/// Accept `[[s,e],...]`, nested segment lists `[[[s,e],...],...]`, or the
/// whole thing JSON-encoded as a string; flatten to character pairs.
fn flatten_timestamps(value: &Value) -> Option<Vec<[i64; 2]>> {
    match value {
        Value::String(s) => {
            let inner: Value = serde_json::from_str(s).ok()?;
            flatten_timestamps(&inner)
        }
        Value::Array(items) => {
            let mut pairs = Vec::new();
            for item in items {
                collect_pairs(item, &mut pairs)?;
            }
            if pairs.is_empty() {
                None
            } else {
                Some(pairs)
            }
        }
        _ => {
            warn!("Unexpected timestamp shape, ignoring");
            None
        }
    }
}

fn collect_pairs(value: &Value, out: &mut Vec<[i64; 2]>) -> Option<()> {
    let items = value.as_array()?;
    if items.len() == 2 && items[0].is_number() && items[1].is_number() {
        out.push([items[0].as_i64()?, items[1].as_i64()?]);
        return Some(());
    }
    for item in items {
        collect_pairs(item, out)?;
    }
    Some(())
}
