use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubpipeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid SRT content: {0}")]
    InvalidSrt(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("No usable subtitle or audio source: {0}")]
    NoUsableSource(String),

    #[error("Transcription produced no text")]
    TranscriptionEmpty,

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SubpipeError {
    /// Whether this error maps to a caller mistake (HTTP 4xx at the API
    /// boundary) rather than a pipeline failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SubpipeError::InvalidUrl(_)
                | SubpipeError::UnsupportedPlatform(_)
                | SubpipeError::InvalidSrt(_)
                | SubpipeError::SourceUnavailable(_)
                | SubpipeError::AuthRequired(_)
                | SubpipeError::NoUsableSource(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SubpipeError>;
