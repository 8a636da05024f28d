use crate::error::{Result, SubpipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Named OpenAI-compatible endpoint under `tokens.openai`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiEndpoint {
    pub name: String,
    pub api_key: String,
    pub api_endpoint: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Prompt template; `{target_lang}` and `{text}` are substituted.
    #[serde(default)]
    pub prompt: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for the Readwise egress (consumed outside the core).
    #[serde(default)]
    pub readwise: Option<String>,
    #[serde(default)]
    pub openai: Vec<OpenAiEndpoint>,
    /// Optional auth header value for DeepL-protocol endpoints.
    #[serde(default)]
    pub deepl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeeplxConfig {
    #[serde(default = "default_deeplx_url")]
    pub api_url: String,
    #[serde(default = "default_deeplx_v2_url")]
    pub api_v2_url: String,
}

impl Default for DeeplxConfig {
    fn default() -> Self {
        Self {
            api_url: default_deeplx_url(),
            api_v2_url: default_deeplx_v2_url(),
        }
    }
}

fn default_deeplx_url() -> String {
    "http://deeplx:1188/translate".to_string()
}

fn default_deeplx_v2_url() -> String {
    "http://deeplx:1188/v2/translate".to_string()
}

/// One entry of the ordered translation provider chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationServiceEntry {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// For `openai_*` services: the `tokens.openai` entry to use.
    #[serde(default)]
    pub config_name: Option<String>,
}

fn default_priority() -> u32 {
    999
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub services: Vec<TranslationServiceEntry>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in seconds; attempt N waits N * base_delay.
    #[serde(default = "default_base_delay")]
    pub base_delay: f64,
    /// Minimum spacing between chunk requests, seconds.
    #[serde(default = "default_request_interval")]
    pub request_interval: f64,
    /// Target translation chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            request_interval: default_request_interval(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> f64 {
    3.0
}

fn default_request_interval() -> f64 {
    1.0
}

fn default_chunk_size() -> usize {
    2000
}

/// One ASR backend in the transcription pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeServers {
    #[serde(default)]
    pub servers: Vec<BackendEntry>,
    /// Per-chunk request timeout, seconds.
    #[serde(default = "default_transcribe_timeout")]
    pub timeout: u64,
    #[serde(default = "default_transcribe_url")]
    pub default_url: String,
}

impl Default for TranscribeServers {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            timeout: default_transcribe_timeout(),
            default_url: default_transcribe_url(),
        }
    }
}

fn default_transcribe_timeout() -> u64 {
    300
}

fn default_transcribe_url() -> String {
    "http://localhost:9000".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Servers {
    #[serde(default)]
    pub transcribe: TranscribeServers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_upload_folder")]
    pub upload_folder: PathBuf,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    /// Upload size cap in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_folder: default_upload_folder(),
            output_folder: default_output_folder(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_upload_folder() -> PathBuf {
    PathBuf::from("/app/uploads")
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("/app/outputs")
}

fn default_max_file_size() -> u64 {
    500 * 1024 * 1024
}

/// Process-wide configuration, read once at startup from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tokens: Tokens,
    #[serde(default)]
    pub deeplx: DeeplxConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub servers: Servers,
    /// Path to a cookie file or a Firefox profile directory.
    #[serde(default)]
    pub cookies: Option<PathBuf>,
    #[serde(default)]
    pub app: AppConfig,
}

impl Config {
    /// Load configuration, preferring the containerized location and
    /// falling back to a local `config/config.yml`.
    pub fn load() -> Result<Self> {
        for path in Self::candidate_paths() {
            if path.exists() {
                info!("Loading config from {}", path.display());
                return Self::load_from(&path);
            }
            debug!("Config candidate not found: {}", path.display());
        }

        warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SubpipeError::Config(format!("{}: {}", path.display(), e)))
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("/app/config/config.yml"),
            PathBuf::from("config/config.yml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("subpipe").join("config.yml"));
        }
        paths
    }

    /// Translation services sorted by ascending priority, enabled only.
    pub fn enabled_translation_services(&self) -> Vec<TranslationServiceEntry> {
        let mut services: Vec<_> = self
            .translation
            .services
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        services.sort_by_key(|s| s.priority);
        services
    }

    /// ASR backend pool sorted by ascending priority; falls back to the
    /// default URL when none are configured.
    pub fn transcribe_backends(&self) -> Vec<BackendEntry> {
        let mut servers = self.servers.transcribe.servers.clone();
        if servers.is_empty() {
            servers.push(BackendEntry {
                name: "default".to_string(),
                url: self.servers.transcribe.default_url.clone(),
                priority: 1,
            });
        }
        servers.sort_by_key(|s| s.priority);
        servers
    }

    pub fn openai_endpoint(&self, name: &str) -> Option<&OpenAiEndpoint> {
        self.tokens.openai.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.translation.max_retries, 3);
        assert_eq!(config.translation.chunk_size, 2000);
        assert_eq!(config.servers.transcribe.timeout, 300);
        assert!(config.tokens.openai.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
tokens:
  readwise: rw-token
  openai:
    - name: primary
      api_key: sk-test
      api_endpoint: https://api.example.com/v1/chat/completions
      model: gpt-4o-mini
translation:
  services:
    - name: deeplx_v2
      enabled: true
      priority: 1
    - name: openai_primary
      enabled: true
      priority: 2
      config_name: primary
  max_retries: 2
servers:
  transcribe:
    servers:
      - name: gpu-1
        url: http://gpu-1:9000
        priority: 1
    timeout: 120
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tokens.readwise.as_deref(), Some("rw-token"));
        assert_eq!(config.tokens.openai[0].model, "gpt-4o-mini");
        assert_eq!(config.translation.max_retries, 2);
        assert_eq!(config.translation.chunk_size, 2000);
        assert_eq!(config.servers.transcribe.timeout, 120);
        assert_eq!(config.servers.transcribe.servers[0].name, "gpu-1");
    }

    #[test]
    fn test_enabled_services_sorted_by_priority() {
        let mut config = Config::default();
        config.translation.services = vec![
            TranslationServiceEntry {
                name: "openai_primary".to_string(),
                enabled: true,
                priority: 5,
                config_name: Some("primary".to_string()),
            },
            TranslationServiceEntry {
                name: "deeplx".to_string(),
                enabled: false,
                priority: 1,
                config_name: None,
            },
            TranslationServiceEntry {
                name: "deeplx_v2".to_string(),
                enabled: true,
                priority: 2,
                config_name: None,
            },
        ];

        let enabled = config.enabled_translation_services();
        assert_eq!(enabled.len(), 2);
        assert_eq!(enabled[0].name, "deeplx_v2");
        assert_eq!(enabled[1].name, "openai_primary");
    }

    #[test]
    fn test_backend_fallback_to_default_url() {
        let config = Config::default();
        let backends = config.transcribe_backends();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].url, "http://localhost:9000");
    }

    #[test]
    fn test_openai_endpoint_lookup() {
        let mut config = Config::default();
        config.tokens.openai.push(OpenAiEndpoint {
            name: "primary".to_string(),
            api_key: "k".to_string(),
            api_endpoint: "https://example.com".to_string(),
            model: default_openai_model(),
            prompt: None,
        });
        assert!(config.openai_endpoint("primary").is_some());
        assert!(config.openai_endpoint("missing").is_none());
    }
}
