pub mod deeplx;
pub mod openai;
pub mod split;

pub use split::split_chunks;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;

use deeplx::DeeplxTranslator;
use openai::OpenAiTranslator;

/// Failure of a single provider call, pre-classified for retry handling.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// 5xx, timeout, connection refused: worth retrying.
    #[error("transient: {0}")]
    Transient(String),

    /// 429: retry with doubled backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Other 4xx: this provider will not accept the request, move on.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// A stateless translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Ok,
    Transient,
    Fatal,
}

/// One provider call, recorded for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// Result of a routed translation, including the attempt audit.
#[derive(Debug, Clone)]
pub struct TranslationReport {
    pub text: String,
    pub attempts: Vec<ProviderAttempt>,
    pub chunks: usize,
    /// Chunks that fell back to their source text.
    pub failed_chunks: usize,
}

/// Routes text through an ordered provider chain with per-provider retries.
///
/// The router never fails the caller: a chunk that exhausts every provider
/// keeps its source text.
pub struct TranslationRouter {
    providers: Vec<Box<dyn Translator>>,
    max_retries: u32,
    base_delay: Duration,
    request_interval: Duration,
    chunk_target: usize,
}

impl TranslationRouter {
    pub fn new(providers: Vec<Box<dyn Translator>>) -> Self {
        Self {
            providers,
            max_retries: 3,
            base_delay: Duration::from_secs(3),
            request_interval: Duration::from_secs(1),
            chunk_target: 2000,
        }
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.base_delay = base_delay;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_chunk_target(mut self, target: usize) -> Self {
        self.chunk_target = target.clamp(1000, 4000);
        self
    }

    /// Build the provider chain from configuration. Unknown service names
    /// and `openai_*` entries whose config is missing are skipped with a
    /// log line, not an error.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn Translator>> = Vec::new();

        for service in config.enabled_translation_services() {
            match service.name.as_str() {
                "deeplx_v2" => providers.push(Box::new(
                    DeeplxTranslator::new("deeplx_v2", config.deeplx.api_v2_url.as_str(), true)
                        .with_auth(config.tokens.deepl.clone()),
                )),
                "deeplx" => providers.push(Box::new(
                    DeeplxTranslator::new("deeplx", config.deeplx.api_url.as_str(), false)
                        .with_auth(config.tokens.deepl.clone()),
                )),
                name if name.starts_with("openai_") => {
                    let config_name = service
                        .config_name
                        .clone()
                        .unwrap_or_else(|| name.trim_start_matches("openai_").to_string());
                    match config.openai_endpoint(&config_name) {
                        Some(endpoint) => providers
                            .push(Box::new(OpenAiTranslator::new(name, endpoint.clone()))),
                        None => {
                            warn!("OpenAI config '{config_name}' not found, skipping {name}")
                        }
                    }
                }
                other => warn!("Unknown translation service: {other}"),
            }
        }

        Self::new(providers)
            .with_retry(
                config.translation.max_retries,
                Duration::from_secs_f64(config.translation.base_delay),
            )
            .with_request_interval(Duration::from_secs_f64(
                config.translation.request_interval,
            ))
            .with_chunk_target(config.translation.chunk_size)
    }

    /// Translate, returning only the text. Identity fallback on any failure.
    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        self.translate_detailed(text, source_lang, target_lang)
            .await
            .text
    }

    /// Translate with the full attempt audit.
    pub async fn translate_detailed(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationReport {
        if text.trim().is_empty() || self.providers.is_empty() {
            return TranslationReport {
                text: text.to_string(),
                attempts: Vec::new(),
                chunks: 0,
                failed_chunks: 0,
            };
        }

        let max = self.chunk_target + self.chunk_target / 5;
        let chunks = split_chunks(text, self.chunk_target, max);
        info!(
            "Translating {} characters in {} chunk(s) {source_lang}->{target_lang}",
            text.chars().count(),
            chunks.len()
        );

        let mut attempts = Vec::new();
        let mut translated = Vec::with_capacity(chunks.len());
        let mut failed_chunks = 0usize;

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !self.request_interval.is_zero() {
                tokio::time::sleep(self.request_interval).await;
            }

            match self
                .translate_chunk(chunk, source_lang, target_lang, &mut attempts)
                .await
            {
                Some(text) => translated.push(text),
                None => {
                    warn!("Chunk {} failed through all providers, keeping source", i + 1);
                    translated.push(chunk.clone());
                    failed_chunks += 1;
                }
            }
        }

        TranslationReport {
            text: translated.join(" "),
            attempts,
            chunks: chunks.len(),
            failed_chunks,
        }
    }

    async fn translate_chunk(
        &self,
        chunk: &str,
        source_lang: &str,
        target_lang: &str,
        attempts: &mut Vec<ProviderAttempt>,
    ) -> Option<String> {
        for provider in &self.providers {
            let mut rate_limited = false;

            for attempt in 1..=self.max_retries {
                if attempt > 1 {
                    let mut delay = self.base_delay * (attempt - 1);
                    if rate_limited {
                        delay *= 2;
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }

                match provider.translate(chunk, source_lang, target_lang).await {
                    Ok(text) => {
                        attempts.push(ProviderAttempt {
                            provider: provider.name().to_string(),
                            attempt,
                            outcome: AttemptOutcome::Ok,
                        });
                        info!("Translation successful with {}", provider.name());
                        return Some(text);
                    }
                    Err(e) => {
                        let fatal = matches!(e, ProviderError::Fatal(_));
                        rate_limited = matches!(e, ProviderError::RateLimited(_));
                        warn!(
                            "{} attempt {attempt}/{} failed: {e}",
                            provider.name(),
                            self.max_retries
                        );
                        attempts.push(ProviderAttempt {
                            provider: provider.name().to_string(),
                            attempt,
                            outcome: if fatal {
                                AttemptOutcome::Fatal
                            } else {
                                AttemptOutcome::Transient
                            },
                        });
                        if fatal {
                            break;
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OpenAiEndpoint, TranslationServiceEntry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTranslator {
        name: String,
        calls: AtomicUsize,
        result: fn() -> Result<String, ProviderError>,
    }

    #[async_trait]
    impl Translator for FixedTranslator {
        async fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn fixed(name: &str, result: fn() -> Result<String, ProviderError>) -> Box<dyn Translator> {
        Box::new(FixedTranslator {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            result,
        })
    }

    fn fast_router(providers: Vec<Box<dyn Translator>>) -> TranslationRouter {
        TranslationRouter::new(providers)
            .with_retry(3, Duration::ZERO)
            .with_request_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_identity_fallback_without_providers() {
        let router = fast_router(vec![]);
        assert_eq!(router.translate("未翻译", "zh", "en").await, "未翻译");
    }

    #[tokio::test]
    async fn test_short_text_single_attempt_per_provider() {
        let router = fast_router(vec![
            fixed("a", || Err(ProviderError::Fatal("no".to_string()))),
            fixed("b", || Ok("done".to_string())),
        ]);
        let report = router.translate_detailed("short", "en", "zh").await;

        assert_eq!(report.text, "done");
        assert_eq!(report.chunks, 1);
        // Fatal ends provider a after one attempt; b succeeds first try.
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[0].provider, "a");
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Fatal);
        assert_eq!(report.attempts[1].provider, "b");
        assert_eq!(report.attempts[1].outcome, AttemptOutcome::Ok);
    }

    #[tokio::test]
    async fn test_transient_errors_exhaust_retries() {
        let router = fast_router(vec![fixed("flaky", || {
            Err(ProviderError::Transient("503".to_string()))
        })]);
        let report = router.translate_detailed("hello", "en", "zh").await;

        assert_eq!(report.text, "hello");
        assert_eq!(report.failed_chunks, 1);
        assert_eq!(report.attempts.len(), 3);
        assert!(report
            .attempts
            .iter()
            .all(|a| a.outcome == AttemptOutcome::Transient));
    }

    #[tokio::test]
    async fn test_from_config_builds_chain_in_priority_order() {
        let mut config = Config::default();
        config.tokens.openai.push(OpenAiEndpoint {
            name: "primary".to_string(),
            api_key: "sk-test".to_string(),
            api_endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            prompt: None,
        });
        config.translation.services = vec![
            TranslationServiceEntry {
                name: "openai_primary".to_string(),
                enabled: true,
                priority: 2,
                config_name: Some("primary".to_string()),
            },
            TranslationServiceEntry {
                name: "deeplx_v2".to_string(),
                enabled: true,
                priority: 1,
                config_name: None,
            },
            TranslationServiceEntry {
                name: "deeplx".to_string(),
                enabled: false,
                priority: 3,
                config_name: None,
            },
        ];

        let router = TranslationRouter::from_config(&config);
        let names: Vec<&str> = router.providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["deeplx_v2", "openai_primary"]);
    }

    #[tokio::test]
    async fn test_missing_openai_config_skipped() {
        let mut config = Config::default();
        config.translation.services = vec![TranslationServiceEntry {
            name: "openai_ghost".to_string(),
            enabled: true,
            priority: 1,
            config_name: Some("ghost".to_string()),
        }];
        let router = TranslationRouter::from_config(&config);
        assert!(router.providers.is_empty());
        // Identity fallback still holds.
        assert_eq!(router.translate("text", "en", "zh").await, "text");
    }

    #[tokio::test]
    async fn test_empty_text_untouched() {
        let router = fast_router(vec![fixed("never", || Ok("x".to_string()))]);
        let report = router.translate_detailed("   ", "en", "zh").await;
        assert_eq!(report.text, "   ");
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chunk_keeps_source_others_translated() {
        // One provider that succeeds only on the second chunk text.
        struct Selective;
        #[async_trait]
        impl Translator for Selective {
            async fn translate(
                &self,
                text: &str,
                _s: &str,
                _t: &str,
            ) -> Result<String, ProviderError> {
                if text.contains('好') {
                    Ok("ok".to_string())
                } else {
                    Err(ProviderError::Fatal("nope".to_string()))
                }
            }
            fn name(&self) -> &str {
                "selective"
            }
        }

        let router = TranslationRouter::new(vec![Box::new(Selective)])
            .with_retry(1, Duration::ZERO)
            .with_request_interval(Duration::ZERO)
            .with_chunk_target(1000);

        // Two chunks: one translatable, one not.
        let bad: String = "x".repeat(1000);
        let good = "好".repeat(10);
        let text = format!("{bad}{good}");
        let report = router.translate_detailed(&text, "zh", "en").await;

        assert_eq!(report.chunks, 2);
        assert_eq!(report.failed_chunks, 1);
        assert!(report.text.contains("ok"));
        assert!(report.text.contains('x'));
    }
}
