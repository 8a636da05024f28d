//! Translation through OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiEndpoint;

use super::{ProviderError, Translator};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PROMPT: &str =
    "Translate the following text to {target_lang}. Output only the translation.";

pub struct OpenAiTranslator {
    name: String,
    client: reqwest::Client,
    endpoint: OpenAiEndpoint,
}

impl OpenAiTranslator {
    pub fn new(name: impl Into<String>, endpoint: OpenAiEndpoint) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    fn system_prompt(&self, target_lang: &str) -> String {
        let template = self
            .endpoint
            .prompt
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT);
        template.replace("{target_lang}", language_name(target_lang))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        let system = self.system_prompt(target_lang);
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint.api_endpoint)
            .header("Authorization", format!("Bearer {}", self.endpoint.api_key))
            .json(&request)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited(format!("{status}")));
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient(format!("{status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Fatal(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("bad response body: {e}")))?;

        let content = parsed
            .choices
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match content {
            Some(translated) => {
                debug!("{} translation successful", self.name);
                Ok(translated)
            }
            None => Err(ProviderError::Transient("empty completion".to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Human-readable language name for prompting; models follow names much
/// better than codes.
pub fn language_name(code: &str) -> &'static str {
    match code.to_lowercase().as_str() {
        "en" => "English",
        "zh" | "zh-hans" | "zh-cn" => "Simplified Chinese",
        "zh-hant" | "zh-tw" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "it" => "Italian",
        _ => "the target language",
    }
}
