//! Clients for DeepLX-protocol translation endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ProviderError, Translator};

/// Per-call timeout mandated for translation providers.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// DeepLX endpoint speaking either the plain or the v2 envelope.
pub struct DeeplxTranslator {
    name: String,
    client: reqwest::Client,
    url: String,
    v2: bool,
    auth: Option<String>,
}

impl DeeplxTranslator {
    pub fn new(name: impl Into<String>, url: impl Into<String>, v2: bool) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            url: url.into(),
            v2,
            auth: None,
        }
    }

    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.auth = token;
        self
    }
}

#[derive(Serialize)]
struct DeeplxRequest<'a> {
    text: &'a str,
    source_lang: String,
    target_lang: String,
}

#[derive(Deserialize)]
struct DeeplxTranslationItem {
    text: Option<String>,
}

/// Response envelopes seen in the wild: `{code:200, data}`, bare `{data}`,
/// and DeepL-official `{translations:[{text}]}`.
#[derive(Deserialize)]
struct DeeplxResponse {
    code: Option<i64>,
    data: Option<String>,
    translations: Option<Vec<DeeplxTranslationItem>>,
}

impl DeeplxResponse {
    fn into_text(self) -> Option<String> {
        if let Some(code) = self.code {
            if code != 200 {
                return None;
            }
        }
        if let Some(data) = self.data {
            if !data.is_empty() {
                return Some(data);
            }
        }
        self.translations
            .and_then(|mut t| t.drain(..).next())
            .and_then(|t| t.text)
            .filter(|t| !t.is_empty())
    }
}

/// Map ISO-ish codes to what DeepL-protocol servers expect.
fn deepl_lang_code(code: &str, v2: bool) -> String {
    if !v2 {
        return code.to_uppercase();
    }
    match code.to_lowercase().as_str() {
        "zh" | "zh-hans" | "zh-cn" => "ZH-HANS".to_string(),
        "zh-hant" | "zh-tw" => "ZH-HANT".to_string(),
        other => other.to_uppercase(),
    }
}

#[async_trait]
impl Translator for DeeplxTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        let request = DeeplxRequest {
            text,
            source_lang: deepl_lang_code(source_lang, self.v2),
            target_lang: deepl_lang_code(target_lang, self.v2),
        };

        let mut builder = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(CALL_TIMEOUT);
        if let Some(ref token) = self.auth {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder
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

        let parsed: DeeplxResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("bad response body: {e}")))?;

        match parsed.into_text() {
            Some(translated) => {
                debug!("{} translation successful", self.name);
                Ok(translated)
            }
            None => Err(ProviderError::Transient("empty translation".to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
