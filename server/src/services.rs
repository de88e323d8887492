//! Translation and speech synthesis collaborators.
//!
//! Both are best effort: every failure surfaces as
//! [`CollaboratorError::Unavailable`] so the request can still be answered in
//! the base language.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    fn from_http(err: reqwest::Error) -> Self {
        CollaboratorError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` between two explicit language codes.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Audio, CollaboratorError>;
}

/// Stand-in used when no endpoint is configured.
pub struct Disabled;

#[async_trait]
impl Translator for Disabled {
    async fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("translation is not configured".into()))
    }
}

#[async_trait]
impl SpeechSynthesizer for Disabled {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Audio, CollaboratorError> {
        Err(CollaboratorError::Unavailable("speech synthesis is not configured".into()))
    }
}

fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Client for a LibreTranslate-style `POST /translate` endpoint.
pub struct HttpTranslator {
    client: Client,
    base_url: String,
}

impl HttpTranslator {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { client: http_client(timeout)?, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, CollaboratorError> {
        if source.eq_ignore_ascii_case(target) {
            return Ok(text.to_string());
        }
        let body = TranslateRequest { q: text, source, target, format: "text" };
        let resp = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(CollaboratorError::from_http)?
            .error_for_status()
            .map_err(CollaboratorError::from_http)?;
        let out: TranslateResponse = resp.json().await.map_err(CollaboratorError::from_http)?;
        Ok(out.translated_text)
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

/// Client for a `POST /synthesize` endpoint that answers with audio bytes.
pub struct HttpSpeech {
    client: Client,
    base_url: String,
}

impl HttpSpeech {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self { client: http_client(timeout)?, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeech {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Audio, CollaboratorError> {
        let resp = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&SynthesizeRequest { text, lang })
            .send()
            .await
            .map_err(CollaboratorError::from_http)?
            .error_for_status()
            .map_err(CollaboratorError::from_http)?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = resp.bytes().await.map_err(CollaboratorError::from_http)?;
        if bytes.is_empty() {
            return Err(CollaboratorError::Unavailable("empty audio response".into()));
        }
        Ok(Audio { content_type, bytes: bytes.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_reports_unavailable() {
        assert!(matches!(Disabled.translate("hi", "hi", "en").await, Err(CollaboratorError::Unavailable(_))));
        assert!(matches!(Disabled.synthesize("hi", "hi").await, Err(CollaboratorError::Unavailable(_))));
    }

    #[tokio::test]
    async fn same_language_skips_the_network() {
        // nothing listens here; a request would fail
        let t = HttpTranslator::new("http://127.0.0.1:9/", Duration::from_millis(200)).unwrap();
        assert_eq!(t.translate("Rice needs water", "en", "EN").await.unwrap(), "Rice needs water");
    }

    #[tokio::test]
    async fn unreachable_speech_is_unavailable() {
        let s = HttpSpeech::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(matches!(s.synthesize("namaste", "hi").await, Err(CollaboratorError::Unavailable(_))));
    }
}
