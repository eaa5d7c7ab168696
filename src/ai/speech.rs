use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{http_client, status_error};
use crate::error::ChatError;

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_VOICE_ID: &str = "NOpBlnGInO9m6vDvFkFC";

/// Synthesis tunables sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_settings: VoiceSettings,
}

/// Turns text into encoded audio (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ChatError>;
}

/// ElevenLabs text-to-speech client
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    api_key: Option<String>,
    voice_id: String,
    settings: VoiceSettings,
    base_url: String,
}

impl SpeechClient {
    pub fn new(api_key: Option<&str>, voice_id: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.map(str::to_string),
            voice_id: voice_id.to_string(),
            settings: VoiceSettings::default(),
            base_url: ELEVENLABS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ChatError::MissingApiKey("ElevenLabs"))?;

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);
        debug!(voice = %self.voice_id, chars = text.chars().count(), "requesting speech");

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&SpeechRequest {
                text,
                voice_settings: self.settings,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_server::{request_body, serve_once};

    #[tokio::test]
    async fn test_synthesize_sends_voice_settings_and_returns_bytes() {
        let audio = vec![0xFF, 0xFB, 0x90, 0x64];
        let (base_url, server) = serve_once("200 OK", "audio/mpeg", audio.clone()).await;

        let client = SpeechClient::new(Some("xi-test"), DEFAULT_VOICE_ID, Duration::from_secs(5))
            .with_base_url(&base_url);
        let bytes = client.synthesize("Hello!").await.unwrap();
        assert_eq!(bytes, audio);

        let raw = server.await.unwrap();
        let lower = raw.to_lowercase();
        assert!(raw.starts_with("POST /text-to-speech/NOpBlnGInO9m6vDvFkFC "));
        assert!(lower.contains("xi-api-key: xi-test"));
        assert!(lower.contains("accept: audio/mpeg"));
        assert_eq!(
            request_body(&raw),
            serde_json::json!({
                "text": "Hello!",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.75}
            })
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_a_request() {
        let client = SpeechClient::new(None, DEFAULT_VOICE_ID, Duration::from_secs(5))
            .with_base_url("http://127.0.0.1:9");
        let err = client.synthesize("Hello!").await.unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey("ElevenLabs")));
    }
}
