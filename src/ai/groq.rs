use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, status_error, ChatBackend};
use crate::error::ChatError;
use crate::state::{ChatRole, HistoryEntry};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Serialize)]
struct GroqMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

/// Talks to Groq's OpenAI-compatible completions API without going
/// through a proxy backend.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GROQ_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for GroqClient {
    async fn complete(&self, history: &[HistoryEntry]) -> Result<String, ChatError> {
        let messages = std::iter::once(GroqMessage {
            role: "system",
            content: SYSTEM_PROMPT,
        })
        .chain(history.iter().map(|entry| GroqMessage {
            role: match entry.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: &entry.content,
        }))
        .collect();

        let request = GroqRequest {
            model: &self.model,
            messages,
        };

        debug!(model = %self.model, turns = history.len(), "sending groq completion");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let groq_response: GroqResponse = response.json().await?;
        groq_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ChatError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_server::{request_body, serve_once};

    #[tokio::test]
    async fn test_prepends_system_prompt_and_reads_first_choice() {
        let (base_url, server) = serve_once(
            "200 OK",
            "application/json",
            br#"{"choices":[{"message":{"role":"assistant","content":"Hey!"}}]}"#.to_vec(),
        )
        .await;

        let client = GroqClient::new("gsk-test", DEFAULT_MODEL, Duration::from_secs(5))
            .with_base_url(&base_url);
        let history = vec![HistoryEntry {
            role: ChatRole::User,
            content: "Hi".into(),
        }];
        assert_eq!(client.complete(&history).await.unwrap(), "Hey!");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /chat/completions "));
        assert!(raw.to_lowercase().contains("authorization: bearer gsk-test"));
        assert_eq!(
            request_body(&raw),
            serde_json::json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "Hi"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_reply() {
        let (base_url, _server) =
            serve_once("200 OK", "application/json", br#"{"choices":[]}"#.to_vec()).await;

        let client = GroqClient::new("k", DEFAULT_MODEL, Duration::from_secs(5))
            .with_base_url(&base_url);
        let err = client.complete(&[]).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyReply));
    }
}
