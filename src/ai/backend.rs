use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, status_error, ChatBackend};
use crate::error::ChatError;
use crate::state::HistoryEntry;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a [HistoryEntry],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// Client for the chat proxy exposing `POST {base_url}/chat`.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn complete(&self, history: &[HistoryEntry]) -> Result<String, ChatError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, turns = history.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message: history })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.response)
    }
}
