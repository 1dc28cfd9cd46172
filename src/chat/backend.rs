use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::chat::accumulator::ByteStream;
use crate::error::{AppError, AppResult};
use crate::models::message::{ChatMessage, ChatRequest};

pub const DEFAULT_ENDPOINT: &str = "/api/chat";

/// Something that accepts the conversation so far and answers with a byte
/// stream of SSE lines.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> AppResult<ByteStream>;
}

/// Backend reached over HTTP: `POST {base_url}{endpoint}` with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, endpoint: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self::with_client(client, base_url, endpoint))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, endpoint: &str) -> Self {
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, messages: &[ChatMessage]) -> AppResult<ByteStream> {
        log::info!("POST {} with {} messages", self.url, messages.len());

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&ChatRequest { messages })
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to reach chat backend: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Chat backend returned {}: {}", status, body);
            return Err(AppError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(AppError::Http))))
    }
}
