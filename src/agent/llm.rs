//! Language-model client.
//!
//! Thin adapter over an OpenAI-style chat-completions deployment. The
//! pipeline sees only the `LanguageModel` trait: a completion call and
//! a streaming call delivering text fragments over a channel. Provider
//! failures surface as `AppError::Upstream`; there is no retry policy
//! here.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[allow(dead_code)]
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[allow(dead_code)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the ordered messages and returns the full generated text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError>;

    /// Streaming variant. The returned channel yields text fragments
    /// in arrival order and closes when the model finishes; a provider
    /// failure mid-stream arrives as a terminal `Err` item, so a
    /// channel that closes without one means the completion finished.
    /// Dropping the receiver cancels further emission.
    async fn stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError>;
}

pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| AppError::Internal(format!("build http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            deployment: config.llm_deployment.clone(),
            api_version: config.llm_api_version.clone(),
            api_key: config.llm_api_key.clone(),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn request_body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        json!({
            "messages": messages,
            "stream": stream,
        })
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response, AppError> {
        let response = self
            .client
            .post(self.api_url())
            .header("api-key", &self.api_key)
            .json(&self.request_body(messages, stream))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("model request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "model returned HTTP {}: {}",
                status, text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let response = self.send(messages, false).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("decode model response: {}", e)))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream("model response carried no content".to_string()))
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<mpsc::Receiver<Result<String, AppError>>, AppError> {
        let response = self.send(messages, true).await?;
        let (tx, rx) = mpsc::channel::<Result<String, AppError>>(100);

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(AppError::Upstream(format!(
                                "model stream interrupted: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames arrive line-delimited; a frame may span
                // chunk boundaries, so keep the remainder buffered.
                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].to_string();
                    buffer = buffer[newline_pos + 1..].to_string();

                    match parse_stream_line(&line) {
                        StreamFrame::Skip => {}
                        StreamFrame::Done => return,
                        StreamFrame::Error(message) => {
                            let _ = tx
                                .send(Err(AppError::Upstream(format!(
                                    "model stream error frame: {}",
                                    message
                                ))))
                                .await;
                            return;
                        }
                        StreamFrame::Content(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                // Receiver dropped: the caller went
                                // away, stop emitting.
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[derive(Debug, PartialEq)]
enum StreamFrame {
    Skip,
    Content(String),
    Done,
    Error(String),
}

/// Classifies one SSE line of a streamed completion.
fn parse_stream_line(line: &str) -> StreamFrame {
    let line = line.trim();
    if line.is_empty() || line.starts_with(": ") {
        return StreamFrame::Skip;
    }
    let Some(data) = line.strip_prefix("data: ") else {
        return StreamFrame::Skip;
    };
    if data == "[DONE]" {
        return StreamFrame::Done;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(json) => {
            if let Some(error) = json.get("error") {
                return StreamFrame::Error(error.to_string());
            }
            match json["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => {
                    StreamFrame::Content(content.to_string())
                }
                _ => StreamFrame::Skip,
            }
        }
        Err(_) => StreamFrame::Skip,
    }
}
