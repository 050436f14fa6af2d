//! OpenAI-compatible chat-completions generator.

use super::{sse, DeltaStream, GenerationError, GenerationRequest, Generator};
use crate::transport::HttpTransport;
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::debug;

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Generator backed by `POST {base_url}/chat/completions`.
pub struct OpenAiGenerator {
    transport: HttpTransport,
}

impl OpenAiGenerator {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    fn body(request: &GenerationRequest, stream: bool) -> Value {
        json!({
            "model": request.params.model,
            "messages": request.messages,
            "max_tokens": request.params.max_tokens,
            "temperature": request.params.temperature,
            "stream": stream,
        })
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GenerationError> {
        let resp = self
            .transport
            .post_json(COMPLETIONS_PATH, &Self::body(request, stream), stream)
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(model = %request.params.model, stream, "provider accepted request");
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let resp = self.send(request, false).await?;
        let v: Value = resp.json().await?;

        if let Some(err) = v.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(GenerationError::Provider(message));
        }

        let choice = v
            .pointer("/choices/0")
            .ok_or(GenerationError::EmptyResponse)?;
        let content = match choice.pointer("/message/content") {
            Some(Value::String(s)) => s.as_str(),
            Some(Value::Null) | None => "",
            Some(other) => {
                return Err(GenerationError::Decode(format!(
                    "expected string content, got {other}"
                )))
            }
        };
        Ok(content.trim().to_string())
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<DeltaStream, GenerationError> {
        let resp = self.send(request, true).await?;
        let bytes = resp.bytes_stream().map_err(GenerationError::from);
        Ok(sse::content_deltas(Box::pin(bytes)))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
