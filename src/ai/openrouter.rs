//! OpenRouter API integration.
//!
//! Implements the TextBackend trait over OpenRouter's OpenAI-compatible chat
//! completions endpoint, with server-sent-event streaming.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{BackendCall, BackendReply, GenerationError, TextBackend};

/// OpenRouter API provider.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterProvider {
    /// Create a provider with an explicit key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "google/gemini-2.5-flash".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        }
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create with a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(&self, call: &BackendCall, stream: bool) -> ChatRequest {
        ChatRequest {
            model: call.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: call.system_instruction.clone() },
                ChatMessage { role: "user".to_string(), content: call.user_prompt.clone() },
            ],
            max_tokens: Some(call.max_output_tokens),
            stream,
            reasoning: call.thinking_budget.map(|max_tokens| Reasoning { max_tokens }),
            plugins: if call.grounded { vec![Plugin { id: "web".to_string() }] } else { vec![] },
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Planforge")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextBackend for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, call: &BackendCall) -> Result<BackendReply, GenerationError> {
        let request = self.build_request(call, false);
        tracing::debug!(kind = %call.kind, model = %request.model, "Calling OpenRouter");

        let response: ChatResponse = self.send(&request).await?.json().await?;
        if let Some(error) = response.error {
            return Err(error.into_generation_error());
        }

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Provider("No response from OpenRouter".to_string()))?;

        Ok(BackendReply {
            text,
            model: response.model.or(Some(request.model)),
            grounding: Vec::new(),
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn complete_streaming(
        &self,
        call: &BackendCall,
        on_delta: &(dyn for<'d> Fn(&'d str) + Send + Sync),
    ) -> Result<BackendReply, GenerationError> {
        let request = self.build_request(call, true);
        tracing::debug!(kind = %call.kind, model = %request.model, "Streaming from OpenRouter");

        let mut stream = self.send(&request).await?.bytes_stream();
        let mut lines = SseLines::default();
        let mut text = String::new();
        let mut model = None;

        'read: while let Some(bytes) = stream.next().await {
            for line in lines.push(&bytes?)? {
                match parse_sse_line(&line)? {
                    SseEvent::Delta { content, model: chunk_model } => {
                        if model.is_none() {
                            model = chunk_model;
                        }
                        if !content.is_empty() {
                            text.push_str(&content);
                            on_delta(&content);
                        }
                    }
                    SseEvent::Done => break 'read,
                    SseEvent::Ignored => {}
                }
            }
        }

        if text.trim().is_empty() {
            return Err(GenerationError::Provider("Empty stream from OpenRouter".to_string()));
        }

        Ok(BackendReply { text, model: model.or(Some(request.model)), grounding: Vec::new() })
    }
}

/// Splits a byte stream into complete lines.
///
/// Bytes are buffered until a newline arrives; only complete lines are
/// decoded.
#[derive(Debug, Default)]
struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8(raw)
                .map_err(|e| GenerationError::Provider(format!("stream is not valid UTF-8: {e}")))?;
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(lines)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta { content: String, model: Option<String> },
    Done,
    Ignored,
}

fn parse_sse_line(line: &str) -> Result<SseEvent, GenerationError> {
    // Blank separators and ": keep-alive" comments carry no data
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Ignored);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| GenerationError::Provider(format!("malformed stream chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(error.into_generation_error());
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();

    Ok(SseEvent::Delta { content, model: chunk.model })
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<Plugin>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Reasoning {
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Plugin {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: String,
}

impl ApiError {
    fn into_generation_error(self) -> GenerationError {
        let code = self.code.as_ref().and_then(serde_json::Value::as_u64);
        let detail = format!("OpenRouter error {}: {}", code.unwrap_or_default(), self.message);
        if code == Some(429) || self.message.to_lowercase().contains("rate limit") {
            GenerationError::RateLimited(detail)
        } else {
            GenerationError::Provider(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_http::serve_once;
    use crate::hierarchy::DocumentKind;

    fn call() -> BackendCall {
        BackendCall {
            kind: DocumentKind::Architecture,
            subject: "Test".to_string(),
            system_instruction: "system".to_string(),
            user_prompt: "prompt".to_string(),
            model: None,
            grounded: true,
            thinking_budget: Some(4096),
            max_output_tokens: 2048,
        }
    }

    #[test]
    fn test_provider_model_used_without_override() {
        let provider = OpenRouterProvider::new("key").with_model("anthropic/claude-sonnet-4");
        let request = provider.build_request(&call(), false);
        assert_eq!(request.model, "anthropic/claude-sonnet-4");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["reasoning"]["max_tokens"], 4096);
        assert_eq!(json["plugins"][0]["id"], "web");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_call_model_overrides_provider_model() {
        let provider = OpenRouterProvider::new("key");
        let mut call = call();
        call.model = Some("openai/gpt-4o".to_string());
        assert_eq!(provider.build_request(&call, true).model, "openai/gpt-4o");
    }

    #[test]
    fn test_sse_lines_buffer_partial_input() {
        let mut lines = SseLines::default();
        assert!(lines.push(b"data: {\"cho").unwrap().is_empty());
        let out = lines.push(b"ices\":[]}\r\n\ndata: [DONE]\n").unwrap();
        assert_eq!(out, vec!["data: {\"choices\":[]}", "", "data: [DONE]"]);
    }

    #[test]
    fn test_parse_sse_delta_and_done() {
        let line = r#"data: {"model":"m","choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseEvent::Delta { content: "Hello".to_string(), model: Some("m".to_string()) }
        );
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
        assert_eq!(parse_sse_line(": OPENROUTER PROCESSING").unwrap(), SseEvent::Ignored);
    }

    #[test]
    fn test_parse_sse_rate_limit_error() {
        let line = r#"data: {"error":{"code":429,"message":"Rate limit exceeded"}}"#;
        assert!(parse_sse_line(line).unwrap_err().is_rate_limited());
    }

    #[test]
    fn test_sse_lines_keep_multibyte_char_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café — ok\"}}]}\n".as_bytes();
        let cut = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut lines = SseLines::default();
        assert!(lines.push(&line[..cut]).unwrap().is_empty());
        let out = lines.push(&line[cut..]).unwrap();

        assert_eq!(
            parse_sse_line(&out[0]).unwrap(),
            SseEvent::Delta { content: "café — ok".to_string(), model: None }
        );
    }

    #[test]
    fn test_sse_lines_reject_invalid_utf8() {
        let mut lines = SseLines::default();
        let err = lines.push(b"data: \xff\xfe\n").unwrap_err();
        assert!(matches!(err, GenerationError::Provider(_)));
    }

    #[tokio::test]
    async fn test_streaming_against_local_server() {
        let body = "data: {\"model\":\"m\",\"choices\":[{\"delta\":{\"content\":\"café \"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n\
                    data: [DONE]\n\n"
            .as_bytes();
        let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let parts = vec![body[..cut].to_vec(), body[cut..].to_vec()];
        let (url, server) = serve_once("200 OK", "text/event-stream", parts).await;

        let provider = OpenRouterProvider::new("secret").with_base_url(url);
        let deltas = parking_lot::Mutex::new(Vec::new());
        let reply = provider
            .complete_streaming(&call(), &|delta: &str| deltas.lock().push(delta.to_string()))
            .await
            .unwrap();

        assert_eq!(reply.text, "café ok");
        assert_eq!(reply.model.as_deref(), Some("m"));
        assert_eq!(deltas.into_inner(), vec!["café ", "ok"]);

        let request = server.await.unwrap();
        assert!(request.starts_with("post /chat/completions"));
        assert!(request.contains("authorization: bearer secret"));
        assert!(request.contains("\"stream\":true"));
    }
}
