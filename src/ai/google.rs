//! Google Gemini API integration.
//!
//! Implements the TextBackend trait for the `generateContent` endpoint,
//! including search grounding and thinking budgets.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{BackendCall, BackendReply, GenerationError, GroundingReference, TextBackend};

/// Gemini API provider.
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleProvider {
    /// Create a provider with an explicit key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create with a custom base URL (for proxies or test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(&self, call: &BackendCall) -> GeminiRequest {
        GeminiRequest {
            system_instruction: Content::text(None, &call.system_instruction),
            contents: vec![Content::text(Some("user"), &call.user_prompt)],
            tools: if call.grounded { vec![Tool { google_search: GoogleSearch {} }] } else { vec![] },
            generation_config: GenerationSettings {
                max_output_tokens: call.max_output_tokens,
                thinking_config: call
                    .thinking_budget
                    .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            },
        }
    }
}

#[async_trait]
impl TextBackend for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(&self, call: &BackendCall) -> Result<BackendReply, GenerationError> {
        let model = call.model.as_deref().unwrap_or(&self.model);
        let request = self.build_request(call);

        tracing::debug!(kind = %call.kind, model, grounded = call.grounded, "Calling Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status, &body));
        }

        let response: GeminiResponse = response.json().await?;
        let mut reply = response.into_reply()?;
        reply.model.get_or_insert_with(|| model.to_string());
        Ok(reply)
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text.to_string()) }] }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: String,
    #[serde(default)]
    title: Option<String>,
}

impl GeminiResponse {
    fn into_reply(self) -> Result<BackendReply, GenerationError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Provider("No candidates in Gemini response".into()))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GenerationError::Provider(format!(
                "Empty Gemini response (finish reason: {reason})"
            )));
        }

        let grounding = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .map(|web| GroundingReference {
                        title: web.title.unwrap_or_else(|| web.uri.clone()),
                        uri: web.uri,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(BackendReply { text, model: self.model_version, grounding })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_http::serve_once;
    use crate::hierarchy::DocumentKind;

    fn call(grounded: bool, thinking_budget: Option<u32>) -> BackendCall {
        BackendCall {
            kind: DocumentKind::MarketAnalysis,
            subject: "Test".to_string(),
            system_instruction: "system".to_string(),
            user_prompt: "prompt".to_string(),
            model: None,
            grounded,
            thinking_budget,
            max_output_tokens: 1024,
        }
    }

    #[test]
    fn test_request_shape_with_grounding_and_thinking() {
        let provider = GoogleProvider::new("key");
        let json = serde_json::to_value(provider.build_request(&call(true, Some(2048)))).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system");
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["tools"][0]["google_search"].is_object());
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingBudget"], 2048);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_request_shape_plain() {
        let provider = GoogleProvider::new("key");
        let json = serde_json::to_value(provider.build_request(&call(false, None))).unwrap();

        assert!(json.get("tools").is_none());
        assert!(json["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_response_parsing_collects_grounding() {
        let body = r##"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "# Market"}, {"text": "\nbody"}]},
                "finishReason": "STOP",
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://example.com/report", "title": "Report"}},
                    {"web": {"uri": "https://example.org"}}
                ]}
            }],
            "modelVersion": "gemini-2.5-flash"
        }"##;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        let reply = response.into_reply().unwrap();

        assert_eq!(reply.text, "# Market\nbody");
        assert_eq!(reply.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(reply.grounding.len(), 2);
        assert_eq!(reply.grounding[1].title, "https://example.org");
    }

    #[test]
    fn test_empty_response_is_provider_error() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        let err = response.into_reply().unwrap_err();
        assert!(matches!(err, GenerationError::Provider(msg) if msg.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let body = br##"{"candidates":[{"content":{"parts":[{"text":"# Market Analysis"}]}}]}"##.to_vec();
        let (url, server) = serve_once("200 OK", "application/json", vec![body]).await;

        let provider = GoogleProvider::new("secret").with_model("gemini-test").with_base_url(url);
        let reply = provider.complete(&call(false, None)).await.unwrap();

        assert_eq!(reply.text, "# Market Analysis");
        assert_eq!(reply.model.as_deref(), Some("gemini-test"));

        let request = server.await.unwrap();
        assert!(request.starts_with("post /models/gemini-test:generatecontent"));
        assert!(request.contains("x-goog-api-key: secret"));
    }

    #[tokio::test]
    async fn test_quota_response_is_rate_limited() {
        let body = br#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#.to_vec();
        let (url, _server) =
            serve_once("429 Too Many Requests", "application/json", vec![body]).await;

        let provider = GoogleProvider::new("secret").with_base_url(url);
        let err = provider.complete(&call(true, None)).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
