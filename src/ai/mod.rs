//! Text-generation integration.
//!
//! Turns a document kind plus a project brief into markdown by calling a
//! generative text backend.
//!
//! ## Features
//!
//! - Google (Gemini) and OpenRouter backends, plus an offline template backend
//! - Per-kind generation profiles (search-grounded, deep reasoning)
//! - Exponential backoff on rate limits, one-shot failover to a secondary
//!   provider, and a soft placeholder when every option is exhausted
//! - Progress and token-stream notifications over a channel

mod client;
mod google;
mod openrouter;
mod progress;
mod prompts;
mod template;

pub use client::{GenerationClient, GenerationOutcome, RefineOutcome, PLACEHOLDER_MARKER};
pub use google::GoogleProvider;
pub use openrouter::OpenRouterProvider;
pub use progress::{EventSender, GenerationEvent, SyntheticProgress, INITIAL_PHASE};
pub use prompts::{refine_prompt, refine_system_instruction, system_instruction, user_prompt};
pub use template::TemplateBackend;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::hierarchy::DocumentKind;
use crate::workflow::ProjectBrief;

/// A generation backend: one provider reachable with one set of credentials.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Provider name reported as `providerUsed`.
    fn name(&self) -> &str;

    /// Run one non-incremental completion.
    async fn complete(&self, call: &BackendCall) -> Result<BackendReply, GenerationError>;

    /// Whether [`TextBackend::complete_streaming`] really streams.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Run a completion, reporting text deltas as they arrive.
    ///
    /// The default implementation waits for the full reply and reports it as
    /// a single delta.
    async fn complete_streaming(
        &self,
        call: &BackendCall,
        on_delta: &(dyn for<'d> Fn(&'d str) + Send + Sync),
    ) -> Result<BackendReply, GenerationError> {
        let reply = self.complete(call).await?;
        on_delta(&reply.text);
        Ok(reply)
    }
}

/// Generation error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Provider quota exhausted; retried and failed over by the client
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-retryable provider rejection (bad request, model, key)
    #[error("provider error: {0}")]
    Provider(String),

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// No credentials and no offline fallback
    #[error("configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Map a non-success HTTP response to an error.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("{status}: {}", truncate(body, 300));
        if status == StatusCode::TOO_MANY_REQUESTS || is_quota_message(body) {
            Self::RateLimited(detail)
        } else if status.is_server_error() {
            Self::Network(detail)
        } else {
            Self::Provider(detail)
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Provider(format!("malformed response: {err}"))
        } else if err.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
            Self::RateLimited(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Provider wording for an exhausted quota.
fn is_quota_message(body: &str) -> bool {
    body.contains("RESOURCE_EXHAUSTED") || body.to_lowercase().contains("rate limit")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

/// Everything a generation call needs. Built fresh from the brief each time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: DocumentKind,
    pub concept: String,
    pub features: String,
    pub audience: String,
    pub problem: String,
    pub preferences: Preferences,

    /// Excerpts of completed prerequisite documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedDocument>,
}

/// Delivery preferences from the brief.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub tech: String,
    pub budget: String,
    pub timeline: String,
}

/// A prerequisite document passed along as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub title: String,
    pub excerpt: String,
}

impl GenerationRequest {
    /// Build a request for `kind` from the current brief.
    pub fn from_brief(kind: DocumentKind, brief: &ProjectBrief) -> Self {
        Self {
            kind,
            concept: brief.concept.clone(),
            features: brief.features.clone(),
            audience: brief.audience.clone(),
            problem: brief.problem.clone(),
            preferences: Preferences {
                tech: brief.tech_preferences.clone(),
                budget: brief.budget.clone(),
                timeline: brief.timeline.clone(),
            },
            related: Vec::new(),
        }
    }

    /// Attach prerequisite context.
    pub fn with_related(mut self, related: Vec<RelatedDocument>) -> Self {
        self.related = related;
        self
    }
}

/// One provider call: prompts plus mode flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub kind: DocumentKind,
    /// Product concept, for backends that render without a model
    pub subject: String,
    pub system_instruction: String,
    pub user_prompt: String,
    /// Model override; `None` uses the backend's own model
    pub model: Option<String>,
    /// Augment with web search
    pub grounded: bool,
    /// Deep-reasoning token budget
    pub thinking_budget: Option<u32>,
    pub max_output_tokens: u32,
}

impl BackendCall {
    /// Same call with the primary's model choice dropped, for a failover backend.
    pub fn for_secondary(&self) -> Self {
        Self { model: None, ..self.clone() }
    }
}

/// A backend's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendReply {
    pub text: String,
    /// Model that actually answered, when reported
    pub model: Option<String>,
    pub grounding: Vec<GroundingReference>,
}

/// A web source backing a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReference {
    pub title: String,
    pub uri: String,
}
