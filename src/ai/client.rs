//! Generation client: provider selection, backoff, failover and soft
//! degradation around a [`TextBackend`].

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::progress::{EventSender, GenerationEvent};
use super::prompts::{refine_prompt, refine_system_instruction, system_instruction, user_prompt};
use super::{
    BackendCall, BackendReply, GenerationError, GenerationRequest, GoogleProvider,
    GroundingReference, OpenRouterProvider, TemplateBackend, TextBackend,
};
use crate::core::{
    retry_async, Config, GenerationConfig, ProviderKind, RetryConfig, Sleeper, TokioSleeper,
};
use crate::hierarchy::{lookup, profile_for, DocumentKind};
use crate::workflow::Section;

/// First line of every soft-degraded document.
pub const PLACEHOLDER_MARKER: &str = "> **Generation deferred:**";

/// Result of a document generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Final markdown
    pub content: String,
    /// Name of the backend that produced the content
    pub provider_used: String,
    pub model: Option<String>,
    /// True when `content` is the placeholder notice
    pub degraded: bool,
    /// Provider calls made, failover included
    pub attempts: u32,
    pub grounding: Vec<GroundingReference>,
}

impl GenerationOutcome {
    /// Soft-degraded success carrying the placeholder notice.
    fn placeholder(kind: DocumentKind, reason: &GenerationError, attempts: u32) -> Self {
        Self {
            content: placeholder_content(kind, reason),
            provider_used: "none".to_string(),
            model: None,
            degraded: true,
            attempts,
            grounding: Vec::new(),
        }
    }

    /// Whether `content` is a soft-degraded placeholder.
    pub fn is_placeholder(content: &str) -> bool {
        content.starts_with(PLACEHOLDER_MARKER)
    }
}

/// Result of a section refinement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineOutcome {
    pub content: String,
    pub provider_used: String,
}

/// Produces document text for a kind and a brief.
///
/// Stateless apart from configuration; never touches the lifecycle store.
pub struct GenerationClient {
    primary: Option<Arc<dyn TextBackend>>,
    secondary: Option<Arc<dyn TextBackend>>,
    settings: GenerationConfig,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
    /// Create a client around an explicit primary backend.
    pub fn new(primary: Arc<dyn TextBackend>) -> Self {
        Self {
            primary: Some(primary),
            secondary: None,
            settings: GenerationConfig::default(),
            retry: RetryConfig::generation(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Create a client with no usable backend; every call fails with a
    /// configuration error.
    pub fn unconfigured() -> Self {
        Self { primary: None, ..Self::new(Arc::new(TemplateBackend)) }
    }

    /// Build backends from configuration.
    ///
    /// Missing primary credentials select the template backend when
    /// `offline_fallback` is on, otherwise leave the client unconfigured. The
    /// secondary backend only exists when its key is present.
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.generation;

        let primary: Option<Arc<dyn TextBackend>> = match settings.resolved_api_key() {
            Some(key) => {
                Some(build_backend(settings.provider, key, &settings.provider_model(&settings.model)))
            }
            None if settings.offline_fallback => {
                info!("No API key configured, using offline templates");
                Some(Arc::new(TemplateBackend))
            }
            None => None,
        };

        let secondary = settings.secondary.as_ref().and_then(|secondary| {
            secondary
                .resolved_api_key()
                .map(|key| build_backend(secondary.provider, key, &secondary.model))
        });

        Self {
            primary,
            secondary,
            settings: settings.clone(),
            retry: config.retry.to_retry_config(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set the failover backend.
    pub fn with_secondary(mut self, secondary: Arc<dyn TextBackend>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Set model and mode settings.
    pub fn with_settings(mut self, settings: GenerationConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Set the backoff policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the timer used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Whether any backend can serve requests.
    pub fn is_configured(&self) -> bool {
        self.primary.is_some()
    }

    /// Name of the primary backend.
    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_ref().map(|backend| backend.name())
    }

    /// Name of the failover backend.
    pub fn secondary_name(&self) -> Option<&str> {
        self.secondary.as_ref().map(|backend| backend.name())
    }

    /// Generate a whole document.
    pub async fn generate(
        &self,
        kind: DocumentKind,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.generate_with_events(kind, request, None).await
    }

    /// Generate a whole document, reporting phase changes and streamed text
    /// on `events`.
    ///
    /// Rate limits are retried with backoff, then failed over once to the
    /// secondary backend, then degraded to placeholder content. Every other
    /// error is returned as is.
    pub async fn generate_with_events(
        &self,
        kind: DocumentKind,
        request: &GenerationRequest,
        events: Option<&EventSender>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let primary = self.require_primary()?;
        let call = self.plan_call(kind, request);

        let (result, attempts) = self.call_with_backoff(primary, &call, events).await;
        let err = match result {
            Ok(reply) => return Ok(finish(primary.name(), reply, attempts, false)),
            Err(err) if err.is_rate_limited() => err,
            Err(err) => return Err(err),
        };

        warn!(%kind, provider = primary.name(), attempts, "Primary provider still rate limited");

        let last_error = match self.fail_over(&call, events).await {
            Some(Ok(reply)) => {
                let provider = self.secondary_name().unwrap_or_default().to_string();
                return Ok(finish(&provider, reply, attempts + 1, true));
            }
            Some(Err(secondary_err)) => secondary_err,
            None => err,
        };

        warn!(%kind, error = %last_error, "All providers exhausted, returning placeholder");
        emit(events, GenerationEvent::Phase("Deferred: provider quota exhausted".to_string()));
        let attempts = attempts + u32::from(self.secondary.is_some());
        Ok(GenerationOutcome::placeholder(kind, &last_error, attempts))
    }

    /// Rewrite one section following `instruction`.
    ///
    /// Same retry and failover policy as [`GenerationClient::generate`], but
    /// never degrades: an exhausted quota is returned as `RateLimited` so the
    /// caller keeps the user's section untouched.
    pub async fn refine(
        &self,
        kind: DocumentKind,
        request: &GenerationRequest,
        section: &Section,
        instruction: &str,
    ) -> Result<RefineOutcome, GenerationError> {
        let primary = self.require_primary()?;
        let mut call = self.plan_call(kind, request);
        call.system_instruction = refine_system_instruction(kind);
        call.user_prompt = refine_prompt(request, section, instruction);
        call.grounded = false;

        let (result, _) = self.call_with_backoff(primary, &call, None).await;
        match result {
            Ok(reply) => Ok(RefineOutcome {
                content: reply.text.trim_end().to_string(),
                provider_used: primary.name().to_string(),
            }),
            Err(err) if err.is_rate_limited() => match self.fail_over(&call, None).await {
                Some(Ok(reply)) => Ok(RefineOutcome {
                    content: reply.text.trim_end().to_string(),
                    provider_used: self.secondary_name().unwrap_or_default().to_string(),
                }),
                Some(Err(secondary_err)) => Err(secondary_err),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Resolve prompts, model and mode flags for `kind`.
    pub fn plan_call(&self, kind: DocumentKind, request: &GenerationRequest) -> BackendCall {
        let profile = profile_for(kind);
        let overrides = self.settings.override_for(kind);

        let model = overrides
            .and_then(|o| o.model.as_deref())
            .or_else(|| {
                if profile.is_deep_reasoning() {
                    self.settings.deep_model.as_deref()
                } else {
                    None
                }
            })
            .map(|model| self.settings.provider_model(model));

        let thinking_budget = overrides
            .and_then(|o| o.thinking_budget)
            .or_else(|| profile.is_deep_reasoning().then_some(self.settings.thinking_budget));

        let grounded = overrides.and_then(|o| o.grounded).unwrap_or(profile.is_grounded());

        BackendCall {
            kind,
            subject: request.concept.clone(),
            system_instruction: system_instruction(kind),
            user_prompt: user_prompt(request),
            model,
            grounded,
            thinking_budget,
            max_output_tokens: self.settings.max_output_tokens,
        }
    }

    fn require_primary(&self) -> Result<&Arc<dyn TextBackend>, GenerationError> {
        self.primary.as_ref().ok_or_else(|| {
            GenerationError::Config(format!(
                "no API key for {} and offline fallback is disabled",
                self.settings.provider
            ))
        })
    }

    async fn call_with_backoff(
        &self,
        backend: &Arc<dyn TextBackend>,
        call: &BackendCall,
        events: Option<&EventSender>,
    ) -> (Result<BackendReply, GenerationError>, u32) {
        let mut current = 0u32;
        let outcome = retry_async(
            &self.retry,
            self.sleeper.as_ref(),
            GenerationError::is_rate_limited,
            move || {
                current += 1;
                if current > 1 {
                    emit(events, GenerationEvent::Phase(format!("Rate limited, retry {}", current - 1)));
                }
                debug!(kind = %call.kind, provider = backend.name(), attempt = current, "Generation attempt");
                self.invoke(backend.as_ref(), call, events)
            },
        )
        .await;
        let attempts = outcome.attempts;
        (outcome.into_result(), attempts)
    }

    /// One call to the secondary backend, if configured.
    async fn fail_over(
        &self,
        call: &BackendCall,
        events: Option<&EventSender>,
    ) -> Option<Result<BackendReply, GenerationError>> {
        let secondary = self.secondary.as_ref()?;
        info!(kind = %call.kind, provider = secondary.name(), "Failing over to secondary provider");
        emit(events, GenerationEvent::Phase(format!("Switching to {}", secondary.name())));

        let result = self.invoke(secondary.as_ref(), &call.for_secondary(), events).await;
        if let Err(err) = &result {
            warn!(kind = %call.kind, provider = secondary.name(), error = %err, "Secondary provider failed");
        }
        Some(result)
    }

    async fn invoke(
        &self,
        backend: &dyn TextBackend,
        call: &BackendCall,
        events: Option<&EventSender>,
    ) -> Result<BackendReply, GenerationError> {
        match events {
            Some(tx) if self.settings.stream && backend.supports_streaming() => {
                let accumulated = Mutex::new(String::new());
                let on_delta = |delta: &str| {
                    let mut text = accumulated.lock();
                    text.push_str(delta);
                    let _ = tx.send(GenerationEvent::Chunk(text.clone()));
                };
                backend.complete_streaming(call, &on_delta).await
            }
            _ => backend.complete(call).await,
        }
    }
}

fn build_backend(provider: ProviderKind, api_key: String, model: &str) -> Arc<dyn TextBackend> {
    match provider {
        ProviderKind::Google => Arc::new(GoogleProvider::new(api_key).with_model(model)),
        ProviderKind::OpenRouter => Arc::new(OpenRouterProvider::new(api_key).with_model(model)),
    }
}

fn emit(events: Option<&EventSender>, event: GenerationEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

fn finish(provider: &str, reply: BackendReply, attempts: u32, failed_over: bool) -> GenerationOutcome {
    let mut content = reply.text.trim_end().to_string();
    if !reply.grounding.is_empty() {
        content.push_str("\n\n## Sources\n");
        for source in &reply.grounding {
            let _ = write!(content, "\n- [{}]({})", source.title, source.uri);
        }
    }
    if failed_over {
        info!(provider, "Generated with secondary provider");
    }
    GenerationOutcome {
        content,
        provider_used: provider.to_string(),
        model: reply.model,
        degraded: false,
        attempts,
        grounding: reply.grounding,
    }
}

fn placeholder_content(kind: DocumentKind, reason: &GenerationError) -> String {
    let node = lookup(kind);
    format!(
        "{PLACEHOLDER_MARKER} every text-generation provider is over its request quota.\n\n\
         # {title}\n\n\
         This {title} has not been written yet. Regenerate it once the quota resets.\n\n\
         _Last error: {reason}_",
        title = node.title,
    )
}
