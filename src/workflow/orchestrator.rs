//! Orchestrator: decides when each document is generated and drives the
//! generation client and the lifecycle store together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::documents::{Document, DocumentStatus, Project, ProjectBrief};
use super::sections::{apply_section_edit, find_section, keep_trailing_breaks, SectionError};
use super::store::{LifecycleError, LifecycleStore};
use crate::ai::{
    GenerationClient, GenerationError, GenerationEvent, GenerationOutcome, GenerationRequest,
    RelatedDocument, SyntheticProgress,
};
use crate::core::{OrchestratorSettings, Sleeper, TokioSleeper};
use crate::hierarchy::{leading_kinds, lookup, prerequisites_of, unlocks_of, DocumentKind};

/// Characters of each prerequisite document passed along as context.
const RELATED_EXCERPT_CHARS: usize = 1500;

/// Orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Section(#[from] SectionError),

    /// The document was marked failed with this reason
    #[error("generating {kind} failed: {source}")]
    Generation { kind: DocumentKind, source: GenerationError },

    /// The document was left untouched
    #[error("refining {kind} failed: {source}")]
    Refinement { kind: DocumentKind, source: GenerationError },

    #[error("project brief needs a concept")]
    EmptyConcept,

    #[error("no document with id `{0}`")]
    UnknownDocumentId(String),
}

/// What the initial batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: Vec<DocumentKind>,

    /// Completed with placeholder content
    pub degraded: Vec<DocumentKind>,
    pub failed: Vec<(DocumentKind, String)>,

    /// Already started before the batch reached them
    pub skipped: Vec<DocumentKind>,
}

/// Result of an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// Document the presentation should focus
    pub focus: DocumentKind,

    /// Whether the focused document was generated by this call
    pub generated: bool,
}

/// Drives generation for one project.
pub struct Orchestrator {
    store: Arc<LifecycleStore>,
    client: Arc<GenerationClient>,
    settings: OrchestratorSettings,
    sleeper: Arc<dyn Sleeper>,
}

impl Orchestrator {
    /// Drive an existing project.
    pub fn new(store: Arc<LifecycleStore>, client: Arc<GenerationClient>) -> Self {
        Self { store, client, settings: OrchestratorSettings::default(), sleeper: Arc::new(TokioSleeper) }
    }

    /// Create a project for `brief` with every document pending.
    ///
    /// Follow with [`Orchestrator::run_initial_batch`].
    pub fn create_project(
        owner: &str,
        brief: ProjectBrief,
        client: Arc<GenerationClient>,
    ) -> Result<Self, OrchestratorError> {
        if brief.concept.trim().is_empty() {
            return Err(OrchestratorError::EmptyConcept);
        }

        let project = Project::new(owner, brief);
        info!(project = %project.id, name = project.name(), "Creating project");

        let store = Arc::new(LifecycleStore::new(project));
        store.initialize_all()?;
        Ok(Self::new(store, client))
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the timer used for the settle delay.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &Arc<LifecycleStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Project {
        self.store.snapshot()
    }

    /// Kinds generated right after project creation.
    pub fn initial_batch_kinds(&self) -> Vec<DocumentKind> {
        leading_kinds(self.settings.initial_categories)
    }

    /// Generate the initial batch one document at a time, pausing the settle
    /// delay between documents.
    ///
    /// A failed document does not stop the batch. Documents that are no
    /// longer pending are skipped.
    pub async fn run_initial_batch(&self) -> BatchReport {
        let mut report = BatchReport::default();
        let mut first = true;

        for kind in self.initial_batch_kinds() {
            let pending = self.store.document(kind).is_some_and(|doc| doc.status == DocumentStatus::Pending);
            if !pending {
                debug!(%kind, "Skipping initial generation");
                report.skipped.push(kind);
                continue;
            }

            if !first {
                self.sleeper.sleep(self.settings.settle_delay()).await;
            }
            first = false;

            match self.regenerate(kind).await {
                Ok(doc) if doc.is_placeholder() => report.degraded.push(kind),
                Ok(_) => report.completed.push(kind),
                Err(err) => report.failed.push((kind, err.to_string())),
            }
        }

        info!(
            completed = report.completed.len(),
            degraded = report.degraded.len(),
            failed = report.failed.len(),
            "Initial batch finished"
        );
        report
    }

    /// Generate one document, whatever its position in the hierarchy.
    ///
    /// Rejected while the document is already generating. A generation error
    /// leaves the document failed and is returned.
    pub async fn regenerate(&self, kind: DocumentKind) -> Result<Document, OrchestratorError> {
        self.store.start_generation(kind)?;
        info!(%kind, "Generating document");

        let request = self.request_for(kind);
        match self.drive(kind, &request).await {
            Ok(outcome) => {
                if outcome.degraded {
                    warn!(%kind, "Stored placeholder content");
                } else {
                    info!(%kind, provider = %outcome.provider_used, attempts = outcome.attempts, "Document generated");
                }
                self.store.complete_generation(kind, &outcome.content)?;
            }
            Err(source) => {
                warn!(%kind, error = %source, "Document generation failed");
                self.store.fail_generation(kind, &source.to_string())?;
                return Err(OrchestratorError::Generation { kind, source });
            }
        }

        Ok(self.store.document(kind).ok_or(LifecycleError::UnknownDocument(kind))?)
    }

    /// Move to the primary successor of `from`, generating it if pending.
    ///
    /// Returns `None` for the last kind of the hierarchy. Never cascades past
    /// the successor.
    pub async fn advance(
        &self,
        from: DocumentKind,
    ) -> Result<Option<AdvanceOutcome>, OrchestratorError> {
        let Some(&next) = unlocks_of(from).first() else {
            return Ok(None);
        };

        let doc = self.store.document(next).ok_or(LifecycleError::UnknownDocument(next))?;
        let generated = doc.status == DocumentStatus::Pending;
        if generated {
            self.regenerate(next).await?;
        } else {
            debug!(%from, %next, status = %doc.status, "Successor already started, focusing only");
        }

        Ok(Some(AdvanceOutcome { focus: next, generated }))
    }

    /// Rewrite one section with the model and store the rejoined document.
    pub async fn refine_section(
        &self,
        doc_id: &str,
        section_id: &str,
        instruction: &str,
    ) -> Result<Document, OrchestratorError> {
        let doc = self.document_by_id(doc_id)?;
        let kind = doc.kind;
        if doc.status == DocumentStatus::Generating {
            return Err(LifecycleError::InvalidTransition { kind, from: doc.status, action: "refine" }.into());
        }

        let section = find_section(&doc.content, section_id)?;
        let request = self.request_for(kind);
        info!(%kind, section = %section.title, "Refining section");

        let refined = self
            .client
            .refine(kind, &request, &section, instruction)
            .await
            .map_err(|source| OrchestratorError::Refinement { kind, source })?;

        let replacement = keep_trailing_breaks(&section.content, &refined.content);
        self.edit_section(doc_id, section_id, &replacement)
    }

    /// Replace one section verbatim and store the rejoined document.
    pub fn edit_section(
        &self,
        doc_id: &str,
        section_id: &str,
        content: &str,
    ) -> Result<Document, OrchestratorError> {
        let doc = self.document_by_id(doc_id)?;
        let updated = apply_section_edit(&doc.content, section_id, content)?;
        self.save_document(doc_id, &updated)
    }

    /// Replace a whole document's content.
    pub fn save_document(&self, doc_id: &str, content: &str) -> Result<Document, OrchestratorError> {
        let kind = self.document_by_id(doc_id)?.kind;
        self.store.replace_content(kind, content)?;
        Ok(self.store.document(kind).ok_or(LifecycleError::UnknownDocument(kind))?)
    }

    fn document_by_id(&self, doc_id: &str) -> Result<Document, OrchestratorError> {
        self.store
            .snapshot()
            .document_by_id(doc_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownDocumentId(doc_id.to_string()))
    }

    /// Request for `kind` from the current brief, with completed
    /// prerequisites as context.
    fn request_for(&self, kind: DocumentKind) -> GenerationRequest {
        let project = self.store.snapshot();
        let related = prerequisites_of(kind)
            .filter_map(|prerequisite| project.document(prerequisite))
            .filter(|doc| doc.status == DocumentStatus::Completed && doc.has_content() && !doc.is_placeholder())
            .map(|doc| RelatedDocument {
                title: lookup(doc.kind).title.to_string(),
                excerpt: excerpt(&doc.content, RELATED_EXCERPT_CHARS),
            })
            .collect();

        GenerationRequest::from_brief(kind, &project.brief).with_related(related)
    }

    /// Await the client while folding its events and synthetic progress
    /// into the store.
    async fn drive(
        &self,
        kind: DocumentKind,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let generation = self.client.generate_with_events(kind, request, Some(&tx));
        tokio::pin!(generation);

        let mut ticker = tokio::time::interval(self.settings.progress_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut progress = SyntheticProgress::new();
        let mut streaming = false;

        loop {
            tokio::select! {
                biased;

                result = &mut generation => return result,

                Some(event) = rx.recv() => {
                    let applied = match event {
                        GenerationEvent::Phase(phase) => {
                            self.store.update_progress(kind, i32::from(progress.percent()), &phase)
                        }
                        GenerationEvent::Chunk(text) => {
                            streaming = true;
                            self.store.record_partial(kind, &text)
                        }
                    };
                    if let Err(err) = applied {
                        warn!(%kind, error = %err, "Dropped progress event");
                    }
                }

                _ = ticker.tick(), if !streaming => {
                    let (percent, phase) = progress.tick();
                    if let Err(err) = self.store.update_progress(kind, i32::from(percent), phase) {
                        warn!(%kind, error = %err, "Dropped progress tick");
                    }
                }
            }
        }
    }
}

/// First `max_chars` characters of `content`, cut at a line break when one
/// is close.
fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => {
            let head = &content[..end];
            let cut = head.rfind('\n').filter(|pos| *pos > end / 2).unwrap_or(end);
            format!("{}\n…", content[..cut].trim_end())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use tokio::sync::{watch, Notify};

    use super::*;
    use crate::ai::{BackendCall, BackendReply, TextBackend, INITIAL_PHASE};
    use crate::core::{GenerationConfig, RecordingSleeper, RetryConfig};
    use crate::workflow::STREAMING_PHASE;

    /// Answers with `# {title}` and records every call.
    #[derive(Default)]
    struct EchoBackend {
        calls: Mutex<Vec<BackendCall>>,
        fail: Mutex<Option<GenerationError>>,
    }

    #[async_trait]
    impl TextBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, call: &BackendCall) -> Result<BackendReply, GenerationError> {
            self.calls.lock().push(call.clone());
            if let Some(err) = self.fail.lock().clone() {
                return Err(err);
            }
            let text = if call.system_instruction.contains("editing one section") {
                "## Goals\n- refined".to_string()
            } else {
                format!("# {}\n\n## Goals\n- one\n\n## Risks\nnone", lookup(call.kind).title)
            };
            Ok(BackendReply { text, ..Default::default() })
        }
    }

    fn orchestrator(backend: Arc<EchoBackend>) -> (Orchestrator, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let client = GenerationClient::new(backend)
            .with_retry(RetryConfig::no_retry())
            .with_sleeper(sleeper.clone());
        let orchestrator =
            Orchestrator::create_project("owner", ProjectBrief::new("X", "Y"), Arc::new(client))
                .unwrap()
                .with_sleeper(sleeper.clone());
        (orchestrator, sleeper)
    }

    fn status(orchestrator: &Orchestrator, kind: DocumentKind) -> DocumentStatus {
        orchestrator.store().document(kind).unwrap().status
    }

    fn doc_id(orchestrator: &Orchestrator, kind: DocumentKind) -> String {
        Document::id_for(&orchestrator.store().project_id(), kind)
    }

    #[test]
    fn test_create_project_requires_concept() {
        let client = Arc::new(GenerationClient::unconfigured());
        let result = Orchestrator::create_project("owner", ProjectBrief::new("  ", "Y"), client);
        assert!(matches!(result, Err(OrchestratorError::EmptyConcept)));
    }

    #[tokio::test]
    async fn test_initial_batch_is_sequential_with_settle_delay() {
        let backend = Arc::new(EchoBackend::default());
        let (orchestrator, sleeper) = orchestrator(backend.clone());

        let report = orchestrator.run_initial_batch().await;

        assert_eq!(report.completed, leading_kinds(2));
        assert!(report.failed.is_empty());
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(1500); 7]);

        let called: Vec<_> = backend.calls.lock().iter().map(|call| call.kind).collect();
        assert_eq!(called, leading_kinds(2));

        let project = orchestrator.snapshot();
        assert_eq!(project.count(DocumentStatus::Completed), 8);
        assert_eq!(project.count(DocumentStatus::Pending), 27);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let backend = Arc::new(EchoBackend::default());
        *backend.fail.lock() = Some(GenerationError::Provider("invalid model".to_string()));
        let (orchestrator, _) = orchestrator(backend);

        let report = orchestrator.run_initial_batch().await;

        assert_eq!(report.failed.len(), 8);
        let doc = orchestrator.store().document(DocumentKind::Vision).unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.error.unwrap().contains("invalid model"));
    }

    #[tokio::test]
    async fn test_regenerate_passes_completed_prerequisites() {
        let backend = Arc::new(EchoBackend::default());
        let (orchestrator, _) = orchestrator(backend.clone());

        orchestrator.regenerate(DocumentKind::Vision).await.unwrap();
        orchestrator.regenerate(DocumentKind::MarketAnalysis).await.unwrap();

        let calls = backend.calls.lock();
        assert!(!calls[0].user_prompt.contains("Related documents"));
        assert!(calls[1].user_prompt.contains("--- Product Vision ---"));
    }

    #[tokio::test]
    async fn test_regenerate_rejects_in_flight_document() {
        let backend = Arc::new(EchoBackend::default());
        let (orchestrator, _) = orchestrator(backend.clone());
        orchestrator.store().start_generation(DocumentKind::Prd).unwrap();

        let err = orchestrator.regenerate(DocumentKind::Prd).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Lifecycle(LifecycleError::ConcurrentGeneration(DocumentKind::Prd))
        ));
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_advance_generates_pending_successor_only() {
        let backend = Arc::new(EchoBackend::default());
        let (orchestrator, _) = orchestrator(backend.clone());
        orchestrator.regenerate(DocumentKind::Vision).await.unwrap();

        let outcome = orchestrator.advance(DocumentKind::Vision).await.unwrap().unwrap();
        assert_eq!(outcome, AdvanceOutcome { focus: DocumentKind::MarketAnalysis, generated: true });
        assert_eq!(status(&orchestrator, DocumentKind::MarketAnalysis), DocumentStatus::Completed);

        let project = orchestrator.snapshot();
        assert_eq!(project.count(DocumentStatus::Completed), 2);
        assert_eq!(project.count(DocumentStatus::Pending), 33);

        // Second advance only moves focus
        let again = orchestrator.advance(DocumentKind::Vision).await.unwrap().unwrap();
        assert!(!again.generated);
        assert_eq!(backend.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_advance_from_last_kind() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoBackend::default()));
        assert_eq!(orchestrator.advance(DocumentKind::Okrs).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_edit_and_refine_sections() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoBackend::default()));
        orchestrator.regenerate(DocumentKind::Vision).await.unwrap();
        let id = doc_id(&orchestrator, DocumentKind::Vision);

        let doc = orchestrator.edit_section(&id, "section-2", "## Risks\nsome").unwrap();
        assert_eq!(doc.content, "# Product Vision\n\n## Goals\n- one\n\n## Risks\nsome");

        let doc = orchestrator.refine_section(&id, "section-1", "be sharper").await.unwrap();
        assert_eq!(doc.content, "# Product Vision\n\n## Goals\n- refined\n\n## Risks\nsome");
        assert_eq!(doc.status, DocumentStatus::Completed);
    }

    #[tokio::test]
    async fn test_refine_failure_leaves_document_untouched() {
        let backend = Arc::new(EchoBackend::default());
        let (orchestrator, _) = orchestrator(backend.clone());
        orchestrator.regenerate(DocumentKind::Vision).await.unwrap();
        let before = orchestrator.store().document(DocumentKind::Vision).unwrap();

        *backend.fail.lock() = Some(GenerationError::RateLimited("429".to_string()));
        let err = orchestrator
            .refine_section(&before.id, "section-1", "expand")
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Refinement { .. }));
        assert_eq!(orchestrator.store().document(DocumentKind::Vision).unwrap(), before);
    }

    #[tokio::test]
    async fn test_section_edit_on_empty_document() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoBackend::default()));
        let id = doc_id(&orchestrator, DocumentKind::Vision);
        let err = orchestrator.edit_section(&id, "section-0", "x").unwrap_err();
        assert!(matches!(err, OrchestratorError::Section(SectionError::EmptyDocument)));
        assert!(matches!(
            orchestrator.save_document("missing", "x"),
            Err(OrchestratorError::UnknownDocumentId(_))
        ));
    }

    const GATED_REPLY: &str = "# Product Vision\n\n## Goals\n- one";

    /// Holds its reply until `release` is notified. When streaming, the
    /// title line is sent before waiting.
    #[derive(Default)]
    struct GatedBackend {
        release: Notify,
        streaming: bool,
    }

    #[async_trait]
    impl TextBackend for GatedBackend {
        fn name(&self) -> &str {
            "gated"
        }

        async fn complete(&self, _call: &BackendCall) -> Result<BackendReply, GenerationError> {
            self.release.notified().await;
            Ok(BackendReply { text: GATED_REPLY.to_string(), ..Default::default() })
        }

        fn supports_streaming(&self) -> bool {
            self.streaming
        }

        async fn complete_streaming(
            &self,
            _call: &BackendCall,
            on_delta: &(dyn for<'d> Fn(&'d str) + Send + Sync),
        ) -> Result<BackendReply, GenerationError> {
            let (title, rest) = GATED_REPLY.split_at("# Product Vision\n\n".len());
            on_delta(title);
            self.release.notified().await;
            on_delta(rest);
            Ok(BackendReply { text: GATED_REPLY.to_string(), ..Default::default() })
        }
    }

    fn ticking_orchestrator(backend: Arc<GatedBackend>, stream: bool) -> Orchestrator {
        let client = GenerationClient::new(backend)
            .with_settings(GenerationConfig { stream, ..Default::default() })
            .with_retry(RetryConfig::no_retry());
        Orchestrator::create_project("owner", ProjectBrief::new("X", "Y"), Arc::new(client))
            .unwrap()
            .with_settings(OrchestratorSettings { progress_tick_ms: 10, ..Default::default() })
    }

    /// Generating snapshots of `kind`, collected until it leaves Generating.
    async fn watch_generation(
        mut rx: watch::Receiver<Project>,
        kind: DocumentKind,
        mut on_generating: impl FnMut(&Document),
    ) -> Vec<Document> {
        let mut seen = Vec::new();
        loop {
            let doc = rx.borrow_and_update().document(kind).cloned();
            if let Some(doc) = doc {
                if doc.status == DocumentStatus::Generating {
                    on_generating(&doc);
                    seen.push(doc);
                } else if !seen.is_empty() {
                    break;
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_synthetic_progress_reaches_store_while_backend_is_slow() {
        let backend = Arc::new(GatedBackend::default());
        let orchestrator = ticking_orchestrator(backend.clone(), false);
        let rx = orchestrator.store().subscribe();

        let watcher = watch_generation(rx, DocumentKind::Vision, |doc| {
            if doc.progress >= 28 {
                backend.release.notify_one();
            }
        });
        let (result, seen) = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::join!(orchestrator.regenerate(DocumentKind::Vision), watcher)
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap().status, DocumentStatus::Completed);
        assert_eq!(seen[0].phase, INITIAL_PHASE);
        assert!(seen.windows(2).all(|pair| pair[0].progress <= pair[1].progress));
        assert!(seen.iter().all(|doc| doc.progress <= 95));
        assert!(seen.iter().any(|doc| doc.progress > 0));

        let labels = [
            INITIAL_PHASE,
            "Analyzing brief",
            "Drafting outline",
            "Writing sections",
            "Reviewing consistency",
            "Finalizing",
        ];
        let order: Vec<usize> = seen
            .iter()
            .map(|doc| labels.iter().position(|label| *label == doc.phase).unwrap())
            .collect();
        assert!(order.windows(2).all(|pair| pair[0] <= pair[1]), "phases out of order: {order:?}");
        assert!(seen.iter().any(|doc| doc.phase == "Drafting outline"));
    }

    #[tokio::test]
    async fn test_streamed_text_reaches_store_before_completion() {
        let backend = Arc::new(GatedBackend { streaming: true, ..Default::default() });
        let orchestrator = ticking_orchestrator(backend.clone(), true);
        let rx = orchestrator.store().subscribe();

        let mut partial = None;
        let watcher = watch_generation(rx, DocumentKind::Vision, |doc| {
            if doc.phase == STREAMING_PHASE {
                partial.get_or_insert_with(|| doc.content.clone());
                backend.release.notify_one();
            }
        });
        let (result, _) = tokio::time::timeout(Duration::from_secs(10), async {
            tokio::join!(orchestrator.regenerate(DocumentKind::Vision), watcher)
        })
        .await
        .unwrap();

        let doc = result.unwrap();
        let partial = partial.unwrap();
        assert_eq!(partial, "# Product Vision\n\n");
        assert!(doc.content.starts_with(&partial));
        assert!(doc.content.len() > partial.len());
        assert_eq!(doc.status, DocumentStatus::Completed);
    }

    #[test]
    fn test_excerpt_cuts_long_content() {
        assert_eq!(excerpt("short", 100), "short");
        let long = format!("{}\n{}", "a".repeat(80), "b".repeat(80));
        let cut = excerpt(&long, 100);
        assert_eq!(cut, format!("{}\n…", "a".repeat(80)));
    }
}
