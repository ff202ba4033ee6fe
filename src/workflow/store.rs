//! Document lifecycle store.
//!
//! The single writer of a project's documents. Each document follows
//!
//! ```text
//! Pending ──start──▶ Generating ──complete──▶ Completed
//!                        │   ▲                    │
//!                      fail  └──────start─────────┤
//!                        ▼                        │
//!                      Failed ─────start──────────┘
//! ```
//!
//! Nothing returns to Pending. Every successful transition publishes a fresh
//! project snapshot on a `watch` channel.

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::documents::{Document, DocumentStatus, Project};
use crate::ai::INITIAL_PHASE;
use crate::hierarchy::{all_kinds, DocumentKind};

/// Phase label of a completed document.
pub const COMPLETED_PHASE: &str = "Completed";

/// Phase label of a failed document.
pub const FAILED_PHASE: &str = "Failed";

/// Phase label while streamed text is arriving.
pub const STREAMING_PHASE: &str = "Streaming";

/// Failure reason recorded by [`LifecycleStore::recover_interrupted`].
pub const INTERRUPTED_REASON: &str = "generation interrupted before completion";

/// Lifecycle transition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// A generation for this document is already in flight
    #[error("{0} is already generating")]
    ConcurrentGeneration(DocumentKind),

    #[error("cannot {action} {kind} while it is {from}")]
    InvalidTransition { kind: DocumentKind, from: DocumentStatus, action: &'static str },

    #[error("project documents are already initialized")]
    AlreadyInitialized,

    #[error("project has no {0} document")]
    UnknownDocument(DocumentKind),
}

/// Owns one project and serializes every document transition.
pub struct LifecycleStore {
    project: Mutex<Project>,
    snapshots: watch::Sender<Project>,
}

impl LifecycleStore {
    /// Take ownership of `project`.
    pub fn new(project: Project) -> Self {
        let (snapshots, _) = watch::channel(project.clone());
        Self { project: Mutex::new(project), snapshots }
    }

    /// Create one pending document per hierarchy kind.
    pub fn initialize_all(&self) -> Result<(), LifecycleError> {
        let mut project = self.project.lock();
        if !project.documents.is_empty() {
            return Err(LifecycleError::AlreadyInitialized);
        }

        let now = Utc::now();
        let id = project.id.clone();
        project.documents = all_kinds().iter().map(|kind| Document::pending(&id, *kind, now)).collect();
        project.status = project.derive_status();
        project.updated_at = now;

        debug!(project = %project.id, documents = project.documents.len(), "Initialized documents");
        self.snapshots.send_replace(project.clone());
        Ok(())
    }

    /// Mark `kind` as generating.
    ///
    /// Allowed from every state except Generating, which is rejected with
    /// [`LifecycleError::ConcurrentGeneration`] and leaves the document as is.
    pub fn start_generation(&self, kind: DocumentKind) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            if doc.status == DocumentStatus::Generating {
                return Err(LifecycleError::ConcurrentGeneration(kind));
            }
            doc.status = DocumentStatus::Generating;
            doc.progress = 0;
            doc.phase = INITIAL_PHASE.to_string();
            doc.error = None;
            Ok(true)
        })
    }

    /// Report progress of an in-flight generation. `percent` is clamped to
    /// 0..=100.
    pub fn update_progress(
        &self,
        kind: DocumentKind,
        percent: i32,
        phase: &str,
    ) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            require_generating(doc, "update progress of")?;
            let percent = percent.clamp(0, 100) as u8;
            let changed = doc.progress != percent || doc.phase != phase;
            doc.progress = percent;
            doc.phase = phase.to_string();
            Ok(changed)
        })
    }

    /// Store streamed text received so far.
    pub fn record_partial(&self, kind: DocumentKind, content: &str) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            require_generating(doc, "stream into")?;
            doc.content = content.to_string();
            doc.phase = STREAMING_PHASE.to_string();
            Ok(true)
        })
    }

    /// Finish a generation with `content`.
    pub fn complete_generation(
        &self,
        kind: DocumentKind,
        content: &str,
    ) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            require_generating(doc, "complete")?;
            doc.status = DocumentStatus::Completed;
            doc.progress = 100;
            doc.phase = COMPLETED_PHASE.to_string();
            doc.content = content.to_string();
            doc.error = None;
            Ok(true)
        })
    }

    /// Finish a generation as failed. Content produced so far is kept.
    pub fn fail_generation(&self, kind: DocumentKind, reason: &str) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            require_generating(doc, "fail")?;
            doc.status = DocumentStatus::Failed;
            doc.progress = 100;
            doc.phase = FAILED_PHASE.to_string();
            doc.error = Some(reason.to_string());
            Ok(true)
        })
    }

    /// Replace content outside of a generation. Status is left unchanged.
    pub fn replace_content(&self, kind: DocumentKind, content: &str) -> Result<(), LifecycleError> {
        self.transition(kind, |doc| {
            if doc.status == DocumentStatus::Generating {
                return Err(LifecycleError::InvalidTransition {
                    kind,
                    from: doc.status,
                    action: "replace content of",
                });
            }
            if doc.content == content {
                return Ok(false);
            }
            doc.content = content.to_string();
            Ok(true)
        })
    }

    /// Fail every document left generating by a process that stopped
    /// mid-call. Returns the kinds it touched.
    pub fn recover_interrupted(&self) -> Vec<DocumentKind> {
        let stuck: Vec<DocumentKind> = self
            .project
            .lock()
            .documents
            .iter()
            .filter(|doc| doc.status == DocumentStatus::Generating)
            .map(|doc| doc.kind)
            .collect();

        stuck
            .into_iter()
            .filter(|kind| self.fail_generation(*kind, INTERRUPTED_REASON).is_ok())
            .collect()
    }

    /// Current project state.
    pub fn snapshot(&self) -> Project {
        self.project.lock().clone()
    }

    /// Current state of one document.
    pub fn document(&self, kind: DocumentKind) -> Option<Document> {
        self.project.lock().document(kind).cloned()
    }

    pub fn project_id(&self) -> String {
        self.project.lock().id.clone()
    }

    /// Receiver that sees a new snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<Project> {
        self.snapshots.subscribe()
    }

    /// Apply `change` to one document under the lock.
    ///
    /// `change` returns whether it modified the document; unchanged documents
    /// keep their timestamp and publish nothing.
    fn transition<F>(&self, kind: DocumentKind, change: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut Document) -> Result<bool, LifecycleError>,
    {
        let mut project = self.project.lock();
        let doc = project.document_mut(kind).ok_or(LifecycleError::UnknownDocument(kind))?;

        if !change(doc)? {
            return Ok(());
        }

        let now = Utc::now();
        doc.last_updated = now;
        debug!(%kind, status = %doc.status, progress = doc.progress, phase = %doc.phase, "Document transition");

        project.status = project.derive_status();
        project.updated_at = now;
        self.snapshots.send_replace(project.clone());
        Ok(())
    }
}

fn require_generating(doc: &Document, action: &'static str) -> Result<(), LifecycleError> {
    if doc.status == DocumentStatus::Generating {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { kind: doc.kind, from: doc.status, action })
    }
}
