//! Project workflow: documents, their lifecycle, and generation orchestration.
//!
//! ## Components
//!
//! - [`LifecycleStore`] - single writer of a project's documents, enforcing
//!   the per-document state machine and publishing snapshots
//! - [`Orchestrator`] - runs the initial batch, regenerations and advances
//! - Section codec ([`split`], [`join`]) - addressable slices of a document
//!   for targeted edits
//! - [`ProjectRepository`] - snapshot persistence

mod documents;
mod orchestrator;
mod persistence;
mod sections;
mod store;

pub use documents::{Document, DocumentStatus, Project, ProjectBrief, ProjectStatus, PENDING_PHASE};
pub use orchestrator::{AdvanceOutcome, BatchReport, Orchestrator, OrchestratorError};
pub use persistence::{
    find_project, persist_snapshots, JsonProjectRepository, MemoryProjectRepository,
    ProjectRepository,
};
pub use sections::{
    apply_section_edit, find_section, join, keep_trailing_breaks, replace_section, section_id,
    split, Section, SectionError, FULL_DOCUMENT_TITLE, INTRODUCTION_TITLE,
};
pub use store::{
    LifecycleError, LifecycleStore, COMPLETED_PHASE, FAILED_PHASE, INTERRUPTED_REASON,
    STREAMING_PHASE,
};
