#![allow(clippy::format_push_string)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::should_implement_trait)]

//! # Planforge
//!
//! Turns a product brief into a fixed hierarchy of planning documents
//! (vision, PRD, architecture, test plans, go-to-market, ...) generated by a
//! text model, one phase at a time.
//!
//! ## Features
//!
//! - **Fixed Hierarchy**: 35 document kinds in 9 ordered phases, each
//!   unlocking the next
//! - **Resilient Generation**: exponential backoff on rate limits, failover to
//!   a secondary provider, soft placeholders when quota runs out
//! - **Lifecycle Store**: per-document state machine with at most one
//!   generation in flight, observable through snapshots
//! - **Section Editing**: lossless heading-based split/join for targeted
//!   edits and AI refinement
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a project; the first two phases generate right away
//! planforge new "Shared grocery lists" --problem "Families buy duplicates"
//!
//! # Generate the next document
//! planforge advance <project> vision
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod ai;
pub mod core;
pub mod hierarchy;
pub mod workflow;

// Re-export commonly used types
pub use ai::{GenerationClient, GenerationError, GenerationOutcome, GenerationRequest, TextBackend};
pub use core::Config;
pub use hierarchy::{Category, DocumentKind, HierarchyNode};
pub use workflow::{
    Document, DocumentStatus, LifecycleStore, Orchestrator, Project, ProjectBrief, ProjectStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "planforge";
