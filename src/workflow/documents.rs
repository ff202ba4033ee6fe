//! Project and document records.
//!
//! These are plain data. Every mutation after creation goes through
//! [`LifecycleStore`](super::LifecycleStore).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::PLACEHOLDER_MARKER;
use crate::hierarchy::{lookup, DocumentKind};

/// What the user wants to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectBrief {
    /// Product concept
    pub concept: String,

    /// Problem being solved
    pub problem: String,

    /// Target audience
    pub audience: String,

    /// Key features
    pub features: String,

    /// Technology preferences
    pub tech_preferences: String,

    pub budget: String,
    pub timeline: String,
}

impl ProjectBrief {
    /// Create a brief from the two required fields.
    pub fn new(concept: impl Into<String>, problem: impl Into<String>) -> Self {
        Self { concept: concept.into(), problem: problem.into(), ..Default::default() }
    }

    /// Short display name derived from the concept.
    pub fn name(&self) -> &str {
        self.concept.lines().next().unwrap_or_default().trim()
    }
}

/// Lifecycle state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Not generated yet
    Pending,
    /// A generation is in flight
    Generating,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Icon for terminal output.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "○",
            Self::Generating => "◐",
            Self::Completed => "●",
            Self::Failed => "✗",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase label of a document nobody has started.
pub const PENDING_PHASE: &str = "Waiting";

/// One planning document inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// `"{project_id}:{kind}"`
    pub id: String,
    pub kind: DocumentKind,
    pub title: String,

    /// Markdown, possibly empty
    pub content: String,
    pub status: DocumentStatus,

    /// 0 to 100
    pub progress: u8,

    /// Human-readable sub-status
    pub phase: String,

    /// Reason of the last failed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Document {
    /// Create an empty pending document for `kind`.
    pub fn pending(project_id: &str, kind: DocumentKind, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::id_for(project_id, kind),
            kind,
            title: lookup(kind).title.to_string(),
            content: String::new(),
            status: DocumentStatus::Pending,
            progress: 0,
            phase: PENDING_PHASE.to_string(),
            error: None,
            created_at: now,
            last_updated: now,
        }
    }

    /// Stable document id within a project.
    pub fn id_for(project_id: &str, kind: DocumentKind) -> String {
        format!("{project_id}:{kind}")
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Whether the content is a soft-degraded placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.content.starts_with(PLACEHOLDER_MARKER)
    }
}

/// Overall project state, derived from its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    New,
    InProgress,
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A brief plus one document per hierarchy kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    /// Stable identity of the owning user
    pub owner: String,
    pub brief: ProjectBrief,
    pub status: ProjectStatus,

    /// One entry per kind, in hierarchy order
    pub documents: Vec<Document>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a project with a fresh id and no documents yet.
    pub fn new(owner: impl Into<String>, brief: ProjectBrief) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            brief,
            status: ProjectStatus::New,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        self.brief.name()
    }

    /// Document of `kind`, if the project has been initialized.
    pub fn document(&self, kind: DocumentKind) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.kind == kind)
    }

    pub(crate) fn document_mut(&mut self, kind: DocumentKind) -> Option<&mut Document> {
        self.documents.iter_mut().find(|doc| doc.kind == kind)
    }

    /// Document with the given id.
    pub fn document_by_id(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    /// Number of documents in `status`.
    pub fn count(&self, status: DocumentStatus) -> usize {
        self.documents.iter().filter(|doc| doc.status == status).count()
    }

    /// Status implied by the documents.
    pub fn derive_status(&self) -> ProjectStatus {
        if self.documents.is_empty() || self.count(DocumentStatus::Pending) == self.documents.len() {
            ProjectStatus::New
        } else if self.count(DocumentStatus::Completed) == self.documents.len() {
            ProjectStatus::Completed
        } else {
            ProjectStatus::InProgress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with(statuses: &[DocumentStatus]) -> Project {
        let mut project = Project::new("owner", ProjectBrief::new("X", "Y"));
        let now = Utc::now();
        for (kind, status) in DocumentKind::ALL.iter().zip(statuses) {
            let mut doc = Document::pending(&project.id, *kind, now);
            doc.status = *status;
            project.documents.push(doc);
        }
        project
    }

    #[test]
    fn test_document_id_and_title() {
        let doc = Document::pending("p1", DocumentKind::DbSchema, Utc::now());
        assert_eq!(doc.id, "p1:db-schema");
        assert_eq!(doc.title, "Database Schema");
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(!doc.has_content());
    }

    #[test]
    fn test_project_status_derivation() {
        use DocumentStatus::*;

        assert_eq!(project_with(&[]).derive_status(), ProjectStatus::New);
        assert_eq!(project_with(&[Pending, Pending]).derive_status(), ProjectStatus::New);
        assert_eq!(project_with(&[Completed, Pending]).derive_status(), ProjectStatus::InProgress);
        assert_eq!(project_with(&[Failed, Failed]).derive_status(), ProjectStatus::InProgress);
        assert_eq!(project_with(&[Completed, Completed]).derive_status(), ProjectStatus::Completed);
    }

    #[test]
    fn test_brief_name_uses_first_line() {
        let brief = ProjectBrief::new("  Meal planner\nwith sharing", "waste");
        assert_eq!(brief.name(), "Meal planner");
    }

    #[test]
    fn test_project_serde_round_trip() {
        let project = project_with(&[DocumentStatus::Completed]);
        let json = serde_json::to_string(&project).unwrap();
        assert!(json.contains("\"status\":\"completed\""));
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
    }
}
