//! Project snapshot persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::documents::Project;

/// Storage for whole-project snapshots.
///
/// Implementations only need snapshots to round-trip losslessly.
pub trait ProjectRepository: Send + Sync {
    /// Insert or overwrite the snapshot of `project`.
    fn save_project_snapshot(&self, project: &Project) -> anyhow::Result<()>;

    /// Every stored project, oldest first.
    fn load_all_projects(&self) -> anyhow::Result<Vec<Project>>;

    /// One project by id.
    fn load_project(&self, id: &str) -> anyhow::Result<Option<Project>>;

    /// Remove a project with all its documents. Returns whether it existed.
    fn delete_project(&self, id: &str) -> anyhow::Result<bool>;
}

/// One pretty-printed JSON file per project.
#[derive(Debug, Clone)]
pub struct JsonProjectRepository {
    dir: PathBuf,
}

impl JsonProjectRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read(path: &Path) -> anyhow::Result<Project> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl ProjectRepository for JsonProjectRepository {
    fn save_project_snapshot(&self, project: &Project) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let content = serde_json::to_string_pretty(project)?;
        let path = self.path_for(&project.id);
        let tmp = path.with_extension("json.tmp");

        // Readers never observe a partially written snapshot
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(project = %project.id, path = %path.display(), "Saved project snapshot");
        Ok(())
    }

    fn load_all_projects(&self) -> anyhow::Result<Vec<Project>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(project) => projects.push(project),
                Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable project"),
            }
        }

        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    fn load_project(&self, id: &str) -> anyhow::Result<Option<Project>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn delete_project(&self, id: &str) -> anyhow::Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(true)
    }
}

/// Volatile repository for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryProjectRepository {
    projects: Mutex<BTreeMap<String, Project>>,
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectRepository for MemoryProjectRepository {
    fn save_project_snapshot(&self, project: &Project) -> anyhow::Result<()> {
        self.projects.lock().insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn load_all_projects(&self) -> anyhow::Result<Vec<Project>> {
        let mut projects: Vec<_> = self.projects.lock().values().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    fn load_project(&self, id: &str) -> anyhow::Result<Option<Project>> {
        Ok(self.projects.lock().get(id).cloned())
    }

    fn delete_project(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.projects.lock().remove(id).is_some())
    }
}

/// Save every snapshot published on `snapshots` until the store goes away.
///
/// Save errors are logged and do not stop the loop.
pub async fn persist_snapshots(
    mut snapshots: watch::Receiver<Project>,
    repo: Arc<dyn ProjectRepository>,
) {
    while snapshots.changed().await.is_ok() {
        let project = snapshots.borrow_and_update().clone();
        if let Err(err) = repo.save_project_snapshot(&project) {
            warn!(project = %project.id, error = %err, "Failed to save project snapshot");
        }
    }
}

/// Find a project by full id or unique id prefix.
pub fn find_project(repo: &dyn ProjectRepository, id_or_prefix: &str) -> anyhow::Result<Project> {
    if let Some(project) = repo.load_project(id_or_prefix)? {
        return Ok(project);
    }

    let mut matches: Vec<Project> = repo
        .load_all_projects()?
        .into_iter()
        .filter(|project| project.id.starts_with(id_or_prefix))
        .collect();

    match matches.len() {
        0 => anyhow::bail!("No project matches '{id_or_prefix}'"),
        1 => Ok(matches.remove(0)),
        n => anyhow::bail!("'{id_or_prefix}' is ambiguous ({n} projects match)"),
    }
}
