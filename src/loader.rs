//! Disk to workspace loading and write-back.
//!
//! Recursively walks a project root to collect `.cs` files, skipping
//! entries whose names start with `.` or `_`, and loads them into a live
//! [`Workspace`] with the root as the project identity. After a rename has
//! been committed, [`diff_snapshots`] + [`write_diff`] persist the result:
//! changed and added documents are written, removed documents are deleted.

use crate::workspace::{Snapshot, Workspace};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Collects all `.cs` files under `root`, excluding hidden and
/// underscore-prefixed directories.
pub fn collect_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden_or_underscore(e))
    {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "cs") {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_hidden_or_underscore(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.') || s.starts_with('_'))
}

/// Loads every source file under `root` into a fresh workspace, with
/// `root` as the single project.
pub fn load_workspace(root: &Path) -> Result<Arc<Workspace>> {
    let workspace = Workspace::new();
    workspace.add_project(root.to_path_buf());

    for file in collect_source_files(root)? {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        workspace
            .add_document(root, file, text)
            .context("project disappeared while loading")?;
    }

    Ok(workspace)
}

/// Documents that differ between two snapshots of the same workspace.
#[derive(Debug, Default)]
pub struct WorkspaceDiff {
    /// Added or edited documents, with their final text.
    pub changed: Vec<(PathBuf, Arc<str>)>,
    /// Documents present in the base but gone from the current snapshot.
    pub removed: Vec<PathBuf>,
}

impl WorkspaceDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Compares `current` against `base` by document identity.
pub fn diff_snapshots(base: &Snapshot, current: &Snapshot) -> WorkspaceDiff {
    let mut diff = WorkspaceDiff::default();

    for project in current.projects() {
        let old_project = base.project_by_path(project.path());
        for document in project.documents() {
            match old_project.and_then(|p| p.document(document.id())) {
                Some(old) if old.text() == document.text() => {}
                _ => diff
                    .changed
                    .push((document.path().to_path_buf(), document.text().into())),
            }
        }
    }

    for project in base.projects() {
        let new_project = current.project_by_path(project.path());
        for document in project.documents() {
            let still_there = new_project.is_some_and(|p| p.document(document.id()).is_some());
            if !still_there {
                diff.removed.push(document.path().to_path_buf());
            }
        }
    }

    diff
}

/// Writes a diff to disk: changed documents are (over)written, removed
/// documents are deleted.
pub fn write_diff(diff: &WorkspaceDiff) -> Result<()> {
    for (path, text) in &diff.changed {
        std::fs::write(path, text.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    for path in &diff.removed {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
