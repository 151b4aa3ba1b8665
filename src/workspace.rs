//! Workspace snapshot model and live host.
//!
//! A [`Snapshot`] is an immutable value describing every project and document
//! at a point in time; edits never mutate a snapshot in place. The live
//! [`Workspace`] owns the current snapshot behind a lock, hands out clones,
//! and accepts derived snapshots back through a versioned compare-and-swap
//! ([`Workspace::try_apply`]). Every mutation notifies registered
//! [`ChangeListener`]s with a [`ChangeEvent`].
//!
//! Projects are identified by their root path; documents carry a stable
//! [`DocumentId`] assigned by the workspace so identity survives renames.

use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Stable identity of a document within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> DocumentId {
        DocumentId(raw)
    }
}

/// A single source file inside a project.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) path: PathBuf,
    pub(crate) text: Arc<str>,
}

impl Document {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File name without the trailing extension, e.g. `Foo.Nested` for
    /// `src/Foo.Nested.cs`.
    pub fn base_name(&self) -> &str {
        file_base_name(&self.path)
    }
}

/// Returns the file name of `path` without its final extension.
pub fn file_base_name(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
}

/// A project: a root path (its identity) plus its documents.
#[derive(Debug, Clone)]
pub struct Project {
    pub(crate) path: PathBuf,
    pub(crate) documents: Vec<Document>,
}

impl Project {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn document_by_path(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }
}

/// Immutable whole-workspace value.
///
/// Carries the workspace version it was read at; a derived snapshot keeps
/// its base version so [`Workspace::try_apply`] can detect staleness.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) version: u64,
    pub(crate) projects: Vec<Project>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Resolves a project by its path identity.
    pub fn project_by_path(&self, path: &Path) -> Option<&Project> {
        self.projects.iter().find(|p| p.path == path)
    }

    pub(crate) fn project_by_path_mut(&mut self, path: &Path) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.path == path)
    }
}

/// A mutation notification emitted by the workspace.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    DocumentAdded {
        project: PathBuf,
        document: DocumentId,
        path: PathBuf,
    },
    DocumentRemoved {
        project: PathBuf,
        document: DocumentId,
    },
    DocumentChanged {
        project: PathBuf,
        document: DocumentId,
    },
    ProjectAdded {
        project: PathBuf,
    },
    ProjectRemoved {
        project: PathBuf,
    },
}

/// Receives workspace mutation notifications.
///
/// Listeners may be invoked from whichever thread performed the mutation;
/// implementations must be prepared for concurrent calls.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// RAII handle for a listener registration. Dropping it detaches the
/// listener, so a subscription always has exactly one owner responsible
/// for cleanup.
pub struct Subscription {
    workspace: Weak<Workspace>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(workspace) = self.workspace.upgrade() {
            workspace.unsubscribe(self.id);
        }
    }
}

/// The live workspace host: current snapshot, document id allocation, and
/// the listener registry.
pub struct Workspace {
    state: RwLock<Snapshot>,
    listeners: Mutex<Vec<(u64, Arc<dyn ChangeListener>)>>,
    next_listener: AtomicU64,
    next_document: AtomicU64,
}

impl Workspace {
    pub fn new() -> Arc<Workspace> {
        Arc::new(Workspace {
            state: RwLock::new(Snapshot {
                version: 0,
                projects: Vec::new(),
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            next_document: AtomicU64::new(0),
        })
    }

    /// Clones the current snapshot.
    pub fn current_snapshot(&self) -> Snapshot {
        self.state.read().clone()
    }

    /// Registers a listener. The returned handle detaches it when dropped.
    pub fn subscribe(self: &Arc<Self>, listener: Arc<dyn ChangeListener>) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        Subscription {
            workspace: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(i, _)| *i != id);
    }

    /// Detaches every listener. Used on host teardown.
    pub fn clear_listeners(&self) {
        self.listeners.lock().clear();
    }

    pub fn add_project(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        {
            let mut state = self.state.write();
            if state.project_by_path(&path).is_some() {
                return;
            }
            state.version += 1;
            state.projects.push(Project {
                path: path.clone(),
                documents: Vec::new(),
            });
        }
        self.notify(&[ChangeEvent::ProjectAdded { project: path }]);
    }

    pub fn remove_project(&self, path: &Path) {
        let removed = {
            let mut state = self.state.write();
            let before = state.projects.len();
            state.projects.retain(|p| p.path != path);
            if state.projects.len() == before {
                false
            } else {
                state.version += 1;
                true
            }
        };
        if removed {
            self.notify(&[ChangeEvent::ProjectRemoved {
                project: path.to_path_buf(),
            }]);
        }
    }

    /// Adds a document to the project at `project`. Returns `None` if no
    /// such project exists.
    pub fn add_document(
        &self,
        project: &Path,
        path: impl Into<PathBuf>,
        text: impl Into<Arc<str>>,
    ) -> Option<DocumentId> {
        let path = path.into();
        let id = DocumentId(self.next_document.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.state.write();
            let target = state.project_by_path_mut(project)?;
            target.documents.push(Document {
                id,
                path: path.clone(),
                text: text.into(),
            });
            state.version += 1;
        }
        self.notify(&[ChangeEvent::DocumentAdded {
            project: project.to_path_buf(),
            document: id,
            path,
        }]);
        Some(id)
    }

    pub fn remove_document(&self, project: &Path, id: DocumentId) {
        let removed = {
            let mut state = self.state.write();
            let Some(target) = state.project_by_path_mut(project) else {
                return;
            };
            let before = target.documents.len();
            target.documents.retain(|d| d.id != id);
            if target.documents.len() == before {
                false
            } else {
                state.version += 1;
                true
            }
        };
        if removed {
            self.notify(&[ChangeEvent::DocumentRemoved {
                project: project.to_path_buf(),
                document: id,
            }]);
        }
    }

    /// Replaces a document's text. Always fires `DocumentChanged`, matching
    /// hosts that notify on save even when the content is unchanged.
    pub fn update_document(&self, project: &Path, id: DocumentId, text: impl Into<Arc<str>>) {
        let found = {
            let mut state = self.state.write();
            let Some(target) = state.project_by_path_mut(project) else {
                return;
            };
            match target.documents.iter_mut().find(|d| d.id == id) {
                Some(document) => {
                    document.text = text.into();
                    state.version += 1;
                    true
                }
                None => false,
            }
        };
        if found {
            self.notify(&[ChangeEvent::DocumentChanged {
                project: project.to_path_buf(),
                document: id,
            }]);
        }
    }

    /// Commits a derived snapshot if the workspace has not moved on since
    /// the snapshot's base version. Returns `false` on a stale base; the
    /// caller decides whether that is worth reporting.
    ///
    /// Derived snapshots only ever carry text edits, so the emitted events
    /// are `DocumentChanged` for every document whose text differs.
    pub fn try_apply(&self, snapshot: Snapshot) -> bool {
        let mut events = Vec::new();
        {
            let mut state = self.state.write();
            if snapshot.version != state.version {
                tracing::debug!(
                    base = snapshot.version,
                    current = state.version,
                    "rejecting stale snapshot"
                );
                return false;
            }
            for project in &snapshot.projects {
                let Some(old_project) = state.project_by_path(&project.path) else {
                    continue;
                };
                for document in &project.documents {
                    let changed = old_project
                        .document(document.id)
                        .is_some_and(|old| old.text != document.text);
                    if changed {
                        events.push(ChangeEvent::DocumentChanged {
                            project: project.path.clone(),
                            document: document.id,
                        });
                    }
                }
            }
            let mut next = snapshot;
            next.version = state.version + 1;
            *state = next;
        }
        self.notify(&events);
        true
    }

    fn notify(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        // Snapshot the listener list so handlers can subscribe/unsubscribe
        // (or mutate the workspace) without deadlocking.
        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for event in events {
            for listener in &listeners {
                listener.on_change(event);
            }
        }
    }
}
