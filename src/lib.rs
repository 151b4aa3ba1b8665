//! declsync library for synchronizing type declarations with renamed files.
//!
//! This library provides programmatic access to the rename synchronization
//! functionality. The core workflow involves three phases:
//!
//! 1. **Correlation**: Watch workspace change notifications and recognize
//!    the add/remove/change trio that constitutes a file rename
//! 2. **Strategy selection**: Pick the rename strategy matching the shape of
//!    the rename (simple base name swap, or dotted compound rename)
//! 3. **Application**: Resolve the declaration, confirm with the user, run
//!    the rename to a fixed point, and commit the new snapshot
//!
//! # Example
//!
//! ```no_run
//! use declsync::correlator::{Correlator, RenameRequest};
//! use declsync::loader;
//! use declsync::settings::JsonSettings;
//! use declsync::strategy::RenameHost;
//! use declsync::ui::{Coordinator, PresetUi};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let root = PathBuf::from("./project");
//! let workspace = loader::load_workspace(&root).unwrap();
//!
//! let host = RenameHost {
//!     ui: Arc::new(PresetUi::new(true)),
//!     settings: Arc::new(JsonSettings::empty()),
//!     coordinator: Arc::new(Coordinator::new()),
//! };
//! let correlator = Correlator::arm(
//!     &workspace,
//!     RenameRequest {
//!         project: root.clone(),
//!         old_path: root.join("Foo.cs"),
//!         new_path: root.join("Bar.cs"),
//!     },
//!     host,
//! );
//!
//! // Feed the rename through the workspace; the correlator dispatches the
//! // strategy once it has seen the full add/remove/change trio.
//! let snapshot = workspace.current_snapshot();
//! let project = snapshot.project_by_path(&root).unwrap();
//! let old = project.document_by_path(&root.join("Foo.cs")).unwrap().clone();
//! workspace.remove_document(&root, old.id());
//! let id = workspace
//!     .add_document(&root, root.join("Bar.cs"), old.text().to_string())
//!     .unwrap();
//! workspace.update_document(&root, id, old.text().to_string());
//!
//! if let Some(report) = correlator.report() {
//!     println!("committed after {} passes: {}", report.outcome.passes, report.committed);
//! }
//! ```

pub mod cli;
pub mod correlator;
pub mod loader;
pub mod rename;
pub mod settings;
pub mod strategy;
pub mod syntax;
pub mod ui;
pub mod workspace;

// Re-export commonly used types at crate root
pub use correlator::{Correlator, RenameRequest};
pub use strategy::{ApplyOutcome, RenameHost, RenameStrategy, SyncReport};
pub use syntax::{Declaration, DeclarationKind, Symbol};
pub use workspace::{ChangeEvent, ChangeListener, Document, DocumentId, Snapshot, Workspace};
