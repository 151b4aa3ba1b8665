//! Workspace change correlation.
//!
//! A file rename in the editing host shows up on the notification stream as
//! three separate events: the new document is added, the old document is
//! removed, and at least one content change fires for the owning project.
//! The [`Correlator`] is a single-shot state machine bound to one
//! [`RenameRequest`]: it records the three conditions as they arrive (in
//! any order, possibly from different producer threads), and once all three
//! hold it detaches from the stream, re-resolves the owning project against
//! the *current* snapshot, and runs the selected rename strategy.
//!
//! Dispatch is claimed with a single atomic transition on a bitset, so a
//! second qualifying event racing with the first can never double-dispatch.

use crate::strategy::{self, RenameHost, SyncReport};
use crate::workspace::{ChangeEvent, ChangeListener, DocumentId, Subscription, Workspace};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const ADDED: u8 = 1;
const REMOVED: u8 = 1 << 1;
const CHANGED: u8 = 1 << 2;
const DISPATCHED: u8 = 1 << 3;
const TRIO: u8 = ADDED | REMOVED | CHANGED;

/// One observed file rename: old path, new path, and the owning project's
/// path identity. Consumed by exactly one correlator.
#[derive(Debug, Clone)]
pub struct RenameRequest {
    pub project: PathBuf,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// Single-shot correlator for one rename request.
pub struct Correlator {
    request: RenameRequest,
    /// Identity of the old document, resolved once at bind time by path
    /// lookup in the original project.
    old_document: Option<DocumentId>,
    workspace: Arc<Workspace>,
    host: RenameHost,
    state: AtomicU8,
    subscription: Mutex<Option<Subscription>>,
    report: Mutex<Option<SyncReport>>,
}

impl Correlator {
    /// Binds a correlator to `request` and starts listening on the
    /// workspace's notification stream.
    pub fn arm(
        workspace: &Arc<Workspace>,
        request: RenameRequest,
        host: RenameHost,
    ) -> Arc<Correlator> {
        let old_document = workspace
            .current_snapshot()
            .project_by_path(&request.project)
            .and_then(|p| p.document_by_path(&request.old_path))
            .map(|d| d.id());

        let correlator = Arc::new(Correlator {
            request,
            old_document,
            workspace: Arc::clone(workspace),
            host,
            state: AtomicU8::new(0),
            subscription: Mutex::new(None),
            report: Mutex::new(None),
        });

        let subscription = workspace.subscribe(correlator.clone());
        *correlator.subscription.lock() = Some(subscription);
        // The trio may already have completed between subscribing and
        // storing the handle; make sure a finished correlator holds no
        // subscription.
        if correlator.is_dispatched() {
            correlator.subscription.lock().take();
        }

        correlator
    }

    pub fn request(&self) -> &RenameRequest {
        &self.request
    }

    /// Whether the correlator has fired (or been abandoned).
    pub fn is_dispatched(&self) -> bool {
        self.state.load(Ordering::Acquire) & DISPATCHED != 0
    }

    /// The strategy report from dispatch, if dispatch ran.
    pub fn report(&self) -> Option<SyncReport> {
        self.report.lock().clone()
    }

    /// Stops listening and blocks any future dispatch. Idempotent; a no-op
    /// if dispatch already happened. The owner calls this when the rename
    /// can no longer complete (e.g. workspace teardown).
    pub fn abandon(&self) {
        self.state.fetch_or(DISPATCHED, Ordering::AcqRel);
        self.subscription.lock().take();
    }

    fn observe(&self, bit: u8) {
        let seen = self.state.fetch_or(bit, Ordering::AcqRel) | bit;
        if seen & DISPATCHED != 0 || seen & TRIO != TRIO {
            return;
        }
        // Claim the dispatch; exactly one caller wins this transition.
        let prev = self.state.fetch_or(DISPATCHED, Ordering::AcqRel);
        if prev & DISPATCHED != 0 {
            return;
        }
        self.dispatch();
    }

    fn dispatch(&self) {
        // Detach before running the strategy so late events cannot re-enter.
        self.subscription.lock().take();

        let snapshot = self.workspace.current_snapshot();
        if snapshot.project_by_path(&self.request.project).is_none() {
            // The project disappeared while the rename settled; a normal
            // abort, not an error.
            tracing::debug!(
                project = %self.request.project.display(),
                "owning project no longer resolves, skipping rename"
            );
            return;
        }

        let report = strategy::synchronize(
            &self.host,
            &self.workspace,
            &self.request.project,
            &self.request.old_path,
            &self.request.new_path,
        );
        tracing::debug!(
            old = %self.request.old_path.display(),
            new = %self.request.new_path.display(),
            passes = report.outcome.passes,
            committed = report.committed,
            "rename dispatch finished"
        );
        *self.report.lock() = Some(report);
    }
}

impl ChangeListener for Correlator {
    fn on_change(&self, event: &ChangeEvent) {
        match event {
            ChangeEvent::DocumentAdded { project, path, .. }
                if *project == self.request.project && *path == self.request.new_path =>
            {
                self.observe(ADDED);
            }
            ChangeEvent::DocumentRemoved { project, document }
                if *project == self.request.project
                    && Some(*document) == self.old_document =>
            {
                self.observe(REMOVED);
            }
            ChangeEvent::DocumentChanged { project, .. } if *project == self.request.project => {
                // Intentionally coarse: any content change in the owning
                // project counts.
                self.observe(CHANGED);
            }
            _ => {}
        }
    }
}
