//! User-facing prompts, failure notifications, and the coordination context.
//!
//! Confirmation prompts and workspace commits must not overlap with other
//! user-facing work, so both run under the [`Coordinator`]'s exclusive
//! guard. Pure computation (parsing, rename computation) stays outside it.

use colored::Colorize;
use dialoguer::Confirm;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Confirmation and failure-notification surface.
pub trait UserInteraction: Send + Sync {
    /// Asks the user a yes/no question. Must be called under the
    /// coordinator's guard.
    fn confirm(&self, message: &str) -> bool;

    /// Surfaces a failure the user has to know about. Must be called under
    /// the coordinator's guard.
    fn notify_failure(&self, message: &str);
}

/// Interactive console implementation.
pub struct ConsoleUi;

impl UserInteraction for ConsoleUi {
    fn confirm(&self, message: &str) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(true)
            .interact()
            .unwrap_or(false)
    }

    fn notify_failure(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
}

/// Non-interactive implementation with a fixed answer. Records what it was
/// asked so callers (and tests) can inspect the interaction afterwards.
pub struct PresetUi {
    answer: bool,
    confirmations: AtomicUsize,
    failures: Mutex<Vec<String>>,
}

impl PresetUi {
    pub fn new(answer: bool) -> PresetUi {
        PresetUi {
            answer,
            confirmations: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Number of times `confirm` was called.
    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl UserInteraction for PresetUi {
    fn confirm(&self, _message: &str) -> bool {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
        self.answer
    }

    fn notify_failure(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }
}

/// Exclusive-affinity context for user-facing work, the single-threaded
/// "UI thread" of a full editor host reduced to a scoped lock. Reentrant,
/// so a prompt issued while the commit scope is held cannot self-deadlock.
pub struct Coordinator {
    lock: ReentrantMutex<()>,
}

impl Coordinator {
    pub fn new() -> Coordinator {
        Coordinator {
            lock: ReentrantMutex::new(()),
        }
    }

    /// Acquires the context for the lifetime of the returned guard.
    pub fn enter(&self) -> CoordinationGuard<'_> {
        CoordinationGuard {
            _guard: self.lock.lock(),
        }
    }
}

impl Default for Coordinator {
    fn default() -> Coordinator {
        Coordinator::new()
    }
}

/// Proof of holding the coordination context.
pub struct CoordinationGuard<'a> {
    _guard: ReentrantMutexGuard<'a, ()>,
}
