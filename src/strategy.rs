//! Rename strategies and the commit path.
//!
//! A [`RenameStrategy`] decides whether it understands a particular file
//! rename (`can_handle`) and computes the resulting snapshot (`apply`).
//! [`select_strategy`] picks the first strategy in priority order whose
//! predicate matches; the simple strategy is the always-eligible fallback.
//! [`synchronize`] runs the selected strategy against the live workspace
//! and commits the result under the coordination context.
//!
//! Every "no match" rung — missing document, no declaration, unresolvable
//! symbol, declined confirmation — returns the best snapshot computed so
//! far without raising an error.

use crate::rename::rename_symbol;
use crate::settings::{
    KEY_PROMPT_FOR_RENAME, SECTION_ENVIRONMENT, SUBSECTION_PROJECTS, SettingsStore,
};
use crate::syntax::{self, Symbol};
use crate::ui::{Coordinator, UserInteraction};
use crate::workspace::{Document, Snapshot, Workspace, file_base_name};
use std::path::Path;
use std::sync::Arc;

/// Characters that qualify a file name as compound, e.g. `Foo.Bar.cs` or
/// `Foo+Bar.cs`.
const SEPARATORS: &[char] = &['.', '+'];

/// Upper bound on fixed-point passes per apply. Hitting it is reported on
/// the outcome instead of looping forever.
pub const MAX_RENAME_PASSES: usize = 32;

/// The collaborators a strategy needs: prompting, settings, and the
/// coordination context.
#[derive(Clone)]
pub struct RenameHost {
    pub ui: Arc<dyn UserInteraction>,
    pub settings: Arc<dyn SettingsStore>,
    pub coordinator: Arc<Coordinator>,
}

/// Result of one `apply` invocation.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// The last snapshot produced, or `None` if nothing was renamed.
    pub snapshot: Option<Snapshot>,
    /// Number of successful rename passes.
    pub passes: usize,
    /// True when the pass budget ran out before the loop converged.
    pub budget_exhausted: bool,
}

/// Result of [`synchronize`]: the computed outcome plus whether it landed
/// in the live workspace.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: ApplyOutcome,
    pub committed: bool,
}

/// Strategy contract for interpreting a file rename.
pub trait RenameStrategy: Send + Sync {
    /// Whether this strategy understands the rename from `old_path` to
    /// `new_path`.
    fn can_handle(&self, old_path: &Path, new_path: &Path) -> bool;

    /// Computes the renamed snapshot for the project identified by
    /// `project_path` inside `snapshot`.
    fn apply(
        &self,
        host: &RenameHost,
        snapshot: &Snapshot,
        project_path: &Path,
        old_path: &Path,
        new_path: &Path,
    ) -> ApplyOutcome;
}

/// Picks the first strategy, in fixed priority order, whose `can_handle`
/// returns true. The compound strategy outranks the simple one; the simple
/// strategy accepts everything.
pub fn select_strategy(old_path: &Path, new_path: &Path) -> &'static dyn RenameStrategy {
    static STRATEGIES: [&(dyn RenameStrategy); 2] =
        [&CompoundRenameStrategy, &SimpleRenameStrategy];
    STRATEGIES
        .iter()
        .copied()
        .find(|s| s.can_handle(old_path, new_path))
        .unwrap_or(&SimpleRenameStrategy)
}

/// Runs the selected strategy against the workspace's current snapshot and
/// commits the result. A rejected commit raises a user-visible failure
/// notification and is not retried.
pub fn synchronize(
    host: &RenameHost,
    workspace: &Workspace,
    project_path: &Path,
    old_path: &Path,
    new_path: &Path,
) -> SyncReport {
    let snapshot = workspace.current_snapshot();
    let strategy = select_strategy(old_path, new_path);
    let outcome = strategy.apply(host, &snapshot, project_path, old_path, new_path);

    let mut committed = false;
    if let Some(renamed) = &outcome.snapshot {
        let _guard = host.coordinator.enter();
        committed = workspace.try_apply(renamed.clone());
        if !committed {
            host.ui.notify_failure(&format!(
                "Renaming the declaration for '{}' failed: the workspace changed while the rename was being computed.",
                file_name(old_path)
            ));
        }
    }

    SyncReport { outcome, committed }
}

/// Per-apply confirmation cache: the user is asked at most once, and every
/// pass of the loop reuses the decision.
#[derive(Default)]
struct ConfirmationGate {
    decision: Option<bool>,
}

impl ConfirmationGate {
    fn confirm(&mut self, host: &RenameHost, old_path: &Path) -> bool {
        if let Some(decision) = self.decision {
            return decision;
        }
        let _guard = host.coordinator.enter();
        let prompt_required = host.settings.get_bool(
            SECTION_ENVIRONMENT,
            SUBSECTION_PROJECTS,
            KEY_PROMPT_FOR_RENAME,
            false,
        );
        let decision = if prompt_required {
            host.ui.confirm(&format!(
                "You renamed '{}'. Rename the matching declaration across the project?",
                file_name(old_path)
            ))
        } else {
            true
        };
        self.decision = Some(decision);
        decision
    }
}

/// The iterative resolve-confirm-apply fixed point shared by both
/// strategies. `locate` inspects the document at the new path and returns
/// the symbol to rename plus its new name, or `None` when the loop is done.
fn run_fixed_point<F>(
    host: &RenameHost,
    snapshot: &Snapshot,
    project_path: &Path,
    old_path: &Path,
    new_path: &Path,
    locate: F,
) -> ApplyOutcome
where
    F: Fn(&Path, &Document) -> Option<(Symbol, String)>,
{
    let mut gate = ConfirmationGate::default();
    let mut outcome = ApplyOutcome::default();
    let mut current = snapshot.clone();

    loop {
        if outcome.passes == MAX_RENAME_PASSES {
            tracing::warn!(
                passes = outcome.passes,
                old = %old_path.display(),
                new = %new_path.display(),
                "rename fixed point did not converge within the pass budget"
            );
            outcome.budget_exhausted = true;
            return outcome;
        }

        // Re-resolve by path identity: every pass may be looking at a new
        // snapshot.
        let Some(project) = current.project_by_path(project_path) else {
            return outcome;
        };
        let Some(document) = project.document_by_path(new_path) else {
            return outcome;
        };
        let Some((symbol, new_name)) = locate(project_path, document) else {
            return outcome;
        };
        if !gate.confirm(host, old_path) {
            return outcome;
        }

        let renamed = rename_symbol(&current, &symbol, &new_name);
        outcome.passes += 1;
        outcome.snapshot = Some(renamed.clone());
        current = renamed;
    }
}

/// Default strategy: the renamed file's base name is taken as-is. The first
/// declaration (document order) named after the old base name is renamed to
/// the current document's base name.
pub struct SimpleRenameStrategy;

impl RenameStrategy for SimpleRenameStrategy {
    fn can_handle(&self, _old_path: &Path, _new_path: &Path) -> bool {
        true
    }

    fn apply(
        &self,
        host: &RenameHost,
        snapshot: &Snapshot,
        project_path: &Path,
        old_path: &Path,
        new_path: &Path,
    ) -> ApplyOutcome {
        let old_base = file_base_name(old_path).to_string();

        run_fixed_point(host, snapshot, project_path, old_path, new_path, {
            move |project_path, document| {
                let declarations = syntax::parse_declarations(document.text());
                let declaration = syntax::find_declaration(&declarations, &old_base)?;
                let symbol =
                    syntax::resolve_symbol(project_path, document, &declarations, declaration)?;
                // New name comes from the document's current base name, not
                // the original request, to tolerate chained renames.
                let new_name = document.base_name().to_string();
                if symbol.name() == new_name {
                    return None;
                }
                Some((symbol, new_name))
            }
        })
    }
}

/// Strategy for compound file names: `Foo.Bar.cs` → `Foo.Baz.cs` renames
/// the nested declaration `Bar` inside `Foo` to `Baz`.
///
/// The old and new base names must share all segments but the last; any
/// other shape (including `Foo` → `Foo.Nested`, where no symbol changes
/// name) is an explicit no-op rather than a fall-through to the simple
/// strategy, which would wrongly rename the outer type.
pub struct CompoundRenameStrategy;

impl RenameStrategy for CompoundRenameStrategy {
    fn can_handle(&self, old_path: &Path, new_path: &Path) -> bool {
        let old_base = file_base_name(old_path);
        let new_base = file_base_name(new_path);
        SEPARATORS
            .iter()
            .any(|&c| old_base.contains(c) || new_base.contains(c))
    }

    fn apply(
        &self,
        host: &RenameHost,
        snapshot: &Snapshot,
        project_path: &Path,
        old_path: &Path,
        new_path: &Path,
    ) -> ApplyOutcome {
        let old_segments = split_segments(file_base_name(old_path));
        let new_segments = split_segments(file_base_name(new_path));

        let shared = old_segments
            .iter()
            .zip(&new_segments)
            .take_while(|(a, b)| a == b)
            .count();
        if old_segments.len() != shared + 1 || new_segments.len() != shared + 1 {
            tracing::debug!(
                old = %old_path.display(),
                new = %new_path.display(),
                "compound rename does not target a single trailing segment, skipping"
            );
            return ApplyOutcome::default();
        }

        let chain: Vec<String> = old_segments.iter().map(|s| s.to_string()).collect();

        run_fixed_point(host, snapshot, project_path, old_path, new_path, {
            move |project_path, document| {
                let segments: Vec<&str> = chain.iter().map(String::as_str).collect();
                let declarations = syntax::parse_declarations(document.text());
                let declaration = syntax::find_qualified(&declarations, &segments)?;
                let symbol =
                    syntax::resolve_symbol(project_path, document, &declarations, declaration)?;
                let new_name = split_segments(document.base_name())
                    .last()?
                    .to_string();
                if symbol.name() == new_name {
                    return None;
                }
                Some((symbol, new_name))
            }
        })
    }
}

fn split_segments(base: &str) -> Vec<&str> {
    base.split(SEPARATORS)
        .filter(|s| !s.is_empty())
        .collect()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::JsonSettings;
    use crate::ui::PresetUi;
    use crate::workspace::DocumentId;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::path::PathBuf;

    const PROJECT: &str = "/proj";

    fn setup(docs: &[(&str, &str)]) -> Arc<Workspace> {
        let workspace = Workspace::new();
        workspace.add_project(PROJECT);
        for (path, text) in docs {
            workspace
                .add_document(Path::new(PROJECT), PathBuf::from(path), *text)
                .unwrap();
        }
        workspace
    }

    fn host_with(prompt: bool, answer: bool) -> (RenameHost, Arc<PresetUi>) {
        let ui = Arc::new(PresetUi::new(answer));
        let settings: Arc<dyn SettingsStore> = if prompt {
            Arc::new(JsonSettings::from_value(json!({
                "environment": { "projects": { "prompt_for_rename": true } }
            })))
        } else {
            Arc::new(JsonSettings::empty())
        };
        let host = RenameHost {
            ui: ui.clone(),
            settings,
            coordinator: Arc::new(Coordinator::new()),
        };
        (host, ui)
    }

    fn document_text(workspace: &Workspace, path: &str) -> String {
        workspace
            .current_snapshot()
            .project_by_path(Path::new(PROJECT))
            .unwrap()
            .document_by_path(Path::new(path))
            .unwrap()
            .text()
            .to_string()
    }

    #[test]
    fn simple_rename_updates_declaration_and_references() {
        let workspace = setup(&[
            ("/proj/Bar.cs", "class Foo { Foo Clone() { return new Foo(); } }"),
            ("/proj/Program.cs", "class Program { Foo f; }"),
        ]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.committed);
        assert_eq!(report.outcome.passes, 1);
        assert!(!report.outcome.budget_exhausted);
        assert_eq!(
            document_text(&workspace, "/proj/Bar.cs"),
            "class Bar { Bar Clone() { return new Bar(); } }"
        );
        assert_eq!(
            document_text(&workspace, "/proj/Program.cs"),
            "class Program { Bar f; }"
        );
    }

    #[test]
    fn same_named_declarations_in_multiple_files_all_end_up_renamed() {
        let workspace = setup(&[
            ("/proj/Bar.cs", "partial class Foo { }"),
            ("/proj/FooPart.cs", "partial class Foo { void M() { Foo x; } }"),
        ]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.committed);
        let snapshot = workspace.current_snapshot();
        let project = snapshot.project_by_path(Path::new(PROJECT)).unwrap();
        for document in project.documents() {
            assert!(
                syntax::identifier_occurrences(document.text(), "Foo").is_empty(),
                "stale Foo identifier in {}",
                document.path().display()
            );
        }
        assert_eq!(
            document_text(&workspace, "/proj/FooPart.cs"),
            "partial class Bar { void M() { Bar x; } }"
        );
    }

    #[test]
    fn declined_confirmation_leaves_workspace_untouched() {
        let workspace = setup(&[
            ("/proj/Bar.cs", "class Foo { }"),
            ("/proj/Other.cs", "class Other { Foo f; }"),
        ]);
        let before = document_text(&workspace, "/proj/Other.cs");
        let (host, ui) = host_with(true, false);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.outcome.snapshot.is_none());
        assert!(!report.committed);
        assert_eq!(ui.confirmations(), 1);
        assert_eq!(document_text(&workspace, "/proj/Bar.cs"), "class Foo { }");
        assert_eq!(document_text(&workspace, "/proj/Other.cs"), before);
    }

    #[test]
    fn confirmation_is_asked_at_most_once_per_apply() {
        let workspace = setup(&[("/proj/Bar.cs", "class Foo { }")]);
        let (host, ui) = host_with(true, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.committed);
        assert_eq!(ui.confirmations(), 1);
    }

    #[test]
    fn disabled_prompt_grants_confirmation_implicitly() {
        let workspace = setup(&[("/proj/Bar.cs", "class Foo { }")]);
        let (host, ui) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.committed);
        assert_eq!(ui.confirmations(), 0);
        assert_eq!(document_text(&workspace, "/proj/Bar.cs"), "class Bar { }");
    }

    #[test]
    fn missing_document_yields_absent_outcome_without_error() {
        let workspace = setup(&[("/proj/Other.cs", "class Foo { }")]);
        let (host, ui) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.outcome.snapshot.is_none());
        assert!(!report.committed);
        assert!(ui.failures().is_empty());
    }

    #[test]
    fn missing_declaration_yields_absent_outcome() {
        let workspace = setup(&[("/proj/Bar.cs", "class Unrelated { }")]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.outcome.snapshot.is_none());
        assert_eq!(document_text(&workspace, "/proj/Bar.cs"), "class Unrelated { }");
    }

    #[test]
    fn unresolvable_project_yields_absent_outcome() {
        let workspace = setup(&[("/proj/Bar.cs", "class Foo { }")]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new("/missing"),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.outcome.snapshot.is_none());
    }

    #[test]
    fn rename_to_same_name_is_a_no_op() {
        let workspace = setup(&[("/proj/Foo.cs", "class Foo { }")]);
        let (host, _) = host_with(false, true);

        let outcome = SimpleRenameStrategy.apply(
            &host,
            &workspace.current_snapshot(),
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Foo.cs"),
        );

        assert!(outcome.snapshot.is_none());
        assert_eq!(outcome.passes, 0);
    }

    #[test]
    fn selection_prefers_compound_for_separator_names() {
        let selected = select_strategy(Path::new("Foo.cs"), Path::new("Foo.Nested.cs"));
        // Only the compound strategy rejects a separator-free pair.
        assert!(!selected.can_handle(Path::new("Foo.cs"), Path::new("Bar.cs")));

        let fallback = select_strategy(Path::new("Foo.cs"), Path::new("Bar.cs"));
        assert!(fallback.can_handle(Path::new("Foo.cs"), Path::new("Bar.cs")));
    }

    #[test]
    fn compound_can_handle_checks_both_base_names() {
        let strategy = CompoundRenameStrategy;
        assert!(strategy.can_handle(Path::new("Foo.Bar.cs"), Path::new("Qux.cs")));
        assert!(strategy.can_handle(Path::new("Foo.cs"), Path::new("Foo.Nested.cs")));
        assert!(strategy.can_handle(Path::new("Foo+Bar.cs"), Path::new("Foo+Baz.cs")));
        assert!(!strategy.can_handle(Path::new("Foo.cs"), Path::new("Bar.cs")));
    }

    #[test]
    fn compound_renames_nested_declaration() {
        let workspace = setup(&[(
            "/proj/Foo.Baz.cs",
            "class Foo { class Bar { Bar Next() { return null; } } }",
        )]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.Bar.cs"),
            Path::new("/proj/Foo.Baz.cs"),
        );

        assert!(report.committed);
        assert_eq!(
            document_text(&workspace, "/proj/Foo.Baz.cs"),
            "class Foo { class Baz { Baz Next() { return null; } } }"
        );
    }

    #[test]
    fn compound_targets_nested_type_not_the_outer_one() {
        // Foo.cs -> Foo.Nested.cs: the nested type is already named Nested,
        // so nothing changes name; in particular Foo must stay Foo.
        let workspace = setup(&[("/proj/Foo.Nested.cs", "class Foo { class Nested { } }")]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Foo.Nested.cs"),
        );

        assert!(report.outcome.snapshot.is_none());
        assert_eq!(
            document_text(&workspace, "/proj/Foo.Nested.cs"),
            "class Foo { class Nested { } }"
        );
    }

    #[test]
    fn compound_skips_when_chain_does_not_resolve() {
        let workspace = setup(&[("/proj/Foo.Baz.cs", "class Foo { } class Bar { }")]);
        let (host, _) = host_with(false, true);

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.Bar.cs"),
            Path::new("/proj/Foo.Baz.cs"),
        );

        // Bar exists only at the top level, not nested inside Foo.
        assert!(report.outcome.snapshot.is_none());
    }

    #[test]
    fn fixed_point_respects_the_pass_budget() {
        let workspace = setup(&[("/proj/Bar.cs", "class Foo { }")]);
        let (host, _) = host_with(false, true);
        let snapshot = workspace.current_snapshot();

        // A locator that never converges: it always reports work to do.
        let outcome = run_fixed_point(
            &host,
            &snapshot,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
            |project_path, document| {
                Some((
                    Symbol {
                        project: project_path.to_path_buf(),
                        document: document.id(),
                        qualified: vec!["Missing".to_string()],
                        kind: syntax::DeclarationKind::Class,
                    },
                    "Elsewhere".to_string(),
                ))
            },
        );

        assert!(outcome.budget_exhausted);
        assert_eq!(outcome.passes, MAX_RENAME_PASSES);
    }

    /// Confirms the prompt, but edits the workspace first so the computed
    /// snapshot is stale by the time it is committed.
    struct ConflictingUi {
        workspace: Arc<Workspace>,
        document: DocumentId,
        failures: Mutex<Vec<String>>,
    }

    impl UserInteraction for ConflictingUi {
        fn confirm(&self, _message: &str) -> bool {
            self.workspace.update_document(
                Path::new(PROJECT),
                self.document,
                "class Conflicting { }",
            );
            true
        }

        fn notify_failure(&self, message: &str) {
            self.failures.lock().push(message.to_string());
        }
    }

    #[test]
    fn rejected_commit_raises_a_failure_notification() {
        let workspace = setup(&[
            ("/proj/Bar.cs", "class Foo { }"),
            ("/proj/Other.cs", "class Other { }"),
        ]);
        let other = workspace
            .current_snapshot()
            .project_by_path(Path::new(PROJECT))
            .unwrap()
            .document_by_path(Path::new("/proj/Other.cs"))
            .unwrap()
            .id();
        let ui = Arc::new(ConflictingUi {
            workspace: workspace.clone(),
            document: other,
            failures: Mutex::new(Vec::new()),
        });
        let host = RenameHost {
            ui: ui.clone(),
            settings: Arc::new(JsonSettings::from_value(json!({
                "environment": { "projects": { "prompt_for_rename": true } }
            }))),
            coordinator: Arc::new(Coordinator::new()),
        };

        let report = synchronize(
            &host,
            &workspace,
            Path::new(PROJECT),
            Path::new("/proj/Foo.cs"),
            Path::new("/proj/Bar.cs"),
        );

        assert!(report.outcome.snapshot.is_some());
        assert!(!report.committed);
        assert_eq!(ui.failures.lock().len(), 1);
        // The live workspace kept the conflicting edit, not the rename.
        assert_eq!(document_text(&workspace, "/proj/Bar.cs"), "class Foo { }");
        assert_eq!(
            document_text(&workspace, "/proj/Other.cs"),
            "class Conflicting { }"
        );
    }
}
