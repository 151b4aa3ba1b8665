//! Project-wide symbol rename.
//!
//! Pure computation: takes a snapshot and a resolved [`Symbol`], returns a
//! new snapshot in which every identifier occurrence of the symbol's name
//! in the owning project is replaced. The input snapshot is untouched and
//! the result keeps its base version, so the caller can commit it through
//! [`crate::workspace::Workspace::try_apply`]. Replacement spans are sorted
//! by start offset and applied in reverse to preserve offset validity.

use crate::syntax::{Symbol, identifier_occurrences};
use crate::workspace::Snapshot;

/// A single text replacement with position information.
#[derive(Debug, Clone)]
struct Replacement {
    start: usize,
    end: usize,
}

/// Renames `symbol` to `new_name` across its owning project.
///
/// The reference analyzer binds identifiers by name within a project, so
/// every whole-identifier occurrence of the symbol's simple name is an
/// occurrence of the symbol. Comments and string literals are left alone.
pub fn rename_symbol(snapshot: &Snapshot, symbol: &Symbol, new_name: &str) -> Snapshot {
    let mut next = snapshot.clone();
    let Some(project) = next.project_by_path_mut(&symbol.project) else {
        return next;
    };

    for document in &mut project.documents {
        let occurrences = identifier_occurrences(&document.text, symbol.name());
        if occurrences.is_empty() {
            continue;
        }
        document.text = replace_spans(&document.text, &occurrences, new_name).into();
    }

    next
}

/// Applies `new_text` over each span, back to front.
fn replace_spans(content: &str, spans: &[(usize, usize)], new_text: &str) -> String {
    let mut replacements: Vec<Replacement> = spans
        .iter()
        .map(|&(start, end)| Replacement { start, end })
        .collect();

    // Sort by start offset descending so we can apply from end to start.
    replacements.sort_by(|a, b| b.start.cmp(&a.start));

    let mut result = content.to_string();
    for rep in replacements {
        if rep.start <= rep.end && rep.end <= result.len() {
            result.replace_range(rep.start..rep.end, new_text);
        }
    }

    result
}
