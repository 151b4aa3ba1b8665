//! declsync: keep type declaration names in sync with renamed source files.
//!
//! Given a file rename inside a project, this tool replays the rename
//! through an in-memory workspace, lets the change correlator dispatch the
//! matching rename strategy, and reports (or persists, with `--write`) the
//! resulting project-wide symbol rename.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use declsync::cli::{Args, Commands};
use declsync::correlator::{Correlator, RenameRequest};
use declsync::loader;
use declsync::settings::{JsonSettings, SettingsStore};
use declsync::strategy::RenameHost;
use declsync::syntax::{self, Declaration};
use declsync::ui::{ConsoleUi, Coordinator, PresetUi, UserInteraction};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Sync {
            old,
            new,
            project,
            write,
            yes,
            settings,
            json,
            verbose,
        } => {
            init_tracing(verbose);
            cmd_sync(old, new, project, write, yes, settings, json, verbose)
        }
        Commands::Scan { project, json } => {
            init_tracing(false);
            cmd_scan(project, json)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Outcome of a sync run.
#[derive(Debug, Serialize)]
struct SyncSummary {
    old_file: PathBuf,
    new_file: PathBuf,
    passes: usize,
    committed: bool,
    budget_exhausted: bool,
    changed_files: Vec<PathBuf>,
    removed_files: Vec<PathBuf>,
    written: bool,
}

#[allow(clippy::too_many_arguments)]
fn cmd_sync(
    old: PathBuf,
    new: PathBuf,
    project: PathBuf,
    write: bool,
    yes: bool,
    settings_path: Option<PathBuf>,
    json_output: bool,
    verbose: bool,
) -> Result<()> {
    let old_path = resolve(&project, old);
    let new_path = resolve(&project, new);

    let workspace = loader::load_workspace(&project)?;
    let base = workspace.current_snapshot();
    let document_count = base
        .project_by_path(&project)
        .map(|p| p.documents().count())
        .unwrap_or(0);
    if verbose {
        eprintln!(
            "{} Loaded {} source files from {}",
            "info:".blue().bold(),
            document_count,
            project.display()
        );
    }

    let old_document = base
        .project_by_path(&project)
        .and_then(|p| p.document_by_path(&old_path))
        .cloned()
        .with_context(|| format!("{} is not part of the project", old_path.display()))?;

    let ui: Arc<dyn UserInteraction> = if yes {
        Arc::new(PresetUi::new(true))
    } else {
        Arc::new(ConsoleUi)
    };
    let settings: Arc<dyn SettingsStore> = match &settings_path {
        Some(path) => Arc::new(JsonSettings::load(path)?),
        // Interactive runs prompt by default; --yes answers implicitly.
        None => Arc::new(JsonSettings::from_value(serde_json::json!({
            "environment": { "projects": { "prompt_for_rename": !yes } }
        }))),
    };
    let host = RenameHost {
        ui,
        settings,
        coordinator: Arc::new(Coordinator::new()),
    };

    let correlator = Correlator::arm(
        &workspace,
        RenameRequest {
            project: project.clone(),
            old_path: old_path.clone(),
            new_path: new_path.clone(),
        },
        host,
    );

    // Replay the rename the way an editing host would: remove the old
    // document, add the new one, then save it. The correlator observes
    // these events and dispatches the strategy.
    workspace.remove_document(&project, old_document.id());
    let new_id = workspace
        .add_document(&project, new_path.clone(), old_document.text().to_string())
        .context("project disappeared during rename")?;
    workspace.update_document(&project, new_id, old_document.text().to_string());

    // The simulated rename is complete; nothing further can arrive.
    correlator.abandon();

    let report = correlator.report();
    let current = workspace.current_snapshot();
    let diff = loader::diff_snapshots(&base, &current);

    if write {
        loader::write_diff(&diff)?;
    }

    let summary = SyncSummary {
        old_file: old_path,
        new_file: new_path,
        passes: report.as_ref().map_or(0, |r| r.outcome.passes),
        committed: report.as_ref().is_some_and(|r| r.committed),
        budget_exhausted: report.as_ref().is_some_and(|r| r.outcome.budget_exhausted),
        changed_files: diff.changed.iter().map(|(p, _)| p.clone()).collect(),
        removed_files: diff.removed.clone(),
        written: write,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_sync_summary(&summary);
    }

    Ok(())
}

fn print_sync_summary(summary: &SyncSummary) {
    if summary.passes == 0 {
        println!(
            "{} No declaration matched {}; only the file itself moves",
            "info:".blue().bold(),
            summary.old_file.display()
        );
    } else {
        println!(
            "{} Renamed the declaration for {} -> {}",
            "ok:".green().bold(),
            summary.old_file.display(),
            summary.new_file.display()
        );
    }
    if summary.budget_exhausted {
        println!(
            "{} Rename did not converge within the pass budget",
            "warn:".yellow().bold()
        );
    }

    let update = if summary.written {
        "Updated:"
    } else {
        "Would update:"
    };
    for path in &summary.changed_files {
        println!("  {} {}", update.yellow().bold(), path.display());
    }
    let remove = if summary.written {
        "Removed:"
    } else {
        "Would remove:"
    };
    for path in &summary.removed_files {
        println!("  {} {}", remove.yellow().bold(), path.display());
    }

    if !summary.written && !(summary.changed_files.is_empty() && summary.removed_files.is_empty()) {
        println!("\n{} Use --write to apply changes", "hint:".cyan().bold());
    }
}

#[derive(Debug, Serialize)]
struct FileDeclarations {
    file: PathBuf,
    declarations: Vec<Declaration>,
}

fn cmd_scan(project: PathBuf, json_output: bool) -> Result<()> {
    let files = loader::collect_source_files(&project)?;

    let mut rows = Vec::new();
    for file in files {
        let source = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        rows.push(FileDeclarations {
            file,
            declarations: syntax::parse_declarations(&source),
        });
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        if row.declarations.is_empty() {
            continue;
        }
        println!("{}", row.file.display().to_string().bold());
        for line in syntax::format_declaration_tree(&row.declarations).lines() {
            println!("  {}", line);
        }
    }

    Ok(())
}

fn resolve(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
