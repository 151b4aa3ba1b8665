//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Each subcommand corresponds to a distinct operation: synchronizing a
//! declaration with a renamed file, or listing the declarations a project
//! contains.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep type declaration names in sync with renamed source files.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rename the declaration matching a renamed file, project-wide.
    ///
    /// Replays the file rename through the workspace notification stream,
    /// lets the correlator dispatch the appropriate strategy, and reports
    /// what changed. Dry-run by default.
    Sync {
        /// Path of the file before the rename. Relative paths resolve
        /// against the project root.
        old: PathBuf,

        /// Path the file was renamed to.
        new: PathBuf,

        /// Project root directory.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Actually modify files (default is dry-run).
        #[arg(long)]
        write: bool,

        /// Answer every confirmation prompt with yes.
        #[arg(short, long)]
        yes: bool,

        /// Settings file (JSON) controlling confirmation behavior.
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the declaration tree of every source file in a project.
    Scan {
        /// Project root directory.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },
}
