//! Settings lookup.
//!
//! The rename flow consults a single boolean: whether the user wants to be
//! prompted before a declaration is renamed. The store is addressed by
//! `(section, subsection, key)` with a caller-supplied default, backed here
//! by a JSON document traversed the same way the registry tree is.

use anyhow::{Context, Result};
use std::path::Path;

pub const SECTION_ENVIRONMENT: &str = "environment";
pub const SUBSECTION_PROJECTS: &str = "projects";
pub const KEY_PROMPT_FOR_RENAME: &str = "prompt_for_rename";

/// Read-only settings surface.
pub trait SettingsStore: Send + Sync {
    fn get_bool(&self, section: &str, subsection: &str, key: &str, default: bool) -> bool;
}

/// Settings backed by a nested JSON object:
/// `{ "environment": { "projects": { "prompt_for_rename": true } } }`.
pub struct JsonSettings {
    root: serde_json::Value,
}

impl JsonSettings {
    pub fn from_value(root: serde_json::Value) -> JsonSettings {
        JsonSettings { root }
    }

    /// An empty store: every lookup falls back to its default.
    pub fn empty() -> JsonSettings {
        JsonSettings {
            root: serde_json::Value::Null,
        }
    }

    pub fn load(path: &Path) -> Result<JsonSettings> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let root = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(JsonSettings { root })
    }
}

impl SettingsStore for JsonSettings {
    fn get_bool(&self, section: &str, subsection: &str, key: &str, default: bool) -> bool {
        self.root
            .get(section)
            .and_then(|s| s.get(subsection))
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }
}
