//! History export to a standalone JSON file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::capture::models::ConversationRecord;
use crate::capture::store::RecordStore;
use crate::storage::replace_file;

/// Pretty-printed JSON array, two-space indented
pub fn export_json(records: &[ConversationRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize history for export")
}

/// `gemini_chat_history_<ISO-8601 UTC>.json` with `:` and `.` replaced by `-`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("gemini_chat_history_{}.json", stamp)
}

/// Writes the whole history into `dir`. Returns `None` when there is nothing
/// to export.
pub fn write_export(dir: &Path, store: &RecordStore, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
    let records = store.load();
    if records.is_empty() {
        log::warn!(target: crate::LOG_TARGET, "No history found to export");
        return Ok(None);
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let path = dir.join(export_file_name(now));
    replace_file(&path, &export_json(&records)?)?;
    log::info!(
        target: crate::LOG_TARGET,
        "Exported {} record(s) to {}",
        records.len(),
        path.display()
    );
    Ok(Some(path))
}
