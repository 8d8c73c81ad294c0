//! Record store: the persisted, deduplicated conversation history
//!
//! The whole history is one JSON array stored under a fixed key, most recent
//! first. Reads self-heal: anything that is not an array loads as empty, and
//! array entries that are not records are skipped. `append` is the only write
//! path used by the capture pipeline.

use std::rc::Rc;

use thiserror::Error;

use crate::capture::address::is_resolved_conversation_address;
use crate::capture::models::ConversationRecord;
use crate::storage::{KeyValueStore, StorageError};

/// Storage key of the serialized history
pub const HISTORY_STORAGE_KEY: &str = "geminiChatHistory";

/// Why a record was not appended
#[derive(Debug, Error)]
pub enum AppendRejection {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("`{0}` is not a resolved conversation address")]
    InvalidAddress(String),
    #[error("`{0}` is already recorded")]
    Duplicate(String),
    #[error("failed to persist history")]
    SaveFailed(#[from] StorageError),
}

#[derive(Clone)]
pub struct RecordStore {
    backend: Rc<dyn KeyValueStore>,
}

impl RecordStore {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Current history, most recent first. Never fails.
    pub fn load(&self) -> Vec<ConversationRecord> {
        let raw = self.backend.get(HISTORY_STORAGE_KEY, "[]");

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::error!(target: crate::LOG_TARGET, "Error parsing stored history: {}", e);
                return Vec::new();
            }
        };

        let serde_json::Value::Array(entries) = value else {
            log::error!(
                target: crate::LOG_TARGET,
                "Stored history is not a list, treating it as empty"
            );
            return Vec::new();
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_json::from_value(entry)
                    .map_err(|e| {
                        log::warn!(
                            target: crate::LOG_TARGET,
                            "Skipping malformed history entry {}: {}",
                            index,
                            e
                        )
                    })
                    .ok()
            })
            .collect()
    }

    /// Persists `records` as the whole history. Failures are reported, not retried.
    pub fn save(&self, records: &[ConversationRecord]) -> Result<(), StorageError> {
        let result = serde_json::to_string(records)
            .map_err(|e| StorageError::Write {
                key: HISTORY_STORAGE_KEY.to_string(),
                source: e.into(),
            })
            .and_then(|json| self.backend.set(HISTORY_STORAGE_KEY, &json));
        if let Err(e) = &result {
            log::error!(target: crate::LOG_TARGET, "Error saving history: {}", e);
        }
        result
    }

    /// Validates, deduplicates by address and prepends `record`
    pub fn append(&self, record: ConversationRecord) -> Result<(), AppendRejection> {
        for (field, value) in [
            ("timestamp", &record.timestamp),
            ("url", &record.address),
            ("title", &record.title),
            ("model", &record.model),
        ] {
            if value.trim().is_empty() {
                return Err(AppendRejection::MissingField(field));
            }
        }

        if !is_resolved_conversation_address(&record.address) {
            return Err(AppendRejection::InvalidAddress(record.address));
        }

        let mut history = self.load();
        if history.iter().any(|entry| entry.address == record.address) {
            return Err(AppendRejection::Duplicate(record.address));
        }

        history.insert(0, record);
        self.save(&history)?;
        Ok(())
    }

    /// Boolean form of [`RecordStore::append`]; reports why a record was skipped
    pub fn try_append(&self, record: ConversationRecord) -> bool {
        let summary = format!("{} ({:?})", record.address, record.title);
        match self.append(record) {
            Ok(()) => {
                log::info!(target: crate::LOG_TARGET, "Added entry {}", summary);
                true
            }
            Err(AppendRejection::Duplicate(address)) => {
                log::info!(
                    target: crate::LOG_TARGET,
                    "Duplicate URL detected, skipping entry: {}",
                    address
                );
                false
            }
            Err(rejection) => {
                log::warn!(target: crate::LOG_TARGET, "Rejected entry {}: {}", summary, rejection);
                false
            }
        }
    }
}
