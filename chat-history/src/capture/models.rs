//! Capture data models: the trigger-time context and the persisted record

use serde::{Deserialize, Serialize};

/// Sentinel for metadata the page did not expose
pub const UNKNOWN: &str = "Unknown";

/// Ambient page metadata snapshotted when the send control is clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureContext {
    pub model_name: String,
    pub prompt: String,
    pub attached_files: Vec<String>,
    pub account_name: String,
    pub account_email: String,
}

impl Default for CaptureContext {
    fn default() -> Self {
        Self {
            model_name: UNKNOWN.to_string(),
            prompt: String::new(),
            attached_files: Vec::new(),
            account_name: UNKNOWN.to_string(),
            account_email: UNKNOWN.to_string(),
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// One captured conversation, as persisted
///
/// Serialized with the key names the history has always used (`url`,
/// `attachedFiles`, ...). Entries written before prompt/attachment/account
/// capture existed only carry timestamp, url, title and model; the rest
/// default on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Capture time in the configured fixed zone, `YYYY-MM-DDTHH:MM:SS`
    pub timestamp: String,
    /// Resolved conversation address
    #[serde(rename = "url")]
    pub address: String,
    pub title: String,
    pub model: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub attached_files: Vec<String>,
    #[serde(default = "unknown")]
    pub account_name: String,
    #[serde(default = "unknown")]
    pub account_email: String,
}

impl ConversationRecord {
    pub fn from_capture(
        timestamp: String,
        address: String,
        title: String,
        context: CaptureContext,
    ) -> Self {
        Self {
            timestamp,
            address,
            title,
            model: context.model_name,
            prompt: context.prompt,
            attached_files: context.attached_files,
            account_name: context.account_name,
            account_email: context.account_email,
        }
    }
}
