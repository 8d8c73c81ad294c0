// Environment configuration for the capture pipeline and the CLI
// Resolves the data directory, the settle delay and the timestamp zone

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::capture::pipeline::CaptureSettings;
use crate::capture::store::HISTORY_STORAGE_KEY;
use crate::storage::FileKeyValueStore;

/// Overrides the data directory
pub const DIR_ENV: &str = "GEMINI_HISTORY_DIR";
/// Overrides the settle delay, in milliseconds
pub const SETTLE_MS_ENV: &str = "GEMINI_HISTORY_SETTLE_MS";
/// Overrides the timestamp zone, in whole hours east of UTC
pub const UTC_OFFSET_ENV: &str = "GEMINI_HISTORY_UTC_OFFSET_HOURS";

/// Delay between the send click and opening the sidebar subscription
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Asia/Jakarta; no daylight saving, so a fixed offset is exact
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted history
    pub data_dir: PathBuf,
    pub settle_delay: Duration,
    pub utc_offset: FixedOffset,
}

impl Config {
    /// Configuration using default paths and timings
    pub fn default_paths() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            utc_offset: default_utc_offset(),
        }
    }

    /// Configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default_paths();

        if let Some(dir) = lookup(DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(SETTLE_MS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.settle_delay = Duration::from_millis(ms),
                Err(e) => log::warn!(
                    target: crate::LOG_TARGET,
                    "Ignoring {}={:?}: {}",
                    SETTLE_MS_ENV,
                    raw,
                    e
                ),
            }
        }

        if let Some(raw) = lookup(UTC_OFFSET_ENV) {
            let parsed = raw
                .trim()
                .parse::<i32>()
                .ok()
                .and_then(|hours| hours.checked_mul(3600))
                .and_then(FixedOffset::east_opt);
            match parsed {
                Some(offset) => config.utc_offset = offset,
                None => log::warn!(
                    target: crate::LOG_TARGET,
                    "Ignoring {}={:?}: expected whole hours between -23 and 23",
                    UTC_OFFSET_ENV,
                    raw
                ),
            }
        }

        config
    }

    /// Default data directory: ~/.gemini-history (or /tmp/gemini-history without a home dir)
    fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".gemini-history"))
            .unwrap_or_else(|| PathBuf::from("/tmp/gemini-history"))
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Key/value store rooted at the data directory
    pub fn storage(&self) -> FileKeyValueStore {
        FileKeyValueStore::new(&self.data_dir)
    }

    /// File holding the serialized history
    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", HISTORY_STORAGE_KEY))
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            settle_delay: self.settle_delay,
            utc_offset: self.utc_offset,
        }
    }
}

/// Default timestamp zone as an offset
pub fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}
