// Conversation capture core (shared between the CLI and embedding hosts)
pub mod capture;

// Data directory and timing configuration
pub mod config;

// Element snapshots, selectors and the host seams
pub mod page;

// Key-value persistence backends
pub mod storage;

/// Log target for every line this crate emits
pub const LOG_TARGET: &str = "gemini_history";
