//! Classification of page addresses
//!
//! The composer lives at the bare app address; once the first reply starts
//! streaming, the page moves to `/app/<hex id>`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Address of the composer before any conversation exists
pub const APP_URL: &str = "https://gemini.google.com/app";

static RESOLVED_CONVERSATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://gemini\.google\.com/app/[0-9a-f]+$")
        .expect("failed to compile conversation address pattern")
});

/// True iff `addr` is the app prefix followed by a hex conversation id and nothing else
pub fn is_resolved_conversation_address(addr: &str) -> bool {
    RESOLVED_CONVERSATION.is_match(addr)
}

/// True iff `addr` is the composer address, optionally with a query string
pub fn is_composer_origin(addr: &str) -> bool {
    match addr.strip_prefix(APP_URL) {
        Some("") => true,
        Some(rest) => rest.starts_with('?'),
        None => false,
    }
}
