//! Conversation capture
//!
//! Watches the composer for a send click, waits for the new conversation to
//! show up in the sidebar and records it once it has a title.

pub mod address;
pub mod context;
pub mod driver;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod trigger;

// Re-export key types
pub use driver::{CaptureDriver, HostEvent};
pub use models::{CaptureContext, ConversationRecord};
pub use pipeline::{
    AbortReason, CaptureMachine, CaptureOutcome, CaptureSettings, Clock, PipelineStage,
    SettleTicket, SystemClock,
};
pub use store::{AppendRejection, RecordStore};
pub use trigger::{SendControlDetector, SendControlStrategy};
