//! services/client/src/session/mod.rs
//!
//! The chat session state machine: staging, uploads, identity, streaming and
//! transcript bootstrap.

pub mod attachments;
pub mod bootstrap;
pub mod chat;
pub mod history;
pub mod identity;
pub mod state;
pub mod streaming;
pub mod transcript;
pub mod uploads;

pub use chat::{BootstrapHandle, ChatSession, SendHandle};
pub use history::ConversationHistory;
pub use state::{AppState, SendOutcome, SendPhase};
pub use transcript::TranscriptEvent;
