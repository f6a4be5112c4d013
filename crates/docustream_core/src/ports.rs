//! crates/docustream_core/src/ports.rs
//!
//! Defines the service contracts (traits) the chat session depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! session logic to be independent of HTTP, SSE, or wherever the address lives.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{
    ChatRequest, ConversationId, ConversationSummary, Message, StagedAttachment, StreamEvent,
    UploadedFile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, decoding).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The ordered events of one streamed response.
pub type EventStream = Pin<Box<dyn Stream<Item = PortResult<StreamEvent>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Opens one streaming connection for an outgoing message.
    ///
    /// Events are yielded in arrival order. A stream that ends without
    /// `StreamEvent::End` counts as a normal termination.
    async fn open_stream(&self, request: ChatRequest) -> PortResult<EventStream>;
}

#[async_trait]
pub trait FileUploadService: Send + Sync {
    /// Durably stores a single file.
    async fn upload_file(&self, attachment: &StagedAttachment) -> PortResult<UploadedFile>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn list_conversations(&self) -> PortResult<Vec<ConversationSummary>>;

    /// Fetches a persisted transcript; `PortError::NotFound` when the id is unknown.
    async fn fetch_transcript(&self, id: &ConversationId) -> PortResult<Vec<Message>>;

    async fn delete_conversation(&self, id: &ConversationId) -> PortResult<()>;
}

#[async_trait]
pub trait NavigableAddress: Send + Sync {
    /// The current location, e.g. `/chat/<id>`.
    async fn current(&self) -> PortResult<String>;

    /// Replaces the current location without reloading anything.
    async fn replace(&self, location: &str) -> PortResult<()>;
}

/// Location of a conversation in the navigable address.
pub fn conversation_location(id: &ConversationId) -> String {
    format!("/chat/{}", id)
}

/// Location of a fresh, not-yet-persisted conversation.
pub const ROOT_LOCATION: &str = "/";

/// Extracts the conversation id from a location, if it references one.
pub fn conversation_from_location(location: &str) -> Option<ConversationId> {
    location
        .trim()
        .strip_prefix("/chat/")
        .map(|rest| rest.trim_end_matches('/'))
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(ConversationId::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_round_trips_conversation_id() {
        let id = ConversationId::from("abc-123");
        let location = conversation_location(&id);
        assert_eq!(location, "/chat/abc-123");
        assert_eq!(conversation_from_location(&location), Some(id));
    }

    #[test]
    fn non_conversation_locations_yield_none() {
        assert_eq!(conversation_from_location(ROOT_LOCATION), None);
        assert_eq!(conversation_from_location("/chat/"), None);
        assert_eq!(conversation_from_location("/settings"), None);
        assert_eq!(conversation_from_location("/chat/a/b"), None);
    }
}
