//! services/client/src/error.rs
//!
//! Defines the primary error type for the chat client.

use crate::config::ConfigError;
use docustream_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// At least one upload of a batch failed; nothing was sent.
    #[error("Upload failed: {0}")]
    UploadFailed(PortError),

    /// A staged file was refused by the upload validation hook.
    #[error("Attachment '{name}' rejected: {reason}")]
    InvalidAttachment { name: String, reason: String },

    /// The streaming connection for an outgoing message could not be opened.
    #[error("Send failed: {0}")]
    SendTransportFailed(PortError),

    /// The persisted transcript could not be fetched.
    #[error("Failed to fetch conversation: {0}")]
    FetchFailed(PortError),

    /// The conversation could not be deleted.
    #[error("Failed to delete conversation: {0}")]
    DeleteFailed(PortError),

    /// A message is already being sent or streamed in this conversation.
    #[error("A message is already in flight for this conversation")]
    SendInFlight,

    /// The conversation was closed or replaced before the message could be sent.
    #[error("The conversation was closed before the message could be sent")]
    Superseded,

    /// Neither text nor attachments were provided.
    #[error("Nothing to send")]
    EmptyMessage,

    /// Represents an error that propagated up from one of the service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading a file to attach).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// A convenience type alias for `Result<T, ClientError>`.
pub type ClientResult<T> = Result<T, ClientError>;
