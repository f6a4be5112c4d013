pub mod domain;
pub mod ports;

pub use domain::{
    attached_files, ChatRequest, ConversationId, ConversationSummary, ExtractionProfile, Message,
    MessagePart, MessageStatus, Role, StagedAttachment, StreamEvent, UploadedFile,
};
pub use ports::{
    ChatTransport, ConversationStore, EventStream, FileUploadService, NavigableAddress, PortError,
    PortResult,
};
