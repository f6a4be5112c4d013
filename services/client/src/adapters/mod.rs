pub mod address;
pub mod chat_sse;
pub mod http;
pub mod protocol;
pub mod sse;
pub mod store;
pub mod upload;

pub use address::FileAddress;
pub use chat_sse::SseChatAdapter;
pub use store::HttpConversationStore;
pub use upload::HttpUploadAdapter;
