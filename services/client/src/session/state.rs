//! services/client/src/session/state.rs
//!
//! Defines the client's shared services and the state of the open chat session.

use crate::config::Config;
use crate::session::transcript::Transcript;
use docustream_core::{
    ChatTransport, ConversationId, ConversationStore, ExtractionProfile, FileUploadService,
    NavigableAddress, PortError,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared By Everything In The Process)
//=========================================================================================

/// The service adapters, created once at startup and handed to every session.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transport: Arc<dyn ChatTransport>,
    pub uploader: Arc<dyn FileUploadService>,
    pub store: Arc<dyn ConversationStore>,
    pub address: Arc<dyn NavigableAddress>,
}

//=========================================================================================
// SessionContext (Read By The Transport Layer At Send Time)
//=========================================================================================

#[derive(Debug, Clone, Default)]
struct ContextValues {
    conversation_id: Option<ConversationId>,
    extraction_profile: Option<ExtractionProfile>,
}

/// The session-scoped selections every outgoing request is built from.
///
/// One instance lives for the whole session and is updated in place. The
/// conversation id has a single writer: the identity resolver.
#[derive(Debug, Default)]
pub struct SessionContext {
    values: RwLock<ContextValues>,
}

impl SessionContext {
    pub fn new(extraction_profile: Option<ExtractionProfile>) -> Self {
        Self {
            values: RwLock::new(ContextValues {
                conversation_id: None,
                extraction_profile,
            }),
        }
    }

    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.values.read().await.conversation_id.clone()
    }

    pub async fn extraction_profile(&self) -> Option<ExtractionProfile> {
        self.values.read().await.extraction_profile
    }

    pub async fn set_extraction_profile(&self, profile: Option<ExtractionProfile>) {
        self.values.write().await.extraction_profile = profile;
    }

    pub(crate) async fn set_conversation_id(&self, id: Option<ConversationId>) {
        self.values.write().await.conversation_id = id;
    }

    /// Returns the committed id, minting and committing one first if there is none.
    /// The boolean is `true` when this call minted it.
    pub(crate) async fn get_or_mint(&self) -> (ConversationId, bool) {
        let mut values = self.values.write().await;
        let minted = values.conversation_id.is_none();
        let id = values
            .conversation_id
            .get_or_insert_with(ConversationId::generate)
            .clone();
        (id, minted)
    }
}

//=========================================================================================
// SessionState (The Displayed Conversation)
//=========================================================================================

/// Where the current outgoing message is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    /// Attachments uploading and the connection being opened.
    Sending,
    Streaming,
}

impl SendPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SendPhase::Sending | SendPhase::Streaming)
    }
}

/// How a send that reached the streaming stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed(PortError),
    /// The conversation was closed or replaced while the stream was open.
    Superseded,
}

/// The mutable state of the displayed conversation. Every mutation of the
/// transcript happens under the session's lock, which serializes streamed
/// appends with bootstrap replacement.
pub struct SessionState {
    pub transcript: Transcript,
    pub phase: SendPhase,
    /// Bumped whenever the displayed conversation changes; late results carrying an
    /// older epoch are discarded.
    pub epoch: u64,
    /// Cancels the stream belonging to the current epoch.
    pub cancellation_token: CancellationToken,
    /// Transcript length when a pending fetch started, if one is pending.
    pub bootstrap_mark: Option<usize>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::greeting(),
            phase: SendPhase::Idle,
            epoch: 0,
            cancellation_token: CancellationToken::new(),
            bootstrap_mark: None,
        }
    }

    /// Abandons the displayed conversation: its stream is cancelled, pending
    /// results are invalidated and the greeting is shown again.
    pub fn supersede(&mut self) -> u64 {
        self.cancellation_token.cancel();
        self.cancellation_token = CancellationToken::new();
        self.epoch += 1;
        self.phase = SendPhase::Idle;
        self.transcript = Transcript::greeting();
        self.bootstrap_mark = None;
        self.epoch
    }
}
