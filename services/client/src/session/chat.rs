//! services/client/src/session/chat.rs
//!
//! The chat session: the one in-progress conversation a client displays, and the
//! control flow that ties staging, uploads, identity and streaming together.

use crate::{
    error::{ClientError, ClientResult},
    session::{
        attachments::AttachmentBuffer,
        bootstrap::{bootstrap_process, BootstrapOutcome},
        identity::IdentityResolver,
        state::{AppState, SendOutcome, SendPhase, SessionContext, SessionState},
        streaming::stream_process,
        transcript::TranscriptEvent,
        uploads::{compose_message, UploadCoordinator},
    },
};
use docustream_core::{
    ChatRequest, ConversationId, ExtractionProfile, Message, PortError, StagedAttachment,
};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

//=========================================================================================
// Task Handles
//=========================================================================================

/// A send whose response is being streamed in the background.
pub struct SendHandle {
    task: JoinHandle<SendOutcome>,
    address_error: Option<PortError>,
}

impl SendHandle {
    /// Set when this send minted the conversation id but the address could not
    /// be updated to show it. The message was still sent.
    pub fn address_error(&self) -> Option<&PortError> {
        self.address_error.as_ref()
    }

    pub async fn outcome(self) -> SendOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => SendOutcome::Failed(PortError::Unexpected(e.to_string())),
        }
    }
}

/// The transcript fetch started by opening an existing conversation.
pub struct BootstrapHandle {
    task: JoinHandle<BootstrapOutcome>,
}

impl BootstrapHandle {
    pub async fn outcome(self) -> BootstrapOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => BootstrapOutcome::GreetingKept(ClientError::Internal(e.to_string())),
        }
    }
}

//=========================================================================================
// ChatSession
//=========================================================================================

pub struct ChatSession {
    app: AppState,
    context: Arc<SessionContext>,
    identity: IdentityResolver,
    uploads: UploadCoordinator,
    attachments: Mutex<AttachmentBuffer>,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<TranscriptEvent>,
}

impl ChatSession {
    /// Creates a fresh session showing the greeting, with no conversation identity.
    pub fn new(app: AppState) -> Self {
        let context = Arc::new(SessionContext::new(app.config.default_profile));
        let identity = IdentityResolver::new(context.clone(), app.address.clone());
        let uploads = UploadCoordinator::new(app.uploader.clone(), app.config.max_upload_bytes);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            app,
            context,
            identity,
            uploads,
            attachments: Mutex::new(AttachmentBuffer::default()),
            state: Arc::new(Mutex::new(SessionState::new())),
            events,
        }
    }

    /// Subscribes to every change applied to the displayed transcript.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    // --- Conversation lifecycle ---

    /// Displays an existing conversation and starts loading its transcript.
    ///
    /// Any stream or fetch belonging to the previously displayed conversation stops
    /// affecting the transcript from here on.
    pub async fn open(&self, id: ConversationId) -> BootstrapHandle {
        info!("Opening conversation {}.", id);
        let identity = self.identity.lock().await;
        let epoch = {
            let mut session = self.state.lock().await;
            let epoch = session.supersede();
            session.bootstrap_mark = Some(session.transcript.len());
            let _ = self.events.send(TranscriptEvent::Replaced {
                len: session.transcript.len(),
            });
            epoch
        };

        identity.adopt(id.clone()).await;
        drop(identity);

        let task = tokio::spawn(bootstrap_process(
            self.app.store.clone(),
            self.state.clone(),
            self.events.clone(),
            id,
            epoch,
        ));
        BootstrapHandle { task }
    }

    /// Leaves the displayed conversation for a fresh one. The next send mints a new
    /// identity. Staged attachments are kept.
    pub async fn new_conversation(&self) {
        info!("Starting a new conversation.");
        let identity = self.identity.lock().await;
        {
            let mut session = self.state.lock().await;
            session.supersede();
            let _ = self.events.send(TranscriptEvent::Replaced {
                len: session.transcript.len(),
            });
        }
        identity.reset().await;
    }

    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.context.conversation_id().await
    }

    // --- Composition ---

    pub async fn select_profile(&self, profile: Option<ExtractionProfile>) {
        self.context.set_extraction_profile(profile).await;
    }

    pub async fn profile(&self) -> Option<ExtractionProfile> {
        self.context.extraction_profile().await
    }

    pub async fn stage(&self, files: impl IntoIterator<Item = StagedAttachment>) {
        self.attachments.lock().await.add(files);
    }

    pub async fn unstage(&self, index: usize) -> Option<StagedAttachment> {
        self.attachments.lock().await.remove(index)
    }

    pub async fn staged(&self) -> Vec<StagedAttachment> {
        self.attachments.lock().await.as_slice().to_vec()
    }

    // --- Transcript view ---

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.transcript.messages().to_vec()
    }

    pub async fn phase(&self) -> SendPhase {
        self.state.lock().await.phase
    }

    /// Whether a send is in flight. This alone disables submission; a pending
    /// transcript fetch never does.
    pub async fn is_loading(&self) -> bool {
        self.phase().await.is_in_flight()
    }

    pub async fn can_submit(&self, input: &str) -> bool {
        if self.is_loading().await {
            return false;
        }
        !input.trim().is_empty() || !self.attachments.lock().await.is_empty()
    }

    // --- Sending ---

    /// Sends the typed text together with every staged attachment.
    ///
    /// Uploads complete before anything is sent; if any of them fails nothing is
    /// sent and the attachments stay staged. On success the user's message is
    /// appended right away and the response streams in the background.
    pub async fn submit(&self, input: &str) -> ClientResult<SendHandle> {
        let staged = self.staged().await;
        if input.trim().is_empty() && staged.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let epoch = {
            let mut session = self.state.lock().await;
            if session.phase.is_in_flight() {
                warn!("Rejecting a send while another one is in flight.");
                return Err(ClientError::SendInFlight);
            }
            session.phase = SendPhase::Sending;
            session.epoch
        };

        // --- 1. Uploads ---
        let uploaded = match self.uploads.upload_all(&staged).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                error!("Send aborted before transmission: {}", e);
                self.release(epoch).await;
                return Err(e);
            }
        };
        let text = compose_message(&uploaded, input);

        // --- 2. Identity, committed before the request is built ---
        // Held until the user message is appended; opening or resetting a
        // conversation waits for it, so the epoch cannot move underneath.
        let identity = self.identity.lock().await;
        if self.state.lock().await.epoch != epoch {
            info!("Conversation changed during upload; dropping the send.");
            return Err(ClientError::Superseded);
        }
        let resolution = identity.resolve().await;
        let request = ChatRequest {
            text: text.clone(),
            extraction_profile: self.context.extraction_profile().await,
            conversation_id: resolution.id,
        };
        let address_error = resolution.address_error;

        // --- 3. Optimistic append ---
        let token = {
            let mut session = self.state.lock().await;
            if session.epoch != epoch {
                return Err(ClientError::Superseded);
            }
            let change = session.transcript.push_user(text);
            let _ = self.events.send(change);
            session.cancellation_token.clone()
        };
        drop(identity);
        self.attachments.lock().await.consume_sent(staged.len());

        // --- 4. Transmission ---
        match self.app.transport.open_stream(request).await {
            Ok(stream) => {
                let mut session = self.state.lock().await;
                if session.epoch != epoch {
                    info!("Conversation changed while connecting; closing the stream.");
                    return Ok(SendHandle {
                        task: tokio::spawn(async { SendOutcome::Superseded }),
                        address_error,
                    });
                }
                session.phase = SendPhase::Streaming;
                let task = tokio::spawn(stream_process(
                    self.state.clone(),
                    self.events.clone(),
                    stream,
                    token,
                    epoch,
                ));
                Ok(SendHandle {
                    task,
                    address_error,
                })
            }
            Err(e) => {
                error!("Failed to open the chat stream: {}", e);
                let mut session = self.state.lock().await;
                if session.epoch == epoch {
                    for change in session.transcript.fail() {
                        let _ = self.events.send(change);
                    }
                    session.phase = SendPhase::Idle;
                }
                Err(ClientError::SendTransportFailed(e))
            }
        }
    }

    /// Returns to idle after an aborted send, unless the conversation changed meanwhile.
    async fn release(&self, epoch: u64) {
        let mut session = self.state.lock().await;
        if session.epoch == epoch {
            session.phase = SendPhase::Idle;
        }
    }
}
