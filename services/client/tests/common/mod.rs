//! In-memory stand-ins for the service ports, shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use client_lib::{
    config::Config,
    session::{AppState, ChatSession},
};
use docustream_core::{
    ChatRequest, ChatTransport, ConversationId, ConversationStore, ConversationSummary,
    EventStream, FileUploadService, Message, NavigableAddress, PortError, PortResult,
    StagedAttachment, StreamEvent, UploadedFile,
};
use futures::channel::mpsc;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Ordered record of externally visible effects, shared by the fakes.
pub type EffectLog = Arc<Mutex<Vec<String>>>;

//=========================================================================================
// Transport
//=========================================================================================

pub enum Script {
    Events(Vec<PortResult<StreamEvent>>),
    Live(mpsc::UnboundedReceiver<PortResult<StreamEvent>>),
    Refuse(PortError),
}

pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
    log: EffectLog,
}

impl ScriptedTransport {
    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Queues a stream fed by the returned sender.
    pub fn push_live(&self) -> mpsc::UnboundedSender<PortResult<StreamEvent>> {
        let (tx, rx) = mpsc::unbounded();
        self.push(Script::Live(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// The reply used when nothing was scripted.
pub fn simple_reply(text: &str) -> Vec<PortResult<StreamEvent>> {
    vec![
        Ok(StreamEvent::MessageStart { id: None }),
        Ok(StreamEvent::TextDelta(text.to_string())),
        Ok(StreamEvent::End),
    ]
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(&self, request: ChatRequest) -> PortResult<EventStream> {
        self.log
            .lock()
            .unwrap()
            .push(format!("send:{}", request.conversation_id));
        self.requests.lock().unwrap().push(request);

        let script = self.scripts.lock().unwrap().pop_front();
        match script.unwrap_or_else(|| Script::Events(simple_reply("ok"))) {
            Script::Events(events) => Ok(Box::pin(futures::stream::iter(events))),
            Script::Live(rx) => Ok(Box::pin(rx)),
            Script::Refuse(e) => Err(e),
        }
    }
}

//=========================================================================================
// Uploads
//=========================================================================================

#[derive(Default)]
pub struct FakeUploader {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    failing: Mutex<Option<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    held: Mutex<Vec<String>>,
}

impl FakeUploader {
    pub fn fail_on(&self, name: &str) {
        *self.failing.lock().unwrap() = Some(name.to_string());
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(name.to_string(), delay);
    }

    /// The upload of `name` never completes.
    pub fn hold(&self, name: &str) {
        self.held.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most uploads observed running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileUploadService for FakeUploader {
    async fn upload_file(&self, attachment: &StagedAttachment) -> PortResult<UploadedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if self.held.lock().unwrap().contains(&attachment.name) {
            std::future::pending::<()>().await;
        }
        let delay = self.delays.lock().unwrap().get(&attachment.name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().as_deref() == Some(attachment.name.as_str()) {
            return Err(PortError::Rejected {
                status: 500,
                message: format!("could not store {}", attachment.name),
            });
        }
        Ok(UploadedFile {
            id: format!("id-{}", attachment.name),
            filename: attachment.name.clone(),
        })
    }
}

//=========================================================================================
// Conversation Store
//=========================================================================================

#[derive(Default)]
pub struct InMemoryStore {
    conversations: Mutex<Vec<(ConversationSummary, Vec<Message>)>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub fail_list: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl InMemoryStore {
    pub fn insert(&self, id: &str, title: &str, messages: Vec<Message>) {
        let summary = ConversationSummary {
            id: ConversationId::from(id),
            title: title.to_string(),
        };
        self.conversations.lock().unwrap().push((summary, messages));
    }

    /// Removes a conversation behind the client's back.
    pub fn forget(&self, id: &str) {
        self.conversations
            .lock()
            .unwrap()
            .retain(|(summary, _)| summary.id.as_str() != id);
    }

    /// Holds the next fetch of `id` until the returned sender fires.
    pub fn gate(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(id.to_string(), rx);
        tx
    }

    fn contains(&self, id: &ConversationId) -> bool {
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .any(|(summary, _)| &summary.id == id)
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn list_conversations(&self) -> PortResult<Vec<ConversationSummary>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(PortError::Transport("connection reset".to_string()));
        }
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .map(|(summary, _)| summary.clone())
            .collect())
    }

    async fn fetch_transcript(&self, id: &ConversationId) -> PortResult<Vec<Message>> {
        let gate = self.gates.lock().unwrap().remove(id.as_str());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(PortError::Transport("connection reset".to_string()));
        }
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .find(|(summary, _)| &summary.id == id)
            .map(|(_, messages)| messages.clone())
            .ok_or_else(|| PortError::NotFound(id.to_string()))
    }

    async fn delete_conversation(&self, id: &ConversationId) -> PortResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(PortError::Rejected {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        if !self.contains(id) {
            return Err(PortError::NotFound(id.to_string()));
        }
        self.forget(id.as_str());
        Ok(())
    }
}

//=========================================================================================
// Address
//=========================================================================================

pub struct RecordingAddress {
    location: Mutex<String>,
    delays: Mutex<HashMap<String, Duration>>,
    pub fail: AtomicBool,
    log: EffectLog,
}

impl RecordingAddress {
    pub fn location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    /// Slows down every later write of `location`.
    pub fn delay(&self, location: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(location.to_string(), delay);
    }
}

#[async_trait]
impl NavigableAddress for RecordingAddress {
    async fn current(&self) -> PortResult<String> {
        Ok(self.location())
    }

    async fn replace(&self, location: &str) -> PortResult<()> {
        let delay = self.delays.lock().unwrap().get(location).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("history API unavailable".to_string()));
        }
        *self.location.lock().unwrap() = location.to_string();
        self.log.lock().unwrap().push(format!("address:{}", location));
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<InMemoryStore>,
    pub address: Arc<RecordingAddress>,
    log: EffectLog,
}

impl Harness {
    pub fn new() -> Self {
        let log = EffectLog::default();
        Self {
            transport: Arc::new(ScriptedTransport {
                scripts: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                log: log.clone(),
            }),
            uploader: Arc::new(FakeUploader::default()),
            store: Arc::new(InMemoryStore::default()),
            address: Arc::new(RecordingAddress {
                location: Mutex::new("/".to_string()),
                delays: Mutex::new(HashMap::new()),
                fail: AtomicBool::new(false),
                log: log.clone(),
            }),
            log,
        }
    }

    pub fn app(&self) -> AppState {
        AppState {
            config: Arc::new(Config::default()),
            transport: self.transport.clone(),
            uploader: self.uploader.clone(),
            store: self.store.clone(),
            address: self.address.clone(),
        }
    }

    pub fn session(&self) -> ChatSession {
        ChatSession::new(self.app())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

pub fn file(name: &str) -> StagedAttachment {
    StagedAttachment::new(name, format!("contents of {}", name).into_bytes())
}

pub fn texts(messages: &[Message]) -> Vec<String> {
    messages.iter().map(Message::text).collect()
}

/// Polls `check` until it holds, failing the test after a second.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
