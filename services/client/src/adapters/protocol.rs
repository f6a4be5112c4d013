//! services/client/src/adapters/protocol.rs
//!
//! Defines the HTTP wire protocol between the chat client and the extraction backend.

use crate::adapters::sse::SseFrame;
use chrono::{DateTime, Utc};
use docustream_core::{
    ChatRequest, ExtractionProfile, Message, MessagePart, MessageStatus, PortError, PortResult,
    Role, StreamEvent, UploadedFile,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

//=========================================================================================
// Requests Sent FROM the Client TO the Backend
//=========================================================================================

/// Body of `POST /chat`.
#[derive(Serialize, Debug)]
pub struct ChatRequestBody<'a> {
    pub messages: Vec<OutgoingMessage<'a>>,
    pub industry: Option<ExtractionProfile>,
    pub chat_id: &'a str,
}

#[derive(Serialize, Debug)]
pub struct OutgoingMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

impl<'a> From<&'a ChatRequest> for ChatRequestBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            messages: vec![OutgoingMessage {
                role: Role::User,
                content: &request.text,
            }],
            industry: request.extraction_profile,
            chat_id: request.conversation_id.as_str(),
        }
    }
}

//=========================================================================================
// Responses Sent FROM the Backend TO the Client
//=========================================================================================

/// Response of `POST /upload`.
#[derive(Deserialize, Debug)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
}

impl From<UploadResponse> for UploadedFile {
    fn from(response: UploadResponse) -> Self {
        Self {
            id: response.id,
            filename: response.filename,
        }
    }
}

/// A persisted message as returned by `GET /chats/{id}`.
#[derive(Deserialize, Debug)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Self {
            id: stored.id,
            role: stored.role,
            parts: stored.parts,
            status: MessageStatus::Complete,
            created_at: stored.created_at.unwrap_or_else(Utc::now),
        }
    }
}

//=========================================================================================
// Stream Frames
//=========================================================================================

/// Maps one SSE frame to a stream event.
///
/// Returns `Ok(None)` for frames that carry nothing for the transcript.
pub fn frame_to_event(frame: SseFrame) -> PortResult<Option<StreamEvent>> {
    match frame.event.as_deref() {
        Some("start") => Ok(Some(StreamEvent::MessageStart {
            id: start_message_id(&frame.data),
        })),
        Some("end") => Ok(Some(StreamEvent::End)),
        Some("error") => Err(PortError::Transport(error_message(&frame.data))),
        None | Some("message") | Some("delta") => Ok(data_to_event(&frame.data)),
        Some(other) => {
            warn!("Ignoring unknown stream event '{}'.", other);
            Ok(None)
        }
    }
}

fn data_to_event(data: &str) -> Option<StreamEvent> {
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(StreamEvent::End);
    }

    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(delta)) => Some(StreamEvent::TextDelta(delta)),
        Ok(Value::Object(object)) => {
            let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_string);
            match object.get("type").and_then(Value::as_str) {
                Some("tool-call") | Some("tool_call") => field("name")
                    .or_else(|| field("toolName"))
                    .map(|name| StreamEvent::ToolCall { name }),
                Some("text") | Some("text-delta") | Some("content") => field("content")
                    .or_else(|| field("delta"))
                    .map(StreamEvent::TextDelta),
                _ => {
                    warn!("Ignoring unrecognized stream payload: {}", data);
                    None
                }
            }
        }
        // Plain-text payloads are taken verbatim.
        _ => Some(StreamEvent::TextDelta(data.to_string())),
    }
}

fn start_message_id(data: &str) -> Option<String> {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_string))
        .filter(|id| !id.is_empty())
}

fn error_message(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(message)) => message,
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Err(_) if data.is_empty() => "stream reported an error".to_string(),
        Err(_) => data.to_string(),
    }
}
