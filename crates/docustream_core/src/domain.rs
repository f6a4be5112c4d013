//! crates/docustream_core/src/domain.rs
//!
//! Defines the pure, core data structures for the chat client.
//! These structs are independent of any transport or wire format.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content of the assistant message shown before any transcript is available.
pub const GREETING_TEXT: &str =
    "Hello! Upload a document and select an industry to extract structured data.";

/// Identifier of the greeting message.
pub const GREETING_MESSAGE_ID: &str = "greeting";

//=========================================================================================
// Conversation Identity
//=========================================================================================

/// The durable identifier of a conversation.
///
/// Identifiers minted by this client are UUIDv4 strings, but conversations opened
/// by reference may carry whatever identifier the backend issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Mints a new, globally-unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry in the list of persisted conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
}

//=========================================================================================
// Messages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A typed fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text { content: String },
    ToolCall { name: String },
}

impl MessagePart {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(name: impl Into<String>) -> Self {
        Self::ToolCall { name: name.into() }
    }
}

/// Lifecycle of a message in the transcript.
///
/// Only a `Streaming` message accepts new parts; the other two states are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Streaming,
    Complete,
    Failed,
}

/// A single message of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user message, complete from the moment it is created.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![MessagePart::text(text)],
            status: MessageStatus::Complete,
            created_at: Utc::now(),
        }
    }

    /// An empty assistant message that is still receiving parts.
    pub fn streaming_assistant(id: Option<String>) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: Role::Assistant,
            parts: Vec::new(),
            status: MessageStatus::Streaming,
            created_at: Utc::now(),
        }
    }

    /// The default assistant message shown while no transcript is loaded.
    pub fn greeting() -> Self {
        Self {
            id: GREETING_MESSAGE_ID.to_string(),
            role: Role::Assistant,
            parts: vec![MessagePart::text(GREETING_TEXT)],
            status: MessageStatus::Complete,
            created_at: Utc::now(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.status != MessageStatus::Streaming
    }

    /// Appends a part. Returns `false` (and leaves the message untouched) when frozen.
    pub fn append(&mut self, part: MessagePart) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.parts.push(part);
        true
    }

    /// Freezes the message with a terminal status.
    pub fn settle(&mut self, status: MessageStatus) {
        if !self.is_frozen() {
            self.status = status;
        }
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { content } => Some(content.as_str()),
                MessagePart::ToolCall { .. } => None,
            })
            .collect()
    }
}

//=========================================================================================
// Attachments
//=========================================================================================

/// A file selected by the user that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    pub name: String,
    pub size: u64,
    pub bytes: Bytes,
}

impl StagedAttachment {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Size label used by attachment previews, e.g. `"12 KB"`.
    pub fn size_label(&self) -> String {
        format!("{:.0} KB", self.size as f64 / 1024.0)
    }
}

/// Server-issued proof that a file was durably stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
}

impl UploadedFile {
    /// The tag embedded in the outgoing message text.
    pub fn tag(&self) -> String {
        format!("[FILE_ID: {} FILENAME: {}]", self.id, self.filename)
    }
}

fn file_tag_regex() -> &'static Regex {
    static FILE_TAG: OnceLock<Regex> = OnceLock::new();
    FILE_TAG.get_or_init(|| {
        Regex::new(r"\[FILE_ID: (\S+) FILENAME: (.+?)\]").expect("file tag pattern is valid")
    })
}

/// Recovers the file references embedded in a message text, in order.
pub fn attached_files(text: &str) -> Vec<UploadedFile> {
    file_tag_regex()
        .captures_iter(text)
        .map(|caps| UploadedFile {
            id: caps[1].to_string(),
            filename: caps[2].to_string(),
        })
        .collect()
}

//=========================================================================================
// Extraction Profile
//=========================================================================================

/// The extraction profile steering the backend agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionProfile {
    Banking,
    Healthcare,
    Insurance,
    Legal,
    Retail,
    FoodBeverage,
}

impl ExtractionProfile {
    pub const ALL: [ExtractionProfile; 6] = [
        Self::Banking,
        Self::Healthcare,
        Self::Insurance,
        Self::Legal,
        Self::Retail,
        Self::FoodBeverage,
    ];

    /// The value sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Banking => "banking",
            Self::Healthcare => "healthcare",
            Self::Insurance => "insurance",
            Self::Legal => "legal",
            Self::Retail => "retail",
            Self::FoodBeverage => "food_beverage",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Banking => "Banking & Finance",
            Self::Healthcare => "Healthcare & Pharma",
            Self::Insurance => "Insurance",
            Self::Legal => "Legal & Litigation",
            Self::Retail => "Retail & CPG",
            Self::FoodBeverage => "Food & Beverage",
        }
    }
}

impl fmt::Display for ExtractionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown extraction profile: {0}")]
pub struct UnknownProfile(pub String);

impl FromStr for ExtractionProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str() == normalized)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

//=========================================================================================
// Transport Types
//=========================================================================================

/// Everything the backend needs to answer one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub text: String,
    pub extraction_profile: Option<ExtractionProfile>,
    pub conversation_id: ConversationId,
}

/// One event of a streamed response, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Opens a new assistant message.
    MessageStart { id: Option<String> },
    TextDelta(String),
    ToolCall { name: String },
    /// The stream closed normally.
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parses_wire_and_loose_spellings() {
        assert_eq!(
            "food_beverage".parse::<ExtractionProfile>(),
            Ok(ExtractionProfile::FoodBeverage)
        );
        assert_eq!(
            "Food-Beverage".parse::<ExtractionProfile>(),
            Ok(ExtractionProfile::FoodBeverage)
        );
        assert_eq!(" LEGAL ".parse::<ExtractionProfile>(), Ok(ExtractionProfile::Legal));
        assert!("astrology".parse::<ExtractionProfile>().is_err());
    }

    #[test]
    fn profile_serializes_as_wire_value() {
        let json = serde_json::to_string(&ExtractionProfile::FoodBeverage).unwrap();
        assert_eq!(json, "\"food_beverage\"");
    }

    #[test]
    fn frozen_message_rejects_parts() {
        let mut message = Message::streaming_assistant(None);
        assert!(message.append(MessagePart::text("partial")));
        message.settle(MessageStatus::Complete);
        assert!(!message.append(MessagePart::text("late")));
        assert_eq!(message.parts, vec![MessagePart::text("partial")]);

        // A settled message keeps its first terminal status.
        message.settle(MessageStatus::Failed);
        assert_eq!(message.status, MessageStatus::Complete);
    }

    #[test]
    fn attached_files_recovers_tags_in_order() {
        let text = "[FILE_ID: 1 FILENAME: a.pdf]\n[FILE_ID: 2 FILENAME: my scan.png]\n\nsummarize";
        let files = attached_files(text);
        assert_eq!(
            files,
            vec![
                UploadedFile { id: "1".into(), filename: "a.pdf".into() },
                UploadedFile { id: "2".into(), filename: "my scan.png".into() },
            ]
        );
        assert!(attached_files("no files here").is_empty());
    }

    #[test]
    fn size_label_is_rounded_kib() {
        let attachment = StagedAttachment::new("a.pdf", vec![0u8; 2048]);
        assert_eq!(attachment.size, 2048);
        assert_eq!(attachment.size_label(), "2 KB");
    }
}
