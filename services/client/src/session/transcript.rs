//! services/client/src/session/transcript.rs
//!
//! The ordered message list of the displayed conversation and the rules for
//! applying streamed events to it.

use docustream_core::{Message, MessagePart, MessageStatus, StreamEvent};

/// A change applied to the transcript, published to front-ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Appended(Message),
    Fragment { message_id: String, part: MessagePart },
    Settled { message_id: String, status: MessageStatus },
    Replaced { len: usize },
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    /// Index of the assistant message currently receiving fragments.
    open: Option<usize>,
}

impl Transcript {
    /// A transcript holding only the default greeting.
    pub fn greeting() -> Self {
        Self::from_messages(vec![Message::greeting()])
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            open: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    /// Optimistically appends the user's outgoing message.
    pub fn push_user(&mut self, text: impl Into<String>) -> TranscriptEvent {
        let message = Message::user(text);
        self.messages.push(message.clone());
        TranscriptEvent::Appended(message)
    }

    /// Applies one streamed event, returning the resulting changes in order.
    pub fn apply(&mut self, event: StreamEvent) -> Vec<TranscriptEvent> {
        let mut changes = Vec::new();
        match event {
            StreamEvent::MessageStart { id } => {
                changes.extend(self.settle_open(MessageStatus::Complete));
                changes.push(self.start_assistant(id));
            }
            StreamEvent::TextDelta(content) => {
                changes.extend(self.append_fragment(MessagePart::Text { content }));
            }
            StreamEvent::ToolCall { name } => {
                changes.extend(self.append_fragment(MessagePart::ToolCall { name }));
            }
            StreamEvent::End => changes.extend(self.finish()),
        }
        changes
    }

    /// Freezes the open assistant message after a normal end of stream.
    pub fn finish(&mut self) -> Option<TranscriptEvent> {
        self.settle_open(MessageStatus::Complete)
    }

    /// Marks the assistant turn as failed. Partial content is kept; when nothing
    /// was streamed yet, an empty failed assistant message records the turn.
    pub fn fail(&mut self) -> Vec<TranscriptEvent> {
        if let Some(change) = self.settle_open(MessageStatus::Failed) {
            return vec![change];
        }

        let mut message = Message::streaming_assistant(None);
        message.settle(MessageStatus::Failed);
        self.messages.push(message.clone());
        vec![TranscriptEvent::Appended(message)]
    }

    /// Installs a fetched transcript in place of the first `keep_from` messages,
    /// keeping everything appended after that point.
    pub fn rebase(&mut self, fetched: Vec<Message>, keep_from: usize) -> TranscriptEvent {
        let keep_from = keep_from.min(self.messages.len());
        let local = self.messages.split_off(keep_from);
        let offset = fetched.len();

        self.open = self
            .open
            .and_then(|index| index.checked_sub(keep_from))
            .map(|index| index + offset);
        self.messages = fetched;
        self.messages.extend(local);

        TranscriptEvent::Replaced {
            len: self.messages.len(),
        }
    }

    fn start_assistant(&mut self, id: Option<String>) -> TranscriptEvent {
        let message = Message::streaming_assistant(id);
        self.messages.push(message.clone());
        self.open = Some(self.messages.len() - 1);
        TranscriptEvent::Appended(message)
    }

    fn append_fragment(&mut self, part: MessagePart) -> Vec<TranscriptEvent> {
        let mut changes = Vec::new();
        let index = match self.open {
            Some(index) => index,
            None => {
                // A delta without a start marker implicitly opens the assistant turn.
                changes.push(self.start_assistant(None));
                self.messages.len() - 1
            }
        };

        let message = &mut self.messages[index];
        if message.append(part.clone()) {
            changes.push(TranscriptEvent::Fragment {
                message_id: message.id.clone(),
                part,
            });
        }
        changes
    }

    fn settle_open(&mut self, status: MessageStatus) -> Option<TranscriptEvent> {
        let index = self.open.take()?;
        let message = self.messages.get_mut(index)?;
        message.settle(status);
        Some(TranscriptEvent::Settled {
            message_id: message.id.clone(),
            status,
        })
    }
}
