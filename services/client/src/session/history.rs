//! services/client/src/session/history.rs
//!
//! The list of persisted conversations shown alongside the chat.

use crate::error::{ClientError, ClientResult};
use docustream_core::{ConversationId, ConversationStore, ConversationSummary, PortError};
use std::sync::Arc;
use tracing::{error, info};

pub struct ConversationHistory {
    store: Arc<dyn ConversationStore>,
    entries: Vec<ConversationSummary>,
}

impl ConversationHistory {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ConversationSummary] {
        &self.entries
    }

    /// Reloads the list. On failure the previous entries are kept.
    pub async fn refresh(&mut self) -> ClientResult<&[ConversationSummary]> {
        let entries = self
            .store
            .list_conversations()
            .await
            .map_err(ClientError::FetchFailed)?;
        info!("Loaded {} conversations.", entries.len());
        self.entries = entries;
        Ok(&self.entries)
    }

    /// Deletes a conversation and drops it from the list.
    ///
    /// A conversation the store no longer knows counts as deleted. Any other
    /// failure leaves the entry in place.
    pub async fn delete(&mut self, id: &ConversationId) -> ClientResult<()> {
        match self.store.delete_conversation(id).await {
            Ok(()) | Err(PortError::NotFound(_)) => {
                self.entries.retain(|entry| &entry.id != id);
                info!("Deleted conversation {}.", id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete conversation {}: {}", id, e);
                Err(ClientError::DeleteFailed(e))
            }
        }
    }
}
