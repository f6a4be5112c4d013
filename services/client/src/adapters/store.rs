//! services/client/src/adapters/store.rs
//!
//! This module contains the adapter for the backend's persisted conversations.
//! It implements the `ConversationStore` port from the `core` crate.

use crate::adapters::{
    http::{endpoint, ensure_success, transport_error},
    protocol::StoredMessage,
};
use async_trait::async_trait;
use docustream_core::{
    ConversationId, ConversationStore, ConversationSummary, Message, PortError, PortResult,
};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::info;

/// An adapter that implements `ConversationStore` against the REST endpoints.
#[derive(Clone)]
pub struct HttpConversationStore {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpConversationStore {
    /// Creates a new `HttpConversationStore`.
    pub fn new(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    fn chat_url(&self, id: &ConversationId) -> PortResult<Url> {
        endpoint(&self.base_url, &format!("chats/{}", id))
    }
}

#[async_trait]
impl ConversationStore for HttpConversationStore {
    async fn list_conversations(&self) -> PortResult<Vec<ConversationSummary>> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "chats")?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "chats").await?;

        response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed conversation list: {}", e)))
    }

    async fn fetch_transcript(&self, id: &ConversationId) -> PortResult<Vec<Message>> {
        let response = self
            .client
            .get(self.chat_url(id)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, &format!("conversation {}", id)).await?;

        let stored: Vec<StoredMessage> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed transcript: {}", e)))?;
        info!("Fetched {} messages for conversation {}.", stored.len(), id);
        Ok(stored.into_iter().map(Message::from).collect())
    }

    async fn delete_conversation(&self, id: &ConversationId) -> PortResult<()> {
        let response = self
            .client
            .delete(self.chat_url(id)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response, &format!("conversation {}", id)).await?;
        Ok(())
    }
}
