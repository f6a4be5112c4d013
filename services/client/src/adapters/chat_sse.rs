//! services/client/src/adapters/chat_sse.rs
//!
//! This module contains the adapter for the backend's streaming chat endpoint.
//! It implements the `ChatTransport` port from the `core` crate by posting the
//! outgoing message and decoding the `text/event-stream` response.

use crate::adapters::{
    http::{endpoint, ensure_success, transport_error},
    protocol::{frame_to_event, ChatRequestBody},
    sse::SseDecoder,
};
use async_stream::stream;
use async_trait::async_trait;
use docustream_core::{ChatRequest, ChatTransport, EventStream, PortResult, StreamEvent};
use futures::StreamExt;
use reqwest::{header::ACCEPT, Client, Url};
use tracing::{info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatTransport` over HTTP server-sent events.
#[derive(Clone)]
pub struct SseChatAdapter {
    client: Client,
    base_url: Url,
}

impl SseChatAdapter {
    /// Creates a new `SseChatAdapter`.
    ///
    /// The client must not carry a global timeout: streams stay open as long as the
    /// backend keeps producing.
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

//=========================================================================================
// `ChatTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatTransport for SseChatAdapter {
    async fn open_stream(&self, request: ChatRequest) -> PortResult<EventStream> {
        let url = endpoint(&self.base_url, "chat")?;
        info!(
            "Opening chat stream for conversation {} (profile: {:?}).",
            request.conversation_id, request.extraction_profile
        );

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(&ChatRequestBody::from(&request))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "chat").await?;

        let mut body = response.bytes_stream();
        let events = stream! {
            let mut decoder = SseDecoder::default();
            let mut ended = false;

            'read: while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        ended = true;
                        yield Err(transport_error(e));
                        break 'read;
                    }
                };
                for frame in decoder.feed(&chunk) {
                    match frame_to_event(frame) {
                        Ok(Some(event)) => {
                            ended = event == StreamEvent::End;
                            yield Ok(event);
                            if ended {
                                break 'read;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            ended = true;
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }

            if !ended {
                // The body may close right after a final frame that lacks its blank line.
                match decoder.finish().map(frame_to_event).transpose() {
                    Ok(Some(Some(event))) => {
                        yield Ok(event);
                    }
                    Ok(_) => {
                        warn!("Chat stream closed without an end marker.");
                    }
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}
