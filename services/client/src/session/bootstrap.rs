//! services/client/src/session/bootstrap.rs
//!
//! This module contains the asynchronous "worker" function that loads a
//! persisted transcript when an existing conversation is opened.

use crate::error::ClientError;
use crate::session::{state::SessionState, transcript::TranscriptEvent};
use docustream_core::{ConversationId, ConversationStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

/// How a bootstrap fetch was resolved.
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// The fetched transcript replaced the greeting.
    Loaded { messages: usize },
    /// The fetch failed; the greeting stays and the conversation remains usable.
    GreetingKept(ClientError),
    /// Another conversation was opened before the fetch resolved.
    Superseded,
}

/// Fetches the transcript of `id` once and installs it.
///
/// The replacement is applied under the session lock, so it is serialized with
/// streamed appends. Messages appended locally after the fetch started are kept
/// after the fetched ones.
pub async fn bootstrap_process(
    store: Arc<dyn ConversationStore>,
    session_state_lock: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<TranscriptEvent>,
    id: ConversationId,
    epoch: u64,
) -> BootstrapOutcome {
    let start_time = Instant::now();
    info!("Bootstrap process started for conversation {}.", id);

    let fetched = store.fetch_transcript(&id).await;

    let mut session = session_state_lock.lock().await;
    if session.epoch != epoch {
        info!("Discarding transcript of {}; another conversation is displayed.", id);
        return BootstrapOutcome::Superseded;
    }
    let keep_from = session.bootstrap_mark.take().unwrap_or(session.transcript.len());

    match fetched {
        Ok(messages) => {
            let count = messages.len();
            let change = session.transcript.rebase(messages, keep_from);
            let _ = events.send(change);
            info!(
                "Loaded {} messages for {} in {:?}.",
                count,
                id,
                start_time.elapsed()
            );
            BootstrapOutcome::Loaded { messages: count }
        }
        Err(e) => {
            warn!("Failed to fetch conversation {}: {}. Keeping the greeting.", id, e);
            BootstrapOutcome::GreetingKept(ClientError::FetchFailed(e))
        }
    }
}
