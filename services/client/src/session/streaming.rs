//! services/client/src/session/streaming.rs
//!
//! This module contains the asynchronous "worker" function that drains one
//! streamed response into the transcript.

use crate::session::{
    state::{SendOutcome, SendPhase, SessionState},
    transcript::TranscriptEvent,
};
use docustream_core::{EventStream, StreamEvent};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Applies streamed events to the transcript strictly in arrival order.
///
/// The task stops touching the transcript as soon as the conversation it was
/// started for is no longer displayed: either the token fires or the session's
/// epoch moved on.
pub async fn stream_process(
    session_state_lock: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<TranscriptEvent>,
    mut stream: EventStream,
    cancellation_token: CancellationToken,
    epoch: u64,
) -> SendOutcome {
    let start_time = Instant::now();
    info!("Stream process started.");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => {
                info!("Stream process cancelled.");
                return SendOutcome::Superseded;
            }
            next = stream.next() => next,
        };

        let mut session = session_state_lock.lock().await;
        if session.epoch != epoch {
            info!("Dropping stream for a conversation that is no longer displayed.");
            return SendOutcome::Superseded;
        }

        match next {
            Some(Ok(StreamEvent::End)) | None => {
                if let Some(change) = session.transcript.finish() {
                    let _ = events.send(change);
                }
                session.phase = SendPhase::Idle;
                info!("Stream completed in {:?}.", start_time.elapsed());
                return SendOutcome::Completed;
            }
            Some(Ok(event)) => {
                for change in session.transcript.apply(event) {
                    let _ = events.send(change);
                }
            }
            Some(Err(e)) => {
                error!("Stream failed after {:?}: {}", start_time.elapsed(), e);
                for change in session.transcript.fail() {
                    let _ = events.send(change);
                }
                session.phase = SendPhase::Idle;
                return SendOutcome::Failed(e);
            }
        }
    }
}
