//! services/client/src/session/identity.rs
//!
//! Guarantees that an outgoing message carries exactly one agreed-upon
//! conversation id, and that the navigable address shows it before the
//! message departs.

use crate::session::state::SessionContext;
use docustream_core::{
    ports::{conversation_location, ROOT_LOCATION},
    ConversationId, NavigableAddress, PortError,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Clone)]
pub struct IdentityResolver {
    context: Arc<SessionContext>,
    address: Arc<dyn NavigableAddress>,
    /// Held across every identity change, from the context commit to the
    /// address write, so the two are never observed out of step.
    transition: Arc<Mutex<()>>,
}

/// Exclusive access to the conversation identity.
///
/// While this is held no other identity change can start, so a caller can check
/// that the conversation it works on is still displayed and act on that answer.
pub struct IdentityLock<'a> {
    resolver: &'a IdentityResolver,
    _guard: MutexGuard<'a, ()>,
}

/// The id a send must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: ConversationId,
    /// Set when the id was minted but the address could not show it. Non-fatal.
    pub address_error: Option<PortError>,
}

impl IdentityResolver {
    pub fn new(context: Arc<SessionContext>, address: Arc<dyn NavigableAddress>) -> Self {
        Self {
            context,
            address,
            transition: Arc::new(Mutex::new(())),
        }
    }

    /// Waits for any identity change in progress and blocks new ones until the
    /// returned lock is dropped.
    pub async fn lock(&self) -> IdentityLock<'_> {
        IdentityLock {
            resolver: self,
            _guard: self.transition.lock().await,
        }
    }

    async fn show(&self, location: &str) -> Option<PortError> {
        // The address is presentation only; failing to update it never blocks a send.
        match self.address.replace(location).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to update the address to {}: {}", location, e);
                Some(e)
            }
        }
    }
}

impl IdentityLock<'_> {
    /// Returns the id the next send must carry.
    ///
    /// A fresh session mints an id on its first send. The id is committed to the
    /// shared context and written to the address before this returns, and the value
    /// returned is the one read back from the context, so the caller passes it to the
    /// transport explicitly.
    pub async fn resolve(&self) -> Resolution {
        let (id, minted) = self.resolver.context.get_or_mint().await;
        let mut address_error = None;
        if minted {
            info!("Minted conversation id {}.", id);
            address_error = self.resolver.show(&conversation_location(&id)).await;
        }
        Resolution { id, address_error }
    }

    /// Reuses an existing identity for a reopened conversation.
    pub async fn adopt(&self, id: ConversationId) {
        let location = conversation_location(&id);
        self.resolver.context.set_conversation_id(Some(id)).await;
        self.resolver.show(&location).await;
    }

    /// Forgets the identity; the next send mints a new one.
    pub async fn reset(&self) {
        self.resolver.context.set_conversation_id(None).await;
        self.resolver.show(ROOT_LOCATION).await;
    }
}
