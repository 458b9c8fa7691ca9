//! The identity provider seam.
//!
//! The portal treats the identity provider as an opaque external service that
//! signs users in and out, answers "is there a session right now?", and pushes
//! session-change events to registered listeners. Implementations live
//! elsewhere: [`MemoryProvider`](crate::memory::MemoryProvider) for tests and
//! offline use, and the GoTrue client in `lynx-gotrue`.

use crate::error::ProviderError;
use crate::session::Session;
use async_trait::async_trait;
use lynx_core::{Result, SubscriptionId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A change in the provider's session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was established, refreshed or otherwise replaced.
    Updated(Session),
    /// The session ended (explicit sign-out or expiry).
    SignedOut,
}

impl SessionEvent {
    /// Returns the session carried by the event.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Updated(session) => Some(session),
            Self::SignedOut => None,
        }
    }

    /// Returns the event kind name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Updated(_) => "SESSION_UPDATED",
            Self::SignedOut => "SIGNED_OUT",
        }
    }
}

/// Observer of session-change events.
pub trait SessionListener: Send + Sync {
    /// Called for every event, on the thread that emitted it.
    fn on_session_event(&self, event: &SessionEvent);
}

impl<F> SessionListener for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_session_event(&self, event: &SessionEvent) {
        self(event)
    }
}

type Listeners = Mutex<Vec<(SubscriptionId, Arc<dyn SessionListener>)>>;

/// Listener bookkeeping shared by provider implementations.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Listeners>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; it stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn register(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        let id = SubscriptionId::new();
        self.listeners.lock().push((id, listener));
        tracing::debug!(subscription = %id, "registered session listener");
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers an event to every registered listener.
    ///
    /// Listeners run outside the registry lock, so they may register or
    /// unsubscribe from within the callback.
    pub fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(
            event = event.kind(),
            listeners = listeners.len(),
            "emitting session event"
        );
        for listener in listeners {
            listener.on_session_event(event);
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

/// Handle for a registered listener.
///
/// Dropping the handle unregisters the listener.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    id: SubscriptionId,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Returns the subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unregisters the listener.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
            tracing::debug!(subscription = %self.id, "unregistered session listener");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// Registers a new account.
    ///
    /// Returns `None` when the account needs confirmation before a session
    /// is issued.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, ProviderError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Looks up the current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Registers a listener for session-change events.
    fn on_auth_state_change(&self, listener: Arc<dyn SessionListener>) -> Subscription;
}
