//! Latest known session snapshot.
//!
//! The store mirrors the provider's session and tracks whether the startup
//! lookup is still running. It never propagates provider failures: a failed
//! lookup resolves to "no session" so the portal always leaves the loading
//! state.

use crate::guard::MountGuard;
use crate::identity::Identity;
use crate::provider::IdentityProvider;
use crate::session::Session;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct StoreState {
    session: Option<Session>,
    loading: bool,
    /// Bumped on every replacement, so a lookup can tell whether it was overtaken.
    revision: u64,
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    /// The current session.
    pub session: Option<Session>,
    /// True until the startup lookup has resolved.
    pub loading: bool,
}

impl StoreSnapshot {
    /// Returns true when a session is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Holds the current session and the loading flag.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Creates a store that has not looked anything up yet.
    ///
    /// The store starts out loading: until [`initialize`](Self::initialize)
    /// resolves nothing is known about the session.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(StoreState {
                session: None,
                loading: true,
                revision: 0,
            }),
        }
    }

    /// Looks up an existing session at startup.
    ///
    /// Sets loading before the lookup and clears it afterwards whatever the
    /// outcome. Failures and expired sessions resolve to `None`. If `guard`
    /// was unmounted while the lookup was pending, nothing is applied. If a
    /// session event replaced the snapshot while the lookup was pending, the
    /// newer snapshot wins.
    ///
    /// Returns the session in effect afterwards.
    pub async fn initialize(&self, guard: &MountGuard) -> Option<Session> {
        let revision = {
            let mut state = self.state.lock();
            state.loading = true;
            state.revision
        };

        let looked_up = match self.provider.get_session().await {
            Ok(Some(session)) if session.is_expired() => {
                debug!("restored session has expired, treating as signed out");
                None
            }
            Ok(session) => session,
            Err(report) => {
                warn!(error = %report, "session lookup failed, continuing without a session");
                None
            }
        };

        if !guard.is_mounted() {
            debug!("dropping session lookup result after teardown");
            return None;
        }

        let mut state = self.state.lock();
        state.loading = false;
        if state.revision == revision {
            state.session = looked_up;
            state.revision += 1;
        } else {
            debug!("session changed during startup lookup, keeping the newer session");
        }
        state.session.clone()
    }

    /// Replaces the snapshot with `session`.
    ///
    /// This is a full replacement, never a merge. Replacing with an equal
    /// value is harmless.
    pub fn update(&self, session: Option<Session>) {
        let mut state = self.state.lock();
        state.session = session;
        state.revision += 1;
    }

    /// Clears the session.
    pub fn reset(&self) {
        self.update(None);
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock();
        StoreSnapshot {
            session: state.session.clone(),
            loading: state.loading,
        }
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    /// Returns the identity of the current session.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state
            .lock()
            .session
            .as_ref()
            .map(|session| session.user().clone())
    }

    /// Returns true when a session is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Returns true until the startup lookup has resolved.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }
}
