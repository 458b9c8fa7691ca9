//! In-process identity provider.
//!
//! Keeps accounts and the current session in memory and emits the same
//! session-change events a remote provider would. Besides backing tests, it
//! lets the portal run without a network identity service.

use crate::error::ProviderError;
use crate::identity::Identity;
use crate::provider::{
    IdentityProvider, ListenerRegistry, SessionEvent, SessionListener, Subscription,
};
use crate::role::{Role, RoleSet};
use crate::session::Session;
use async_trait::async_trait;
use chrono::Duration;
use lynx_core::{Result, TokenId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

#[derive(Debug)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    current: Option<Session>,
    lookup_failure: Option<ProviderError>,
    confirmation_required: bool,
    signup_roles: RoleSet,
    session_ttl: Duration,
}

/// Identity provider that lives entirely in memory.
pub struct MemoryProvider {
    state: Mutex<MemoryState>,
    registry: ListenerRegistry,
    lookup_gate: watch::Sender<bool>,
    lookups_started: AtomicUsize,
    lookups_completed: AtomicUsize,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates a provider with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        let (lookup_gate, _) = watch::channel(false);
        Self {
            state: Mutex::new(MemoryState {
                accounts: HashMap::new(),
                current: None,
                lookup_failure: None,
                confirmation_required: false,
                signup_roles: RoleSet::new(),
                session_ttl: Duration::hours(1),
            }),
            registry: ListenerRegistry::new(),
            lookup_gate,
            lookups_started: AtomicUsize::new(0),
            lookups_completed: AtomicUsize::new(0),
        }
    }

    /// Registers an account and returns its identity.
    pub fn register_account(
        &self,
        email: &str,
        password: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Identity {
        let identity = Identity::new(TokenId::new().as_ulid().to_string())
            .with_email(email)
            .with_roles(roles.into_iter().collect::<RoleSet>());
        self.state.lock().accounts.insert(
            normalize_email(email),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        identity
    }

    /// Requires new accounts to confirm their email before a session is
    /// issued.
    pub fn set_confirmation_required(&self, required: bool) {
        self.state.lock().confirmation_required = required;
    }

    /// Sets the roles granted to accounts created through sign-up.
    pub fn set_signup_roles(&self, roles: impl IntoIterator<Item = Role>) {
        self.state.lock().signup_roles = roles.into_iter().collect();
    }

    /// Sets how long issued sessions stay valid.
    pub fn set_session_ttl(&self, ttl: Duration) {
        self.state.lock().session_ttl = ttl;
    }

    /// Makes session lookups fail with `error` until cleared with `None`.
    pub fn set_lookup_failure(&self, error: Option<ProviderError>) {
        self.state.lock().lookup_failure = error;
    }

    /// Installs a session as if it had been restored from a previous run,
    /// without emitting an event.
    pub fn restore_session(&self, session: Session) {
        self.state.lock().current = Some(session);
    }

    /// Holds every session lookup pending until [`release_lookups`] is called.
    ///
    /// [`release_lookups`]: Self::release_lookups
    pub fn hold_lookups(&self) {
        self.lookup_gate.send_replace(true);
    }

    /// Lets pending and future session lookups complete.
    pub fn release_lookups(&self) {
        self.lookup_gate.send_replace(false);
    }

    /// Returns how many session lookups have started.
    #[must_use]
    pub fn lookups_started(&self) -> usize {
        self.lookups_started.load(Ordering::SeqCst)
    }

    /// Returns how many session lookups have completed.
    #[must_use]
    pub fn lookups_completed(&self) -> usize {
        self.lookups_completed.load(Ordering::SeqCst)
    }

    /// Returns the current session.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state.lock().current.clone()
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Pushes an event to listeners, updating the current session to match.
    pub fn emit(&self, event: SessionEvent) {
        self.state.lock().current = event.session().cloned();
        self.registry.emit(&event);
    }

    /// Ends the current session as if its token had expired server-side.
    pub fn expire_session(&self) {
        self.emit(SessionEvent::SignedOut);
    }

    fn issue_session(&self, identity: Identity) -> Session {
        let ttl = self.state.lock().session_ttl;
        Session::new(TokenId::new().to_string(), identity, ttl)
            .with_refresh_token(TokenId::new().to_string())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let account = self.state.lock().accounts.get(&normalize_email(email)).cloned();
        let identity = match account {
            Some(account) if account.password == password => account.identity,
            _ => return Err(ProviderError::InvalidCredentials.into()),
        };

        let session = self.issue_session(identity);
        self.emit(SessionEvent::Updated(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, ProviderError> {
        let key = normalize_email(email);
        let (identity, confirmation_required) = {
            let mut state = self.state.lock();
            if state.accounts.contains_key(&key) {
                return Err(ProviderError::Rejected {
                    status: 422,
                    message: "User already registered".to_string(),
                }
                .into());
            }
            let identity = Identity::new(TokenId::new().as_ulid().to_string())
                .with_email(email.trim())
                .with_roles(state.signup_roles.clone());
            state.accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            (identity, state.confirmation_required)
        };

        if confirmation_required {
            return Ok(None);
        }
        let session = self.issue_session(identity);
        self.emit(SessionEvent::Updated(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.lookups_started.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.lookup_gate.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = gate.wait_for(|held| !*held).await;

        let result = {
            let state = self.state.lock();
            match &state.lookup_failure {
                Some(error) => Err(error.clone().into()),
                None => Ok(state.current.clone()),
            }
        };
        self.lookups_completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn on_auth_state_change(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        self.registry.register(listener)
    }
}
