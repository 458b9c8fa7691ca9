//! Session orchestration.
//!
//! [`SessionOrchestrator`] composes the session store, credential operations
//! and role selector, follows the identity provider's session-change events
//! and publishes a consolidated [`AuthSnapshot`] for the rest of the portal.
//!
//! Lifecycle:
//!
//! 1. [`start`](SessionOrchestrator::start) registers the session listener,
//!    mounts a fresh guard and spawns the startup lookup.
//! 2. Once the lookup resolves, and only if still mounted, the saved role is
//!    loaded against the now-known identity.
//! 3. Every provider event replaces the session. A new identity reloads the
//!    saved role; a sign-out clears it.
//! 4. [`stop`](SessionOrchestrator::stop) unregisters the listener and
//!    unmounts the guard, so a lookup still in flight applies nothing.

use crate::config::AccessConfig;
use crate::credentials::CredentialOperations;
use crate::error::CredentialError;
use crate::guard::MountGuard;
use crate::identity::Identity;
use crate::menu::{self, MenuItem};
use crate::provider::{IdentityProvider, SessionEvent, Subscription};
use crate::role::{Role, RoleSet};
use crate::selector::RoleSelector;
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::store::SessionStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info};

/// Where the orchestrator is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Not started yet.
    Uninitialized,
    /// Startup lookup in flight.
    Initializing,
    /// A session is present.
    Authenticated,
    /// No session.
    Unauthenticated,
}

/// Consolidated auth state published to consumers.
///
/// Every change produces a new snapshot; consumers never mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<Identity>,
    pub session: Option<Session>,
    pub selected_role: Role,
    pub available_roles: RoleSet,
    pub state: AuthState,
    pub loading: bool,
    pub is_authenticated: bool,
}

impl AuthSnapshot {
    fn initial(selected_role: Role) -> Self {
        Self {
            user: None,
            session: None,
            selected_role,
            available_roles: RoleSet::new(),
            state: AuthState::Uninitialized,
            loading: true,
            is_authenticated: false,
        }
    }

    /// Same as the `loading` field.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[derive(Default)]
struct Lifecycle {
    guard: Option<MountGuard>,
    subscription: Option<Subscription>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<SessionStore>,
    credentials: CredentialOperations,
    roles: RoleSelector,
    snapshot: watch::Sender<AuthSnapshot>,
    lifecycle: Mutex<Lifecycle>,
    started: AtomicBool,
}

impl Inner {
    fn handle_event(&self, event: &SessionEvent) {
        debug!(event = event.kind(), "session event");
        match event {
            SessionEvent::Updated(session) => {
                self.sessions.update(Some(session.clone()));
                self.roles.revalidate();
            }
            SessionEvent::SignedOut => {
                self.sessions.update(None);
                self.roles.clear_selected_role();
            }
        }
        self.publish();
    }

    fn compose(&self) -> AuthSnapshot {
        let store = self.sessions.snapshot();
        let is_authenticated = store.is_authenticated();
        let state = if store.loading {
            if self.started.load(Ordering::Acquire) {
                AuthState::Initializing
            } else {
                AuthState::Uninitialized
            }
        } else if is_authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        let user = store.session.as_ref().map(|session| session.user().clone());
        let available_roles = user
            .as_ref()
            .map(|user| user.roles().clone())
            .unwrap_or_default();

        AuthSnapshot {
            user,
            session: store.session,
            selected_role: self.roles.selected_role(),
            available_roles,
            state,
            loading: store.loading,
            is_authenticated,
        }
    }

    /// Recomputes the snapshot, notifying subscribers only on change.
    fn publish(&self) {
        self.snapshot.send_if_modified(|current| {
            let next = self.compose();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Coordinates session lifecycle, role selection and the published snapshot.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionOrchestrator {
    inner: Arc<Inner>,
}

impl SessionOrchestrator {
    /// Creates an orchestrator. Nothing happens until [`start`](Self::start).
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn KeyValueStore>,
        config: AccessConfig,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(Arc::clone(&provider)));
        let credentials = CredentialOperations::new(Arc::clone(&provider));
        let roles = RoleSelector::new(Arc::clone(&sessions), storage, config.roles);
        let (snapshot, _) = watch::channel(AuthSnapshot::initial(roles.selected_role()));

        Self {
            inner: Arc::new(Inner {
                provider,
                sessions,
                credentials,
                roles,
                snapshot,
                lifecycle: Mutex::new(Lifecycle::default()),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Registers the session listener and begins the startup lookup.
    ///
    /// Calling `start` on a running orchestrator does nothing.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.guard.is_some() {
            debug!("session orchestrator already started");
            return;
        }

        let guard = MountGuard::mounted();
        let listener = {
            let inner: Weak<Inner> = Arc::downgrade(&self.inner);
            let guard = guard.clone();
            Arc::new(move |event: &SessionEvent| {
                if !guard.is_mounted() {
                    debug!(event = event.kind(), "dropping session event after teardown");
                    return;
                }
                if let Some(inner) = inner.upgrade() {
                    inner.handle_event(event);
                }
            })
        };
        lifecycle.subscription = Some(self.inner.provider.on_auth_state_change(listener));
        lifecycle.guard = Some(guard.clone());
        self.inner.started.store(true, Ordering::Release);
        drop(lifecycle);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let session = inner.sessions.initialize(&guard).await;
            if !guard.is_mounted() {
                return;
            }
            inner.roles.load_saved_role();
            inner.publish();
            info!(
                authenticated = session.is_some(),
                role = %inner.roles.selected_role(),
                "session initialized"
            );
        });

        self.inner.publish();
        info!("session orchestrator started");
    }

    /// Unregisters the session listener and unmounts the guard.
    pub fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        let Some(guard) = lifecycle.guard.take() else {
            return;
        };
        guard.unmount();
        lifecycle.subscription.take();
        self.inner.started.store(false, Ordering::Release);
        info!("session orchestrator stopped");
    }

    /// Signs in. The session arrives through the provider's event.
    ///
    /// # Errors
    ///
    /// Returns a displayable [`CredentialError`] on failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        self.inner.credentials.sign_in(email, password).await
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns a displayable [`CredentialError`] on failure.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        self.inner.credentials.sign_up(email, password).await
    }

    /// Signs out and clears local state without waiting for the provider's
    /// event. Safe to call repeatedly.
    pub async fn sign_out(&self) {
        self.inner.credentials.sign_out().await;
        self.inner.sessions.reset();
        self.inner.roles.clear_selected_role();
        self.inner.publish();
    }

    /// Alias of [`sign_in`](Self::sign_in).
    ///
    /// # Errors
    ///
    /// Same as [`sign_in`](Self::sign_in).
    pub async fn login(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        self.sign_in(email, password).await
    }

    /// Alias of [`sign_out`](Self::sign_out).
    pub async fn logout(&self) {
        self.sign_out().await;
    }

    /// Switches the active role. Returns false, changing nothing, when the
    /// user does not hold `role`.
    pub fn set_selected_role(&self, role: Role) -> bool {
        let changed = self.inner.roles.update_selected_role(role);
        if changed {
            self.inner.publish();
        }
        changed
    }

    /// Alias of [`set_selected_role`](Self::set_selected_role).
    pub fn switch_role(&self, role: Role) -> bool {
        self.set_selected_role(role)
    }

    /// Returns the roles the current user holds.
    #[must_use]
    pub fn available_roles(&self) -> RoleSet {
        self.inner.roles.available_roles()
    }

    /// Returns the active role.
    #[must_use]
    pub fn selected_role(&self) -> Role {
        self.inner.roles.selected_role()
    }

    /// Builds the menu for `role`, or for the active role when `None`.
    #[must_use]
    pub fn menu_for_role(&self, role: Option<&Role>) -> Vec<MenuItem> {
        match role {
            Some(role) => menu::menu_for_role(role),
            None => menu::menu_for_role(&self.inner.roles.selected_role()),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver notified on every snapshot change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Waits until the startup lookup has resolved and returns the snapshot.
    ///
    /// Never resolves if the orchestrator is stopped before the lookup
    /// completes.
    pub async fn wait_until_loaded(&self) -> AuthSnapshot {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|snapshot| !snapshot.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleConfig;
    use crate::error::{CredentialErrorKind, ProviderError};
    use crate::memory::MemoryProvider;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    const KEY: &str = "selectedRole";

    struct Harness {
        provider: Arc<MemoryProvider>,
        storage: Arc<MemoryStore>,
        auth: SessionOrchestrator,
    }

    fn harness() -> Harness {
        let provider = Arc::new(MemoryProvider::new());
        let storage = Arc::new(MemoryStore::new());
        let auth = SessionOrchestrator::new(
            provider.clone(),
            storage.clone(),
            AccessConfig::default(),
        );
        Harness {
            provider,
            storage,
            auth,
        }
    }

    fn session_with(email: &str, roles: Vec<Role>) -> Session {
        let identity = Identity::new(email).with_email(email).with_roles(roles);
        Session::new("access", identity, Duration::hours(1))
    }

    fn email_of(snapshot: &AuthSnapshot) -> Option<&str> {
        snapshot.user.as_ref().and_then(Identity::email)
    }

    async fn wait_for_lookup_start(provider: &MemoryProvider) {
        while provider.lookups_started() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn fresh_start_without_session() {
        let h = harness();
        let initial = h.auth.snapshot();
        assert!(initial.loading);
        assert_eq!(initial.state, AuthState::Uninitialized);

        h.auth.start();
        assert!(h.auth.snapshot().is_loading());

        let loaded = h.auth.wait_until_loaded().await;
        assert!(!loaded.loading);
        assert!(!loaded.is_authenticated);
        assert!(loaded.user.is_none());
        assert_eq!(loaded.state, AuthState::Unauthenticated);
        assert_eq!(loaded.selected_role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn sign_in_is_reflected_through_the_event() {
        let h = harness();
        h.provider
            .register_account("a@b.com", "pw", [Role::CarrierAdmin, Role::Driver]);
        h.auth.start();
        h.auth.wait_until_loaded().await;

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        let snapshot = h.auth.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(email_of(&snapshot), Some("a@b.com"));
        assert_eq!(snapshot.state, AuthState::Authenticated);
        assert_eq!(snapshot.selected_role, Role::CarrierAdmin);
        assert_eq!(snapshot.available_roles.len(), 2);
    }

    #[tokio::test]
    async fn sign_in_falls_back_to_first_entitled_role() {
        let h = harness();
        h.provider
            .register_account("a@b.com", "pw", [Role::CarrierAdmin, Role::SuperAdmin]);
        h.auth.start();
        h.auth.wait_until_loaded().await;

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert_eq!(h.auth.selected_role(), Role::CarrierAdmin);
    }

    #[tokio::test]
    async fn sign_in_restores_saved_role() {
        let h = harness();
        h.storage.set(KEY, "driver").expect("set");
        h.provider
            .register_account("a@b.com", "pw", [Role::SuperAdmin, Role::Driver]);
        h.auth.start();
        h.auth.wait_until_loaded().await;

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert_eq!(h.auth.selected_role(), Role::Driver);
        assert_eq!(h.auth.snapshot().selected_role, Role::Driver);
    }

    #[tokio::test]
    async fn refreshed_session_keeps_chosen_role() {
        let h = harness();
        h.auth.start();
        h.auth.wait_until_loaded().await;
        let roles = vec![Role::Driver, Role::OwnerOperator];
        h.provider
            .emit(SessionEvent::Updated(session_with("a@b.com", roles.clone())));
        assert!(h.auth.switch_role(Role::OwnerOperator));
        h.storage.remove(KEY).expect("remove");

        h.provider
            .emit(SessionEvent::Updated(session_with("a@b.com", roles)));

        assert_eq!(h.auth.selected_role(), Role::OwnerOperator);
    }

    #[tokio::test]
    async fn sign_in_does_not_touch_state_without_listener() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::Driver]);

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert!(!h.auth.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn failed_sign_in_returns_message() {
        let h = harness();
        h.auth.start();
        h.auth.wait_until_loaded().await;

        let err = h.auth.login("a@b.com", "pw").await.expect_err("no account");

        assert_eq!(err.kind(), CredentialErrorKind::InvalidCredentials);
        assert!(!h.auth.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn restored_session_selects_first_entitled_role() {
        let h = harness();
        h.provider
            .restore_session(session_with("a@b.com", vec![Role::CarrierAdmin, Role::Driver]));

        h.auth.start();
        let loaded = h.auth.wait_until_loaded().await;

        assert!(loaded.is_authenticated);
        assert_eq!(loaded.selected_role, Role::CarrierAdmin);
        assert_eq!(h.auth.selected_role(), Role::CarrierAdmin);
    }

    #[tokio::test]
    async fn restored_session_restores_saved_role() {
        let h = harness();
        h.storage.set(KEY, "driver").expect("set");
        h.provider
            .restore_session(session_with("a@b.com", vec![Role::CarrierAdmin, Role::Driver]));

        h.auth.start();
        let loaded = h.auth.wait_until_loaded().await;

        assert_eq!(loaded.selected_role, Role::Driver);
    }

    #[tokio::test]
    async fn sign_out_clears_role_and_session() {
        let h = harness();
        h.provider
            .register_account("a@b.com", "pw", [Role::CarrierAdmin, Role::Driver]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");
        assert!(h.auth.switch_role(Role::Driver));
        assert_eq!(h.storage.get(KEY).expect("get").as_deref(), Some("driver"));

        h.auth.sign_out().await;

        let snapshot = h.auth.snapshot();
        assert!(!snapshot.is_authenticated);
        assert_eq!(snapshot.state, AuthState::Unauthenticated);
        assert_eq!(h.storage.get(KEY).expect("get"), None);

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in again");
        assert_eq!(h.auth.snapshot().selected_role, Role::CarrierAdmin);
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::Driver]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        h.auth.logout().await;
        h.auth.sign_out().await;

        assert!(!h.auth.snapshot().is_authenticated);
        assert_eq!(h.storage.get(KEY).expect("get"), None);
    }

    #[tokio::test]
    async fn provider_sign_out_event_clears_state() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::Driver, Role::OwnerOperator]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");
        h.auth.set_selected_role(Role::OwnerOperator);

        h.provider.expire_session();

        let snapshot = h.auth.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.user.is_none());
        assert_eq!(h.storage.get(KEY).expect("get"), None);
        assert_eq!(snapshot.selected_role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn unentitled_role_switch_is_ignored() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::ShipperAdmin]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert!(!h.auth.switch_role(Role::SuperAdmin));
        assert!(!h.auth.set_selected_role(Role::parse("dispatcher")));

        assert_eq!(h.auth.selected_role(), Role::ShipperAdmin);
        assert_eq!(h.storage.get(KEY).expect("get"), None);
    }

    #[tokio::test]
    async fn lookup_pending_at_teardown_applies_nothing() {
        let h = harness();
        h.provider
            .restore_session(session_with("a@b.com", vec![Role::Driver]));
        h.provider.hold_lookups();

        h.auth.start();
        wait_for_lookup_start(&h.provider).await;
        h.auth.stop();
        let before = h.auth.snapshot();

        h.provider.release_lookups();
        while h.provider.lookups_completed() == 0 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        let after = h.auth.snapshot();
        assert_eq!(before, after);
        assert!(after.loading);
        assert!(after.user.is_none());
        assert_eq!(h.provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn newer_event_wins_over_slow_lookup() {
        let h = harness();
        h.provider
            .restore_session(session_with("old@b.com", vec![Role::Driver]));
        h.provider.hold_lookups();

        h.auth.start();
        wait_for_lookup_start(&h.provider).await;
        h.provider.emit(SessionEvent::Updated(session_with(
            "new@b.com",
            vec![Role::FactoringAdmin],
        )));
        h.provider.release_lookups();

        let loaded = h.auth.wait_until_loaded().await;
        assert_eq!(email_of(&loaded), Some("new@b.com"));
        assert_eq!(loaded.selected_role, Role::FactoringAdmin);
    }

    #[tokio::test]
    async fn lookup_failure_still_finishes_loading() {
        let h = harness();
        h.provider.set_lookup_failure(Some(ProviderError::Transport {
            details: "connection refused".to_string(),
        }));

        h.auth.start();
        let loaded = h.auth.wait_until_loaded().await;

        assert!(!loaded.loading);
        assert!(!loaded.is_authenticated);
    }

    #[tokio::test]
    async fn events_after_stop_are_ignored() {
        let h = harness();
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.stop();

        h.provider
            .emit(SessionEvent::Updated(session_with("a@b.com", vec![Role::Driver])));

        assert!(!h.auth.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn restart_mounts_a_fresh_guard() {
        let h = harness();
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.stop();
        h.auth.start();
        h.auth.start();
        assert_eq!(h.provider.listener_count(), 1);

        h.provider
            .emit(SessionEvent::Updated(session_with("a@b.com", vec![Role::Driver])));

        assert!(h.auth.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn identity_change_revalidates_active_role() {
        let h = harness();
        h.auth.start();
        h.auth.wait_until_loaded().await;

        h.provider
            .emit(SessionEvent::Updated(session_with("a@b.com", vec![Role::Driver])));
        assert_eq!(h.auth.selected_role(), Role::Driver);

        h.provider.emit(SessionEvent::Updated(session_with(
            "a@b.com",
            vec![Role::OwnerOperator],
        )));
        assert_eq!(h.auth.selected_role(), Role::OwnerOperator);
    }

    #[tokio::test]
    async fn menu_follows_active_role() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::Driver, Role::OwnerOperator]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert_eq!(h.auth.menu_for_role(None)[0].label, "Driver Hub");
        h.auth.switch_role(Role::OwnerOperator);
        assert_eq!(h.auth.menu_for_role(None)[0].label, "Business Hub");
        assert_eq!(
            h.auth.menu_for_role(Some(&Role::SuperAdmin)),
            menu::menu_for_role(&Role::SuperAdmin)
        );
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let h = harness();
        h.provider.register_account("a@b.com", "pw", [Role::Driver]);
        h.auth.start();
        h.auth.wait_until_loaded().await;
        let mut receiver = h.auth.subscribe();
        receiver.borrow_and_update();

        h.auth.sign_in("a@b.com", "pw").await.expect("sign in");

        assert!(receiver.has_changed().expect("sender alive"));
        assert!(receiver.borrow_and_update().is_authenticated);
    }

    #[tokio::test]
    async fn configured_default_role_applies_without_entitlements() {
        let provider = Arc::new(MemoryProvider::new());
        let config = AccessConfig {
            roles: RoleConfig::default().with_default_role(Role::ShipperAdmin),
        };
        let auth = SessionOrchestrator::new(provider.clone(), Arc::new(MemoryStore::new()), config);
        provider.restore_session(session_with("a@b.com", Vec::new()));

        auth.start();
        let loaded = auth.wait_until_loaded().await;

        assert!(loaded.is_authenticated);
        assert!(loaded.available_roles.is_empty());
        assert_eq!(loaded.selected_role, Role::ShipperAdmin);
        assert!(auth.available_roles().is_empty());
    }
}
