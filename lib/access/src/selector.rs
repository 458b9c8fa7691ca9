//! Active role selection.
//!
//! An identity may hold several roles but the portal renders under exactly
//! one at a time. The selector keeps that active role, persists the choice in
//! client-side storage and keeps it within the identity's entitlements:
//!
//! - with no entitled roles the active role is the configured default role
//! - otherwise the active role is one of the entitled roles
//!
//! When no valid saved choice exists the active role falls back to the first
//! entitled role, or to the default role when there is none. The choice is
//! resolved again whenever a different identity signs in; a refreshed session
//! for the same identity keeps it.

use crate::config::RoleConfig;
use crate::identity::UserId;
use crate::role::{Role, RoleSet};
use crate::storage::KeyValueStore;
use crate::store::SessionStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tracks and persists the active role.
pub struct RoleSelector {
    sessions: Arc<SessionStore>,
    storage: Arc<dyn KeyValueStore>,
    config: RoleConfig,
    active: Mutex<Role>,
    resolved_for: Mutex<Option<UserId>>,
}

impl RoleSelector {
    /// Creates a selector whose active role starts at the configured default.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        storage: Arc<dyn KeyValueStore>,
        config: RoleConfig,
    ) -> Self {
        let active = Mutex::new(config.default_role().clone());
        Self {
            sessions,
            storage,
            config,
            active,
            resolved_for: Mutex::new(None),
        }
    }

    /// Returns the roles the current identity is entitled to, in entitlement
    /// order. Empty when nobody is signed in.
    #[must_use]
    pub fn available_roles(&self) -> RoleSet {
        self.sessions
            .identity()
            .map(|identity| identity.roles().clone())
            .unwrap_or_default()
    }

    /// Returns the active role.
    #[must_use]
    pub fn selected_role(&self) -> Role {
        self.active.lock().clone()
    }

    /// Returns the configured default role.
    #[must_use]
    pub fn default_role(&self) -> &Role {
        self.config.default_role()
    }

    /// Restores the persisted role, falling back when it is missing or no
    /// longer entitled.
    pub fn load_saved_role(&self) {
        let (user, available) = self.current();
        let saved = self.read_saved();

        let role = match saved {
            Some(role) if is_valid(&role, &available, self.config.default_role()) => {
                debug!(role = %role, "restored saved role");
                role
            }
            Some(role) => {
                let fallback = self.fallback(&available);
                debug!(saved = %role, role = %fallback, "saved role not entitled, falling back");
                fallback
            }
            None => self.fallback(&available),
        };
        self.resolve(user, role);
    }

    /// Switches the active role and persists the choice.
    ///
    /// Returns false, leaving the active role untouched, when `role` is not
    /// one of [`available_roles`](Self::available_roles).
    pub fn update_selected_role(&self, role: Role) -> bool {
        let (user, available) = self.current();
        if !available.contains(&role) {
            warn!(role = %role, "ignoring selection of a role the user does not hold");
            return false;
        }

        if let Err(report) = self.storage.set(self.config.storage_key(), role.as_str()) {
            warn!(error = %report, "failed to persist selected role");
        }
        info!(role = %role, "active role changed");
        self.resolve(user, role);
        true
    }

    /// Forgets the persisted role and resets to the fallback.
    pub fn clear_selected_role(&self) {
        if let Err(report) = self.storage.remove(self.config.storage_key()) {
            warn!(error = %report, "failed to clear persisted role");
        }
        let (user, available) = self.current();
        let fallback = self.fallback(&available);
        self.resolve(user, fallback);
    }

    /// Re-checks the active role against the current identity.
    ///
    /// A different identity than the one the role was resolved for reloads
    /// the saved role. The same identity keeps its role unless it is no
    /// longer entitled to it.
    pub fn revalidate(&self) {
        let (user, available) = self.current();
        if *self.resolved_for.lock() != user {
            debug!(user = ?user.as_ref().map(UserId::as_str), "identity changed, reloading role");
            self.load_saved_role();
            return;
        }
        let active = self.selected_role();
        if !is_valid(&active, &available, self.config.default_role()) {
            debug!(role = %active, "active role no longer valid, reloading");
            self.load_saved_role();
        }
    }

    fn current(&self) -> (Option<UserId>, RoleSet) {
        match self.sessions.identity() {
            Some(identity) => (Some(identity.id().clone()), identity.roles().clone()),
            None => (None, RoleSet::new()),
        }
    }

    fn resolve(&self, user: Option<UserId>, role: Role) {
        *self.active.lock() = role;
        *self.resolved_for.lock() = user;
    }

    fn fallback(&self, available: &RoleSet) -> Role {
        available
            .first()
            .cloned()
            .unwrap_or_else(|| self.config.default_role().clone())
    }

    fn read_saved(&self) -> Option<Role> {
        match self.storage.get(self.config.storage_key()) {
            Ok(Some(value)) if !value.trim().is_empty() => Some(Role::parse(value.trim())),
            Ok(_) => None,
            Err(report) => {
                warn!(error = %report, "failed to read persisted role");
                None
            }
        }
    }
}

fn is_valid(role: &Role, available: &RoleSet, default_role: &Role) -> bool {
    if available.is_empty() {
        role == default_role
    } else {
        available.contains(role)
    }
}
