//! Task-scoped access to the session orchestrator.
//!
//! The orchestrator is provided once at the root of the application with
//! [`provide_auth`] and looked up anywhere below it with [`use_auth`].

use crate::orchestrator::SessionOrchestrator;
use std::future::Future;

tokio::task_local! {
    static AUTH: SessionOrchestrator;
}

/// Runs `future` with `auth` available to [`use_auth`].
pub async fn provide_auth<F>(auth: SessionOrchestrator, future: F) -> F::Output
where
    F: Future,
{
    AUTH.scope(auth, future).await
}

/// Returns the orchestrator of the enclosing [`provide_auth`] scope, if any.
#[must_use]
pub fn try_use_auth() -> Option<SessionOrchestrator> {
    AUTH.try_with(SessionOrchestrator::clone).ok()
}

/// Returns the orchestrator of the enclosing [`provide_auth`] scope.
///
/// # Panics
///
/// Panics when called outside a [`provide_auth`] scope. That is a wiring
/// mistake, not a runtime condition.
#[must_use]
#[track_caller]
pub fn use_auth() -> SessionOrchestrator {
    match try_use_auth() {
        Some(auth) => auth,
        None => panic!("use_auth must be called within a provide_auth scope"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessConfig;
    use crate::memory::MemoryProvider;
    use crate::role::Role;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn orchestrator() -> SessionOrchestrator {
        SessionOrchestrator::new(
            Arc::new(MemoryProvider::new()),
            Arc::new(MemoryStore::new()),
            AccessConfig::default(),
        )
    }

    #[tokio::test]
    async fn scope_provides_orchestrator() {
        let selected = provide_auth(orchestrator(), async { use_auth().selected_role() }).await;
        assert_eq!(selected, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn lookup_outside_scope_is_none() {
        assert!(try_use_auth().is_none());
    }

    #[test]
    #[should_panic(expected = "provide_auth")]
    fn use_auth_outside_scope_panics() {
        let _ = use_auth();
    }
}
