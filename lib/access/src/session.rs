//! Sessions established with the identity provider.
//!
//! A session is the token bundle proving a live authentication. It carries
//! the identity it was issued for, so the two are always replaced together.

use crate::identity::Identity;
use crate::role::RoleSet;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An active authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    access_token: String,
    /// Token used to obtain a new access token once this one expires.
    refresh_token: Option<String>,
    /// When the access token expires.
    expires_at: DateTime<Utc>,
    /// The identity the session was issued for.
    user: Identity,
}

impl Session {
    /// Creates a session valid for `duration` from now.
    #[must_use]
    pub fn new(access_token: impl Into<String>, user: Identity, duration: Duration) -> Self {
        Self::with_expiry(access_token, user, Utc::now() + duration)
    }

    /// Creates a session with an absolute expiry time.
    #[must_use]
    pub fn with_expiry(
        access_token: impl Into<String>,
        user: Identity,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            user,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the identity the session belongs to.
    #[must_use]
    pub fn user(&self) -> &Identity {
        &self.user
    }

    /// Returns the identity's entitled roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        self.user.roles()
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the session is still valid (not expired).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn identity() -> Identity {
        Identity::new("6f1c")
            .with_email("a@b.com")
            .with_roles(vec![Role::CarrierAdmin])
    }

    #[test]
    fn new_session_has_correct_fields() {
        let before = Utc::now();
        let session = Session::new("access", identity(), Duration::hours(1));

        assert_eq!(session.access_token(), "access");
        assert!(session.refresh_token().is_none());
        assert!(session.expires_at() > before);
        assert_eq!(session.user().email(), Some("a@b.com"));
        assert!(session.roles().contains(&Role::CarrierAdmin));
    }

    #[test]
    fn session_with_refresh_token() {
        let session =
            Session::new("access", identity(), Duration::hours(1)).with_refresh_token("refresh");
        assert_eq!(session.refresh_token(), Some("refresh"));
    }

    #[test]
    fn session_expiration() {
        let session = Session::new("access", identity(), Duration::seconds(-1));
        assert!(session.is_expired());
        assert!(!session.is_valid());

        let session = Session::new("access", identity(), Duration::hours(1));
        assert!(session.is_valid());
    }

    #[test]
    fn session_serialization_roundtrip() {
        let session =
            Session::new("access", identity(), Duration::hours(1)).with_refresh_token("refresh");
        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, parsed);
    }
}
