//! The signed-in identity as reported by the identity provider.
//!
//! The portal never owns identities. It mirrors the provider's user record
//! read-only for as long as a session is established.

use crate::role::RoleSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque user identifier assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID from the provider's identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the user ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user record from the identity provider plus the roles it is entitled to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user ID.
    id: UserId,
    /// Email address, when the provider knows one.
    email: Option<String>,
    /// Free-form profile attributes (the provider's user metadata).
    #[serde(default)]
    attributes: Map<String, Value>,
    /// Roles the identity is entitled to, in entitlement order.
    #[serde(default)]
    roles: RoleSet,
}

impl Identity {
    /// Creates an identity with no email, attributes or roles.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            attributes: Map::new(),
            roles: RoleSet::new(),
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the entitled roles.
    #[must_use]
    pub fn with_roles(mut self, roles: impl Into<RoleSet>) -> Self {
        self.roles = roles.into();
        self
    }

    /// Sets the profile attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns the provider-assigned user ID.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the email address, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns all profile attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns a single profile attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the display name.
    ///
    /// Uses the `full_name` or `name` attribute, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        ["full_name", "name"]
            .iter()
            .find_map(|key| self.attribute(key).and_then(Value::as_str))
            .or(self.email())
    }

    /// Returns the entitled roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }
}
