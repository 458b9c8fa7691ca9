//! Configuration for session and role handling.
//!
//! Fields with defaults can be omitted when loading from environment
//! variables.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Access-layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Active role handling.
    #[serde(default)]
    pub roles: RoleConfig,
}

/// Configuration for active role selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role used when the identity has no entitled role to fall back to, and
    /// before any identity is known.
    /// Default: "super_admin"
    #[serde(default = "default_role")]
    default_role: Role,
    /// Storage key under which the active role is persisted.
    /// Default: "selectedRole"
    #[serde(default = "default_storage_key")]
    storage_key: String,
}

fn default_role() -> Role {
    Role::SuperAdmin
}

fn default_storage_key() -> String {
    "selectedRole".to_string()
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            storage_key: default_storage_key(),
        }
    }
}

impl RoleConfig {
    /// Sets the fallback role.
    #[must_use]
    pub fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = role;
        self
    }

    /// Sets the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Returns the fallback role.
    #[must_use]
    pub fn default_role(&self) -> &Role {
        &self.default_role
    }

    /// Returns the storage key for the persisted role.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}
