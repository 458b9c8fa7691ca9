//! Portal roles and entitled role sets.
//!
//! Every identity is entitled to zero or more roles. The portal renders under
//! exactly one of them at a time (the active role, see
//! [`RoleSelector`](crate::selector::RoleSelector)). Roles are a closed set of
//! known portals plus an `Unknown` fallback so that a role string the portal
//! has never heard of still round-trips instead of failing to parse.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Portal role an identity may be entitled to.
///
/// Serialized as its snake_case name (`"carrier_admin"`), which is also the
/// format stored for the persisted active role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Platform operator with access to every portal.
    SuperAdmin,
    /// Carrier fleet administrator.
    CarrierAdmin,
    /// Freight broker administrator.
    FreightBrokerAdmin,
    /// Shipper administrator.
    ShipperAdmin,
    /// Company driver.
    Driver,
    /// Independent owner-operator.
    OwnerOperator,
    /// Factoring company administrator.
    FactoringAdmin,
    /// A role name the portal does not know about.
    ///
    /// Only [`Role::parse`] builds one, so it never holds a known name.
    Unknown(UnknownRole),
}

/// Name of a role outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownRole(String);

impl UnknownRole {
    /// Returns the name as it was given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Role {
    /// Returns every known role, in display order.
    #[must_use]
    pub fn known() -> [Role; 7] {
        [
            Self::SuperAdmin,
            Self::CarrierAdmin,
            Self::FreightBrokerAdmin,
            Self::ShipperAdmin,
            Self::Driver,
            Self::OwnerOperator,
            Self::FactoringAdmin,
        ]
    }

    /// Parses a role name.
    ///
    /// Matching ignores ASCII case and surrounding whitespace, and accepts the
    /// legacy names `broker_admin` and `carrier_driver`. Anything else becomes
    /// [`Role::Unknown`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "super_admin" => Self::SuperAdmin,
            "carrier_admin" => Self::CarrierAdmin,
            "freight_broker_admin" | "broker_admin" => Self::FreightBrokerAdmin,
            "shipper_admin" => Self::ShipperAdmin,
            "driver" | "carrier_driver" => Self::Driver,
            "owner_operator" => Self::OwnerOperator,
            "factoring_admin" => Self::FactoringAdmin,
            _ => Self::Unknown(UnknownRole(name.trim().to_string())),
        }
    }

    /// Returns the canonical role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::CarrierAdmin => "carrier_admin",
            Self::FreightBrokerAdmin => "freight_broker_admin",
            Self::ShipperAdmin => "shipper_admin",
            Self::Driver => "driver",
            Self::OwnerOperator => "owner_operator",
            Self::FactoringAdmin => "factoring_admin",
            Self::Unknown(name) => name.as_str(),
        }
    }

    /// Returns a human-readable label, e.g. "Carrier Admin".
    #[must_use]
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns true for roles the portal has a dedicated view for.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Ordered set of roles an identity is entitled to.
///
/// Order is entitlement order as reported by the identity provider; the first
/// role is the fallback when no valid role has been selected. Duplicates are
/// dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, returning false if it was already present.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.roles.contains(&role) {
            return false;
        }
        self.roles.push(role);
        true
    }

    /// Returns true if the set contains `role`.
    #[must_use]
    pub fn contains(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Returns the first entitled role.
    #[must_use]
    pub fn first(&self) -> Option<&Role> {
        self.roles.first()
    }

    /// Returns the roles as a slice.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Iterates over the roles in entitlement order.
    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.roles.iter()
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if the identity has no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = Self::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.roles
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.roles.iter()
    }
}
