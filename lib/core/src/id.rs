//! Strongly-typed identifiers minted by the portal itself.
//!
//! Identifiers use ULID (Universally Unique Lexicographically Sortable
//! Identifier) format and render with a short type prefix. Identifiers that
//! come from the identity provider (user ids, session tokens) are opaque
//! strings and live next to the types that carry them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid_str = s
                    .strip_prefix(concat!($prefix, "_"))
                    .unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }
    };
}

define_id!(
    /// Identifies one registered session-change listener.
    SubscriptionId,
    "sub"
);

define_id!(
    /// Identifies a token minted by an in-process identity provider.
    TokenId,
    "tok"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_id_display_format() {
        let id = SubscriptionId::new();
        assert!(id.to_string().starts_with("sub_"));
    }

    #[test]
    fn token_id_display_format() {
        let id = TokenId::new();
        assert!(id.to_string().starts_with("tok_"));
    }

    #[test]
    fn parse_with_prefix() {
        let id = SubscriptionId::new();
        let parsed: SubscriptionId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_without_prefix() {
        let ulid = Ulid::new();
        let id: TokenId = ulid.to_string().parse().expect("should parse");
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "sub_not-a-ulid"
            .parse::<SubscriptionId>()
            .expect_err("should fail");
        assert_eq!(err.id_type, "SubscriptionId");
    }

    #[test]
    fn ids_are_unique() {
        use std::collections::HashSet;

        let ids: HashSet<SubscriptionId> = (0..16).map(|_| SubscriptionId::new()).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn id_serializes_as_bare_ulid() {
        let id = TokenId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
