//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ProviderError`: Failures reported by (or while reaching) the identity provider
//! - `StorageError`: Failures reading or writing persisted client-side values
//! - `CredentialError`: The normalized, user-facing outcome of sign-in and sign-up

use std::fmt;

/// Errors from identity provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Email/password combination was rejected.
    InvalidCredentials,
    /// The provider refused the request.
    Rejected { status: u16, message: String },
    /// The provider could not be reached.
    Transport { details: String },
    /// The provider answered with something we could not interpret.
    InvalidResponse { details: String },
    /// The operation needs a session and there is none.
    SessionMissing,
}

impl ProviderError {
    /// Returns a message suitable for showing next to a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid login credentials".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport { .. } => "Unable to reach the authentication service".to_string(),
            Self::InvalidResponse { .. } => {
                "Unexpected response from the authentication service".to_string()
            }
            Self::SessionMissing => "No active session".to_string(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid login credentials"),
            Self::Rejected { status, message } => {
                write!(f, "identity provider rejected request ({status}): {message}")
            }
            Self::Transport { details } => {
                write!(f, "failed to reach identity provider: {details}")
            }
            Self::InvalidResponse { details } => {
                write!(f, "invalid identity provider response: {details}")
            }
            Self::SessionMissing => write!(f, "no active session"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from persisted key-value storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    Io { path: String, details: String },
    /// The stored data could not be (de)serialized.
    Serialization { details: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, details } => write!(f, "storage I/O error on '{path}': {details}"),
            Self::Serialization { details } => write!(f, "storage serialization error: {details}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Classification of a failed sign-in or sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialErrorKind {
    /// The request was malformed before reaching the provider.
    InvalidInput,
    /// Email/password combination was rejected.
    InvalidCredentials,
    /// The provider refused the request for another reason.
    Rejected,
    /// The provider could not be reached or answered unexpectedly.
    Unavailable,
}

/// Normalized outcome of a failed sign-in or sign-up.
///
/// Returned instead of propagating provider errors so callers can render the
/// message inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError {
    kind: CredentialErrorKind,
    message: String,
}

impl CredentialError {
    /// Creates a credential error.
    #[must_use]
    pub fn new(kind: CredentialErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub fn kind(&self) -> CredentialErrorKind {
        self.kind
    }

    /// Returns the user-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&ProviderError> for CredentialError {
    fn from(error: &ProviderError) -> Self {
        let kind = match error {
            ProviderError::InvalidCredentials => CredentialErrorKind::InvalidCredentials,
            ProviderError::Rejected { .. } | ProviderError::SessionMissing => {
                CredentialErrorKind::Rejected
            }
            ProviderError::Transport { .. } | ProviderError::InvalidResponse { .. } => {
                CredentialErrorKind::Unavailable
            }
        };
        Self::new(kind, error.user_message())
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CredentialError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_rejected_display() {
        let err = ProviderError::Rejected {
            status: 422,
            message: "User already registered".to_string(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("User already registered"));
    }

    #[test]
    fn provider_error_transport_display() {
        let err = ProviderError::Transport {
            details: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::Io {
            path: "/tmp/storage.json".to_string(),
            details: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/tmp/storage.json"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn credential_error_from_invalid_credentials() {
        let err = CredentialError::from(&ProviderError::InvalidCredentials);
        assert_eq!(err.kind(), CredentialErrorKind::InvalidCredentials);
        assert_eq!(err.message(), "Invalid login credentials");
    }

    #[test]
    fn credential_error_keeps_provider_message() {
        let err = CredentialError::from(&ProviderError::Rejected {
            status: 429,
            message: "Email rate limit exceeded".to_string(),
        });
        assert_eq!(err.kind(), CredentialErrorKind::Rejected);
        assert_eq!(err.to_string(), "Email rate limit exceeded");
    }

    #[test]
    fn credential_error_hides_transport_details() {
        let err = CredentialError::from(&ProviderError::Transport {
            details: "dns error: no such host".to_string(),
        });
        assert_eq!(err.kind(), CredentialErrorKind::Unavailable);
        assert!(!err.message().contains("dns"));
    }
}
