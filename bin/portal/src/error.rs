//! Command errors.

use std::fmt;

/// Failures reported to the command line.
#[derive(Debug)]
pub enum PortalError {
    /// Configuration could not be loaded.
    Configuration { details: String },
    /// The identity provider could not be set up.
    Provider { details: String },
    /// Sign-in or sign-up was refused.
    Credentials { message: String },
    /// The user does not hold the requested role.
    RoleNotHeld { role: String },
    /// Output could not be rendered.
    Output { details: String },
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "configuration error: {details}"),
            Self::Provider { details } => write!(f, "identity provider unavailable: {details}"),
            Self::Credentials { message } => f.write_str(message),
            Self::RoleNotHeld { role } => write!(f, "role '{role}' is not available to this user"),
            Self::Output { details } => write!(f, "failed to render output: {details}"),
        }
    }
}

impl std::error::Error for PortalError {}
