//! Sign-in, sign-up and sign-out requests.
//!
//! These wrappers never touch local session state. The provider's
//! session-change event is the single path by which a new session reaches the
//! [`SessionStore`](crate::store::SessionStore).

use crate::error::{CredentialError, CredentialErrorKind};
use crate::provider::IdentityProvider;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Stateless front for the identity provider's credential endpoints.
#[derive(Clone)]
pub struct CredentialOperations {
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialOperations {
    /// Creates the wrapper.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] with a displayable message when the
    /// input is blank or the provider refuses the request.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        let email = validate(email, password)?;
        match self.provider.sign_in_with_password(email, password).await {
            Ok(_) => {
                info!("signed in");
                Ok(())
            }
            Err(report) => {
                warn!(error = %report, "sign in failed");
                Err(CredentialError::from(report.current_context()))
            }
        }
    }

    /// Registers a new account.
    ///
    /// Succeeds both when a session is issued immediately and when the
    /// account still needs to be confirmed.
    ///
    /// # Errors
    ///
    /// Same as [`sign_in`](Self::sign_in).
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        let email = validate(email, password)?;
        match self.provider.sign_up(email, password).await {
            Ok(Some(_)) => {
                info!("signed up");
                Ok(())
            }
            Ok(None) => {
                info!("signed up, confirmation pending");
                Ok(())
            }
            Err(report) => {
                warn!(error = %report, "sign up failed");
                Err(CredentialError::from(report.current_context()))
            }
        }
    }

    /// Ends the provider session. Failures are logged and otherwise ignored.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        match self.provider.sign_out().await {
            Ok(()) => debug!("provider session ended"),
            Err(report) => warn!(error = %report, "sign out failed at the provider"),
        }
    }
}

fn validate<'a>(email: &'a str, password: &str) -> Result<&'a str, CredentialError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CredentialError::new(
            CredentialErrorKind::InvalidInput,
            "Email is required",
        ));
    }
    if password.is_empty() {
        return Err(CredentialError::new(
            CredentialErrorKind::InvalidInput,
            "Password is required",
        ));
    }
    Ok(email)
}
