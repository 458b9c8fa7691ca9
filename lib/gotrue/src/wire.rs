//! GoTrue request and response bodies.

use chrono::{DateTime, Utc};
use lynx_access::{Identity, ProviderError, Role, RoleSet, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifetime assumed when a token response carries no expiry.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Email/password request body for sign-in and sign-up.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Refresh-token request body.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// User record as returned by GoTrue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl WireUser {
    /// Converts to an identity. Roles come from `app_metadata.roles` (an
    /// array) or, failing that, `app_metadata.role` (a single name).
    #[must_use]
    pub fn to_identity(&self) -> Identity {
        let identity = Identity::new(self.id.as_str())
            .with_roles(roles_from(&self.app_metadata))
            .with_attributes(self.user_metadata.clone());
        match &self.email {
            Some(email) if !email.is_empty() => identity.with_email(email.as_str()),
            _ => identity,
        }
    }
}

fn roles_from(app_metadata: &Map<String, Value>) -> RoleSet {
    if let Some(Value::Array(names)) = app_metadata.get("roles") {
        return names.iter().filter_map(Value::as_str).map(Role::parse).collect();
    }
    app_metadata
        .get("role")
        .and_then(Value::as_str)
        .map(Role::parse)
        .into_iter()
        .collect()
}

/// Token grant response. Also the persisted session format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Expiry as Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: WireUser,
}

impl TokenResponse {
    /// Fills in `expires_at` from `expires_in` when the server omitted it.
    #[must_use]
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
            self.expires_at = Some(now.timestamp() + expires_in);
        }
        self
    }

    /// Converts to a session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidResponse`] when the expiry is missing
    /// or out of range.
    pub fn to_session(&self) -> Result<Session, ProviderError> {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| ProviderError::InvalidResponse {
                details: "token response has no valid expiry".to_string(),
            })?;
        let session = Session::with_expiry(
            self.access_token.as_str(),
            self.user.to_identity(),
            expires_at,
        );
        Ok(match &self.refresh_token {
            Some(token) => session.with_refresh_token(token.as_str()),
            None => session,
        })
    }
}

/// Sign-up response: a session when the account is confirmed immediately,
/// otherwise the bare user awaiting confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(WireUser),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classifies a failed response.
#[must_use]
pub fn provider_error(status: u16, body: &str) -> ProviderError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let bad_credentials = body.error.as_deref() == Some("invalid_grant")
        || body.error_code.as_deref() == Some("invalid_credentials");
    if status == 400 && bad_credentials {
        return ProviderError::InvalidCredentials;
    }

    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| format!("request failed with status {status}"));
    ProviderError::Rejected { status, message }
}
