//! GoTrue identity provider.
//!
//! Talks to the `/auth/v1` REST endpoints and keeps the session in the
//! portal's key-value storage, in the same JSON shape and under the same key
//! as the browser client.

use crate::config::GoTrueConfig;
use crate::wire::{self, PasswordRequest, RefreshRequest, SignUpResponse, TokenResponse};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use lynx_access::{
    IdentityProvider, KeyValueStore, ListenerRegistry, ProviderError, Session, SessionEvent,
    SessionListener, Subscription,
};
use lynx_core::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Request timeout for every call to the identity service.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Sessions this close to expiry are refreshed before being handed out.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Identity provider backed by a GoTrue server.
pub struct GoTrueProvider {
    http: reqwest::Client,
    config: GoTrueConfig,
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    listeners: ListenerRegistry,
}

impl GoTrueProvider {
    /// Creates a provider persisting its session in `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: GoTrueConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport {
                details: format!("HTTP client error: {e}"),
            })?;
        let storage_key = config.storage_key();
        Ok(Self {
            http,
            config,
            storage,
            storage_key,
            listeners: ListenerRegistry::new(),
        })
    }

    /// Returns the key the session is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    async fn post<B>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer.unwrap_or(self.config.anon_key.as_str()))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                details: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), path, "identity service refused request");
        Err(wire::provider_error(status.as_u16(), &body).into())
    }

    async fn post_json<T, B>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.post(path, bearer, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse {
                    details: e.to_string(),
                }
                .into()
            })
    }

    /// Persists `token` and announces the new session.
    fn establish(&self, token: TokenResponse) -> Result<Session, ProviderError> {
        let token = token.stamped(Utc::now());
        let session = token.to_session()?;
        self.persist(&token);
        self.listeners.emit(&SessionEvent::Updated(session.clone()));
        Ok(session)
    }

    fn persist(&self, token: &TokenResponse) {
        let json = match serde_json::to_string(token) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize session");
                return;
            }
        };
        if let Err(report) = self.storage.set(&self.storage_key, &json) {
            warn!(error = %report, "failed to persist session");
        }
    }

    fn load_persisted(&self) -> Option<TokenResponse> {
        let json = match self.storage.get(&self.storage_key) {
            Ok(json) => json?,
            Err(report) => {
                warn!(error = %report, "failed to read persisted session");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                self.clear_persisted();
                None
            }
        }
    }

    fn clear_persisted(&self) {
        if let Err(report) = self.storage.remove(&self.storage_key) {
            warn!(error = %report, "failed to clear persisted session");
        }
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let token: TokenResponse = self
            .post_json(
                "token?grant_type=refresh_token",
                None,
                &RefreshRequest { refresh_token },
            )
            .await?;
        debug!("session refreshed");
        self.establish(token)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let token: TokenResponse = self
            .post_json(
                "token?grant_type=password",
                None,
                &PasswordRequest { email, password },
            )
            .await?;
        let session = self.establish(token)?;
        info!(user = %session.user().id(), "signed in");
        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, ProviderError> {
        let response: SignUpResponse = self
            .post_json("signup", None, &PasswordRequest { email, password })
            .await?;
        match response {
            SignUpResponse::Session(token) => self.establish(token).map(Some),
            SignUpResponse::User(user) => {
                info!(user = %user.id, "sign up pending confirmation");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), ProviderError> {
        let token = self.load_persisted();
        self.clear_persisted();

        let result = match &token {
            Some(token) => self
                .post(
                    "logout?scope=global",
                    Some(token.access_token.as_str()),
                    &serde_json::json!({}),
                )
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        self.listeners.emit(&SessionEvent::SignedOut);

        match result {
            Err(report)
                if matches!(
                    report.current_context(),
                    ProviderError::Rejected {
                        status: 401 | 403 | 404,
                        ..
                    }
                ) =>
            {
                debug!("session already ended at the identity service");
                Ok(())
            }
            other => other,
        }
    }

    #[instrument(skip(self))]
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(token) = self.load_persisted() else {
            return Ok(None);
        };
        let session = match token.to_session() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding persisted session");
                self.clear_persisted();
                return Ok(None);
            }
        };
        if session.expires_at() > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token() else {
            debug!("persisted session expired without a refresh token");
            self.clear_persisted();
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(report) if matches!(report.current_context(), ProviderError::Transport { .. }) => {
                Err(report)
            }
            Err(report) => {
                warn!(error = %report, "session refresh refused, signing out");
                self.clear_persisted();
                self.listeners.emit(&SessionEvent::SignedOut);
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        self.listeners.register(listener)
    }
}
