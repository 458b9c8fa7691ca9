//! GoTrue connection settings.

use serde::{Deserialize, Serialize};

/// Connection settings for a GoTrue identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoTrueConfig {
    /// Project base URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// Public API key sent with every request.
    pub anon_key: String,
    /// Storage key for the persisted session.
    /// Default: `sb-<first host label>-auth-token`
    #[serde(default)]
    pub storage_key: Option<String>,
}

impl GoTrueConfig {
    /// Creates settings with the default storage key.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            storage_key: None,
        }
    }

    /// Returns the URL of an auth endpoint.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/v1/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns the key under which the session is persisted.
    ///
    /// Matches the key the browser client uses, so both can share storage.
    #[must_use]
    pub fn storage_key(&self) -> String {
        if let Some(key) = &self.storage_key {
            return key.clone();
        }
        let project = reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|url| {
                url.host_str()
                    .and_then(|host| host.split('.').next())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "local".to_string());
        format!("sb-{project}-auth-token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_uses_project_ref() {
        let config = GoTrueConfig::new("https://abcdefgh.supabase.co", "anon");
        assert_eq!(config.storage_key(), "sb-abcdefgh-auth-token");
    }

    #[test]
    fn storage_key_for_local_instance() {
        let config = GoTrueConfig::new("http://127.0.0.1:54321", "anon");
        assert_eq!(config.storage_key(), "sb-127-auth-token");

        let config = GoTrueConfig::new("not a url", "anon");
        assert_eq!(config.storage_key(), "sb-local-auth-token");
    }

    #[test]
    fn explicit_storage_key_wins() {
        let mut config = GoTrueConfig::new("https://abcdefgh.supabase.co", "anon");
        config.storage_key = Some("portal-session".to_string());
        assert_eq!(config.storage_key(), "portal-session");
    }

    #[test]
    fn endpoint_joins_paths() {
        let config = GoTrueConfig::new("https://abcdefgh.supabase.co/", "anon");
        assert_eq!(
            config.endpoint("token?grant_type=password"),
            "https://abcdefgh.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn deserializes_without_storage_key() {
        let config: GoTrueConfig =
            serde_json::from_str(r#"{"url": "https://x.supabase.co", "anon_key": "k"}"#)
                .expect("deserialize");
        assert_eq!(config.storage_key, None);
    }
}
