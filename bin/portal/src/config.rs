//! Portal configuration.
//!
//! Loaded via the `config` crate from `LYNX__`-prefixed environment
//! variables, with `__` separating nested keys:
//!
//! - `LYNX__DATA_DIR`
//! - `LYNX__ROLES__DEFAULT_ROLE`, `LYNX__ROLES__STORAGE_KEY`
//! - `LYNX__GOTRUE__URL`, `LYNX__GOTRUE__ANON_KEY`, `LYNX__GOTRUE__STORAGE_KEY`
//! - `LYNX__OFFLINE__EMAIL`, `LYNX__OFFLINE__PASSWORD`, `LYNX__OFFLINE__ROLES`

use lynx_access::{AccessConfig, Role};
use lynx_gotrue::GoTrueConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Portal configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct PortalConfig {
    /// Directory holding persisted client state.
    /// Default: ".lynx"
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Session and role handling.
    #[serde(flatten)]
    pub access: AccessConfig,

    /// Identity service. Without it the portal runs against an in-memory
    /// provider.
    #[serde(default)]
    pub gotrue: Option<GoTrueConfig>,

    /// Account seeded into the in-memory provider.
    #[serde(default)]
    pub offline: Option<OfflineAccount>,
}

/// An account available when running without an identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineAccount {
    pub email: String,
    pub password: String,
    /// Comma-separated role names, e.g. `carrier_admin,driver`.
    #[serde(default)]
    pub roles: String,
}

impl OfflineAccount {
    /// Returns the parsed roles in listed order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Role::parse)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".lynx")
}

impl PortalConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_config(
            config::Config::builder()
                .add_source(
                    config::Environment::with_prefix("LYNX")
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                )
                .build()?,
        )
    }

    fn from_config(config: config::Config) -> Result<Self, config::ConfigError> {
        config.try_deserialize()
    }
}
