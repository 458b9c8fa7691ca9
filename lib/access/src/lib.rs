//! Session lifecycle and role authorization for the lynx portal.
//!
//! This crate provides:
//! - The identity provider seam (`IdentityProvider`, `SessionEvent`) and an
//!   in-memory provider
//! - Session tracking (`SessionStore`) and credential operations
//! - Active role selection with persistence (`RoleSelector`, `KeyValueStore`)
//! - Per-role navigation menus (`menu_for_role`)
//! - The `SessionOrchestrator` tying these together and publishing an
//!   `AuthSnapshot`
//!
//! # Example
//!
//! ```
//! use lynx_access::{AccessConfig, MemoryProvider, MemoryStore, Role, SessionOrchestrator};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = Arc::new(MemoryProvider::new());
//! provider.register_account("a@b.com", "pw", [Role::CarrierAdmin, Role::Driver]);
//!
//! let auth = SessionOrchestrator::new(
//!     provider,
//!     Arc::new(MemoryStore::new()),
//!     AccessConfig::default(),
//! );
//! auth.start();
//! auth.wait_until_loaded().await;
//!
//! auth.sign_in("a@b.com", "pw").await.unwrap();
//! assert_eq!(auth.selected_role(), Role::CarrierAdmin);
//! assert!(auth.switch_role(Role::Driver));
//! assert_eq!(auth.menu_for_role(None)[0].label, "Driver Hub");
//! # }
//! ```

pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod identity;
pub mod memory;
pub mod menu;
pub mod orchestrator;
pub mod provider;
pub mod role;
pub mod selector;
pub mod session;
pub mod storage;
pub mod store;

// Re-export main types at crate root
pub use config::{AccessConfig, RoleConfig};
pub use context::{provide_auth, try_use_auth, use_auth};
pub use credentials::CredentialOperations;
pub use error::{CredentialError, CredentialErrorKind, ProviderError, StorageError};
pub use guard::MountGuard;
pub use identity::{Identity, UserId};
pub use memory::MemoryProvider;
pub use menu::{Icon, MenuItem, menu_for_role};
pub use orchestrator::{AuthSnapshot, AuthState, SessionOrchestrator};
pub use provider::{
    IdentityProvider, ListenerRegistry, SessionEvent, SessionListener, Subscription,
};
pub use role::{Role, RoleSet, UnknownRole};
pub use selector::RoleSelector;
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{SessionStore, StoreSnapshot};
