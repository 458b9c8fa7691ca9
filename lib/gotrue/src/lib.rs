//! GoTrue identity provider for the lynx portal.
//!
//! [`GoTrueProvider`] implements [`lynx_access::IdentityProvider`] against a
//! GoTrue (Supabase Auth) server.

pub mod client;
pub mod config;
pub mod wire;

pub use client::GoTrueProvider;
pub use config::GoTrueConfig;
