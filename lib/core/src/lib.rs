//! Core types and utilities shared by the lynx portal crates.
//!
//! This crate provides the `Result` alias used for layered error reporting
//! and the strongly-typed identifiers minted locally (subscription handles,
//! opaque tokens).

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SubscriptionId, TokenId};
