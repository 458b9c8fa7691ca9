//! Shared result type.
//!
//! Crates define their own error enums and return them wrapped in a
//! rootcause [`Report`], which collects context and attachments on the way
//! up. Callers that need to branch on the failure inspect
//! `report.current_context()`.

use rootcause::Report;

/// Result whose error is a rootcause report over the context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
