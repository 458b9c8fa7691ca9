//! Mount guard for asynchronous work owned by a component.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag telling in-flight work whether its owner is still mounted.
///
/// Each mount creates a fresh guard. Work spawned under a guard checks it
/// before applying results, so a late completion after teardown is dropped
/// even if the owner has since been mounted again.
#[derive(Debug, Clone)]
pub struct MountGuard(Arc<AtomicBool>);

impl MountGuard {
    /// Creates a guard in the mounted state.
    #[must_use]
    pub fn mounted() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Returns true while the owner is mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Marks the owner as torn down.
    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}
