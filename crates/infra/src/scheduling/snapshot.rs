//! Published snapshot slot
//!
//! The only piece of state shared between the refresh loop (writer) and the
//! exporter endpoint (readers). Publication replaces the whole value behind
//! a read/write lock, so readers always observe either the previous complete
//! report or the new one, never a partially constructed report.

use std::sync::Arc;

use parking_lot::RwLock;
use ratewatch_domain::CycleReport;

/// Cloneable handle to the current cycle report.
///
/// `None` means no cycle has completed yet (the explicit "not ready" state).
#[derive(Clone, Default)]
pub struct SnapshotSlot {
    inner: Arc<RwLock<Option<Arc<CycleReport>>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current report, or `None` before the first successful cycle.
    ///
    /// Returns a reference-counted handle to the whole report; the slot can
    /// be republished without invalidating what a reader already holds.
    pub fn current(&self) -> Option<Arc<CycleReport>> {
        self.inner.read().clone()
    }

    /// Whether at least one cycle has been published.
    pub fn is_ready(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Atomically replace the published report.
    pub fn publish(&self, report: CycleReport) {
        *self.inner.write() = Some(Arc::new(report));
    }
}
