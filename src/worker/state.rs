use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::types::NodeProfile;

/// State the sync worker shares with the status surface.
///
/// The worker is the only writer; status queries and the watchdog read.
#[derive(Debug, Default)]
pub struct WorkerState {
    pending_scan: AtomicBool,
    profile: OnceLock<NodeProfile>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the worker runs a node-blocking audit, import or rescan
    pub fn is_pending_scan(&self) -> bool {
        self.pending_scan.load(Ordering::Acquire)
    }

    /// Mark a scan as pending until the returned guard is dropped
    pub fn begin_scan(&self) -> PendingScanGuard<'_> {
        self.pending_scan.store(true, Ordering::Release);
        PendingScanGuard { state: self }
    }

    /// Record the node profile; only the first call has an effect
    pub fn record_profile(&self, profile: NodeProfile) {
        if self.profile.set(profile).is_err() {
            log::debug!("Node profile already recorded");
        }
    }

    /// Recorded profile, or an empty one before the worker got that far
    pub fn profile(&self) -> NodeProfile {
        self.profile.get().cloned().unwrap_or_default()
    }
}

#[must_use = "the pending flag clears as soon as the guard is dropped"]
pub struct PendingScanGuard<'a> {
    state: &'a WorkerState,
}

impl Drop for PendingScanGuard<'_> {
    fn drop(&mut self) {
        self.state.pending_scan.store(false, Ordering::Release);
    }
}
