//! Progress reporting for zone assignment and dataset loading.
//!
//! Library code reports through [`ProgressCallback`] and never renders
//! anything itself; the CLI supplies an `indicatif` bar.

use std::sync::Arc;

/// Receives progress from long-running work.
pub trait ProgressCallback: Send + Sync {
    /// Number of listings (or loading steps) that will be reported.
    fn set_total(&self, total: u64);

    /// `delta` more listings or steps are done.
    fn inc(&self, delta: u64);

    /// Describes the current phase.
    fn set_message(&self, msg: String);

    /// The work is done; `msg` summarizes it.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by tests and non-interactive callers.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
