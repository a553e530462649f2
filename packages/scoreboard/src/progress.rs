//! Progress reporting for the day-by-day scoreboard fetch.
//!
//! The fetch loop only knows how many days it has to walk and how many it
//! has finished. Rendering (progress bars, silence) is chosen by the binary.

use std::sync::Arc;

/// Sink for day-count updates from [`crate::fetch::fetch_scoreboard_range`].
pub trait ProgressCallback: Send + Sync {
    /// Called once with the number of days in the range.
    fn set_total(&self, total: u64);

    /// Called after each day's scoreboard arrives.
    fn inc(&self, delta: u64);

    /// The day being requested, as `Scoreboard YYYY/MM/DD`.
    fn set_message(&self, msg: String);

    /// Called after the last day with a closing summary.
    fn finish(&self, msg: String);
}

/// Ignores all updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`] for callers that do not render progress.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
