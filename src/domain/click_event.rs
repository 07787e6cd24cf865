//! Click flush job model for asynchronous click count reconciliation.

/// Request to copy a fast click counter value into the link store.
///
/// Produced by [`crate::application::services::ClickAccumulator`] at batch
/// boundaries and consumed by [`crate::domain::click_worker::run_click_worker`].
/// `count` is the absolute counter value, not a delta, so a dropped or
/// reordered job is repaired by the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickFlush {
    pub shorten_key: String,
    pub count: u64,
}

impl ClickFlush {
    pub fn new(shorten_key: impl Into<String>, count: u64) -> Self {
        Self {
            shorten_key: shorten_key.into(),
            count,
        }
    }
}
