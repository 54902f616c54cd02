//! Status-callback trait for run-stage events.
//!
//! Inject an [`Arc<dyn StatusCallback>`] via
//! [`crate::config::GenerationConfigBuilder::status_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a status label, a terminal spinner, or a log record
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the same callback can be
//! shared across runs.

use crate::deliver::RunStage;
use std::sync::Arc;

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait StatusCallback: Send + Sync {
    /// Called on every state transition, including the final return to
    /// [`RunStage::Idle`].
    fn on_stage(&self, stage: RunStage) {
        let _ = stage;
    }

    /// Called after extraction with the size of the combined text and the
    /// number of images handed to the describer.
    fn on_extracted(&self, text_len: usize, image_count: usize) {
        let _ = (text_len, image_count);
    }

    /// Called after each image batch is described.
    ///
    /// # Arguments
    /// * `batch_num`   — 1-indexed batch number
    /// * `batch_total` — total number of batches for this document
    fn on_batch_described(&self, batch_num: usize, batch_total: usize) {
        let _ = (batch_num, batch_total);
    }

    /// Called after submission with the store's accepted count and the
    /// number of notes sent.
    fn on_notes_submitted(&self, created: usize, submitted: usize) {
        let _ = (created, submitted);
    }
}

/// A no-op implementation for callers that don't need status events.
///
/// This is the default when no callback is configured.
pub struct NoopStatusCallback;

impl StatusCallback for NoopStatusCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type SharedStatusCallback = Arc<dyn StatusCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        stages: Mutex<Vec<RunStage>>,
        batches: AtomicUsize,
        created: AtomicUsize,
    }

    impl StatusCallback for TrackingCallback {
        fn on_stage(&self, stage: RunStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_batch_described(&self, _batch_num: usize, _batch_total: usize) {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }

        fn on_notes_submitted(&self, created: usize, _submitted: usize) {
            self.created.store(created, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopStatusCallback;
        cb.on_stage(RunStage::Reading);
        cb.on_extracted(120, 4);
        cb.on_batch_described(1, 2);
        cb.on_notes_submitted(3, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            stages: Mutex::new(Vec::new()),
            batches: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        };

        tracker.on_stage(RunStage::Reading);
        tracker.on_stage(RunStage::Synthesizing);
        tracker.on_batch_described(1, 2);
        tracker.on_batch_described(2, 2);
        tracker.on_notes_submitted(5, 6);

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![RunStage::Reading, RunStage::Synthesizing]
        );
        assert_eq!(tracker.batches.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.created.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn StatusCallback> = Arc::new(NoopStatusCallback);
        cb.on_stage(RunStage::Done);
        cb.on_notes_submitted(1, 1);
    }
}
