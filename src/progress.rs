//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes long-running passes (sampling, targeted
//! capture, video export), [`ProgressInfo`] is the snapshot it receives, and
//! [`CancellationToken`] lets a caller abandon a pass cooperatively.
//!
//! Any `Fn(&ProgressInfo) + Send + Sync` closure is a progress callback, so
//! the common "fraction done" hook is a one-liner.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepack::{FrameSampler, FramepackError, MediaFile, ProgressInfo, SamplingOptions};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let options = SamplingOptions::new().with_progress(Arc::new(|info: &ProgressInfo| {
//!     if let Some(fraction) = info.fraction() {
//!         println!("{:.0}%", fraction * 100.0);
//!     }
//! }));
//!
//! let sampled = FrameSampler::new(&mut video).sample(&options)?;
//! # Ok::<(), FramepackError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Thumbnail sampling pass over a whole video.
    FrameSampling,
    /// Full-resolution capture at caller-chosen timestamps.
    FrameCapture,
    /// Drawing frames into a video recorder.
    VideoExport,
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Sequence index of the frame just processed.
    pub current_frame: Option<u64>,
    /// Timestamp of the frame just processed.
    pub current_timestamp: Option<Duration>,
}

impl ProgressInfo {
    /// Completion as a fraction in `0.0..=1.0`, if the total is known.
    pub fn fraction(&self) -> Option<f32> {
        self.percentage.map(|pct| (pct / 100.0).clamp(0.0, 1.0))
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks may run
/// on a worker thread (video export, async sampling).
///
/// Progress callbacks are infallible: they observe but cannot halt the
/// operation. Use [`CancellationToken`] to stop early.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an operation.
    fn on_progress(&self, info: &ProgressInfo);
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressInfo) + Send + Sync,
{
    fn on_progress(&self, info: &ProgressInfo) {
        self(info)
    }
}

/// Discards all progress notifications. Default when nothing is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state: cancelling any clone cancels them all. Sampling loops
/// check the token before each capture; the video export draw loop checks it
/// before each frame.
///
/// # Example
///
/// ```
/// use framepack::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether any clone has called [`cancel`](Self::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Counts finished items for one pass and reports every `every` items.
pub(crate) struct ProgressTracker {
    sink: Arc<dyn ProgressCallback>,
    operation: OperationType,
    expected: Option<u64>,
    done: u64,
    every: u64,
    pending: u64,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        sink: Arc<dyn ProgressCallback>,
        operation: OperationType,
        expected: Option<u64>,
        every: u64,
    ) -> Self {
        Self {
            sink,
            operation,
            expected,
            done: 0,
            every: every.max(1),
            pending: 0,
            started: Instant::now(),
        }
    }

    /// Count one finished frame.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>, timestamp: Option<Duration>) {
        self.done += 1;
        self.pending += 1;
        if self.pending == self.every {
            self.pending = 0;
            self.sink.on_progress(&self.snapshot(frame_index, timestamp));
        }
    }

    /// Final report. The total becomes the processed count, so a pass that
    /// stops early (end of video, frame cap) still ends at 100%.
    pub(crate) fn finish(&mut self) {
        self.expected = Some(self.done);
        self.sink.on_progress(&self.snapshot(None, None));
    }

    fn snapshot(
        &self,
        current_frame: Option<u64>,
        current_timestamp: Option<Duration>,
    ) -> ProgressInfo {
        let elapsed = self.started.elapsed();
        let percentage = self.expected.map(|expected| match expected {
            0 => 100.0,
            expected => self.done as f32 * 100.0 / expected as f32,
        });
        let estimated_remaining = self.expected.filter(|_| self.done > 0).map(|expected| {
            let left = expected.saturating_sub(self.done) as f64;
            elapsed.mul_f64(left / self.done as f64)
        });

        ProgressInfo {
            operation: self.operation,
            current: self.done,
            total: self.expected,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame,
            current_timestamp,
        }
    }
}
