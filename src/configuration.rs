//! Sampling configuration.
//!
//! [`SamplingOptions`] is a builder that threads progress callbacks,
//! cancellation tokens, and the sampling limits through
//! [`FrameSampler`](crate::FrameSampler) without polluting every signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepack::{CancellationToken, ProgressInfo, SamplingOptions};
//!
//! let token = CancellationToken::new();
//! let options = SamplingOptions::new()
//!     .with_progress(Arc::new(|info: &ProgressInfo| {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }))
//!     .with_cancellation(token.clone())
//!     .with_max_frames(120)
//!     .with_batch_size(10);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Upper bound on the number of frames one sampling pass produces.
pub const DEFAULT_MAX_FRAMES: usize = 300;

/// Thumbnails are captured at `native / DEFAULT_THUMBNAIL_DIVISOR` per side.
pub const DEFAULT_THUMBNAIL_DIVISOR: u32 = 4;

/// Configuration for sampling passes.
///
/// All fields have defaults: no progress, no cancellation, a cap of
/// [`DEFAULT_MAX_FRAMES`] frames, and quarter-size thumbnails.
#[derive(Clone)]
pub struct SamplingOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
    /// Maximum number of frames a pass will capture.
    pub(crate) max_frames: usize,
    /// Divisor applied to native dimensions for thumbnails.
    pub(crate) thumbnail_divisor: u32,
}

impl Debug for SamplingOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplingOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("max_frames", &self.max_frames)
            .field("thumbnail_divisor", &self.thumbnail_divisor)
            .finish_non_exhaustive()
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            max_frames: DEFAULT_MAX_FRAMES,
            thumbnail_divisor: DEFAULT_THUMBNAIL_DIVISOR,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// The token is checked before every capture; once cancelled the pass
    /// returns [`FramepackError::Cancelled`](crate::FramepackError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Cap the number of frames a sampling pass produces.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the thumbnail divisor. Clamped to at least 1 (native size).
    #[must_use]
    pub fn with_thumbnail_divisor(mut self, divisor: u32) -> Self {
        self.thumbnail_divisor = divisor.max(1);
        self
    }

    /// Maximum frames per pass.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Thumbnail divisor.
    pub fn thumbnail_divisor(&self) -> u32 {
        self.thumbnail_divisor
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
