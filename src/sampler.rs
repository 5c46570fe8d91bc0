//! Timestamp-based frame sampling.
//!
//! A [`FrameSampler`] walks a [`FrameSource`] at a fixed rate chosen from the
//! video's duration ([`SamplingPolicy`]) and captures a thumbnail at every
//! step, producing an ordered sequence of [`RawFrame`]s.
//!
//! Sampling is lazy: [`FrameSampler::iter`] returns a [`SampleIterator`]
//! that performs one seek-and-capture per [`next()`](Iterator::next).
//! [`FrameSampler::sample`] drains it into a [`SampledVideo`].
//!
//! # Example
//!
//! ```no_run
//! use framepack::{FrameSampler, FrameWindow, MediaFile, SamplingOptions};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let sampled = FrameSampler::new(&mut video).sample(&SamplingOptions::default())?;
//!
//! println!("{} frames", sampled.frames.len());
//! for frame in sampled.window(FrameWindow::new(0, 25)) {
//!     println!("{} at {:?}", frame.id, frame.timestamp);
//! }
//! # Ok::<(), framepack::FramepackError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::Range,
    sync::Arc,
    time::Duration,
};

use image::RgbaImage;

use crate::{
    configuration::SamplingOptions,
    error::FramepackError,
    metadata::VideoMetadata,
    progress::{OperationType, ProgressTracker},
    source::FrameSource,
};

/// The sampling rate used for a video, derived from its duration.
///
/// | Duration        | Samples per second | Step      |
/// |-----------------|--------------------|-----------|
/// | under 5 s       | 24                 | 1/24 s    |
/// | 5 s to 30 s     | 12                 | 1/12 s    |
/// | over 30 s       | 1                  | 1 s       |
///
/// Timestamps are computed as `index / rate` rather than by repeated
/// addition, so long clips accumulate no drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    samples_per_second: u32,
}

impl SamplingPolicy {
    /// Pick the sampling rate for a clip of the given length.
    pub fn for_duration(duration: Duration) -> Self {
        let seconds = duration.as_secs_f64();
        let samples_per_second = if seconds < 5.0 {
            24
        } else if seconds > 30.0 {
            1
        } else {
            12
        };
        Self { samples_per_second }
    }

    /// Samples taken per second of video.
    pub fn samples_per_second(&self) -> u32 {
        self.samples_per_second
    }

    /// Interval between consecutive samples.
    pub fn step(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.samples_per_second))
    }

    /// Timestamp of the `index`-th sample.
    pub fn timestamp(&self, index: usize) -> Duration {
        Duration::from_secs_f64(self.seconds_at(index))
    }

    /// How many frames a full pass over `duration` produces when capped at
    /// `max_frames`.
    pub fn expected_frames(&self, duration: Duration, max_frames: usize) -> usize {
        let exact = (duration.as_secs_f64() * f64::from(self.samples_per_second)).ceil();
        (exact as usize).min(max_frames)
    }

    fn seconds_at(&self, index: usize) -> f64 {
        index as f64 / f64::from(self.samples_per_second)
    }
}

/// Stable identifier of a sampled frame, displayed as `frame-{index}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl Display for FrameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "frame-{}", self.0)
    }
}

/// One sampled thumbnail.
///
/// The pixel buffer is reference-counted, so cloning a frame or handing it
/// to several exporters never copies pixels.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Identifier, unique within one sampling pass.
    pub id: FrameId,
    /// The captured image.
    pub image: Arc<RgbaImage>,
    /// Position in the source video.
    pub timestamp: Duration,
    /// Position in the sampled sequence.
    pub index: usize,
}

/// A contiguous selection of sampled frames.
///
/// Windows never fail: a window that runs past the end of the sequence
/// selects fewer frames, and one that starts past the end selects none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameWindow {
    /// Index of the first selected frame.
    pub start: usize,
    /// Maximum number of frames selected.
    pub length: usize,
}

impl FrameWindow {
    /// Create a window of `length` frames starting at `start`.
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// The clamped index range this window covers in a sequence of `total`
    /// frames.
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = self.start.min(total);
        let end = self.start.saturating_add(self.length).min(total);
        start..end
    }

    /// Select this window out of `frames`.
    pub fn select<'f, T>(&self, frames: &'f [T]) -> &'f [T] {
        &frames[self.range(frames.len())]
    }
}

/// The result of a sampling pass.
#[derive(Debug, Clone)]
pub struct SampledVideo {
    /// Frames in timestamp order.
    pub frames: Vec<RawFrame>,
    /// Metadata of the sampled source.
    pub metadata: VideoMetadata,
}

impl SampledVideo {
    /// Frames covered by `window`.
    pub fn window(&self, window: FrameWindow) -> &[RawFrame] {
        window.select(&self.frames)
    }
}

/// Samples frames from a [`FrameSource`].
///
/// The sampler borrows its source mutably, so only one sampling pass can
/// touch a source at a time.
pub struct FrameSampler<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> FrameSampler<'a, S> {
    /// Wrap a source for sampling.
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }

    /// Sample the whole video into memory.
    ///
    /// Captures thumbnails at `native / thumbnail_divisor` starting at `t = 0`,
    /// stepping by the [`SamplingPolicy`] for the duration, until the end of
    /// the video or `max_frames` frames.
    ///
    /// # Errors
    ///
    /// - [`FramepackError::SourceUnreadable`] if the source has zero width or
    ///   height.
    /// - [`FramepackError::FrameCaptureError`] if any capture fails. No
    ///   partial sequence is returned.
    /// - [`FramepackError::Cancelled`] if the cancellation token fires.
    pub fn sample(&mut self, options: &SamplingOptions) -> Result<SampledVideo, FramepackError> {
        let metadata = self.source.metadata().clone();
        let policy = SamplingPolicy::for_duration(metadata.duration);
        let expected = policy.expected_frames(metadata.duration, options.max_frames);

        log::debug!(
            "Sampling {:.3}s video at {} frames per second (expecting {} frames)",
            metadata.duration_seconds(),
            policy.samples_per_second(),
            expected
        );

        let mut frames = Vec::with_capacity(expected);
        for frame in self.iter(options)? {
            frames.push(frame?);
        }

        log::info!("Sampled {} frames", frames.len());

        Ok(SampledVideo { frames, metadata })
    }

    /// Begin a lazy sampling pass.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::SourceUnreadable`] if the source has zero
    /// width or height.
    pub fn iter(&mut self, options: &SamplingOptions) -> Result<SampleIterator<'_, S>, FramepackError> {
        SampleIterator::new(&mut *self.source, options)
    }

    /// Capture frames at native resolution at the given timestamps, in order.
    ///
    /// Unlike [`sample`](Self::sample) this is not capped. Used to
    /// re-extract a selected window at full quality before packing.
    ///
    /// # Errors
    ///
    /// [`FramepackError::FrameCaptureError`] on the first failing capture, or
    /// [`FramepackError::Cancelled`].
    pub fn sample_at(
        &mut self,
        timestamps: &[Duration],
        options: &SamplingOptions,
    ) -> Result<Vec<RgbaImage>, FramepackError> {
        let (width, height) = native_dimensions(self.source.metadata())?;

        log::debug!(
            "Capturing {} frames at native resolution {}x{}",
            timestamps.len(),
            width,
            height
        );

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::FrameCapture,
            Some(timestamps.len() as u64),
            options.batch_size,
        );

        let mut images = Vec::with_capacity(timestamps.len());
        for (index, &timestamp) in timestamps.iter().enumerate() {
            if options.is_cancelled() {
                return Err(FramepackError::Cancelled);
            }
            let image = self
                .source
                .capture(timestamp, width, height)
                .map_err(|error| capture_error(timestamp, error))?;
            images.push(image);
            tracker.advance(Some(index as u64), Some(timestamp));
        }
        tracker.finish();

        Ok(images)
    }
}

/// Lazy iterator over sampled frames.
///
/// Each call to [`next()`](Iterator::next) performs one capture. The
/// iterator is finite (bounded by duration and `max_frames`), cannot be
/// restarted, and stops for good after yielding an error.
pub struct SampleIterator<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    options: SamplingOptions,
    policy: SamplingPolicy,
    duration_seconds: f64,
    thumbnail_width: u32,
    thumbnail_height: u32,
    limit: usize,
    next_index: usize,
    tracker: ProgressTracker,
    done: bool,
}

impl<'a, S: FrameSource + ?Sized> SampleIterator<'a, S> {
    pub(crate) fn new(source: &'a mut S, options: &SamplingOptions) -> Result<Self, FramepackError> {
        let metadata = source.metadata();
        native_dimensions(metadata)?;

        let divisor = options.thumbnail_divisor.max(1);
        let thumbnail_width = (metadata.width / divisor).max(1);
        let thumbnail_height = (metadata.height / divisor).max(1);
        let policy = SamplingPolicy::for_duration(metadata.duration);
        let duration_seconds = metadata.duration_seconds();
        let limit = policy.expected_frames(metadata.duration, options.max_frames);

        let tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::FrameSampling,
            Some(limit as u64),
            options.batch_size,
        );

        Ok(Self {
            source,
            options: options.clone(),
            policy,
            duration_seconds,
            thumbnail_width,
            thumbnail_height,
            limit,
            next_index: 0,
            tracker,
            done: false,
        })
    }

    /// Size of the thumbnails this pass captures.
    pub fn thumbnail_size(&self) -> (u32, u32) {
        (self.thumbnail_width, self.thumbnail_height)
    }

    /// The sampling policy in effect.
    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    fn finish(&mut self) {
        self.done = true;
        self.tracker.finish();
    }
}

impl<S: FrameSource + ?Sized> Iterator for SampleIterator<'_, S> {
    type Item = Result<RawFrame, FramepackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let index = self.next_index;
        if index >= self.limit || self.policy.seconds_at(index) >= self.duration_seconds {
            self.finish();
            return None;
        }

        if self.options.is_cancelled() {
            self.done = true;
            return Some(Err(FramepackError::Cancelled));
        }

        let timestamp = self.policy.timestamp(index);
        match self
            .source
            .capture(timestamp, self.thumbnail_width, self.thumbnail_height)
        {
            Ok(image) => {
                self.next_index += 1;
                self.tracker.advance(Some(index as u64), Some(timestamp));
                Some(Ok(RawFrame {
                    id: FrameId(index),
                    image: Arc::new(image),
                    timestamp,
                    index,
                }))
            }
            Err(error) => {
                self.done = true;
                log::debug!("Sampling aborted at {timestamp:?}: {error}");
                Some(Err(capture_error(timestamp, error)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.limit.saturating_sub(self.next_index)))
        }
    }
}

fn native_dimensions(metadata: &VideoMetadata) -> Result<(u32, u32), FramepackError> {
    if metadata.width == 0 || metadata.height == 0 {
        return Err(FramepackError::SourceUnreadable(format!(
            "video reports {}x{} dimensions",
            metadata.width, metadata.height
        )));
    }
    Ok((metadata.width, metadata.height))
}

/// Wrap a source failure as a capture error for `timestamp`, leaving
/// already-specific errors intact.
fn capture_error(timestamp: Duration, error: FramepackError) -> FramepackError {
    match error {
        FramepackError::FrameCaptureError { .. } | FramepackError::Cancelled => error,
        other => FramepackError::FrameCaptureError {
            timestamp,
            reason: other.to_string(),
        },
    }
}
