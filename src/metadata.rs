//! Video metadata.

use std::time::Duration;

/// Properties of a video source, computed once when the source is opened.
///
/// # Example
///
/// ```no_run
/// use framepack::{FrameSource, MediaFile};
///
/// let video = MediaFile::open("clip.mp4")?;
/// let metadata = video.metadata();
/// println!("{}x{} for {:.2}s", metadata.width, metadata.height, metadata.duration_seconds());
/// # Ok::<(), framepack::FramepackError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Total play length.
    pub duration: Duration,
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated frame count, from duration and frame rate.
    pub approx_frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
}

impl VideoMetadata {
    /// Build metadata for a source with the given duration and size. The
    /// frame count is derived from `frames_per_second`.
    pub fn new(duration: Duration, width: u32, height: u32, frames_per_second: f64) -> Self {
        let approx_frame_count = if frames_per_second.is_finite() && frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second).round() as u64
        } else {
            0
        };
        Self {
            duration,
            width,
            height,
            frames_per_second,
            approx_frame_count,
            codec: String::new(),
        }
    }

    /// Set the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Duration in fractional seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
