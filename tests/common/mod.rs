//! Shared helpers for integration tests.
//!
//! [`SyntheticVideo`] is an in-memory [`FrameSource`] whose frames are solid
//! colours derived from the capture timestamp, so tests can check which
//! timestamp produced which pixel without FFmpeg or fixture files.

#![allow(dead_code)]

use std::time::Duration;

use framepack::{FrameSource, FramepackError, VideoMetadata};
use image::{Rgba, RgbaImage};

pub fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

/// One recorded call to [`FrameSource::capture`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capture {
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
}

pub struct SyntheticVideo {
    metadata: VideoMetadata,
    pub captures: Vec<Capture>,
    /// Fail the capture with this call index.
    pub fail_at: Option<usize>,
    /// Fail every capture at native resolution.
    pub fail_native: bool,
}

impl SyntheticVideo {
    pub fn new(duration: Duration, width: u32, height: u32) -> Self {
        Self {
            metadata: VideoMetadata::new(duration, width, height, 30.0).with_codec("synthetic"),
            captures: Vec::new(),
            fail_at: None,
            fail_native: false,
        }
    }

    pub fn seconds(seconds: f64) -> Self {
        Self::new(Duration::from_secs_f64(seconds), 640, 480)
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn failing_native(mut self) -> Self {
        self.fail_native = true;
        self
    }
}

/// The colour a synthetic frame shows at `timestamp`.
pub fn colour_at(timestamp: Duration) -> Rgba<u8> {
    let millis = timestamp.as_millis() as u64;
    Rgba([
        (millis % 251) as u8,
        ((millis / 251) % 251) as u8,
        ((millis / 63_001) % 251) as u8,
        255,
    ])
}

impl FrameSource for SyntheticVideo {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn capture(
        &mut self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FramepackError> {
        let call = self.captures.len();
        self.captures.push(Capture {
            timestamp,
            width,
            height,
        });

        if self.fail_at == Some(call) {
            return Err(FramepackError::FfmpegError("synthetic decode failure".into()));
        }
        if self.fail_native && (width, height) == (self.metadata.width, self.metadata.height) {
            return Err(FramepackError::FfmpegError("native capture unavailable".into()));
        }

        Ok(RgbaImage::from_pixel(width, height, colour_at(timestamp)))
    }
}

/// A solid `width` x `height` frame.
pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}

/// A distinct opaque colour for frame `index`.
pub fn palette(index: usize) -> [u8; 4] {
    [
        (index * 37 % 256) as u8,
        (index * 91 % 256) as u8,
        (index * 53 % 256) as u8,
        255,
    ]
}
