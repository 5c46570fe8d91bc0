//! The frame capture capability.

use std::time::Duration;

use image::RgbaImage;

use crate::{error::FramepackError, metadata::VideoMetadata};

/// A seekable video that can render a still at any timestamp.
///
/// [`MediaFile`](crate::MediaFile) implements this with FFmpeg. Tests and
/// embedders can supply their own source (for example a synthetic clip or a
/// browser-side decoder).
///
/// Captures take `&mut self`: a source performs one seek at a time, and a
/// pending capture must complete before the next begins.
pub trait FrameSource {
    /// Metadata computed when the source was opened.
    fn metadata(&self) -> &VideoMetadata;

    /// Seek to `timestamp` and render the frame shown there, scaled to
    /// `width` x `height`.
    ///
    /// Timestamps at or beyond the end of the video return the last frame.
    fn capture(
        &mut self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FramepackError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn capture(
        &mut self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FramepackError> {
        (**self).capture(timestamp, width, height)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn capture(
        &mut self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FramepackError> {
        (**self).capture(timestamp, width, height)
    }
}
