//! Error types for the `framepack` crate.
//!
//! This module defines [`FramepackError`], the single error type returned by
//! every fallible operation in the pipeline. Sampling, packing, and encoding
//! failures are all surfaced to the immediate caller; nothing is retried.

use std::{io::Error as IoError, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framepack` operations.
///
/// Variants carry enough context (timestamps, frame indices, dimensions) to
/// diagnose a failure without extra logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramepackError {
    /// The video source could not be opened, or its duration or dimensions
    /// could not be determined.
    #[error("Video source is unreadable: {0}")]
    SourceUnreadable(String),

    /// A seek-and-capture cycle failed while sampling. Sampling is aborted
    /// and no partial sequence is returned.
    #[error("Failed to capture frame at {timestamp:?}: {reason}")]
    FrameCaptureError {
        /// Timestamp that was being captured.
        timestamp: Duration,
        /// Underlying reason the capture failed.
        reason: String,
    },

    /// An export was requested with zero frames.
    #[error("No frames to export")]
    EmptyInput,

    /// A frame image could not be loaded during export. The whole export is
    /// aborted; frames are never silently skipped.
    #[error("Failed to decode frame {index}: {reason}")]
    DecodeError {
        /// Position of the failing frame in the export input.
        index: usize,
        /// Underlying decoder message.
        reason: String,
    },

    /// A destination raster of the given size could not be allocated.
    #[error("Cannot allocate a {width}x{height} drawing surface")]
    SurfaceAllocationError {
        /// Requested surface width.
        width: u32,
        /// Requested surface height.
        height: u32,
    },

    /// Video encoding did not finish within its time budget.
    #[error("Video recording timed out after {0:?}")]
    RecordingTimeout(Duration),

    /// The video recorder reported a lower-level failure.
    #[error("Video encoder fault: {0}")]
    EncoderFault(String),

    /// A frame's dimensions differ from the first frame of a sprite sheet.
    #[error(
        "Frame {index} is {}x{} but the sheet cells are {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    FrameSizeMismatch {
        /// Position of the offending frame.
        index: usize,
        /// Cell size taken from the first frame.
        expected: (u32, u32),
        /// Size of the offending frame.
        actual: (u32, u32),
    },

    /// A frame rate was zero, negative, or not finite.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// A grid layout parameter was invalid (for example zero columns).
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// GIF encoding failed.
    #[error("GIF encoding error: {0}")]
    GifEncodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for FramepackError {
    fn from(error: FfmpegError) -> Self {
        FramepackError::FfmpegError(error.to_string())
    }
}
