//! # framepack
//!
//! Turn a video clip into a bounded sequence of sampled frames, then export
//! a window of them as a PNG sprite sheet, an animated GIF, or a WebM clip.
//!
//! Decoding and WebM encoding are powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; GIF output
//! uses the [`gif`](https://crates.io/crates/gif) crate and all raster work
//! goes through [`image`].
//!
//! ## Quick Start
//!
//! ### Sample a Video
//!
//! ```no_run
//! use framepack::{FrameSampler, MediaFile, SamplingOptions};
//!
//! let mut video = MediaFile::open("clip.mp4").unwrap();
//! let sampled = FrameSampler::new(&mut video)
//!     .sample(&SamplingOptions::default())
//!     .unwrap();
//! println!("{} thumbnails", sampled.frames.len());
//! ```
//!
//! ### Pack a Sprite Sheet
//!
//! ```no_run
//! use framepack::{FrameSampler, FrameWindow, MediaFile, SamplingOptions, SheetOptions, frame_refs};
//!
//! let mut video = MediaFile::open("clip.mp4").unwrap();
//! let sampled = FrameSampler::new(&mut video)
//!     .sample(&SamplingOptions::default())
//!     .unwrap();
//!
//! let window = frame_refs(sampled.window(FrameWindow::new(0, 25)));
//! framepack::pack(&window, &SheetOptions::default())
//!     .unwrap()
//!     .save("sprite-sheet.png")
//!     .unwrap();
//! ```
//!
//! ### Export an Animation
//!
//! ```no_run
//! use framepack::{ExportKind, ExportSession, MediaFile, SamplingOptions};
//!
//! let video = MediaFile::open("clip.mp4").unwrap();
//! let mut session = ExportSession::load(video, &SamplingOptions::default()).unwrap();
//!
//! session.export(ExportKind::Gif).unwrap().save("animation.gif").unwrap();
//! session.export(ExportKind::Webm).unwrap().save("animation.webm").unwrap();
//! ```
//!
//! ## Features
//!
//! - **Duration-based sampling**: 24, 12 or 1 thumbnails per second
//!   depending on clip length, capped at 300 frames
//! - **Lazy iteration**: [`SampleIterator`] captures one frame per `next()`
//! - **Sprite sheets**: fixed-column grid, scaled to stay within 8192 px
//!   and enlarged towards 2800 px, nearest-neighbour drawing
//! - **Animated GIF**: uniform frame delay from the playback rate
//! - **WebM**: VP9, VP8 or the container default, with a recording deadline
//! - **Background isolation**: colour-key transparency against the corner
//!   pixel
//! - **Progress & cancellation**: callbacks and [`CancellationToken`]
//! - **Pluggable sources and recorders**: [`FrameSource`] and
//!   [`VideoRecorder`] traits
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | [`FrameStream`] samples on a Tokio blocking thread |
//! | `rayon` | Export inputs are decoded in parallel |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed. WebM export needs an
//! FFmpeg build with libvpx (or another WebM-capable encoder).

pub mod artifact;
pub mod configuration;
mod conversion;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod gif;
pub mod image_source;
pub mod isolate;
pub mod media;
pub mod metadata;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod sheet;
pub mod source;
#[cfg(feature = "async")]
pub mod stream;
pub mod surface;

pub use artifact::{ArtifactKind, ExportArtifact};
pub use configuration::{DEFAULT_MAX_FRAMES, DEFAULT_THUMBNAIL_DIVISOR, SamplingOptions};
pub use encode::{
    Pacing, VideoCodec, VideoExportOptions, VideoRecorder, WebmRecorder, encode_video,
    encode_video_with,
};
pub use error::FramepackError;
pub use ffmpeg::{FfmpegLogLevel, ffmpeg_log_level, set_ffmpeg_log_level};
pub use self::gif::{GifOptions, encode_gif, frame_delay_ms};
pub use image_source::{ImageRef, frame_refs};
pub use isolate::{DEFAULT_TOLERANCE, isolate_background};
pub use media::MediaFile;
pub use metadata::VideoMetadata;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{
    FrameId, FrameSampler, FrameWindow, RawFrame, SampleIterator, SampledVideo, SamplingPolicy,
};
pub use session::{
    DEFAULT_FRAME_RATE, DEFAULT_WINDOW_SIZE, ExportKind, ExportSession, SessionCommand,
};
pub use sheet::{
    DEFAULT_COLUMNS, MAX_SHEET_DIMENSION, SheetLayout, SheetOptions, TARGET_SHEET_DIMENSION,
    pack, pack_image,
};
pub use source::FrameSource;
#[cfg(feature = "async")]
pub use stream::{FrameStream, sample_file_stream, sample_stream};
pub use surface::Surface;
