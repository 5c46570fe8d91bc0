//! FFmpeg-backed [`FrameSource`].
//!
//! [`MediaFile`] opens a video container, caches its [`VideoMetadata`], and
//! renders stills at arbitrary timestamps by seeking to the preceding
//! keyframe and decoding forward.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    mem,
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbaImage;

use crate::{
    conversion::{duration_to_seek_timestamp, frame_to_buffer, pts_to_seconds},
    error::FramepackError,
    metadata::VideoMetadata,
    source::FrameSource,
};

/// A video file opened for frame capture.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use framepack::{FrameSource, FramepackError, MediaFile};
///
/// let mut video = MediaFile::open("clip.mp4")?;
/// let (width, height) = (video.metadata().width, video.metadata().height);
/// let still = video.capture(Duration::from_millis(1500), width, height)?;
/// still.save("still.png")?;
/// # Ok::<(), FramepackError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg demuxer.
    pub(crate) input_context: Input,
    /// Index of the best video stream.
    pub(crate) video_stream_index: usize,
    /// Cached metadata extracted at open time.
    pub(crate) metadata: VideoMetadata,
    /// Path the file was opened from.
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a video file.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::SourceUnreadable`] if the file cannot be
    /// opened, has no video stream, or its duration or dimensions cannot be
    /// determined.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramepackError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| {
            FramepackError::SourceUnreadable(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input_context = ffmpeg_next::format::input(&path).map_err(|error| {
            FramepackError::SourceUnreadable(format!("{}: {error}", file_path.display()))
        })?;

        let (video_stream_index, metadata) = {
            let stream = input_context.streams().best(Type::Video).ok_or_else(|| {
                FramepackError::SourceUnreadable(format!(
                    "{}: no video stream",
                    file_path.display()
                ))
            })?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| {
                    FramepackError::SourceUnreadable(format!(
                        "{}: cannot create video decoder: {error}",
                        file_path.display()
                    ))
                })?;

            let width = decoder.width();
            let height = decoder.height();
            if width == 0 || height == 0 {
                return Err(FramepackError::SourceUnreadable(format!(
                    "{}: video dimensions are unknown",
                    file_path.display()
                )));
            }

            let frame_rate = stream.avg_frame_rate();
            let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() > 0
            {
                f64::from(frame_rate)
            } else {
                let rate = stream.rate();
                if rate.denominator() != 0 {
                    f64::from(rate)
                } else {
                    0.0
                }
            };

            // Prefer the container duration, fall back to the stream's own.
            let container_microseconds = input_context.duration();
            let duration = if container_microseconds > 0 {
                Duration::from_micros(container_microseconds as u64)
            } else if stream.duration() > 0 {
                Duration::from_secs_f64(pts_to_seconds(stream.duration(), stream.time_base()))
            } else {
                return Err(FramepackError::SourceUnreadable(format!(
                    "{}: video duration is unknown",
                    file_path.display()
                )));
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata =
                VideoMetadata::new(duration, width, height, frames_per_second).with_codec(codec);
            (stream.index(), metadata)
        };

        log::info!(
            "Opened {} ({}x{}, {:.3}s, {:.2} fps, {})",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.duration_seconds(),
            metadata.frames_per_second,
            metadata.codec
        );

        Ok(Self {
            input_context,
            video_stream_index,
            metadata,
            file_path,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Seek to `timestamp` and decode forward until a frame within half a
    /// frame interval of the target is reached. If the stream ends first,
    /// the last decoded frame is returned.
    fn decode_at(&mut self, timestamp: Duration) -> Result<VideoFrame, FramepackError> {
        let video_stream_index = self.video_stream_index;
        let target = timestamp.min(self.metadata.duration);
        let target_seconds = target.as_secs_f64();
        let half_frame = if self.metadata.frames_per_second > 0.0 {
            0.5 / self.metadata.frames_per_second
        } else {
            0.0
        };

        let stream = self
            .input_context
            .stream(video_stream_index)
            .ok_or_else(|| FramepackError::SourceUnreadable("video stream vanished".into()))?;
        let time_base = stream.time_base();
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let seek_timestamp = duration_to_seek_timestamp(target);
        self.input_context
            .seek(seek_timestamp, ..seek_timestamp)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut last_frame = VideoFrame::empty();
        let mut have_frame = false;
        let mut reached = false;

        let accept = |decoded: &mut VideoFrame, last: &mut VideoFrame| -> bool {
            let pts = decoded.timestamp().or_else(|| decoded.pts()).unwrap_or(0);
            mem::swap(last, decoded);
            pts_to_seconds(pts, time_base) + half_frame >= target_seconds
        };

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                have_frame = true;
                if accept(&mut decoded_frame, &mut last_frame) {
                    reached = true;
                    break;
                }
            }

            if reached {
                break;
            }
        }

        if !reached {
            decoder.send_eof()?;
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                have_frame = true;
                if accept(&mut decoded_frame, &mut last_frame) {
                    break;
                }
            }
        }

        if !have_frame {
            return Err(FramepackError::FrameCaptureError {
                timestamp,
                reason: "no decodable frame at or after the seek point".to_string(),
            });
        }

        Ok(last_frame)
    }
}

impl FrameSource for MediaFile {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn capture(
        &mut self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FramepackError> {
        if width == 0 || height == 0 {
            return Err(FramepackError::FrameCaptureError {
                timestamp,
                reason: format!("cannot render a {width}x{height} frame"),
            });
        }

        log::debug!("Capturing {width}x{height} frame at {timestamp:?}");

        let decoded = self.decode_at(timestamp)?;

        let mut scaler = ScalingContext::get(
            decoded.format(),
            decoded.width(),
            decoded.height(),
            Pixel::RGBA,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;
        let mut rgba_frame = VideoFrame::empty();
        scaler.run(&decoded, &mut rgba_frame)?;

        let buffer = frame_to_buffer(&rgba_frame, width, height, 4);
        RgbaImage::from_raw(width, height, buffer).ok_or_else(|| FramepackError::FrameCaptureError {
            timestamp,
            reason: "scaled frame buffer has the wrong size".to_string(),
        })
    }
}
