//! WebM export.
//!
//! Frames are redrawn onto a reusable [`Surface`] and fed to a
//! [`VideoRecorder`] at a fixed rate. The draw loop runs on a dedicated
//! worker thread while the caller waits with a deadline of
//! `frame_count / fps` plus a grace period; if the recorder has not produced
//! its bytes by then the export fails with
//! [`FramepackError::RecordingTimeout`].
//!
//! [`WebmRecorder`] is the FFmpeg implementation. It picks the first
//! available codec from [`VideoCodec::PREFERENCE`].
//!
//! # Example
//!
//! ```no_run
//! use framepack::{FrameSampler, MediaFile, SamplingOptions, VideoExportOptions, frame_refs};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let sampled = FrameSampler::new(&mut video).sample(&SamplingOptions::default())?;
//!
//! let clip = framepack::encode_video(&frame_refs(&sampled.frames), 12.0, &VideoExportOptions::default())?;
//! clip.save(clip.suggested_file_name())?;
//! # Ok::<(), framepack::FramepackError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext, encoder::video::Encoder as OpenedVideoEncoder},
    format::{Flags as FormatFlags, Pixel, context::Output},
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{Rgba, RgbaImage, imageops};
use tempfile::NamedTempFile;

use crate::{
    artifact::{ArtifactKind, ExportArtifact},
    conversion::image_to_frame,
    error::FramepackError,
    gif::validate_frame_rate,
    image_source::{ImageRef, load_all},
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    surface::Surface,
};

/// Default target bitrate for WebM export, in bits per second.
pub const DEFAULT_VIDEO_BITRATE: usize = 5_000_000;

/// Default slack added to the recording deadline.
pub const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// WebM video codecs, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// VP9 via libvpx.
    Vp9,
    /// VP8 via libvpx.
    Vp8,
    /// Whatever WebM-compatible encoder FFmpeg provides (VP9, VP8 or AV1).
    ContainerDefault,
}

impl VideoCodec {
    /// Codecs tried by [`select_best`](Self::select_best), best first.
    pub const PREFERENCE: [VideoCodec; 3] =
        [VideoCodec::Vp9, VideoCodec::Vp8, VideoCodec::ContainerDefault];

    /// Stable name, also used as the MIME codec hint.
    pub fn name(self) -> &'static str {
        match self {
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Vp8 => "vp8",
            VideoCodec::ContainerDefault => "default",
        }
    }

    fn find_encoder(self) -> Option<ffmpeg_next::Codec> {
        match self {
            VideoCodec::Vp9 => ffmpeg_next::encoder::find_by_name("libvpx-vp9"),
            VideoCodec::Vp8 => ffmpeg_next::encoder::find_by_name("libvpx"),
            VideoCodec::ContainerDefault => [Id::VP9, Id::VP8, Id::AV1]
                .into_iter()
                .find_map(ffmpeg_next::encoder::find),
        }
    }

    /// Whether the linked FFmpeg build can encode this codec.
    pub fn is_available(self) -> bool {
        if ffmpeg_next::init().is_err() {
            return false;
        }
        self.find_encoder().is_some()
    }

    /// The first available codec in [`PREFERENCE`](Self::PREFERENCE) order.
    pub fn select_best() -> Option<VideoCodec> {
        let selected = Self::PREFERENCE
            .into_iter()
            .find(|codec| codec.is_available());
        log::debug!("Selected WebM codec: {selected:?}");
        selected
    }
}

/// How the draw loop paces frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Frames carry consecutive timestamps and are fed as fast as the
    /// recorder accepts them.
    #[default]
    Timestamped,
    /// Sleep one frame interval between frames and two after the last one,
    /// for recorders that timestamp by wall clock.
    Realtime,
}

/// A sink that turns a sequence of equally sized RGBA frames into an
/// encoded clip.
pub trait VideoRecorder {
    /// Begin a session for `width` x `height` frames at `frames_per_second`.
    fn start(&mut self, width: u32, height: u32, frames_per_second: f64)
    -> Result<(), FramepackError>;

    /// Record one frame.
    fn feed(&mut self, frame: &RgbaImage) -> Result<(), FramepackError>;

    /// Finish the session and return the encoded bytes.
    fn stop(&mut self) -> Result<Vec<u8>, FramepackError>;
}

/// Options for [`encode_video`].
#[derive(Clone)]
pub struct VideoExportOptions {
    pub(crate) pacing: Pacing,
    pub(crate) timeout_grace: Duration,
    pub(crate) bitrate: usize,
    pub(crate) codec: Option<VideoCodec>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for VideoExportOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoExportOptions")
            .field("pacing", &self.pacing)
            .field("timeout_grace", &self.timeout_grace)
            .field("bitrate", &self.bitrate)
            .field("codec", &self.codec)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for VideoExportOptions {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            timeout_grace: DEFAULT_TIMEOUT_GRACE,
            bitrate: DEFAULT_VIDEO_BITRATE,
            codec: None,
            cancellation: None,
            progress: Arc::new(NoOpProgress),
        }
    }
}

impl VideoExportOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pacing mode.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the slack added to the `frames / fps` recording deadline.
    #[must_use]
    pub fn with_timeout_grace(mut self, grace: Duration) -> Self {
        self.timeout_grace = grace;
        self
    }

    /// Set the target bitrate in bits per second.
    #[must_use]
    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Force a codec instead of probing [`VideoCodec::PREFERENCE`].
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Attach a cancellation token, checked before each frame.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attach a progress callback, fired after each recorded frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }
}

/// Encode frames as a WebM clip with [`WebmRecorder`].
///
/// # Errors
///
/// - [`FramepackError::InvalidFrameRate`] for a non-positive or non-finite rate,
///   or one so low that a frame interval does not fit in a [`Duration`].
/// - [`FramepackError::EmptyInput`] for no frames.
/// - [`FramepackError::DecodeError`] if any frame fails to load.
/// - [`FramepackError::RecordingTimeout`] if encoding misses its deadline.
/// - [`FramepackError::EncoderFault`] if FFmpeg fails or no WebM encoder
///   is available.
pub fn encode_video(
    frames: &[ImageRef],
    frames_per_second: f64,
    options: &VideoExportOptions,
) -> Result<ExportArtifact, FramepackError> {
    let mut recorder = WebmRecorder::new().with_bitrate(options.bitrate);
    if let Some(codec) = options.codec {
        recorder = recorder.with_codec(codec);
    }
    encode_video_with(frames, frames_per_second, recorder, options)
}

/// Encode frames with a caller-supplied [`VideoRecorder`].
///
/// The recorder is moved to a worker thread. Frames are drawn onto one
/// surface sized to the first frame, cleared before every draw.
///
/// # Errors
///
/// As [`encode_video`]. Recorder errors other than cancellation are
/// reported as [`FramepackError::EncoderFault`].
pub fn encode_video_with<R>(
    frames: &[ImageRef],
    frames_per_second: f64,
    recorder: R,
    options: &VideoExportOptions,
) -> Result<ExportArtifact, FramepackError>
where
    R: VideoRecorder + Send + 'static,
{
    validate_frame_rate(frames_per_second)?;
    if frames.is_empty() {
        return Err(FramepackError::EmptyInput);
    }

    // Rates so low that one interval overflows `Duration` are rejected too.
    let too_slow = |_| FramepackError::InvalidFrameRate(frames_per_second);
    let interval = Duration::try_from_secs_f64(frames_per_second.recip()).map_err(too_slow)?;
    let deadline = Duration::try_from_secs_f64(frames.len() as f64 / frames_per_second)
        .map_err(too_slow)?
        .saturating_add(options.timeout_grace);

    let images = load_all(frames)?;
    let (width, height) = images[0].dimensions();
    let surface = Surface::allocate(width, height)?;

    log::debug!(
        "Recording {} frames at {frames_per_second} fps ({width}x{height}, deadline {deadline:?})",
        images.len()
    );

    let abandon = Arc::new(AtomicBool::new(false));
    let (sender, receiver) = mpsc::channel();

    let session = DrawSession {
        recorder,
        surface,
        images,
        frames_per_second,
        interval,
        pacing: options.pacing,
        abandon: Arc::clone(&abandon),
        cancellation: options.cancellation.clone(),
        progress: options.progress.clone(),
    };

    thread::Builder::new()
        .name("framepack-recorder".to_string())
        .spawn(move || {
            let _ = sender.send(session.run());
        })
        .map_err(|e| FramepackError::EncoderFault(format!("cannot spawn recorder thread: {e}")))?;

    match receiver.recv_timeout(deadline) {
        Ok(Ok(bytes)) => {
            log::info!("Recorded WebM clip ({} bytes)", bytes.len());
            Ok(ExportArtifact::new(bytes, ArtifactKind::Webm))
        }
        Ok(Err(error)) => Err(error),
        Err(RecvTimeoutError::Timeout) => {
            abandon.store(true, Ordering::Release);
            log::warn!("Video recording missed its {deadline:?} deadline");
            Err(FramepackError::RecordingTimeout(deadline))
        }
        Err(RecvTimeoutError::Disconnected) => Err(FramepackError::EncoderFault(
            "recorder thread exited without a result".to_string(),
        )),
    }
}

/// State moved onto the recorder thread.
struct DrawSession<R> {
    recorder: R,
    surface: Surface,
    images: Vec<Arc<RgbaImage>>,
    frames_per_second: f64,
    interval: Duration,
    pacing: Pacing,
    abandon: Arc<AtomicBool>,
    cancellation: Option<CancellationToken>,
    progress: Arc<dyn ProgressCallback>,
}

impl<R: VideoRecorder> DrawSession<R> {
    fn run(mut self) -> Result<Vec<u8>, FramepackError> {
        let interval = self.interval;
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::VideoExport,
            Some(self.images.len() as u64),
            1,
        );

        self.recorder
            .start(self.surface.width(), self.surface.height(), self.frames_per_second)
            .map_err(encoder_fault)?;

        for (index, image) in self.images.iter().enumerate() {
            if self.abandon.load(Ordering::Acquire)
                || self.cancellation.as_ref().is_some_and(|t| t.is_cancelled())
            {
                return Err(FramepackError::Cancelled);
            }

            self.surface.clear();
            self.surface.draw_fit(image);
            self.recorder
                .feed(self.surface.as_image())
                .map_err(encoder_fault)?;
            tracker.advance(Some(index as u64), None);

            if self.pacing == Pacing::Realtime {
                thread::sleep(interval);
            }
        }

        if self.pacing == Pacing::Realtime {
            thread::sleep(interval.saturating_mul(2));
        }

        let bytes = self.recorder.stop().map_err(encoder_fault)?;
        tracker.finish();
        Ok(bytes)
    }
}

fn encoder_fault(error: FramepackError) -> FramepackError {
    match error {
        FramepackError::EncoderFault(_) | FramepackError::Cancelled => error,
        other => FramepackError::EncoderFault(other.to_string()),
    }
}

/// FFmpeg WebM recorder.
///
/// Each session muxes into a scratch file which is read back and removed
/// on [`stop`](VideoRecorder::stop).
pub struct WebmRecorder {
    codec: Option<VideoCodec>,
    bitrate: usize,
    session: Option<WebmSession>,
}

impl Debug for WebmRecorder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WebmRecorder")
            .field("codec", &self.codec)
            .field("bitrate", &self.bitrate)
            .field("recording", &self.session.is_some())
            .finish()
    }
}

impl Default for WebmRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebmRecorder {
    /// A recorder that probes for the best codec when started.
    pub fn new() -> Self {
        Self {
            codec: None,
            bitrate: DEFAULT_VIDEO_BITRATE,
            session: None,
        }
    }

    /// Use `codec` instead of probing.
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the target bitrate in bits per second.
    #[must_use]
    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }
}

struct WebmSession {
    output: Output,
    encoder: OpenedVideoEncoder,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    /// Even-sized canvas for odd frames; the extra row/column stays black.
    padded: Option<RgbaImage>,
    scaler: ScalingContext,
    next_pts: i64,
    scratch: NamedTempFile,
}

impl WebmSession {
    fn open(
        codec: VideoCodec,
        bitrate: usize,
        width: u32,
        height: u32,
        frames_per_second: f64,
    ) -> Result<Self, FramepackError> {
        let encoder_codec = codec.find_encoder().ok_or_else(|| {
            FramepackError::EncoderFault(format!("{} encoder not available", codec.name()))
        })?;

        // YUV 4:2:0 needs even dimensions; odd frames are padded, not stretched.
        let encoded_width = (width + 1) & !1;
        let encoded_height = (height + 1) & !1;
        let encoder_time_base = Rational::from(frames_per_second).invert();

        let scratch = tempfile::Builder::new()
            .prefix("framepack-")
            .suffix(".webm")
            .tempfile()?;

        let mut output = ffmpeg_next::format::output_as(scratch.path(), "webm")
            .map_err(|e| FramepackError::EncoderFault(format!("cannot open WebM muxer: {e}")))?;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|e| FramepackError::EncoderFault(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| FramepackError::EncoderFault(format!("cannot create encoder: {e}")))?;

        encoder.set_width(encoded_width);
        encoder.set_height(encoded_height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(Rational::from(frames_per_second)));
        encoder.set_bit_rate(bitrate);

        if needs_global_header {
            // SAFETY: the codec context is allocated and not yet opened.
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder
            .open_as(encoder_codec)
            .map_err(|e| FramepackError::EncoderFault(format!("cannot open encoder: {e}")))?;
        stream.set_parameters(&encoder);

        output
            .write_header()
            .map_err(|e| FramepackError::EncoderFault(format!("cannot write header: {e}")))?;

        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| FramepackError::EncoderFault("output stream vanished".to_string()))?;

        let padded = ((encoded_width, encoded_height) != (width, height)).then(|| {
            RgbaImage::from_pixel(encoded_width, encoded_height, Rgba([0, 0, 0, 255]))
        });

        let scaler = ScalingContext::get(
            Pixel::RGBA,
            encoded_width,
            encoded_height,
            Pixel::YUV420P,
            encoded_width,
            encoded_height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| FramepackError::EncoderFault(format!("cannot create scaler: {e}")))?;

        log::debug!(
            "Started {} session: {encoded_width}x{encoded_height} at {frames_per_second} fps, {bitrate} bps",
            codec.name()
        );

        Ok(Self {
            output,
            encoder,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            padded,
            scaler,
            next_pts: 0,
            scratch,
        })
    }

    fn write_pending_packets(&mut self) -> Result<(), FramepackError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| FramepackError::EncoderFault(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }

    fn encode(&mut self, frame: &RgbaImage) -> Result<(), FramepackError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(FramepackError::EncoderFault(format!(
                "frame is {}x{} but the session is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let source = match self.padded.as_mut() {
            Some(canvas) => {
                imageops::replace(canvas, frame, 0, 0);
                image_to_frame(canvas)
            }
            None => image_to_frame(frame),
        };

        let mut yuv = ffmpeg_next::frame::Video::empty();
        self.scaler
            .run(&source, &mut yuv)
            .map_err(|e| FramepackError::EncoderFault(format!("scaling failed: {e}")))?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .map_err(|e| FramepackError::EncoderFault(format!("send_frame failed: {e}")))?;
        self.write_pending_packets()
    }

    fn finish(mut self) -> Result<Vec<u8>, FramepackError> {
        self.encoder
            .send_eof()
            .map_err(|e| FramepackError::EncoderFault(format!("send_eof failed: {e}")))?;
        self.write_pending_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| FramepackError::EncoderFault(format!("cannot write trailer: {e}")))?;

        let WebmSession {
            output, scratch, ..
        } = self;
        // Closes the muxer's file handle before reading.
        drop(output);
        let bytes = fs::read(scratch.path())?;
        Ok(bytes)
    }
}

impl VideoRecorder for WebmRecorder {
    fn start(
        &mut self,
        width: u32,
        height: u32,
        frames_per_second: f64,
    ) -> Result<(), FramepackError> {
        validate_frame_rate(frames_per_second)?;
        if self.session.is_some() {
            return Err(FramepackError::EncoderFault(
                "recorder is already running".to_string(),
            ));
        }

        let codec = match self.codec {
            Some(codec) => codec,
            None => VideoCodec::select_best().ok_or_else(|| {
                FramepackError::EncoderFault("no WebM encoder is available".to_string())
            })?,
        };

        self.session = Some(WebmSession::open(
            codec,
            self.bitrate,
            width,
            height,
            frames_per_second,
        )?);
        Ok(())
    }

    fn feed(&mut self, frame: &RgbaImage) -> Result<(), FramepackError> {
        self.session
            .as_mut()
            .ok_or_else(|| FramepackError::EncoderFault("recorder is not running".to_string()))?
            .encode(frame)
    }

    fn stop(&mut self) -> Result<Vec<u8>, FramepackError> {
        self.session
            .take()
            .ok_or_else(|| FramepackError::EncoderFault("recorder is not running".to_string()))?
            .finish()
    }
}
