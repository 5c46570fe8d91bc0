//! Animated GIF export.
//!
//! Frames are drawn one by one onto a shared [`Surface`] sized to the first
//! frame, quantised to a 256-colour palette, and written with a uniform
//! delay derived from the playback rate.
//!
//! # Example
//!
//! ```no_run
//! use framepack::{FrameSampler, GifOptions, MediaFile, SamplingOptions, frame_refs};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let sampled = FrameSampler::new(&mut video).sample(&SamplingOptions::default())?;
//!
//! let gif = framepack::encode_gif(&frame_refs(&sampled.frames[..25]), 12.0, &GifOptions::new())?;
//! gif.save(gif.suggested_file_name())?;
//! # Ok::<(), framepack::FramepackError>(())
//! ```

use ::gif::{DisposalMethod, Encoder, Frame, Repeat};

use crate::{
    artifact::{ArtifactKind, ExportArtifact},
    error::FramepackError,
    image_source::{ImageRef, load_all},
    surface::Surface,
};

/// Configuration for animated GIF export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifOptions {
    /// How many times the animation repeats. `None` loops forever.
    pub repeat: Option<u16>,
    /// Quantiser speed, 1 (best quality) to 30 (fastest). Default 10.
    pub speed: i32,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            repeat: None,
            speed: 10,
        }
    }
}

impl GifOptions {
    /// Create a new [`GifOptions`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repeat count. `None` means loop forever.
    #[must_use]
    pub fn with_repeat(mut self, repeat: Option<u16>) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the quantiser speed. Clamped to `1..=30`.
    #[must_use]
    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed.clamp(1, 30);
        self
    }
}

/// Per-frame delay in milliseconds for a playback rate: `round(1000 / fps)`.
///
/// # Errors
///
/// [`FramepackError::InvalidFrameRate`] if `fps` is not a positive finite
/// number.
pub fn frame_delay_ms(frames_per_second: f64) -> Result<u32, FramepackError> {
    validate_frame_rate(frames_per_second)?;
    Ok((1000.0 / frames_per_second).round() as u32)
}

pub(crate) fn validate_frame_rate(frames_per_second: f64) -> Result<(), FramepackError> {
    if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
        return Err(FramepackError::InvalidFrameRate(frames_per_second));
    }
    Ok(())
}

/// GIF delays are stored in hundredths of a second; never zero, since many
/// viewers treat a zero delay as "as fast as possible".
fn delay_centiseconds(delay_ms: u32) -> u16 {
    let centiseconds = (f64::from(delay_ms) / 10.0).round();
    (centiseconds as u64).clamp(1, u64::from(u16::MAX)) as u16
}

/// Encode frames as an animated GIF played at `frames_per_second`.
///
/// All frames are loaded before encoding starts. Frames whose size differs
/// from the first are stretched to fit.
///
/// # Errors
///
/// - [`FramepackError::InvalidFrameRate`] for a non-positive or non-finite rate.
/// - [`FramepackError::EmptyInput`] for no frames.
/// - [`FramepackError::DecodeError`] if any frame fails to load.
/// - [`FramepackError::GifEncodeError`] if the frames are larger than
///   65535 pixels on a side or the encoder fails.
pub fn encode_gif(
    frames: &[ImageRef],
    frames_per_second: f64,
    options: &GifOptions,
) -> Result<ExportArtifact, FramepackError> {
    let delay_ms = frame_delay_ms(frames_per_second)?;
    if frames.is_empty() {
        return Err(FramepackError::EmptyInput);
    }

    log::debug!(
        "Encoding {} frames to GIF at {frames_per_second} fps (delay {delay_ms} ms)",
        frames.len()
    );

    let images = load_all(frames)?;
    let (width, height) = images[0].dimensions();
    let (gif_width, gif_height) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(FramepackError::GifEncodeError(format!(
                "{width}x{height} exceeds the GIF size limit"
            )));
        }
    };

    let mut surface = Surface::allocate(width, height)?;
    let delay = delay_centiseconds(delay_ms);
    let speed = options.speed.clamp(1, 30);

    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, gif_width, gif_height, &[]).map_err(|e| {
            FramepackError::GifEncodeError(format!("Failed to create GIF encoder: {e}"))
        })?;

        let repeat = match options.repeat {
            None => Repeat::Infinite,
            Some(n) => Repeat::Finite(n),
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| FramepackError::GifEncodeError(format!("Failed to set GIF repeat: {e}")))?;

        for image in &images {
            surface.clear();
            surface.draw_fit(image);

            let mut pixels = surface.as_image().as_raw().clone();
            let mut gif_frame = Frame::from_rgba_speed(gif_width, gif_height, &mut pixels, speed);
            gif_frame.delay = delay;
            gif_frame.dispose = DisposalMethod::Background;

            encoder.write_frame(&gif_frame).map_err(|e| {
                FramepackError::GifEncodeError(format!("Failed to write GIF frame: {e}"))
            })?;
        }

        encoder.into_inner().map_err(|e| {
            FramepackError::GifEncodeError(format!("Failed to finish GIF stream: {e}"))
        })?;
    }

    log::info!("Encoded {} frame GIF ({} bytes)", images.len(), buffer.len());

    Ok(ExportArtifact::new(buffer, ArtifactKind::Gif))
}
