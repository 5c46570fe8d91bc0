//! Export session state.
//!
//! [`ExportSession`] holds what an interactive front end needs between
//! user actions: the sampled frames, the source metadata, the selected
//! window and the playback rate. User actions map onto methods or
//! [`SessionCommand`]s, and [`export`](ExportSession::export) runs one
//! pipeline over the current selection.
//!
//! # Example
//!
//! ```no_run
//! use framepack::{ExportKind, ExportSession, MediaFile, SamplingOptions, SessionCommand};
//!
//! let video = MediaFile::open("clip.mp4")?;
//! let mut session = ExportSession::load(video, &SamplingOptions::default())?;
//!
//! session.dispatch(SessionCommand::SelectWindow(10))?;
//! session.dispatch(SessionCommand::SetFrameRate(15.0))?;
//!
//! let gif = session.export(ExportKind::Gif)?;
//! gif.save(gif.suggested_file_name())?;
//! # Ok::<(), framepack::FramepackError>(())
//! ```

use std::time::Duration;

use crate::{
    artifact::ExportArtifact,
    configuration::SamplingOptions,
    encode::{VideoExportOptions, encode_video},
    error::FramepackError,
    gif::{GifOptions, encode_gif, validate_frame_rate},
    image_source::{ImageRef, frame_refs},
    metadata::VideoMetadata,
    sampler::{FrameSampler, FrameWindow, RawFrame},
    sheet::{SheetOptions, pack},
    source::FrameSource,
};

/// Number of frames selected after loading.
pub const DEFAULT_WINDOW_SIZE: usize = 25;

/// Playback rate for GIF and WebM exports after loading.
pub const DEFAULT_FRAME_RATE: f64 = 12.0;

/// The export formats a session offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// PNG sprite sheet, re-extracted at full resolution when possible.
    SpriteSheet,
    /// Animated GIF of the selected thumbnails.
    Gif,
    /// WebM clip of the selected thumbnails.
    Webm,
}

/// User actions that change session state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    /// Move the window so it starts at this frame index.
    SelectWindow(usize),
    /// Change the GIF/WebM playback rate.
    SetFrameRate(f64),
    /// Return to the initial window and rate.
    Reset,
}

/// Sampled frames plus the user's current selection.
pub struct ExportSession<S: FrameSource> {
    source: S,
    frames: Vec<RawFrame>,
    metadata: VideoMetadata,
    window_start: usize,
    window_size: usize,
    frames_per_second: f64,
    sampling_options: SamplingOptions,
    sheet_options: SheetOptions,
    gif_options: GifOptions,
    video_options: VideoExportOptions,
}

impl<S: FrameSource> ExportSession<S> {
    /// Sample `source` and start a session with the first
    /// [`DEFAULT_WINDOW_SIZE`] frames selected.
    ///
    /// `options` is kept: its progress callback and cancellation token also
    /// apply to the native-resolution capture of a sprite sheet export.
    ///
    /// # Errors
    ///
    /// Any error from [`FrameSampler::sample`].
    pub fn load(mut source: S, options: &SamplingOptions) -> Result<Self, FramepackError> {
        let sampled = FrameSampler::new(&mut source).sample(options)?;

        log::info!(
            "Loaded session with {} frames ({}x{})",
            sampled.frames.len(),
            sampled.metadata.width,
            sampled.metadata.height
        );

        Ok(Self {
            source,
            frames: sampled.frames,
            metadata: sampled.metadata,
            window_start: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            frames_per_second: DEFAULT_FRAME_RATE,
            sampling_options: options.clone(),
            sheet_options: SheetOptions::default(),
            gif_options: GifOptions::default(),
            video_options: VideoExportOptions::default(),
        })
    }

    /// Use a different window size. Clamped to at least 1.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self.window_start = self.window_start.min(self.max_window_start());
        self
    }

    /// Use custom sprite sheet options.
    #[must_use]
    pub fn with_sheet_options(mut self, options: SheetOptions) -> Self {
        self.sheet_options = options;
        self
    }

    /// Use custom GIF options.
    #[must_use]
    pub fn with_gif_options(mut self, options: GifOptions) -> Self {
        self.gif_options = options;
        self
    }

    /// Use custom WebM options.
    #[must_use]
    pub fn with_video_options(mut self, options: VideoExportOptions) -> Self {
        self.video_options = options;
        self
    }

    /// Apply a user action.
    ///
    /// # Errors
    ///
    /// [`FramepackError::InvalidFrameRate`] for a bad
    /// [`SetFrameRate`](SessionCommand::SetFrameRate).
    pub fn dispatch(&mut self, command: SessionCommand) -> Result<(), FramepackError> {
        log::debug!("Session command: {command:?}");
        match command {
            SessionCommand::SelectWindow(start) => self.set_window_start(start),
            SessionCommand::SetFrameRate(frames_per_second) => {
                self.set_frame_rate(frames_per_second)?
            }
            SessionCommand::Reset => {
                self.window_start = 0;
                self.frames_per_second = DEFAULT_FRAME_RATE;
            }
        }
        Ok(())
    }

    /// Move the window, clamped so it never runs past the last frame.
    pub fn set_window_start(&mut self, start: usize) {
        self.window_start = start.min(self.max_window_start());
    }

    /// Change the playback rate.
    ///
    /// # Errors
    ///
    /// [`FramepackError::InvalidFrameRate`] if the rate is not positive and
    /// finite; the current rate is kept.
    pub fn set_frame_rate(&mut self, frames_per_second: f64) -> Result<(), FramepackError> {
        validate_frame_rate(frames_per_second)?;
        self.frames_per_second = frames_per_second;
        Ok(())
    }

    fn max_window_start(&self) -> usize {
        self.frames.len().saturating_sub(self.window_size)
    }

    /// All sampled frames.
    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    /// Metadata of the loaded source.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// The current selection.
    pub fn window(&self) -> FrameWindow {
        FrameWindow::new(self.window_start, self.window_size)
    }

    /// Frames in the current selection.
    pub fn selected_frames(&self) -> &[RawFrame] {
        self.window().select(&self.frames)
    }

    /// Current playback rate.
    pub fn frame_rate(&self) -> f64 {
        self.frames_per_second
    }

    /// Give the source back, ending the session.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Export the current selection.
    ///
    /// Sprite sheets are packed from frames re-captured at native
    /// resolution; if that capture fails the thumbnails are packed instead.
    /// GIF and WebM use the thumbnails at the session rate.
    ///
    /// # Errors
    ///
    /// Any error from [`pack`], [`encode_gif`] or [`encode_video`], or
    /// [`FramepackError::Cancelled`] if the load-time token is cancelled
    /// during the native-resolution capture.
    pub fn export(&mut self, kind: ExportKind) -> Result<ExportArtifact, FramepackError> {
        log::info!(
            "Exporting {:?} of frames {:?} at {} fps",
            kind,
            self.window().range(self.frames.len()),
            self.frames_per_second
        );

        match kind {
            ExportKind::SpriteSheet => {
                let inputs = self.full_resolution_selection()?;
                pack(&inputs, &self.sheet_options)
            }
            ExportKind::Gif => encode_gif(
                &frame_refs(self.selected_frames()),
                self.frames_per_second,
                &self.gif_options,
            ),
            ExportKind::Webm => encode_video(
                &frame_refs(self.selected_frames()),
                self.frames_per_second,
                &self.video_options,
            ),
        }
    }

    fn full_resolution_selection(&mut self) -> Result<Vec<ImageRef>, FramepackError> {
        let range = self.window().range(self.frames.len());
        let timestamps: Vec<Duration> = self.frames[range.clone()]
            .iter()
            .map(|frame| frame.timestamp)
            .collect();

        match FrameSampler::new(&mut self.source).sample_at(&timestamps, &self.sampling_options) {
            Ok(images) => Ok(images.into_iter().map(ImageRef::from).collect()),
            Err(FramepackError::Cancelled) => Err(FramepackError::Cancelled),
            Err(error) => {
                log::warn!("Full-resolution capture failed, packing thumbnails instead: {error}");
                Ok(frame_refs(&self.frames[range]))
            }
        }
    }
}
