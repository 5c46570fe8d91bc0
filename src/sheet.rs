//! Sprite sheet packing.
//!
//! Frames are laid out left-to-right, top-to-bottom in a fixed number of
//! columns. Before drawing, [`SheetLayout`] picks a uniform scale so the
//! sheet stays within [`MAX_SHEET_DIMENSION`] on both sides, and small
//! sheets are enlarged towards [`TARGET_SHEET_DIMENSION`]. Cells are drawn
//! with nearest-neighbour scaling and the result is encoded as PNG.
//!
//! # Example
//!
//! ```no_run
//! use framepack::{FrameSampler, FrameWindow, MediaFile, SamplingOptions, SheetOptions, frame_refs};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let sampled = FrameSampler::new(&mut video).sample(&SamplingOptions::default())?;
//! let window = frame_refs(sampled.window(FrameWindow::new(0, 25)));
//!
//! let sheet = framepack::pack(&window, &SheetOptions::default())?;
//! sheet.save(sheet.suggested_file_name())?;
//! # Ok::<(), framepack::FramepackError>(())
//! ```

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::{
    artifact::{ArtifactKind, ExportArtifact},
    error::FramepackError,
    image_source::{ImageRef, load_all},
    surface::Surface,
};

/// Neither side of a sheet may exceed this many pixels.
pub const MAX_SHEET_DIMENSION: u32 = 8192;

/// Sheets smaller than this on both sides are enlarged towards it.
pub const TARGET_SHEET_DIMENSION: u32 = 2800;

/// Default number of grid columns.
pub const DEFAULT_COLUMNS: u32 = 5;

/// Tolerance when flooring scaled cell sizes, so that e.g. `400 * 1.4`
/// lands on 560 rather than 559.
const FLOOR_EPSILON: f64 = 1e-9;

/// Sprite sheet layout settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetOptions {
    /// Number of grid columns.
    pub columns: u32,
    /// Upper bound for either sheet side.
    pub max_dimension: u32,
    /// Size small sheets are enlarged towards.
    pub target_dimension: u32,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            max_dimension: MAX_SHEET_DIMENSION,
            target_dimension: TARGET_SHEET_DIMENSION,
        }
    }
}

impl SheetOptions {
    /// Create options with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of columns.
    #[must_use]
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    /// Set the maximum sheet side.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Set the enlargement target.
    #[must_use]
    pub fn with_target_dimension(mut self, target_dimension: u32) -> Self {
        self.target_dimension = target_dimension;
        self
    }
}

/// The computed grid for a sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetLayout {
    /// Grid columns.
    pub columns: u32,
    /// Grid rows, `ceil(count / columns)`.
    pub rows: u32,
    /// Scaled cell width.
    pub cell_width: u32,
    /// Scaled cell height.
    pub cell_height: u32,
    /// Scale factor applied to the source frame size.
    pub scale: f64,
}

impl SheetLayout {
    /// Lay out `count` cells of `cell_width` x `cell_height`.
    ///
    /// With `W` and `H` the unscaled sheet size:
    /// - if either exceeds `max_dimension`, scale down by
    ///   `min(max / W, max / H)`;
    /// - otherwise, if both are below `target_dimension`, scale up by
    ///   `min(target / W, target / H)` as long as the result still fits;
    /// - otherwise keep the native size.
    ///
    /// # Errors
    ///
    /// [`FramepackError::InvalidLayout`] for zero columns, and
    /// [`FramepackError::EmptyInput`] for zero cells.
    pub fn compute(
        cell_width: u32,
        cell_height: u32,
        count: usize,
        options: &SheetOptions,
    ) -> Result<Self, FramepackError> {
        if options.columns == 0 {
            return Err(FramepackError::InvalidLayout(
                "sprite sheet needs at least one column".to_string(),
            ));
        }
        if count == 0 {
            return Err(FramepackError::EmptyInput);
        }
        if cell_width == 0 || cell_height == 0 {
            return Err(FramepackError::InvalidLayout(format!(
                "cells cannot be {cell_width}x{cell_height}"
            )));
        }

        let columns = options.columns;
        let rows = u32::try_from(count.div_ceil(columns as usize)).map_err(|_| {
            FramepackError::InvalidLayout(format!("{count} frames do not fit a sheet"))
        })?;

        let total_width = f64::from(cell_width) * f64::from(columns);
        let total_height = f64::from(cell_height) * f64::from(rows);
        let max = f64::from(options.max_dimension);
        let target = f64::from(options.target_dimension);

        let scale = if total_width > max || total_height > max {
            (max / total_width).min(max / total_height)
        } else if total_width < target && total_height < target {
            let candidate = (target / total_width).min(target / total_height);
            if total_width * candidate <= max && total_height * candidate <= max {
                candidate
            } else {
                1.0
            }
        } else {
            1.0
        };

        let cell_width = scaled_side(cell_width, scale);
        let cell_height = scaled_side(cell_height, scale);

        log::debug!(
            "Sheet layout: {columns}x{rows} cells of {cell_width}x{cell_height} (scale {scale:.4})"
        );

        Ok(Self {
            columns,
            rows,
            cell_width,
            cell_height,
            scale,
        })
    }

    /// Sheet width in pixels.
    pub fn sheet_width(&self) -> u32 {
        self.cell_width.saturating_mul(self.columns)
    }

    /// Sheet height in pixels.
    pub fn sheet_height(&self) -> u32 {
        self.cell_height.saturating_mul(self.rows)
    }

    /// Top-left pixel of cell `index`.
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let columns = self.columns as usize;
        let column = (index % columns) as u32;
        let row = (index / columns) as u32;
        (column * self.cell_width, row * self.cell_height)
    }
}

fn scaled_side(side: u32, scale: f64) -> u32 {
    ((f64::from(side) * scale + FLOOR_EPSILON).floor() as u32).max(1)
}

/// Pack frames into a sprite sheet raster.
///
/// Every frame must have the size of the first one.
///
/// # Errors
///
/// - [`FramepackError::EmptyInput`] for no frames.
/// - [`FramepackError::InvalidLayout`] for zero columns.
/// - [`FramepackError::DecodeError`] if a frame cannot be loaded.
/// - [`FramepackError::FrameSizeMismatch`] if frame sizes differ.
/// - [`FramepackError::SurfaceAllocationError`] if the sheet cannot be
///   allocated.
pub fn pack_image(frames: &[ImageRef], options: &SheetOptions) -> Result<RgbaImage, FramepackError> {
    if options.columns == 0 {
        return Err(FramepackError::InvalidLayout(
            "sprite sheet needs at least one column".to_string(),
        ));
    }
    if frames.is_empty() {
        return Err(FramepackError::EmptyInput);
    }

    log::debug!("Packing {} frames into a sprite sheet", frames.len());

    let images = load_all(frames)?;
    let expected = images[0].dimensions();
    if let Some((index, image)) = images
        .iter()
        .enumerate()
        .find(|(_, image)| image.dimensions() != expected)
    {
        return Err(FramepackError::FrameSizeMismatch {
            index,
            expected,
            actual: image.dimensions(),
        });
    }

    let layout = SheetLayout::compute(expected.0, expected.1, images.len(), options)?;
    let mut surface = Surface::allocate(layout.sheet_width(), layout.sheet_height())?;

    for (index, image) in images.iter().enumerate() {
        let (x, y) = layout.cell_origin(index);
        surface.draw(
            image,
            i64::from(x),
            i64::from(y),
            layout.cell_width,
            layout.cell_height,
        );
    }

    Ok(surface.into_image())
}

/// Pack frames into a sprite sheet and encode it as PNG.
///
/// # Errors
///
/// Everything [`pack_image`] returns, plus [`FramepackError::ImageError`]
/// if PNG encoding fails.
pub fn pack(frames: &[ImageRef], options: &SheetOptions) -> Result<ExportArtifact, FramepackError> {
    let sheet = pack_image(frames, options)?;

    let mut bytes = Vec::new();
    sheet.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    log::info!(
        "Packed {} frames into a {}x{} sprite sheet ({} bytes)",
        frames.len(),
        sheet.width(),
        sheet.height(),
        bytes.len()
    );

    Ok(ExportArtifact::new(bytes, ArtifactKind::Png))
}
