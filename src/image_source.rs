//! Export inputs.
//!
//! Exporters accept frames as [`ImageRef`]s: an already-decoded raster, an
//! encoded image held in memory (PNG, JPEG, ...), or a file on disk. All of
//! them resolve to a shared RGBA raster before drawing. A frame that fails
//! to resolve aborts the export with [`FramepackError::DecodeError`]
//! carrying its position.
//!
//! With the `rayon` feature, frames are resolved in parallel.

use std::{path::PathBuf, sync::Arc};

use image::RgbaImage;

use crate::{error::FramepackError, sampler::RawFrame};

/// A frame handed to an exporter.
#[derive(Debug, Clone)]
pub enum ImageRef {
    /// A decoded raster.
    Raster(Arc<RgbaImage>),
    /// An encoded image in memory; the format is detected from its header.
    Encoded(Arc<[u8]>),
    /// An encoded image on disk.
    File(PathBuf),
}

impl ImageRef {
    /// Resolve to an RGBA raster.
    ///
    /// # Errors
    ///
    /// Returns [`FramepackError::ImageError`] or [`FramepackError::IoError`]
    /// if the bytes cannot be read or decoded, and
    /// [`FramepackError::SurfaceAllocationError`] for an empty raster.
    pub fn load(&self) -> Result<Arc<RgbaImage>, FramepackError> {
        let image = match self {
            ImageRef::Raster(image) => Arc::clone(image),
            ImageRef::Encoded(bytes) => Arc::new(image::load_from_memory(bytes)?.to_rgba8()),
            ImageRef::File(path) => Arc::new(image::open(path)?.to_rgba8()),
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(FramepackError::SurfaceAllocationError {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }
}

impl From<&RawFrame> for ImageRef {
    fn from(frame: &RawFrame) -> Self {
        ImageRef::Raster(Arc::clone(&frame.image))
    }
}

impl From<RawFrame> for ImageRef {
    fn from(frame: RawFrame) -> Self {
        ImageRef::Raster(frame.image)
    }
}

impl From<RgbaImage> for ImageRef {
    fn from(image: RgbaImage) -> Self {
        ImageRef::Raster(Arc::new(image))
    }
}

impl From<Arc<RgbaImage>> for ImageRef {
    fn from(image: Arc<RgbaImage>) -> Self {
        ImageRef::Raster(image)
    }
}

impl From<Vec<u8>> for ImageRef {
    fn from(bytes: Vec<u8>) -> Self {
        ImageRef::Encoded(bytes.into())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        ImageRef::File(path)
    }
}

/// Convert sampled frames into export inputs.
pub fn frame_refs(frames: &[RawFrame]) -> Vec<ImageRef> {
    frames.iter().map(ImageRef::from).collect()
}

/// Resolve every frame, failing on the first (lowest-index) bad one.
pub(crate) fn load_all(frames: &[ImageRef]) -> Result<Vec<Arc<RgbaImage>>, FramepackError> {
    log::debug!("Loading {} frames for export", frames.len());

    #[cfg(feature = "rayon")]
    {
        use ::rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

        let results: Vec<Result<Arc<RgbaImage>, FramepackError>> = frames
            .par_iter()
            .enumerate()
            .map(|(index, frame)| load_one(index, frame))
            .collect();
        results.into_iter().collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        frames
            .iter()
            .enumerate()
            .map(|(index, frame)| load_one(index, frame))
            .collect()
    }
}

fn load_one(index: usize, frame: &ImageRef) -> Result<Arc<RgbaImage>, FramepackError> {
    frame.load().map_err(|error| FramepackError::DecodeError {
        index,
        reason: error.to_string(),
    })
}
