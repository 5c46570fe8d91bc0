//! A reusable RGBA drawing surface.
//!
//! Exporters allocate one [`Surface`] per call and redraw every frame onto
//! it. Allocation is fallible: oversized or zero-area requests return
//! [`FramepackError::SurfaceAllocationError`] instead of aborting the
//! process. Drawing uses nearest-neighbour scaling so pixel art stays crisp.

use image::{Rgba, RgbaImage, imageops};

use crate::error::FramepackError;

/// An owned RGBA raster that frames are drawn onto.
#[derive(Debug, Clone)]
pub struct Surface {
    canvas: RgbaImage,
}

impl Surface {
    /// Allocate a transparent `width` x `height` surface.
    ///
    /// # Errors
    ///
    /// [`FramepackError::SurfaceAllocationError`] if either side is zero, the
    /// byte size overflows, or the allocator refuses the request.
    pub fn allocate(width: u32, height: u32) -> Result<Self, FramepackError> {
        let failure = || FramepackError::SurfaceAllocationError { width, height };

        if width == 0 || height == 0 {
            return Err(failure());
        }

        let byte_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(failure)?;

        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(byte_len).map_err(|_| failure())?;
        buffer.resize(byte_len, 0);

        let canvas = RgbaImage::from_raw(width, height, buffer).ok_or_else(failure)?;
        Ok(Self { canvas })
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.canvas.pixels_mut().for_each(|pixel| *pixel = Rgba([0, 0, 0, 0]));
    }

    /// Draw `image` scaled to `width` x `height` with its top-left corner at
    /// (`x`, `y`). Parts falling outside the surface are clipped.
    pub fn draw(&mut self, image: &RgbaImage, x: i64, y: i64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if image.dimensions() == (width, height) {
            imageops::replace(&mut self.canvas, image, x, y);
        } else {
            let scaled = imageops::resize(image, width, height, imageops::FilterType::Nearest);
            imageops::replace(&mut self.canvas, &scaled, x, y);
        }
    }

    /// Draw `image` stretched over the whole surface.
    pub fn draw_fit(&mut self, image: &RgbaImage) {
        let (width, height) = self.canvas.dimensions();
        self.draw(image, 0, 0, width, height);
    }

    /// Borrow the current pixels.
    pub fn as_image(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Take ownership of the pixels.
    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }
}
