//! Colour-key background removal.
//!
//! The top-left pixel is taken as the background colour. Every pixel whose
//! RGB value lies within `tolerance` of it (Euclidean distance) becomes
//! fully transparent; all other pixels are left untouched.
//!
//! Matching is global rather than flood-filled, so foreground regions that
//! share the background colour are cleared too.
//!
//! ```
//! use framepack::isolate_background;
//! use image::{Rgba, RgbaImage};
//!
//! let mut frame = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
//! frame.put_pixel(2, 2, Rgba([200, 30, 30, 255]));
//!
//! let cut_out = isolate_background(&frame, framepack::DEFAULT_TOLERANCE);
//! assert_eq!(cut_out.get_pixel(0, 0)[3], 0);
//! assert_eq!(cut_out.get_pixel(2, 2)[3], 255);
//! ```

use image::RgbaImage;

/// Default colour distance under which a pixel counts as background.
pub const DEFAULT_TOLERANCE: f64 = 60.0;

/// Return a copy of `image` with background-coloured pixels made
/// transparent. An empty image, or a tolerance that is not positive, leaves
/// the copy unchanged.
pub fn isolate_background(image: &RgbaImage, tolerance: f64) -> RgbaImage {
    let mut output = image.clone();
    if image.width() == 0 || image.height() == 0 || tolerance.is_nan() || tolerance <= 0.0 {
        return output;
    }

    let reference = *image.get_pixel(0, 0);
    let threshold = tolerance * tolerance;
    let mut cleared = 0usize;

    for pixel in output.pixels_mut() {
        let distance: f64 = (0..3)
            .map(|channel| {
                let delta = f64::from(pixel[channel]) - f64::from(reference[channel]);
                delta * delta
            })
            .sum();
        if distance < threshold {
            pixel[3] = 0;
            cleared += 1;
        }
    }

    log::debug!(
        "Isolated background {:?}: {cleared} of {} pixels cleared",
        &reference.0[..3],
        image.width() as usize * image.height() as usize
    );

    output
}
