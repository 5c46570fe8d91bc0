//! Internal pixel and timestamp conversions shared by the decoder and the
//! WebM recorder.

use std::time::Duration;

use ffmpeg_next::{Rational, format::Pixel, frame::Video as VideoFrame};
use image::RgbaImage;

/// Copy plane 0 of an FFmpeg frame into a tightly packed buffer, dropping
/// any row padding.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Copy an RGBA raster into a freshly allocated RGBA FFmpeg frame,
/// honouring the frame's stride.
pub(crate) fn image_to_frame(image: &RgbaImage) -> VideoFrame {
    let (width, height) = image.dimensions();
    let mut frame = VideoFrame::new(Pixel::RGBA, width, height);
    let stride = frame.stride(0);
    let row_bytes = width as usize * 4;
    let source = image.as_raw();
    let data = frame.data_mut(0);

    for row in 0..height as usize {
        let src = &source[row * row_bytes..(row + 1) * row_bytes];
        data[row * stride..row * stride + row_bytes].copy_from_slice(src);
    }
    frame
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a [`Duration`] to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}
