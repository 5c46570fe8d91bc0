//! Export a sampled window as an animated GIF and a WebM clip, with the
//! background keyed out of the GIF frames.
//!
//! Usage:
//!   cargo run --example export_animation -- <input_file> [fps]

use std::error::Error;

use framepack::{
    DEFAULT_TOLERANCE, FrameSampler, FrameWindow, GifOptions, ImageRef, MediaFile,
    SamplingOptions, VideoCodec, VideoExportOptions, encode_gif, encode_video, frame_refs,
    isolate_background,
};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "input.mp4".to_string());
    let fps: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(12.0);

    let mut video = MediaFile::open(&input_path)?;
    let sampled = FrameSampler::new(&mut video).sample(&SamplingOptions::default())?;
    let window = sampled.window(FrameWindow::new(0, 25));
    println!("Sampled {} frames, exporting {}", sampled.frames.len(), window.len());

    // ── GIF with transparent background ────────────────────────────
    let cut_out: Vec<ImageRef> = window
        .iter()
        .map(|frame| ImageRef::from(isolate_background(&frame.image, DEFAULT_TOLERANCE)))
        .collect();
    let gif = encode_gif(&cut_out, fps, &GifOptions::default())?;
    gif.save(gif.suggested_file_name())?;
    println!("Saved {} ({} bytes)", gif.suggested_file_name(), gif.byte_size());

    // ── WebM ───────────────────────────────────────────────────────
    match VideoCodec::select_best() {
        Some(codec) => {
            println!("Encoding WebM with {}", codec.name());
            let clip = encode_video(&frame_refs(window), fps, &VideoExportOptions::default())?;
            clip.save(clip.suggested_file_name())?;
            println!("Saved {} ({} bytes)", clip.suggested_file_name(), clip.byte_size());
        }
        None => println!("No WebM encoder in this FFmpeg build, skipping."),
    }

    Ok(())
}
