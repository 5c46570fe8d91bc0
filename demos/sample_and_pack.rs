//! Sample a video and pack a window of frames into a sprite sheet.
//!
//! Usage:
//!   cargo run --example sample_and_pack -- <input_file> [window_start]

use std::error::Error;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use framepack::{
    ExportKind, ExportSession, FfmpegLogLevel, MediaFile, ProgressInfo, SamplingOptions,
    SessionCommand,
};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "input.mp4".to_string());
    let window_start: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(0);

    framepack::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    let video = MediaFile::open(&input_path)?;
    let metadata = video.metadata().clone();
    println!(
        "Input: {}x{} @ {:.2} fps, {:.2}s ({})",
        metadata.width,
        metadata.height,
        metadata.frames_per_second,
        metadata.duration_seconds(),
        metadata.codec,
    );

    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    bar.set_style(style.progress_chars("##-"));

    let observer = bar.clone();
    let options = SamplingOptions::new().with_progress(Arc::new(move |info: &ProgressInfo| {
        if let Some(total) = info.total {
            observer.set_length(total);
        }
        observer.set_position(info.current);
    }));

    let mut session = ExportSession::load(video, &options)?;
    bar.finish_with_message("sampled");

    session.dispatch(SessionCommand::SelectWindow(window_start))?;
    let window = session.window();
    println!(
        "Sampled {} frames; packing frames {}..{}",
        session.frames().len(),
        window.start,
        window.start + session.selected_frames().len(),
    );

    let sheet = session.export(ExportKind::SpriteSheet)?;
    sheet.save(sheet.suggested_file_name())?;
    println!(
        "Saved {} ({} bytes)",
        sheet.suggested_file_name(),
        sheet.byte_size()
    );

    Ok(())
}
