//! Export session tests against a synthetic source.

mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use framepack::{
    ArtifactKind, CancellationToken, DEFAULT_FRAME_RATE, DEFAULT_WINDOW_SIZE, ExportKind,
    ExportSession, FramepackError, OperationType, ProgressInfo, SamplingOptions, SessionCommand,
};
use image::ImageFormat;

use common::{SyntheticVideo, colour_at};

fn two_second_session() -> ExportSession<SyntheticVideo> {
    ExportSession::load(SyntheticVideo::seconds(2.0), &SamplingOptions::default()).unwrap()
}

fn decode_png(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

// ── Loading ────────────────────────────────────────────────────────

#[test]
fn load_samples_and_selects_the_first_window() {
    let session = two_second_session();
    assert_eq!(session.frames().len(), 48);
    assert_eq!(session.metadata().width, 640);
    assert_eq!(session.window().start, 0);
    assert_eq!(session.window().length, DEFAULT_WINDOW_SIZE);
    assert_eq!(session.selected_frames().len(), 25);
    assert_eq!(session.frame_rate(), DEFAULT_FRAME_RATE);
}

#[test]
fn load_propagates_sampling_errors() {
    let source = SyntheticVideo::seconds(2.0).failing_at(0);
    let result = ExportSession::load(source, &SamplingOptions::default());
    assert!(matches!(result, Err(FramepackError::FrameCaptureError { .. })));
}

// ── Commands ───────────────────────────────────────────────────────

#[test]
fn window_start_is_clamped_to_the_last_full_window() {
    let mut session = two_second_session();
    session.dispatch(SessionCommand::SelectWindow(10)).unwrap();
    assert_eq!(session.selected_frames()[0].index, 10);

    session.dispatch(SessionCommand::SelectWindow(40)).unwrap();
    assert_eq!(session.window().start, 23);
    assert_eq!(session.selected_frames().len(), 25);
    assert_eq!(session.selected_frames()[24].index, 47);
}

#[test]
fn short_videos_select_everything() {
    let session = ExportSession::load(SyntheticVideo::seconds(0.5), &SamplingOptions::default())
        .unwrap()
        .with_window_size(100);
    assert_eq!(session.frames().len(), 12);
    assert_eq!(session.selected_frames().len(), 12);
}

#[test]
fn invalid_frame_rate_keeps_the_current_rate() {
    let mut session = two_second_session();
    session.dispatch(SessionCommand::SetFrameRate(24.0)).unwrap();
    assert_eq!(session.frame_rate(), 24.0);

    let error = session.dispatch(SessionCommand::SetFrameRate(0.0)).unwrap_err();
    assert!(matches!(error, FramepackError::InvalidFrameRate(_)));
    assert_eq!(session.frame_rate(), 24.0);
}

#[test]
fn reset_restores_window_and_rate() {
    let mut session = two_second_session();
    session.dispatch(SessionCommand::SelectWindow(5)).unwrap();
    session.dispatch(SessionCommand::SetFrameRate(30.0)).unwrap();
    session.dispatch(SessionCommand::Reset).unwrap();
    assert_eq!(session.window().start, 0);
    assert_eq!(session.frame_rate(), DEFAULT_FRAME_RATE);
}

// ── Export ─────────────────────────────────────────────────────────

#[test]
fn sprite_sheet_uses_native_resolution_captures() {
    let mut session = two_second_session();
    session.dispatch(SessionCommand::SelectWindow(4)).unwrap();

    let artifact = session.export(ExportKind::SpriteSheet).unwrap();
    assert_eq!(artifact.kind(), ArtifactKind::Png);

    let sheet = decode_png(artifact.bytes());
    // 5 x 5 cells of 640 x 480 are wider than the target, so no scaling.
    assert_eq!(sheet.dimensions(), (3200, 2400));

    let first = session.selected_frames()[0].timestamp;
    assert_eq!(*sheet.get_pixel(0, 0), colour_at(first));

    let source = session.into_source();
    let native: Vec<_> = source
        .captures
        .iter()
        .filter(|capture| (capture.width, capture.height) == (640, 480))
        .collect();
    assert_eq!(native.len(), 25);
    assert_eq!(native[0].timestamp, first);
}

#[test]
fn sprite_sheet_falls_back_to_thumbnails() {
    let source = SyntheticVideo::seconds(2.0).failing_native();
    let mut session = ExportSession::load(source, &SamplingOptions::default()).unwrap();

    let sheet = decode_png(session.export(ExportKind::SpriteSheet).unwrap().bytes());
    // 800 x 600 of 160 x 120 thumbnails enlarged by 3.5.
    assert_eq!(sheet.dimensions(), (2800, 2100));
}

#[test]
fn sprite_sheet_capture_reports_through_the_load_options() {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let options = SamplingOptions::new().with_progress(Arc::new(move |info: &ProgressInfo| {
        sink.lock().unwrap().push((info.operation, info.current));
    }));

    let mut session = ExportSession::load(SyntheticVideo::seconds(2.0), &options).unwrap();
    reports.lock().unwrap().clear();

    session.export(ExportKind::SpriteSheet).unwrap();

    let reports = reports.lock().unwrap();
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|(op, _)| *op == OperationType::FrameCapture));
    assert_eq!(reports.last().unwrap().1, 25);
}

#[test]
fn cancelling_the_load_token_stops_a_sprite_sheet_export() {
    let token = CancellationToken::new();
    let options = SamplingOptions::new().with_cancellation(token.clone());
    let mut session = ExportSession::load(SyntheticVideo::seconds(2.0), &options).unwrap();

    token.cancel();
    let error = session.export(ExportKind::SpriteSheet).unwrap_err();
    assert!(matches!(error, FramepackError::Cancelled));

    // Cancellation is not a capture failure, so no thumbnail sheet is made.
    let source = session.into_source();
    assert!(source.captures.iter().all(|capture| capture.width == 160));
}

#[test]
fn gif_export_uses_the_session_rate() {
    let mut session = two_second_session();
    session.dispatch(SessionCommand::SetFrameRate(10.0)).unwrap();

    let artifact = session.export(ExportKind::Gif).unwrap();
    assert_eq!(artifact.kind(), ArtifactKind::Gif);

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(artifact.bytes()).unwrap();
    assert_eq!((decoder.width(), decoder.height()), (160, 120));

    let mut count = 0;
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        assert_eq!(frame.delay, 10);
        count += 1;
    }
    assert_eq!(count, 25);
}

#[test]
fn capture_timestamps_match_the_sampling_grid() {
    let session = two_second_session();
    for frame in session.frames() {
        let expected = Duration::from_secs_f64(frame.index as f64 / 24.0);
        let delta = frame.timestamp.abs_diff(expected);
        assert!(delta < Duration::from_micros(1), "frame {}", frame.index);
    }
}
