//! WebM export tests.
//!
//! The draw loop is exercised with an in-memory recorder; the FFmpeg
//! recorder test is skipped when the linked build has no WebM encoder.

mod common;

use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use framepack::{
    ArtifactKind, CancellationToken, FrameSource, FramepackError, ImageRef, MediaFile,
    OperationType, Pacing, ProgressInfo, VideoCodec, VideoExportOptions, VideoRecorder,
    encode_video, encode_video_with,
};
use image::{Rgba, RgbaImage};

use common::{palette, solid};

#[derive(Default)]
struct Recording {
    started: Option<(u32, u32, f64)>,
    frames: Vec<RgbaImage>,
    stopped: bool,
}

/// Keeps every fed frame; `stop` returns the frame count as bytes.
#[derive(Clone, Default)]
struct MemoryRecorder {
    recording: Arc<Mutex<Recording>>,
    feed_delay: Duration,
    fail_on_feed: Option<usize>,
}

impl MemoryRecorder {
    fn slow(feed_delay: Duration) -> Self {
        Self {
            feed_delay,
            ..Self::default()
        }
    }

    fn failing_on_feed(index: usize) -> Self {
        Self {
            fail_on_feed: Some(index),
            ..Self::default()
        }
    }
}

impl VideoRecorder for MemoryRecorder {
    fn start(&mut self, width: u32, height: u32, fps: f64) -> Result<(), FramepackError> {
        self.recording.lock().unwrap().started = Some((width, height, fps));
        Ok(())
    }

    fn feed(&mut self, frame: &RgbaImage) -> Result<(), FramepackError> {
        thread::sleep(self.feed_delay);
        let mut recording = self.recording.lock().unwrap();
        if self.fail_on_feed == Some(recording.frames.len()) {
            return Err(FramepackError::FfmpegError("encoder rejected frame".into()));
        }
        recording.frames.push(frame.clone());
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<u8>, FramepackError> {
        let mut recording = self.recording.lock().unwrap();
        recording.stopped = true;
        Ok(vec![recording.frames.len() as u8])
    }
}

fn frames(count: usize) -> Vec<ImageRef> {
    (0..count)
        .map(|index| ImageRef::from(solid(8, 6, palette(index))))
        .collect()
}

// ── Draw loop ──────────────────────────────────────────────────────

#[test]
fn every_frame_is_fed_in_order() {
    let recorder = MemoryRecorder::default();
    let recording = Arc::clone(&recorder.recording);

    let artifact =
        encode_video_with(&frames(5), 10.0, recorder, &VideoExportOptions::default()).unwrap();
    assert_eq!(artifact.kind(), ArtifactKind::Webm);
    assert_eq!(artifact.mime_type(), "video/webm");
    assert_eq!(artifact.suggested_file_name(), "animation.webm");
    assert_eq!(artifact.bytes(), &[5]);

    let recording = recording.lock().unwrap();
    assert_eq!(recording.started, Some((8, 6, 10.0)));
    assert!(recording.stopped);
    assert_eq!(recording.frames.len(), 5);
    for (index, frame) in recording.frames.iter().enumerate() {
        assert_eq!(*frame.get_pixel(0, 0), Rgba(palette(index)));
    }
}

#[test]
fn frames_are_fitted_to_the_first_frame_size() {
    let recorder = MemoryRecorder::default();
    let recording = Arc::clone(&recorder.recording);
    let inputs = vec![
        ImageRef::from(solid(8, 6, palette(0))),
        ImageRef::from(solid(32, 32, palette(1))),
    ];
    encode_video_with(&inputs, 10.0, recorder, &VideoExportOptions::default()).unwrap();

    let recording = recording.lock().unwrap();
    assert!(recording.frames.iter().all(|frame| frame.dimensions() == (8, 6)));
    assert_eq!(*recording.frames[1].get_pixel(7, 5), Rgba(palette(1)));
}

#[test]
fn progress_reaches_completion() {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let options = VideoExportOptions::new().with_progress(Arc::new(move |info: &ProgressInfo| {
        sink.lock().unwrap().push((info.operation, info.current, info.fraction()));
    }));

    encode_video_with(&frames(4), 20.0, MemoryRecorder::default(), &options).unwrap();

    let reports = reports.lock().unwrap();
    // One per frame plus the final report.
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|(op, _, _)| *op == OperationType::VideoExport));
    assert_eq!(reports.last().unwrap().1, 4);
    assert_eq!(reports.last().unwrap().2, Some(1.0));
}

#[test]
fn realtime_pacing_takes_the_clip_duration() {
    let options = VideoExportOptions::new().with_pacing(Pacing::Realtime);
    let started = Instant::now();
    encode_video_with(&frames(3), 20.0, MemoryRecorder::default(), &options).unwrap();
    // Three intervals plus two trailing ones at 50 ms each.
    assert!(started.elapsed() >= Duration::from_millis(250));
}

// ── Failures ───────────────────────────────────────────────────────

#[test]
fn slow_recorder_times_out() {
    let options = VideoExportOptions::new().with_timeout_grace(Duration::from_millis(50));
    let recorder = MemoryRecorder::slow(Duration::from_millis(400));

    match encode_video_with(&frames(2), 100.0, recorder, &options).unwrap_err() {
        FramepackError::RecordingTimeout(deadline) => {
            assert_eq!(deadline, Duration::from_millis(70));
        }
        other => panic!("Expected RecordingTimeout, got: {other}"),
    }
}

#[test]
fn recorder_errors_become_encoder_faults() {
    let error = encode_video_with(
        &frames(3),
        10.0,
        MemoryRecorder::failing_on_feed(1),
        &VideoExportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(error, FramepackError::EncoderFault(_)));
}

#[test]
fn cancelled_export_stops_before_feeding() {
    let token = CancellationToken::new();
    token.cancel();
    let recorder = MemoryRecorder::default();
    let recording = Arc::clone(&recorder.recording);

    let options = VideoExportOptions::new().with_cancellation(token);
    let error = encode_video_with(&frames(3), 10.0, recorder, &options).unwrap_err();
    assert!(matches!(error, FramepackError::Cancelled));
    assert!(recording.lock().unwrap().frames.is_empty());
}

#[test]
fn empty_input_is_rejected() {
    let error =
        encode_video_with(&[], 10.0, MemoryRecorder::default(), &VideoExportOptions::default())
            .unwrap_err();
    assert!(matches!(error, FramepackError::EmptyInput));
}

#[test]
fn invalid_frame_rate_is_rejected() {
    for fps in [0.0, -1.0, f64::NAN] {
        let error = encode_video_with(
            &frames(2),
            fps,
            MemoryRecorder::default(),
            &VideoExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(error, FramepackError::InvalidFrameRate(_)));
    }
}

#[test]
fn unrepresentable_clip_length_is_rejected() {
    // Positive and finite, but one frame would last longer than `Duration::MAX`.
    for fps in [1e-20, f64::MIN_POSITIVE] {
        let recorder = MemoryRecorder::default();
        let recording = Arc::clone(&recorder.recording);
        let error =
            encode_video_with(&frames(1), fps, recorder, &VideoExportOptions::default()).unwrap_err();
        assert!(matches!(error, FramepackError::InvalidFrameRate(rate) if rate == fps));
        assert!(recording.lock().unwrap().started.is_none());
    }
}

#[test]
fn huge_timeout_grace_saturates() {
    let options = VideoExportOptions::new().with_timeout_grace(Duration::MAX);
    let artifact =
        encode_video_with(&frames(2), 10.0, MemoryRecorder::default(), &options).unwrap();
    assert_eq!(artifact.bytes(), &[2]);
}

#[test]
fn undecodable_frame_is_reported_with_its_index() {
    let mut inputs = frames(3);
    inputs[1] = ImageRef::from(vec![9u8; 16]);
    match encode_video_with(&inputs, 10.0, MemoryRecorder::default(), &VideoExportOptions::default())
        .unwrap_err()
    {
        FramepackError::DecodeError { index, .. } => assert_eq!(index, 1),
        other => panic!("Expected DecodeError, got: {other}"),
    }
}

// ── Codecs ─────────────────────────────────────────────────────────

#[test]
fn codec_preference_order() {
    assert_eq!(
        VideoCodec::PREFERENCE,
        [VideoCodec::Vp9, VideoCodec::Vp8, VideoCodec::ContainerDefault]
    );
    assert_eq!(VideoCodec::Vp9.name(), "vp9");
    assert_eq!(VideoCodec::Vp8.name(), "vp8");
}

#[test]
fn selected_codec_is_available() {
    if let Some(codec) = VideoCodec::select_best() {
        assert!(codec.is_available());
    }
}

#[test]
fn ffmpeg_recorder_produces_webm() {
    if VideoCodec::select_best().is_none() {
        return;
    }

    let inputs: Vec<ImageRef> = (0..6)
        .map(|index| ImageRef::from(solid(33, 25, palette(index))))
        .collect();
    let options = VideoExportOptions::new().with_timeout_grace(Duration::from_secs(30));
    let artifact = encode_video(&inputs, 12.0, &options).unwrap();

    assert_eq!(artifact.kind(), ArtifactKind::Webm);
    // EBML magic.
    assert_eq!(&artifact.bytes()[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
}

#[test]
fn odd_sized_frames_are_padded_not_stretched() {
    if VideoCodec::select_best().is_none() {
        return;
    }

    let inputs: Vec<ImageRef> = (0..6)
        .map(|_| ImageRef::from(solid(33, 25, [255, 255, 255, 255])))
        .collect();
    let options = VideoExportOptions::new().with_timeout_grace(Duration::from_secs(30));
    let artifact = encode_video(&inputs, 12.0, &options).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("padded.webm");
    artifact.save(&path).unwrap();

    let mut video = MediaFile::open(&path).unwrap();
    assert_eq!((video.metadata().width, video.metadata().height), (34, 26));

    let still = video.capture(Duration::ZERO, 34, 26).unwrap();
    let brightness = |x, y| {
        let pixel = still.get_pixel(x, y);
        (u32::from(pixel[0]) + u32::from(pixel[1]) + u32::from(pixel[2])) / 3
    };
    // White content keeps its full width; the padding column stays dark.
    assert!(brightness(16, 12) > 200);
    assert!(brightness(31, 12) > 200);
    assert!(brightness(33, 12) < 100);
}
