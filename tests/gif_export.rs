//! Animated GIF export tests.

mod common;

use std::io::Cursor;

use framepack::{ArtifactKind, FramepackError, GifOptions, ImageRef, encode_gif, frame_delay_ms};

use common::{palette, solid};

struct DecodedGif {
    width: u16,
    height: u16,
    delays: Vec<u16>,
    first_pixels: Vec<[u8; 4]>,
}

fn decode(bytes: &[u8]) -> DecodedGif {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).expect("valid GIF header");

    let width = decoder.width();
    let height = decoder.height();
    let mut delays = Vec::new();
    let mut first_pixels = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid GIF frame") {
        delays.push(frame.delay);
        let px = &frame.buffer[..4];
        first_pixels.push([px[0], px[1], px[2], px[3]]);
    }

    DecodedGif {
        width,
        height,
        delays,
        first_pixels,
    }
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 8)
}

// ── Delay ──────────────────────────────────────────────────────────

#[test]
fn delay_is_rounded_milliseconds_per_frame() {
    assert_eq!(frame_delay_ms(10.0).unwrap(), 100);
    assert_eq!(frame_delay_ms(12.0).unwrap(), 83);
    assert_eq!(frame_delay_ms(24.0).unwrap(), 42);
    assert_eq!(frame_delay_ms(3.0).unwrap(), 333);
}

#[test]
fn invalid_frame_rates_are_rejected() {
    for fps in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            frame_delay_ms(fps),
            Err(FramepackError::InvalidFrameRate(_))
        ));
    }
}

// ── Encoding ───────────────────────────────────────────────────────

#[test]
fn ten_frames_at_ten_fps() {
    let frames: Vec<ImageRef> = (0..10)
        .map(|index| ImageRef::from(solid(16, 12, palette(index))))
        .collect();

    let artifact = encode_gif(&frames, 10.0, &GifOptions::default()).unwrap();
    assert_eq!(artifact.kind(), ArtifactKind::Gif);
    assert_eq!(artifact.mime_type(), "image/gif");
    assert_eq!(artifact.suggested_file_name(), "animation.gif");
    assert_eq!(&artifact.bytes()[..6], b"GIF89a");

    let decoded = decode(artifact.bytes());
    assert_eq!((decoded.width, decoded.height), (16, 12));
    assert_eq!(decoded.delays, vec![10; 10]);
}

#[test]
fn frame_order_and_colours_are_preserved() {
    let colours = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
    let frames: Vec<ImageRef> = colours
        .iter()
        .map(|colour| ImageRef::from(solid(8, 8, *colour)))
        .collect();

    let decoded = decode(encode_gif(&frames, 12.0, &GifOptions::default()).unwrap().bytes());
    assert_eq!(decoded.delays, vec![8; 3]);
    for (pixel, colour) in decoded.first_pixels.iter().zip(colours.iter()) {
        assert!(close(*pixel, *colour), "{pixel:?} vs {colour:?}");
    }
}

#[test]
fn later_frames_are_fitted_to_the_first_frame() {
    let frames = vec![
        ImageRef::from(solid(10, 10, palette(0))),
        ImageRef::from(solid(40, 20, palette(1))),
    ];
    let decoded = decode(encode_gif(&frames, 5.0, &GifOptions::default()).unwrap().bytes());
    assert_eq!((decoded.width, decoded.height), (10, 10));
    assert_eq!(decoded.delays.len(), 2);
}

#[test]
fn very_high_rates_keep_a_nonzero_delay() {
    let frames = vec![ImageRef::from(solid(4, 4, palette(3)))];
    let decoded = decode(encode_gif(&frames, 1000.0, &GifOptions::default()).unwrap().bytes());
    assert_eq!(decoded.delays, vec![1]);
}

#[test]
fn options_builder_clamps_speed() {
    let options = GifOptions::new().with_speed(99).with_repeat(Some(3));
    assert_eq!(options.speed, 30);
    assert_eq!(options.repeat, Some(3));

    let frames = vec![ImageRef::from(solid(4, 4, palette(0)))];
    assert!(encode_gif(&frames, 10.0, &options).is_ok());
}

// ── Failures ───────────────────────────────────────────────────────

#[test]
fn empty_input_is_rejected() {
    let error = encode_gif(&[], 10.0, &GifOptions::default()).unwrap_err();
    assert!(matches!(error, FramepackError::EmptyInput));
}

#[test]
fn bad_frame_rate_is_rejected() {
    let frames = vec![ImageRef::from(solid(4, 4, palette(0)))];
    let error = encode_gif(&frames, 0.0, &GifOptions::default()).unwrap_err();
    assert!(matches!(error, FramepackError::InvalidFrameRate(_)));
}

#[test]
fn undecodable_frame_aborts_the_export() {
    let frames = vec![
        ImageRef::from(solid(4, 4, palette(0))),
        ImageRef::from(vec![0u8, 1, 2, 3]),
    ];
    match encode_gif(&frames, 10.0, &GifOptions::default()).unwrap_err() {
        FramepackError::DecodeError { index, .. } => assert_eq!(index, 1),
        other => panic!("Expected DecodeError, got: {other}"),
    }
}
