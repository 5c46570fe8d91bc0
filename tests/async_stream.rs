//! Async sampling stream tests.

#![cfg(feature = "async")]

mod common;

use tokio_stream::StreamExt;

use framepack::{FramepackError, SamplingOptions, sample_file_stream, sample_stream};

use common::SyntheticVideo;

#[tokio::test]
async fn stream_yields_every_sampled_frame() {
    let mut stream = sample_stream(SyntheticVideo::seconds(1.0), SamplingOptions::new());

    let mut indices = Vec::new();
    while let Some(frame) = stream.next().await {
        let frame = frame.expect("frame");
        assert_eq!(frame.image.dimensions(), (160, 120));
        indices.push(frame.index);
    }
    assert_eq!(indices, (0..24).collect::<Vec<_>>());
}

#[tokio::test]
async fn stream_ends_after_a_capture_error() {
    let source = SyntheticVideo::seconds(1.0).failing_at(2);
    let results: Vec<_> = sample_stream(source, SamplingOptions::new()).collect().await;

    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(Result::is_ok));
    assert!(matches!(
        results[2],
        Err(FramepackError::FrameCaptureError { .. })
    ));
}

#[tokio::test]
async fn dropping_the_stream_early_is_harmless() {
    let mut stream = sample_stream(SyntheticVideo::seconds(10.0), SamplingOptions::new());
    let first = stream.next().await.expect("one frame").expect("frame");
    assert_eq!(first.index, 0);
    drop(stream);
}

#[tokio::test]
async fn missing_file_arrives_as_the_only_item() {
    let results: Vec<_> =
        sample_file_stream("tests/fixtures/does_not_exist.mp4", SamplingOptions::new())
            .collect()
            .await;
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(FramepackError::SourceUnreadable(_))));
}
