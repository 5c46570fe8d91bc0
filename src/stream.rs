//! Async sampling.
//!
//! [`FrameStream`] runs a sampling pass on a Tokio blocking thread and
//! streams each [`RawFrame`] back through a bounded channel as soon as it is
//! captured, so a UI can show thumbnails while sampling is still running.
//! Dropping the stream closes the channel, which stops the pass at the next
//! frame boundary.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//!
//! use framepack::{FramepackError, SamplingOptions};
//!
//! # async fn example() -> Result<(), FramepackError> {
//! let mut stream = framepack::sample_file_stream("clip.mp4", SamplingOptions::new());
//!
//! while let Some(frame) = stream.next().await {
//!     let frame = frame?;
//!     println!("{} at {:?}", frame.id, frame.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use crate::configuration::SamplingOptions;
use crate::error::FramepackError;
use crate::media::MediaFile;
use crate::sampler::{RawFrame, SampleIterator};
use crate::source::FrameSource;

/// Kept small so at most a handful of captured frames wait in memory.
const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// A stream of sampled frames produced by a background thread.
pub struct FrameStream {
    receiver: Receiver<Result<RawFrame, FramepackError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl Stream for FrameStream {
    type Item = Result<RawFrame, FramepackError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Sample `source` on a blocking thread, streaming frames as they are
/// captured. Must be called from within a Tokio runtime.
pub fn sample_stream<S>(mut source: S, options: SamplingOptions) -> FrameStream
where
    S: FrameSource + Send + 'static,
{
    spawn_sampling(move |sender| run_pass(&mut source, &options, sender))
}

/// Open the video at `path` on a blocking thread and stream its sampled
/// frames. Open failures arrive as the stream's only item.
pub fn sample_file_stream<P: Into<PathBuf>>(path: P, options: SamplingOptions) -> FrameStream {
    let path = path.into();
    spawn_sampling(move |sender| {
        let mut source = MediaFile::open(&path)?;
        run_pass(&mut source, &options, sender)
    })
}

fn spawn_sampling<F>(task: F) -> FrameStream
where
    F: FnOnce(&Sender<Result<RawFrame, FramepackError>>) -> Result<(), FramepackError>
        + Send
        + 'static,
{
    let (sender, receiver) = tokio::sync::mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

    let handle = tokio::task::spawn_blocking(move || {
        if let Err(error) = task(&sender) {
            // The receiver may already be gone.
            let _ = sender.blocking_send(Err(error));
        }
    });

    FrameStream { receiver, handle }
}

fn run_pass<S: FrameSource + ?Sized>(
    source: &mut S,
    options: &SamplingOptions,
    sender: &Sender<Result<RawFrame, FramepackError>>,
) -> Result<(), FramepackError> {
    for frame in SampleIterator::new(source, options)? {
        let frame = frame?;
        if sender.blocking_send(Ok(frame)).is_err() {
            log::debug!("Frame stream dropped, stopping sampling");
            return Ok(());
        }
    }
    Ok(())
}
