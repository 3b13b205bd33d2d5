//! Outer acquisition loop: pull, process, present, react to the operator.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::tracker::TrackerBackend;

use super::{Command, FramePipeline, FrameSource, LaneDetector, OperatorInput, RenderSink};

/// Totals for one [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed and presented
    pub frames: u64,
    /// Targets registered
    pub selections: usize,
    /// Whether the operator ended the run before end of stream
    pub quit: bool,
}

/// Owns a [`FrameSource`] and releases it exactly once, on drop at the latest.
pub struct SourceGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<image::RgbImage>> {
        if self.released {
            return Ok(None);
        }
        self.source
            .next_frame()
            .map_err(|e| Error::Source(Box::new(e)))
    }

    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.source.release().map_err(|e| Error::Source(Box::new(e)))
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(%err, "failed to release frame source");
        }
    }
}

/// Drive `pipeline` until the source ends or the operator quits.
///
/// The source is released on every exit path. Frames are presented in the
/// order they were read.
pub fn run<B, S, L, I, R>(
    pipeline: &mut FramePipeline<B>,
    source: S,
    detector: &mut L,
    input: &mut I,
    sink: &mut R,
) -> Result<RunSummary>
where
    B: TrackerBackend,
    S: FrameSource,
    L: LaneDetector,
    I: OperatorInput,
    R: RenderSink,
{
    let mut source = SourceGuard::new(source);
    let outcome = drive(pipeline, &mut source, detector, input, sink);
    let released = source.release();

    let summary = outcome?;
    released?;
    info!(
        frames = summary.frames,
        selections = summary.selections,
        quit = summary.quit,
        "stream closed"
    );
    Ok(summary)
}

fn drive<B, S, L, I, R>(
    pipeline: &mut FramePipeline<B>,
    source: &mut SourceGuard<S>,
    detector: &mut L,
    input: &mut I,
    sink: &mut R,
) -> Result<RunSummary>
where
    B: TrackerBackend,
    S: FrameSource,
    L: LaneDetector,
    I: OperatorInput,
    R: RenderSink,
{
    let mut summary = RunSummary::default();

    while let Some(frame) = source.next_frame()? {
        let annotated = pipeline.process_frame(detector, &frame)?;
        sink.present(&annotated)
            .map_err(|e| Error::Sink(Box::new(e)))?;
        summary.frames += 1;

        match input.poll(&annotated).map_err(|e| Error::Input(Box::new(e)))? {
            Command::Continue => {}
            Command::Select(bbox) => match pipeline.select(&annotated, bbox) {
                Ok(Some(_)) => summary.selections += 1,
                Ok(None) => {}
                Err(err @ Error::InvalidBox { .. }) => warn!(%err, "selection ignored"),
                Err(err) => return Err(err),
            },
            Command::Quit => {
                info!(frame = annotated.index, "quit requested");
                summary.quit = true;
                break;
            }
        }
    }

    Ok(summary)
}
