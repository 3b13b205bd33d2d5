//! Traits for the collaborators around the per-frame pipeline.

use image::RgbImage;

use crate::integration::pipeline::AnnotatedFrame;
use crate::tracker::BoundingBox;

/// Ordered source of frames, e.g. a video file or a camera.
///
/// # Example
///
/// ```ignore
/// use lanetrack_rs::FrameSource;
///
/// struct Camera { /* device handle */ }
///
/// impl FrameSource for Camera {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<image::RgbImage>, Self::Error> {
///         // Grab a frame, or Ok(None) once the stream has ended
///         Ok(None)
///     }
/// }
/// ```
pub trait FrameSource {
    /// Error type for acquisition failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error>;

    /// Release the underlying device or file. Called exactly once by the driver.
    fn release(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Output of a lane detector for one frame.
#[derive(Debug, Clone)]
pub struct LaneOutput {
    /// Frame to display, possibly with lane overlays
    pub frame: RgbImage,
    /// Lane-shadow raster with the same dimensions as `frame`
    pub mask: RgbImage,
}

/// Lane-region detector.
pub trait LaneDetector {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    fn process(&mut self, frame: &RgbImage) -> Result<LaneOutput, Self::Error>;
}

/// What the operator asked for after seeing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    /// Track a new region of the frame just shown
    Select(BoundingBox),
    Quit,
}

/// Operator input, polled once per displayed frame.
pub trait OperatorInput {
    type Error: std::error::Error + Send + Sync + 'static;

    fn poll(&mut self, shown: &AnnotatedFrame) -> Result<Command, Self::Error>;
}

/// Destination for annotated frames, e.g. a window or an output directory.
pub trait RenderSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn present(&mut self, annotated: &AnnotatedFrame) -> Result<(), Self::Error>;
}
