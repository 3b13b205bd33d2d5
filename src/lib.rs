//! Operator-driven multi-object tracking with lane-shadow classification.
//!
//! Every frame, each tracked box is reduced to its integer midpoint, the
//! midpoint is looked up in a lane mask, and the box is annotated green when
//! the mask is exactly black there and red otherwise.

pub mod classifier;
pub mod error;
pub mod integration;
pub mod render;
pub mod tracker;

pub use classifier::{
    AnnotationColor, BoxOutcome, Classification, ClassifyError, FrameClassifier, FrameSize,
    MaskImage, OutOfBoundsPolicy, classify,
};
pub use error::{Error, Result};
pub use integration::{
    AnnotatedFrame, Command, FramePipeline, FrameSource, LaneDetector, LaneOutput, OperatorInput,
    PipelineBuilder, PipelineConfig, RenderSink, RunSummary, run,
};
pub use tracker::{
    BoundingBox, CorrelationBackend, Midpoint, MultiTracker, ObjectTracker, TrackerBackend,
    TrackerKind,
};
