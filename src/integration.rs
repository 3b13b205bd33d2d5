//! Integration of the classifier with its collaborators.
//!
//! This module provides the traits for frame sources, lane detectors,
//! operator input and render sinks, the per-frame [`FramePipeline`], and the
//! [`run`] driver that ties them together. With the `opencv-backend` feature
//! it also provides OpenCV trackers, video capture and HighGUI windows.

mod builder;
mod detector;
mod driver;
mod pipeline;
mod sources;

pub use builder::{DEFAULT_RESIZE_WIDTH, PipelineBuilder, PipelineConfig};
pub use detector::{Command, FrameSource, LaneDetector, LaneOutput, OperatorInput, RenderSink};
pub use driver::{RunSummary, SourceGuard, run};
pub use pipeline::{AnnotatedFrame, FramePipeline};
pub use sources::{
    DirectorySink, ImageSequenceSource, MaskDirectory, ScriptedInput, Selection, list_images,
};

#[cfg(feature = "opencv-backend")]
mod opencv_backend;

#[cfg(feature = "opencv-backend")]
pub use opencv_backend::{
    FRAME_WINDOW, HighguiSink, KeyboardInput, OpencvBackend, OpencvTracker, SHADOW_WINDOW,
    VideoCaptureSource, to_mat, to_rgb_image,
};
