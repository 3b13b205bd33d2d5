//! Builder for validated pipeline configuration.

use crate::classifier::OutOfBoundsPolicy;
use crate::error::{Error, Result};
use crate::tracker::TrackerKind;

/// Width frames and masks are resized to before tracking.
pub const DEFAULT_RESIZE_WIDTH: u32 = 600;

/// Validated configuration for a [`FramePipeline`](super::FramePipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Algorithm used for every newly selected target
    pub tracker: TrackerKind,
    /// Resize width, keeping aspect ratio; `None` keeps the source size
    pub resize_width: Option<u32>,
    pub out_of_bounds: OutOfBoundsPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerKind::default(),
            resize_width: Some(DEFAULT_RESIZE_WIDTH),
            out_of_bounds: OutOfBoundsPolicy::default(),
        }
    }
}

/// Builder for [`PipelineConfig`]. Tracker names are checked in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    tracker: String,
    resize_width: Option<u32>,
    out_of_bounds: OutOfBoundsPolicy,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            tracker: config.tracker.name().to_string(),
            resize_width: config.resize_width,
            out_of_bounds: config.out_of_bounds,
        }
    }
}

impl PipelineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracker by name, e.g. `"kcf"`.
    pub fn tracker(mut self, name: impl Into<String>) -> Self {
        self.tracker = name.into();
        self
    }

    pub fn tracker_kind(mut self, kind: TrackerKind) -> Self {
        self.tracker = kind.name().to_string();
        self
    }

    /// Resize frames to `width` pixels wide.
    pub fn resize_width(mut self, width: u32) -> Self {
        self.resize_width = Some(width);
        self
    }

    /// Process frames at their source size.
    pub fn keep_source_size(mut self) -> Self {
        self.resize_width = None;
        self
    }

    pub fn out_of_bounds(mut self, policy: OutOfBoundsPolicy) -> Self {
        self.out_of_bounds = policy;
        self
    }

    /// Validate and build the final `PipelineConfig`.
    pub fn build(self) -> Result<PipelineConfig> {
        let tracker = self.tracker.parse::<TrackerKind>()?;
        if self.resize_width == Some(0) {
            return Err(Error::config("resize width must be positive"));
        }
        Ok(PipelineConfig {
            tracker,
            resize_width: self.resize_width,
            out_of_bounds: self.out_of_bounds,
        })
    }
}
