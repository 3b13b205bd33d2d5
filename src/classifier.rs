//! Per-frame classification of tracked boxes against a lane-shadow mask.
//!
//! Each box's midpoint is looked up in the mask. An exactly black pixel means
//! the object sits in the shadow region and is annotated green; anything else
//! is annotated red. The classifier holds no state between frames.

mod mask;

pub use mask::{BLACK, FrameSize, MaskImage};

use image::Rgb;
use thiserror::Error;
use tracing::warn;

use crate::tracker::{BoundingBox, Midpoint};

/// Classification failures. Only [`ClassifyError::MidpointOutOfBounds`] is
/// scoped to a single box; the others invalidate the whole frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("mask is {mask} but the frame is {frame}")]
    MaskDimensionMismatch { mask: FrameSize, frame: FrameSize },

    #[error("midpoint ({}, {}) is outside the {bounds} mask", .midpoint.x, .midpoint.y)]
    MidpointOutOfBounds { midpoint: Midpoint, bounds: FrameSize },

    #[error("malformed mask: {0}")]
    MalformedMask(String),
}

/// Annotation chosen for a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationColor {
    /// Midpoint on a black mask pixel; drawn green
    InRegion,
    /// Midpoint on any other pixel; drawn red
    OutOfRegion,
}

impl AnnotationColor {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            AnnotationColor::InRegion => Rgb([0, 225, 0]),
            AnnotationColor::OutOfRegion => Rgb([225, 0, 0]),
        }
    }
}

/// What to do with a midpoint that falls outside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfBoundsPolicy {
    /// Report `MidpointOutOfBounds` for that box.
    #[default]
    Reject,
    /// Sample the nearest valid pixel instead, and log the adjustment.
    Clamp,
}

/// One classified box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub bbox: BoundingBox,
    pub midpoint: Midpoint,
    /// Pixel that was actually sampled; differs from `midpoint` only when clamped
    pub sampled: Midpoint,
    pub color: AnnotationColor,
}

impl Classification {
    pub fn was_clamped(&self) -> bool {
        self.sampled != self.midpoint
    }
}

/// Outcome for a single box of a frame.
pub type BoxOutcome = Result<Classification, ClassifyError>;

/// Classify a single point. Exact equality with [`BLACK`], no tolerance.
pub fn classify(point: Midpoint, mask: &MaskImage) -> Result<AnnotationColor, ClassifyError> {
    let pixel = mask
        .get(point)
        .ok_or(ClassifyError::MidpointOutOfBounds {
            midpoint: point,
            bounds: mask.size(),
        })?;
    Ok(if pixel == BLACK {
        AnnotationColor::InRegion
    } else {
        AnnotationColor::OutOfRegion
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClassifier {
    policy: OutOfBoundsPolicy,
}

impl FrameClassifier {
    pub fn new(policy: OutOfBoundsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OutOfBoundsPolicy {
        self.policy
    }

    pub fn classify_box(&self, bbox: BoundingBox, mask: &MaskImage) -> BoxOutcome {
        let midpoint = bbox.midpoint();
        let bounds = mask.size();

        let sampled = if bounds.contains(midpoint) {
            midpoint
        } else {
            match self.policy {
                OutOfBoundsPolicy::Reject => {
                    return Err(ClassifyError::MidpointOutOfBounds { midpoint, bounds });
                }
                OutOfBoundsPolicy::Clamp => {
                    let clamped = bounds.clamp(midpoint);
                    warn!(?bbox, ?midpoint, ?clamped, %bounds, "midpoint clamped into mask");
                    clamped
                }
            }
        };

        Ok(Classification {
            bbox,
            midpoint,
            sampled,
            color: classify(sampled, mask)?,
        })
    }

    /// Classify every box of a frame.
    ///
    /// The mask must have the frame's dimensions, otherwise nothing is
    /// classified. Per-box failures are reported in place; the output always
    /// has one entry per input box, in input order.
    pub fn classify_frame(
        &self,
        frame: FrameSize,
        boxes: &[BoundingBox],
        mask: &MaskImage,
    ) -> Result<Vec<BoxOutcome>, ClassifyError> {
        if mask.size() != frame {
            return Err(ClassifyError::MaskDimensionMismatch {
                mask: mask.size(),
                frame,
            });
        }
        Ok(boxes
            .iter()
            .map(|&bbox| self.classify_box(bbox, mask))
            .collect())
    }
}
