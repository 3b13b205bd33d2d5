//! Error types for the lane tracking library.

use thiserror::Error;

use crate::classifier::ClassifyError;
use crate::tracker::{BoundingBox, TrackerKind};

/// Result type alias for the lane tracking library.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring or running the tracking loop.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("unsupported tracker kind: {0:?}")]
    UnsupportedTrackerKind(String),

    #[error("backend cannot create a {0} tracker")]
    TrackerUnavailable(TrackerKind),

    #[error("tracker used before init")]
    TrackerNotInitialized,

    #[error("invalid bounding box {bbox:?}: {reason}")]
    InvalidBox {
        bbox: BoundingBox,
        reason: &'static str,
    },

    #[error("innovation covariance is not invertible")]
    SingularCovariance,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("frame source failed: {0}")]
    Source(#[source] BoxError),

    #[error("lane detector failed: {0}")]
    Detector(#[source] BoxError),

    #[error("operator input failed: {0}")]
    Input(#[source] BoxError),

    #[error("render sink failed: {0}")]
    Sink(#[source] BoxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "opencv-backend")]
    #[error("OpenCV error: {0}")]
    Opencv(#[from] opencv::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn invalid_box(bbox: BoundingBox, reason: &'static str) -> Self {
        Self::InvalidBox { bbox, reason }
    }
}
