mod correlation;
mod kalman_filter;
mod kind;
mod multi_tracker;
mod rect;
mod template;

pub use correlation::{
    CorrelationBackend, CorrelationTracker, ObjectTracker, TrackerBackend, TrackerParams,
};
pub use kalman_filter::KalmanFilter;
pub use kind::TrackerKind;
pub use multi_tracker::{MultiTracker, TrackedObject, TrackerUpdate};
pub use rect::{BoundingBox, Midpoint};
