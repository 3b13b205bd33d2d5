//! Container that drives several single-object trackers over the same frames.

use image::RgbImage;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tracker::correlation::ObjectTracker;
use crate::tracker::kind::TrackerKind;
use crate::tracker::rect::BoundingBox;

/// One registered target.
pub struct TrackedObject {
    /// Identifier, unique within its [`MultiTracker`]
    pub id: u64,
    /// Last reported bounding box
    pub bbox: BoundingBox,
    /// Whether the last update located the target
    pub located: bool,
    tracker: Box<dyn ObjectTracker>,
}

impl TrackedObject {
    pub fn kind(&self) -> TrackerKind {
        self.tracker.kind()
    }
}

impl std::fmt::Debug for TrackedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedObject")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("bbox", &self.bbox)
            .field("located", &self.located)
            .finish()
    }
}

/// Result of updating every tracker with one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// False when at least one target was not located in this frame
    pub success: bool,
    /// One box per registered target, in registration order
    pub boxes: Vec<BoundingBox>,
}

#[derive(Debug, Default)]
pub struct MultiTracker {
    objects: Vec<TrackedObject>,
    next_id: u64,
}

impl MultiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise `tracker` on `frame` at `bbox` and register it.
    pub fn add(
        &mut self,
        mut tracker: Box<dyn ObjectTracker>,
        frame: &RgbImage,
        bbox: BoundingBox,
    ) -> Result<u64> {
        if bbox.is_empty() {
            return Err(Error::invalid_box(bbox, "empty selection"));
        }
        tracker.init(frame, bbox)?;

        self.next_id += 1;
        let id = self.next_id;
        debug!(id, kind = %tracker.kind(), ?bbox, "registered target");
        self.objects.push(TrackedObject {
            id,
            bbox,
            located: true,
            tracker,
        });
        Ok(id)
    }

    /// Update every tracker with `frame`.
    ///
    /// A tracker that loses its target, or fails, keeps its previous box and
    /// clears `success`; the remaining trackers are still updated.
    pub fn update(&mut self, frame: &RgbImage) -> TrackerUpdate {
        let mut success = true;
        let mut boxes = Vec::with_capacity(self.objects.len());

        for object in &mut self.objects {
            match object.tracker.update(frame) {
                Ok(Some(bbox)) => {
                    object.bbox = bbox;
                    object.located = true;
                }
                Ok(None) => {
                    if object.located {
                        debug!(id = object.id, "target lost");
                    }
                    object.located = false;
                    success = false;
                }
                Err(err) => {
                    warn!(id = object.id, %err, "tracker update failed");
                    object.located = false;
                    success = false;
                }
            }
            boxes.push(object.bbox);
        }

        TrackerUpdate { success, boxes }
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
