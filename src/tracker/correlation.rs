//! Single-object trackers and the backend that constructs them per [`TrackerKind`].

use image::RgbImage;
use ndarray::{Array1, Array2};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::kind::TrackerKind;
use crate::tracker::rect::BoundingBox;
use crate::tracker::template::{self, Template};

/// A single-object tracker: initialised on one frame, then updated frame by frame.
///
/// Implement this trait to plug an external vision library in behind
/// [`TrackerBackend`].
pub trait ObjectTracker: Send {
    /// Algorithm this tracker was created for.
    fn kind(&self) -> TrackerKind;

    /// Start tracking the region `bbox` of `frame`.
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()>;

    /// Locate the target in the next frame. `Ok(None)` means the target was
    /// lost for this frame.
    fn update(&mut self, frame: &RgbImage) -> Result<Option<BoundingBox>>;
}

/// Maps a [`TrackerKind`] to a concrete tracker constructor.
pub trait TrackerBackend {
    fn create(&self, kind: TrackerKind) -> Result<Box<dyn ObjectTracker>>;

    fn supports(&self, kind: TrackerKind) -> bool {
        let _ = kind;
        true
    }
}

/// Tuning profile for [`CorrelationTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerParams {
    /// Search window padding on each side, as a fraction of the box size
    pub search_margin: f32,
    /// Template update rate; 0 keeps the first appearance forever
    pub learning_rate: f32,
    /// Minimum correlation to accept a match
    pub min_score: f32,
    /// Predict the search center with a constant-velocity Kalman filter
    pub motion_model: bool,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self::for_kind(TrackerKind::default())
    }
}

impl TrackerParams {
    pub fn for_kind(kind: TrackerKind) -> Self {
        let (search_margin, learning_rate, min_score, motion_model) = match kind {
            TrackerKind::Csrt => (1.0, 0.02, 0.5, true),
            TrackerKind::Kcf => (0.75, 0.075, 0.4, false),
            TrackerKind::Boosting => (0.5, 0.0, 0.6, false),
            TrackerKind::Mil => (0.5, 0.05, 0.5, false),
            TrackerKind::Tld => (1.5, 0.0, 0.45, true),
            TrackerKind::MedianFlow => (0.25, 0.1, 0.6, true),
            TrackerKind::Mosse => (0.5, 0.125, 0.3, false),
        };
        Self {
            search_margin,
            learning_rate,
            min_score,
            motion_model,
        }
    }
}

/// Template-matching tracker with an optional motion prior.
///
/// The box keeps the size it was initialised with.
pub struct CorrelationTracker {
    kind: TrackerKind,
    params: TrackerParams,
    kalman_filter: KalmanFilter,
    template: Option<Template>,
    bbox: Option<BoundingBox>,
    motion: Option<(Array1<f64>, Array2<f64>)>,
}

impl CorrelationTracker {
    pub fn new(kind: TrackerKind) -> Self {
        Self::with_params(kind, TrackerParams::for_kind(kind))
    }

    pub fn with_params(kind: TrackerKind, params: TrackerParams) -> Self {
        Self {
            kind,
            params,
            kalman_filter: KalmanFilter::default(),
            template: None,
            bbox: None,
            motion: None,
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Last accepted position of the target.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    fn center(bbox: &BoundingBox) -> [f64; 2] {
        [
            bbox.x as f64 + bbox.width as f64 / 2.0,
            bbox.y as f64 + bbox.height as f64 / 2.0,
        ]
    }

    /// Top-left corner where the target is expected in the next frame.
    fn predict_origin(&mut self, bbox: &BoundingBox) -> (i64, i64) {
        let scale = bbox.height as f64;
        let Some((mean, cov)) = self.motion.take() else {
            return (bbox.x as i64, bbox.y as i64);
        };
        let (mean, cov) = self.kalman_filter.predict(&mean, &cov, scale);
        let origin = (
            (mean[0] - bbox.width as f64 / 2.0).round() as i64,
            (mean[1] - bbox.height as f64 / 2.0).round() as i64,
        );
        self.motion = Some((mean, cov));
        origin
    }

    fn search_area(&self, origin: (i64, i64), bbox: &BoundingBox) -> BoundingBox {
        let margin_x = (bbox.width as f32 * self.params.search_margin).ceil() as i64;
        let margin_y = (bbox.height as f32 * self.params.search_margin).ceil() as i64;
        let x1 = (origin.0 - margin_x).max(0);
        let y1 = (origin.1 - margin_y).max(0);
        let x2 = (origin.0 + bbox.width as i64 + margin_x).max(x1);
        let y2 = (origin.1 + bbox.height as i64 + margin_y).max(y1);
        BoundingBox::from_tlbr(
            x1.min(u32::MAX as i64) as u32,
            y1.min(u32::MAX as i64) as u32,
            x2.min(u32::MAX as i64) as u32,
            y2.min(u32::MAX as i64) as u32,
        )
    }
}

impl ObjectTracker for CorrelationTracker {
    fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()> {
        let plane = template::gray_plane(frame);
        let template = Template::from_plane(&plane, &bbox)
            .ok_or_else(|| Error::invalid_box(bbox, "region does not fit inside the frame"))?;
        if template.is_flat() {
            return Err(Error::invalid_box(bbox, "region has no texture to track"));
        }

        self.motion = self
            .params
            .motion_model
            .then(|| self.kalman_filter.initiate(Self::center(&bbox), bbox.height as f64));
        self.template = Some(template);
        self.bbox = Some(bbox);

        debug!(kind = %self.kind, ?bbox, "tracker initialised");
        Ok(())
    }

    fn update(&mut self, frame: &RgbImage) -> Result<Option<BoundingBox>> {
        let Some(bbox) = self.bbox else {
            return Err(Error::TrackerNotInitialized);
        };

        let origin = self.predict_origin(&bbox);
        let area = self.search_area(origin, &bbox);

        let plane = template::gray_plane(frame);
        let Some(template) = self.template.as_mut() else {
            return Err(Error::TrackerNotInitialized);
        };
        let Some(found) = template.search(&plane, &area) else {
            trace!(kind = %self.kind, ?area, "search area outside frame");
            return Ok(None);
        };
        if found.score < self.params.min_score {
            trace!(kind = %self.kind, score = found.score, "match below threshold");
            return Ok(None);
        }

        let (width, height) = template.size();
        let next = BoundingBox::new(found.x, found.y, width, height);
        if let Some(patch) = template::extract(&plane, &next) {
            template.blend(&patch, self.params.learning_rate);
        }

        if let Some((mean, cov)) = self.motion.take() {
            let (mean, cov) = self.kalman_filter.update(
                &mean,
                &cov,
                Self::center(&next),
                next.height as f64,
            )?;
            self.motion = Some((mean, cov));
        }

        self.bbox = Some(next);
        Ok(Some(next))
    }
}

/// Pure-Rust backend: every [`TrackerKind`] maps to a [`CorrelationTracker`]
/// with that kind's [`TrackerParams`] profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationBackend;

impl TrackerBackend for CorrelationBackend {
    fn create(&self, kind: TrackerKind) -> Result<Box<dyn ObjectTracker>> {
        Ok(Box::new(CorrelationTracker::new(kind)))
    }
}
