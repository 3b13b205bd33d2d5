//! FramePipeline: lane detection, tracking and classification for one frame at a time.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, info};

use crate::classifier::{
    BoxOutcome, Classification, ClassifyError, FrameClassifier, FrameSize, MaskImage,
};
use crate::error::{Error, Result};
use crate::render;
use crate::tracker::{BoundingBox, CorrelationBackend, MultiTracker, TrackerBackend};

use super::{LaneDetector, LaneOutput, PipelineConfig};

/// Everything produced for one frame.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    /// Zero-based position in the stream
    pub index: u64,
    /// Resized display frame before annotation; new targets are selected on it
    pub source: RgbImage,
    /// Display frame with boxes and midpoints drawn
    pub frame: RgbImage,
    /// Lane-shadow mask with midpoints drawn
    pub shadow: RgbImage,
    /// One entry per tracked target, in registration order
    pub classifications: Vec<BoxOutcome>,
    /// False when a tracker lost its target in this frame
    pub tracker_ok: bool,
}

impl AnnotatedFrame {
    /// Successfully classified boxes.
    pub fn classified(&self) -> impl Iterator<Item = &Classification> {
        self.classifications.iter().filter_map(|c| c.as_ref().ok())
    }
}

/// Per-frame processing with explicit tracker state.
///
/// Frames are processed strictly in the order they are passed in.
pub struct FramePipeline<B: TrackerBackend = CorrelationBackend> {
    config: PipelineConfig,
    backend: B,
    trackers: MultiTracker,
    classifier: FrameClassifier,
    frame_index: u64,
}

impl FramePipeline<CorrelationBackend> {
    /// Create a pipeline backed by the built-in correlation trackers.
    pub fn with_default_backend(config: PipelineConfig) -> Result<Self> {
        Self::new(config, CorrelationBackend)
    }
}

impl<B: TrackerBackend> FramePipeline<B> {
    /// Create a new pipeline. Fails if `backend` cannot build the configured tracker.
    pub fn new(config: PipelineConfig, backend: B) -> Result<Self> {
        if !backend.supports(config.tracker) {
            return Err(Error::TrackerUnavailable(config.tracker));
        }
        Ok(Self {
            config,
            backend,
            trackers: MultiTracker::new(),
            classifier: FrameClassifier::new(config.out_of_bounds),
            frame_index: 0,
        })
    }

    /// Run the lane detector, update all trackers and classify their boxes.
    ///
    /// A mask whose size differs from the display frame fails the whole frame
    /// with [`ClassifyError::MaskDimensionMismatch`].
    pub fn process_frame<L: LaneDetector>(
        &mut self,
        detector: &mut L,
        frame: &RgbImage,
    ) -> Result<AnnotatedFrame> {
        let LaneOutput { frame: display, mask } = detector
            .process(frame)
            .map_err(|e| Error::Detector(Box::new(e)))?;

        if display.dimensions() != mask.dimensions() {
            return Err(ClassifyError::MaskDimensionMismatch {
                mask: FrameSize::of(&mask),
                frame: FrameSize::of(&display),
            }
            .into());
        }

        // Same filter for both: mask pixels blended at a lane edge
        // are no longer exactly black
        let display = self.resize(display, FilterType::Triangle);
        let mask = MaskImage::new(self.resize(mask, FilterType::Triangle))?;

        let update = self.trackers.update(&display);
        let classifications =
            self.classifier
                .classify_frame(FrameSize::of(&display), &update.boxes, &mask)?;

        let mut annotated = display.clone();
        let mut shadow = mask.into_image();
        let drawable: Vec<Classification> = classifications
            .iter()
            .filter_map(|c| c.as_ref().ok().copied())
            .collect();
        render::draw_classifications(&mut annotated, &mut shadow, &drawable);

        let index = self.frame_index;
        self.frame_index += 1;
        debug!(
            index,
            targets = classifications.len(),
            tracker_ok = update.success,
            "frame processed"
        );

        Ok(AnnotatedFrame {
            index,
            source: display,
            frame: annotated,
            shadow,
            classifications,
            tracker_ok: update.success,
        })
    }

    /// Register a new target selected on a previously shown frame.
    ///
    /// The selection is clipped to the frame. Returns `Ok(None)` when nothing
    /// of it remains, e.g. a cancelled selection.
    pub fn select(&mut self, shown: &AnnotatedFrame, bbox: BoundingBox) -> Result<Option<u64>> {
        let size = FrameSize::of(&shown.source);
        let Some(clipped) = bbox.clamp_to(size.width, size.height) else {
            info!(?bbox, %size, "empty selection ignored");
            return Ok(None);
        };

        let tracker = self.backend.create(self.config.tracker)?;
        let id = self.trackers.add(tracker, &shown.source, clipped)?;
        info!(
            id,
            kind = %self.config.tracker,
            bbox = ?clipped,
            frame = shown.index,
            "tracking new target"
        );
        Ok(Some(id))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn trackers(&self) -> &MultiTracker {
        &self.trackers
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    fn resize(&self, img: RgbImage, filter: FilterType) -> RgbImage {
        match self.config.resize_width {
            Some(width) if width != img.width() => {
                let height = resized_height(img.width(), img.height(), width);
                imageops::resize(&img, width, height, filter)
            }
            _ => img,
        }
    }
}

/// Height that keeps the aspect ratio at `target_width`, truncated, at least 1.
fn resized_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height;
    }
    ((height as u64 * target_width as u64) / width as u64).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{AnnotationColor, BLACK, OutOfBoundsPolicy, classify};
    use crate::integration::PipelineBuilder;
    use crate::tracker::{Midpoint, ObjectTracker, TrackerKind};
    use image::Rgb;

    /// Passes the frame through and uses a fixed mask.
    struct FixedMask {
        mask: RgbImage,
    }

    impl LaneDetector for FixedMask {
        type Error = std::convert::Infallible;

        fn process(&mut self, frame: &RgbImage) -> std::result::Result<LaneOutput, Self::Error> {
            Ok(LaneOutput {
                frame: frame.clone(),
                mask: self.mask.clone(),
            })
        }
    }

    fn noise(x: u32, y: u32) -> u8 {
        let mut v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        (v & 0xff) as u8
    }

    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = noise(x, y);
            Rgb([v, v, v])
        })
    }

    /// Black top half, white bottom half.
    fn half_mask(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| {
            if y < height / 2 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        })
    }

    fn pipeline(config: PipelineConfig) -> FramePipeline {
        FramePipeline::with_default_backend(config).unwrap()
    }

    #[test]
    fn test_resized_height() {
        assert_eq!(resized_height(1280, 720, 600), 337);
        assert_eq!(resized_height(600, 400, 600), 400);
        assert_eq!(resized_height(1000, 1, 10), 1);
    }

    #[test]
    fn test_no_targets_yields_empty_classification() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let mut detector = FixedMask {
            mask: half_mask(1200, 800),
        };
        let annotated = pipeline
            .process_frame(&mut detector, &textured(1200, 800))
            .unwrap();

        assert_eq!(annotated.index, 0);
        assert_eq!(annotated.frame.dimensions(), (600, 400));
        assert_eq!(annotated.shadow.dimensions(), (600, 400));
        assert!(annotated.classifications.is_empty());
        assert!(annotated.tracker_ok);
        assert_eq!(pipeline.frames_processed(), 1);
    }

    #[test]
    fn test_downscaled_mask_blends_lane_edges() {
        let config = PipelineBuilder::new().resize_width(20).build().unwrap();
        let mut pipeline = pipeline(config);
        // One-pixel black and white columns
        let mut detector = FixedMask {
            mask: RgbImage::from_fn(40, 10, |x, _| {
                if x % 2 == 0 { BLACK } else { Rgb([255, 255, 255]) }
            }),
        };
        let shown = pipeline
            .process_frame(&mut detector, &textured(40, 10))
            .unwrap();

        assert_eq!(shown.shadow.dimensions(), (20, 5));
        assert!(shown.shadow.pixels().all(|p| *p != BLACK));

        let mask = MaskImage::new(shown.shadow.clone()).unwrap();
        assert_eq!(
            classify(Midpoint::new(10, 2), &mask).unwrap(),
            AnnotationColor::OutOfRegion
        );
    }

    #[test]
    fn test_selected_targets_are_classified() {
        let config = PipelineBuilder::new().keep_source_size().build().unwrap();
        let mut pipeline = pipeline(config);
        let mut detector = FixedMask {
            mask: half_mask(200, 100),
        };
        let frame = textured(200, 100);

        let shown = pipeline.process_frame(&mut detector, &frame).unwrap();
        pipeline
            .select(&shown, BoundingBox::new(10, 10, 20, 20))
            .unwrap()
            .unwrap();
        pipeline
            .select(&shown, BoundingBox::new(100, 70, 20, 20))
            .unwrap()
            .unwrap();

        let annotated = pipeline.process_frame(&mut detector, &frame).unwrap();
        let colors: Vec<AnnotationColor> = annotated.classified().map(|c| c.color).collect();
        assert_eq!(
            colors,
            vec![AnnotationColor::InRegion, AnnotationColor::OutOfRegion]
        );
        assert!(annotated.tracker_ok);
        assert_eq!(*annotated.frame.get_pixel(20, 20), AnnotationColor::InRegion.rgb());
        assert_eq!(*annotated.shadow.get_pixel(110, 80), AnnotationColor::OutOfRegion.rgb());
        // The clean copy has no overlay
        assert_eq!(annotated.source, frame);
    }

    #[test]
    fn test_mask_mismatch_fails_frame() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let mut detector = FixedMask {
            mask: half_mask(300, 300),
        };
        let err = pipeline
            .process_frame(&mut detector, &textured(640, 480))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Classify(ClassifyError::MaskDimensionMismatch { .. })
        ));
        assert_eq!(pipeline.frames_processed(), 0);
    }

    #[test]
    fn test_empty_selection_is_ignored() {
        let config = PipelineBuilder::new()
            .keep_source_size()
            .out_of_bounds(OutOfBoundsPolicy::Clamp)
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);
        let mut detector = FixedMask {
            mask: half_mask(50, 50),
        };
        let shown = pipeline
            .process_frame(&mut detector, &textured(50, 50))
            .unwrap();

        assert_eq!(pipeline.select(&shown, BoundingBox::new(0, 0, 0, 0)).unwrap(), None);
        assert_eq!(pipeline.select(&shown, BoundingBox::new(60, 60, 5, 5)).unwrap(), None);
        assert!(pipeline.trackers().is_empty());
    }

    struct NoBackend;

    impl TrackerBackend for NoBackend {
        fn create(&self, kind: TrackerKind) -> Result<Box<dyn ObjectTracker>> {
            Err(Error::TrackerUnavailable(kind))
        }

        fn supports(&self, _kind: TrackerKind) -> bool {
            false
        }
    }

    #[test]
    fn test_backend_must_support_kind() {
        let err = FramePipeline::new(PipelineConfig::default(), NoBackend).err().unwrap();
        assert!(matches!(err, Error::TrackerUnavailable(_)));
    }
}
