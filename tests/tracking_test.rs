use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use image::{Rgb, RgbImage};
use lanetrack_rs::integration::{ScriptedInput, Selection, SourceGuard};
use lanetrack_rs::{
    AnnotatedFrame, AnnotationColor, BoundingBox, ClassifyError, Error, FramePipeline,
    FrameSource, LaneDetector, LaneOutput, PipelineBuilder, RenderSink, run,
};

const WIDTH: u32 = 200;
const HEIGHT: u32 = 100;

fn noise(x: u32, y: u32) -> u8 {
    let mut v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
    v ^= v >> 13;
    v = v.wrapping_mul(0x5bd1_e995);
    v ^= v >> 15;
    (v & 0xff) as u8
}

/// Flat gray frame with a textured 16x16 target at `(ox, 40)`.
fn frame_with_target(ox: u32) -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        if (ox..ox + 16).contains(&x) && (40..56).contains(&y) {
            let v = noise(x - ox, y - 40);
            Rgb([v, v, v])
        } else {
            Rgb([90, 90, 90])
        }
    })
}

/// Target moving right by 10 pixels per frame.
fn moving_target(frames: u32) -> Vec<RgbImage> {
    (0..frames).map(|i| frame_with_target(60 + 10 * i)).collect()
}

struct VecSource {
    frames: std::vec::IntoIter<RgbImage>,
    releases: Rc<Cell<u32>>,
}

impl VecSource {
    fn new(frames: Vec<RgbImage>, releases: Rc<Cell<u32>>) -> Self {
        Self {
            frames: frames.into_iter(),
            releases,
        }
    }
}

impl FrameSource for VecSource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, Infallible> {
        Ok(self.frames.next())
    }

    fn release(&mut self) -> Result<(), Infallible> {
        self.releases.set(self.releases.get() + 1);
        Ok(())
    }
}

/// Black for `x < 100`, white to the right. Returns a wrongly sized mask from
/// frame `broken_at` on.
struct LaneSplit {
    calls: u64,
    broken_at: Option<u64>,
}

impl LaneDetector for LaneSplit {
    type Error = Infallible;

    fn process(&mut self, frame: &RgbImage) -> Result<LaneOutput, Infallible> {
        let call = self.calls;
        self.calls += 1;
        let width = match self.broken_at {
            Some(at) if call >= at => WIDTH / 2,
            _ => WIDTH,
        };
        let mask = RgbImage::from_fn(width, HEIGHT, |x, _| {
            if x < 100 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        Ok(LaneOutput {
            frame: frame.clone(),
            mask,
        })
    }
}

#[derive(Default)]
struct CollectSink {
    frames: Vec<AnnotatedFrame>,
}

impl RenderSink for CollectSink {
    type Error = Infallible;

    fn present(&mut self, annotated: &AnnotatedFrame) -> Result<(), Infallible> {
        self.frames.push(annotated.clone());
        Ok(())
    }
}

fn selection_at_start() -> Selection {
    Selection {
        frame: 0,
        bbox: BoundingBox::new(60, 40, 16, 16),
    }
}

#[test]
fn test_target_crosses_lane_boundary() {
    let config = PipelineBuilder::new().resize_width(WIDTH).build().unwrap();
    let mut pipeline = FramePipeline::with_default_backend(config).unwrap();
    let releases = Rc::new(Cell::new(0));
    let source = VecSource::new(moving_target(5), releases.clone());
    let mut detector = LaneSplit {
        calls: 0,
        broken_at: None,
    };
    let mut input = ScriptedInput::new([selection_at_start()], None).unwrap();
    let mut sink = CollectSink::default();

    let summary = run(&mut pipeline, source, &mut detector, &mut input, &mut sink).unwrap();

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.selections, 1);
    assert!(!summary.quit);
    assert_eq!(releases.get(), 1);

    // Nothing is tracked until the selection on frame 0 is made
    assert!(sink.frames[0].classifications.is_empty());

    let colors: Vec<AnnotationColor> = sink.frames[1..]
        .iter()
        .map(|f| {
            assert!(f.tracker_ok);
            assert_eq!(f.classifications.len(), 1);
            f.classified().next().unwrap().color
        })
        .collect();
    // Midpoint x: 78, 88, 98, 108
    assert_eq!(
        colors,
        vec![
            AnnotationColor::InRegion,
            AnnotationColor::InRegion,
            AnnotationColor::InRegion,
            AnnotationColor::OutOfRegion,
        ]
    );

    let last = sink.frames[4].classified().next().unwrap();
    assert_eq!(last.bbox, BoundingBox::new(100, 40, 16, 16));
    assert_eq!(last.midpoint.x, 108);
    assert_eq!(last.midpoint.y, 48);
}

#[test]
fn test_frames_are_presented_in_order() {
    let mut pipeline = FramePipeline::with_default_backend(
        PipelineBuilder::new().keep_source_size().build().unwrap(),
    )
    .unwrap();
    let source = VecSource::new(moving_target(4), Rc::new(Cell::new(0)));
    let mut detector = LaneSplit {
        calls: 0,
        broken_at: None,
    };
    let mut input = ScriptedInput::default();
    let mut sink = CollectSink::default();

    run(&mut pipeline, source, &mut detector, &mut input, &mut sink).unwrap();

    let indices: Vec<u64> = sink.frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_quit_releases_source() {
    let mut pipeline = FramePipeline::with_default_backend(
        PipelineBuilder::new().keep_source_size().build().unwrap(),
    )
    .unwrap();
    let releases = Rc::new(Cell::new(0));
    let source = VecSource::new(moving_target(5), releases.clone());
    let mut detector = LaneSplit {
        calls: 0,
        broken_at: None,
    };
    let mut input = ScriptedInput::new(Vec::new(), Some(2)).unwrap();
    let mut sink = CollectSink::default();

    let summary = run(&mut pipeline, source, &mut detector, &mut input, &mut sink).unwrap();

    assert!(summary.quit);
    assert_eq!(summary.frames, 2);
    assert_eq!(releases.get(), 1);
}

#[test]
fn test_mask_mismatch_aborts_and_releases() {
    let mut pipeline = FramePipeline::with_default_backend(
        PipelineBuilder::new().keep_source_size().build().unwrap(),
    )
    .unwrap();
    let releases = Rc::new(Cell::new(0));
    let source = VecSource::new(moving_target(5), releases.clone());
    let mut detector = LaneSplit {
        calls: 0,
        broken_at: Some(2),
    };
    let mut input = ScriptedInput::new([selection_at_start()], None).unwrap();
    let mut sink = CollectSink::default();

    let err = run(&mut pipeline, source, &mut detector, &mut input, &mut sink).unwrap_err();

    assert!(matches!(
        err,
        Error::Classify(ClassifyError::MaskDimensionMismatch { .. })
    ));
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(releases.get(), 1);
}

#[test]
fn test_untextured_selection_is_skipped() {
    let mut pipeline = FramePipeline::with_default_backend(
        PipelineBuilder::new().keep_source_size().build().unwrap(),
    )
    .unwrap();
    let source = VecSource::new(moving_target(3), Rc::new(Cell::new(0)));
    let mut detector = LaneSplit {
        calls: 0,
        broken_at: None,
    };
    // Flat background only
    let mut input = ScriptedInput::new(
        [Selection {
            frame: 0,
            bbox: BoundingBox::new(0, 0, 20, 20),
        }],
        None,
    )
    .unwrap();
    let mut sink = CollectSink::default();

    let summary = run(&mut pipeline, source, &mut detector, &mut input, &mut sink).unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.selections, 0);
    assert!(pipeline.trackers().is_empty());
}

#[test]
fn test_guard_releases_on_drop() {
    let releases = Rc::new(Cell::new(0));
    {
        let mut guard = SourceGuard::new(VecSource::new(moving_target(2), releases.clone()));
        assert!(guard.next_frame().unwrap().is_some());
    }
    assert_eq!(releases.get(), 1);

    let mut guard = SourceGuard::new(VecSource::new(moving_target(2), releases.clone()));
    guard.release().unwrap();
    assert!(guard.next_frame().unwrap().is_none());
    drop(guard);
    assert_eq!(releases.get(), 2);
}

#[test]
fn test_unsupported_tracker_is_a_configuration_error() {
    let err = PipelineBuilder::new().tracker("goturn").build().unwrap_err();
    assert!(matches!(err, Error::UnsupportedTrackerKind(ref name) if name == "goturn"));
    assert_eq!(err.to_string(), "unsupported tracker kind: \"goturn\"");
}
