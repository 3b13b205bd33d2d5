//! OpenCV backend: native trackers, video capture and HighGUI windows.
//!
//! [`OpencvBackend`] implements [`TrackerBackend`] with the trackers shipped in
//! OpenCV's `tracking` and `video` modules. [`VideoCaptureSource`],
//! [`HighguiSink`] and [`KeyboardInput`] drive the pipeline from a video file
//! or camera with the `Frame` and `Shadow` windows, `s` to select a target and
//! `q` to quit.
//!
//! # Example
//!
//! ```ignore
//! use lanetrack_rs::integration::{
//!     HighguiSink, KeyboardInput, OpencvBackend, VideoCaptureSource,
//! };
//! use lanetrack_rs::{FramePipeline, PipelineBuilder, run};
//!
//! let config = PipelineBuilder::new().tracker("kcf").build()?;
//! let mut pipeline = FramePipeline::new(config, OpencvBackend)?;
//! let source = VideoCaptureSource::open_file("drive.mp4")?;
//! let mut sink = HighguiSink::new();
//! run(&mut pipeline, source, &mut detector, &mut KeyboardInput, &mut sink)?;
//! ```

use std::path::Path;

use image::RgbImage;
use opencv::core::{Mat, Ptr, Rect, StsUnmatchedSizes};
use opencv::prelude::*;
use opencv::{highgui, imgproc, tracking, video, videoio};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tracker::{BoundingBox, ObjectTracker, TrackerBackend, TrackerKind};

use super::{AnnotatedFrame, Command, FrameSource, OperatorInput, RenderSink};

/// Window showing the annotated frame; selections are drawn here.
pub const FRAME_WINDOW: &str = "Frame";
/// Window showing the annotated lane-shadow mask.
pub const SHADOW_WINDOW: &str = "Shadow";

/// Pack an RGB image into a BGR `Mat`, OpenCV's native channel order.
pub fn to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let bgr: Vec<u8> = image.pixels().flat_map(|p| [p[2], p[1], p[0]]).collect();
    Mat::from_slice(&bgr)?
        .reshape(3, image.height() as i32)?
        .try_clone()
}

/// Unpack a BGR `Mat` into an RGB image.
pub fn to_rgb_image(mat: &Mat) -> opencv::Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec()).ok_or_else(|| {
        opencv::Error::new(
            StsUnmatchedSizes,
            format!("{width}x{height} frame is not packed 8-bit RGB"),
        )
    })
}

fn to_rect(bbox: BoundingBox) -> Rect {
    Rect::new(
        bbox.x as i32,
        bbox.y as i32,
        bbox.width as i32,
        bbox.height as i32,
    )
}

fn from_rect(rect: Rect) -> BoundingBox {
    BoundingBox::from_signed(rect.x, rect.y, rect.width, rect.height)
}

enum Handle {
    Csrt(Ptr<tracking::TrackerCSRT>),
    Kcf(Ptr<tracking::TrackerKCF>),
    Mil(Ptr<video::TrackerMIL>),
}

impl Handle {
    fn init(&mut self, frame: &Mat, rect: Rect) -> opencv::Result<()> {
        match self {
            Handle::Csrt(t) => t.init(frame, rect),
            Handle::Kcf(t) => t.init(frame, rect),
            Handle::Mil(t) => t.init(frame, rect),
        }
    }

    fn update(&mut self, frame: &Mat, rect: &mut Rect) -> opencv::Result<bool> {
        match self {
            Handle::Csrt(t) => t.update(frame, rect),
            Handle::Kcf(t) => t.update(frame, rect),
            Handle::Mil(t) => t.update(frame, rect),
        }
    }
}

/// One native OpenCV tracker.
pub struct OpencvTracker {
    kind: TrackerKind,
    handle: Handle,
    initialized: bool,
}

impl ObjectTracker for OpencvTracker {
    fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()> {
        if bbox.is_empty() {
            return Err(Error::invalid_box(bbox, "empty region"));
        }
        if bbox.clamp_to(frame.width(), frame.height()) != Some(bbox) {
            return Err(Error::invalid_box(bbox, "region leaves the frame"));
        }
        self.handle.init(&to_mat(frame)?, to_rect(bbox))?;
        self.initialized = true;
        Ok(())
    }

    fn update(&mut self, frame: &RgbImage) -> Result<Option<BoundingBox>> {
        if !self.initialized {
            return Err(Error::TrackerNotInitialized);
        }
        let mut rect = Rect::default();
        let found = self.handle.update(&to_mat(frame)?, &mut rect)?;
        Ok(found.then(|| from_rect(rect)))
    }
}

/// Builds OpenCV's CSRT, KCF and MIL trackers.
///
/// BOOSTING, TLD, MedianFlow and MOSSE only survive in OpenCV's legacy
/// tracking API and are reported as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpencvBackend;

impl TrackerBackend for OpencvBackend {
    fn create(&self, kind: TrackerKind) -> Result<Box<dyn ObjectTracker>> {
        let handle = match kind {
            TrackerKind::Csrt => Handle::Csrt(tracking::TrackerCSRT::create_def()?),
            TrackerKind::Kcf => Handle::Kcf(tracking::TrackerKCF::create_def()?),
            TrackerKind::Mil => Handle::Mil(video::TrackerMIL::create_def()?),
            _ => return Err(Error::TrackerUnavailable(kind)),
        };
        debug!(%kind, "created OpenCV tracker");
        Ok(Box::new(OpencvTracker {
            kind,
            handle,
            initialized: false,
        }))
    }

    fn supports(&self, kind: TrackerKind) -> bool {
        matches!(kind, TrackerKind::Csrt | TrackerKind::Kcf | TrackerKind::Mil)
    }
}

/// Frames from a video file or a camera.
pub struct VideoCaptureSource {
    capture: videoio::VideoCapture,
}

impl VideoCaptureSource {
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| Error::config(format!("video path {} is not UTF-8", path.display())))?;
        let capture = videoio::VideoCapture::from_file(name, videoio::CAP_ANY)?;
        Self::opened(capture, name)
    }

    pub fn open_camera(index: i32) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        Self::opened(capture, &format!("camera {index}"))
    }

    fn opened(capture: videoio::VideoCapture, name: &str) -> Result<Self> {
        if !capture.is_opened()? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot open {name}"),
            )
            .into());
        }
        info!(source = name, "video capture opened");
        Ok(Self { capture })
    }
}

impl FrameSource for VideoCaptureSource {
    type Error = Error;

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }
        Ok(Some(to_rgb_image(&frame)?))
    }

    fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        debug!("video capture released");
        Ok(())
    }
}

/// Shows every frame in the `Frame` and `Shadow` windows.
///
/// The windows are closed on drop.
#[derive(Debug, Default)]
pub struct HighguiSink;

impl HighguiSink {
    pub fn new() -> Self {
        Self
    }
}

impl RenderSink for HighguiSink {
    type Error = Error;

    fn present(&mut self, annotated: &AnnotatedFrame) -> Result<()> {
        highgui::imshow(SHADOW_WINDOW, &to_mat(&annotated.shadow)?)?;
        highgui::imshow(FRAME_WINDOW, &to_mat(&annotated.frame)?)?;
        Ok(())
    }
}

impl Drop for HighguiSink {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            warn!(%err, "failed to close windows");
        }
    }
}

/// Keyboard commands read from the HighGUI event loop.
///
/// `s` opens an ROI selector on the clean frame, `q` quits, anything else
/// continues. Must be polled after [`HighguiSink::present`], which it relies
/// on to refresh the windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardInput;

/// `None` means the key starts a selection.
fn command_for_key(key: i32) -> Option<Command> {
    match (key & 0xFF) as u8 {
        b'q' => Some(Command::Quit),
        b's' => None,
        _ => Some(Command::Continue),
    }
}

impl OperatorInput for KeyboardInput {
    type Error = Error;

    fn poll(&mut self, shown: &AnnotatedFrame) -> Result<Command> {
        let key = highgui::wait_key(1)?;
        if let Some(command) = command_for_key(key) {
            return Ok(command);
        }

        // Confirm with ENTER or SPACE; cancelling yields an empty region
        let rect = highgui::select_roi_def(FRAME_WINDOW, &to_mat(&shown.source)?)?;
        Ok(Command::Select(from_rect(rect)))
    }
}
