use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "opencv-backend")]
use lanetrack_rs::integration::{HighguiSink, KeyboardInput, OpencvBackend, VideoCaptureSource};
use lanetrack_rs::integration::{
    DirectorySink, ImageSequenceSource, MaskDirectory, ScriptedInput, Selection,
};
use lanetrack_rs::{
    AnnotatedFrame, Command, CorrelationBackend, FramePipeline, FrameSource, ObjectTracker,
    OperatorInput, OutOfBoundsPolicy, PipelineBuilder, RenderSink, TrackerBackend, TrackerKind,
};

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Track operator-selected objects and color them by lane-shadow membership"
)]
pub struct Config {
    /// Directory of input frames, read in file-name order.
    #[arg(long, env = "LANETRACK_FRAMES")]
    pub frames: Option<PathBuf>,

    /// Read frames from this video file. Without --frames or --video, camera 0 is used.
    #[cfg(feature = "opencv-backend")]
    #[arg(long, conflicts_with = "frames")]
    pub video: Option<PathBuf>,

    /// Show the Frame and Shadow windows: `s` selects a target, `q` quits.
    #[cfg(feature = "opencv-backend")]
    #[arg(long, conflicts_with_all = ["output", "selections", "quit_after"])]
    pub display: bool,

    /// Use the built-in correlation trackers instead of OpenCV's.
    #[cfg(feature = "opencv-backend")]
    #[arg(long)]
    pub builtin_trackers: bool,

    /// Directory of lane-shadow masks, paired with frames by order.
    #[arg(long, env = "LANETRACK_MASKS")]
    pub masks: PathBuf,

    /// Write annotated frames and masks here. Without it results are only logged.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Tracker algorithm: CSRT (or csrt), kcf, boosting, mil, tld, medianflow or mosse.
    #[arg(short, long, default_value = "CSRT")]
    pub tracker: String,

    /// Resize frames to this width before tracking.
    #[arg(long, default_value_t = lanetrack_rs::integration::DEFAULT_RESIZE_WIDTH)]
    pub width: u32,

    /// What to do with a midpoint outside the mask.
    #[arg(long, value_enum, default_value_t = OutOfBounds::Clamp)]
    pub out_of_bounds: OutOfBounds,

    /// Select a target: FRAME:X,Y,W,H in resized-frame pixels. Repeatable.
    #[arg(long = "select", value_name = "FRAME:X,Y,W,H")]
    pub selections: Vec<Selection>,

    /// Stop after this many frames.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub quit_after: Option<u64>,

    /// The log configuration.
    #[command(flatten)]
    pub log: Log,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutOfBounds {
    Clamp,
    Reject,
}

impl From<OutOfBounds> for OutOfBoundsPolicy {
    fn from(value: OutOfBounds) -> Self {
        match value {
            OutOfBounds::Clamp => OutOfBoundsPolicy::Clamp,
            OutOfBounds::Reject => OutOfBoundsPolicy::Reject,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct Log {
    /// Log level for this crate; RUST_LOG takes precedence when set.
    #[arg(long = "log-level", default_value = "info")]
    pub level: tracing::Level,
}

impl Log {
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "lanetrack_rs={level},lanetrack={level}",
                level = self.level
            ))
        });
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Built-in trackers, or OpenCV's when linked.
enum Backend {
    Builtin(CorrelationBackend),
    #[cfg(feature = "opencv-backend")]
    Opencv(OpencvBackend),
}

impl TrackerBackend for Backend {
    fn create(&self, kind: TrackerKind) -> lanetrack_rs::Result<Box<dyn ObjectTracker>> {
        match self {
            Backend::Builtin(backend) => backend.create(kind),
            #[cfg(feature = "opencv-backend")]
            Backend::Opencv(backend) => backend.create(kind),
        }
    }

    fn supports(&self, kind: TrackerKind) -> bool {
        match self {
            Backend::Builtin(backend) => backend.supports(kind),
            #[cfg(feature = "opencv-backend")]
            Backend::Opencv(backend) => backend.supports(kind),
        }
    }
}

/// Still images from a directory, or a video file or camera.
enum Source {
    Images(ImageSequenceSource),
    #[cfg(feature = "opencv-backend")]
    Video(VideoCaptureSource),
}

impl FrameSource for Source {
    type Error = lanetrack_rs::Error;

    fn next_frame(&mut self) -> lanetrack_rs::Result<Option<image::RgbImage>> {
        match self {
            Source::Images(source) => source.next_frame(),
            #[cfg(feature = "opencv-backend")]
            Source::Video(source) => source.next_frame(),
        }
    }

    fn release(&mut self) -> lanetrack_rs::Result<()> {
        match self {
            Source::Images(source) => source.release(),
            #[cfg(feature = "opencv-backend")]
            Source::Video(source) => source.release(),
        }
    }
}

/// Commands from the command line, or from the keyboard.
enum Input {
    Scripted(ScriptedInput),
    #[cfg(feature = "opencv-backend")]
    Keyboard(KeyboardInput),
}

impl OperatorInput for Input {
    type Error = lanetrack_rs::Error;

    fn poll(&mut self, shown: &AnnotatedFrame) -> lanetrack_rs::Result<Command> {
        match self {
            Input::Scripted(input) => input.poll(shown).map_err(|never| match never {}),
            #[cfg(feature = "opencv-backend")]
            Input::Keyboard(input) => input.poll(shown),
        }
    }
}

/// Writes frames to disk, shows them, or only reports classifications.
enum Sink {
    Directory(DirectorySink),
    #[cfg(feature = "opencv-backend")]
    Window(HighguiSink),
    Log,
}

impl RenderSink for Sink {
    type Error = lanetrack_rs::Error;

    fn present(&mut self, annotated: &AnnotatedFrame) -> lanetrack_rs::Result<()> {
        match self {
            Sink::Directory(sink) => sink.present(annotated),
            #[cfg(feature = "opencv-backend")]
            Sink::Window(sink) => sink.present(annotated),
            Sink::Log => {
                for c in annotated.classified() {
                    tracing::info!(
                        frame = annotated.index,
                        bbox = ?c.bbox,
                        midpoint = ?c.midpoint,
                        color = ?c.color,
                        "classified"
                    );
                }
                Ok(())
            }
        }
    }
}

impl Config {
    fn backend(&self, kind: TrackerKind) -> Backend {
        #[cfg(feature = "opencv-backend")]
        if !self.builtin_trackers {
            if OpencvBackend.supports(kind) {
                return Backend::Opencv(OpencvBackend);
            }
            tracing::warn!(%kind, "OpenCV has no such tracker, using the built-in one");
        }
        let _ = kind;
        Backend::Builtin(CorrelationBackend)
    }

    fn source(&self) -> anyhow::Result<Source> {
        if let Some(dir) = &self.frames {
            let source = ImageSequenceSource::open(dir)
                .with_context(|| format!("failed to open frames in {}", dir.display()))?;
            return Ok(Source::Images(source));
        }

        self.open_video()
    }

    #[cfg(feature = "opencv-backend")]
    fn open_video(&self) -> anyhow::Result<Source> {
        let source = match &self.video {
            Some(path) => VideoCaptureSource::open_file(path)
                .with_context(|| format!("failed to open video {}", path.display()))?,
            None => VideoCaptureSource::open_camera(0).context("failed to open camera 0")?,
        };
        Ok(Source::Video(source))
    }

    #[cfg(not(feature = "opencv-backend"))]
    fn open_video(&self) -> anyhow::Result<Source> {
        anyhow::bail!("--frames is required; video input needs the opencv-backend feature")
    }

    fn input(&self) -> anyhow::Result<Input> {
        #[cfg(feature = "opencv-backend")]
        if self.display {
            return Ok(Input::Keyboard(KeyboardInput));
        }
        let input = ScriptedInput::new(self.selections.iter().copied(), self.quit_after)
            .context("invalid selections")?;
        Ok(Input::Scripted(input))
    }

    fn sink(&self) -> anyhow::Result<Sink> {
        #[cfg(feature = "opencv-backend")]
        if self.display {
            return Ok(Sink::Window(HighguiSink::new()));
        }
        Ok(match &self.output {
            Some(dir) => Sink::Directory(
                DirectorySink::create(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?,
            ),
            None => Sink::Log,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.log.init();

    let pipeline_config = PipelineBuilder::new()
        .tracker(config.tracker.as_str())
        .resize_width(config.width)
        .out_of_bounds(config.out_of_bounds.into())
        .build()
        .context("invalid pipeline configuration")?;
    tracing::info!(tracker = %pipeline_config.tracker, width = config.width, "starting");

    let backend = config.backend(pipeline_config.tracker);
    let mut pipeline = FramePipeline::new(pipeline_config, backend)?;
    let source = config.source()?;
    let mut detector = MaskDirectory::open(&config.masks)
        .with_context(|| format!("failed to open masks in {}", config.masks.display()))?;
    let mut input = config.input()?;
    let mut sink = config.sink()?;

    let summary = lanetrack_rs::run(&mut pipeline, source, &mut detector, &mut input, &mut sink)?;
    tracing::info!(
        frames = summary.frames,
        targets = summary.selections,
        "done"
    );

    Ok(())
}
