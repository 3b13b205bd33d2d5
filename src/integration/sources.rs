//! Directory-backed collaborators used by the command-line demo.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tracker::BoundingBox;

use super::{
    AnnotatedFrame, Command, FrameSource, LaneDetector, LaneOutput, OperatorInput, RenderSink,
};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

/// Image files in `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Frames read from a directory of still images, in file-name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let paths = list_images(dir)?;
        info!(dir = %dir.display(), frames = paths.len(), "opened image sequence");
        Ok(Self {
            paths: paths.into_iter(),
        })
    }
}

impl FrameSource for ImageSequenceSource {
    type Error = Error;

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.paths.next() {
            Some(path) => {
                debug!(path = %path.display(), "reading frame");
                Ok(Some(image::open(&path)?.to_rgb8()))
            }
            None => Ok(None),
        }
    }

    fn release(&mut self) -> Result<()> {
        // Drop whatever was not read
        self.paths.by_ref().for_each(drop);
        Ok(())
    }
}

/// Lane detector backed by precomputed masks, paired with frames by order.
///
/// The display frame is the input frame unchanged.
#[derive(Debug)]
pub struct MaskDirectory {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    next: usize,
}

impl MaskDirectory {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let paths = list_images(&dir)?;
        info!(dir = %dir.display(), masks = paths.len(), "opened mask directory");
        Ok(Self {
            dir,
            paths,
            next: 0,
        })
    }
}

impl LaneDetector for MaskDirectory {
    type Error = Error;

    fn process(&mut self, frame: &RgbImage) -> Result<LaneOutput> {
        let path = self.paths.get(self.next).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "no mask for frame {} in {}",
                    self.next,
                    self.dir.display()
                ),
            )
        })?;
        self.next += 1;

        Ok(LaneOutput {
            frame: frame.clone(),
            mask: image::open(path)?.to_rgb8(),
        })
    }
}

/// A target selection scheduled for a frame: `"<frame>:<x>,<y>,<w>,<h>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub frame: u64,
    pub bbox: BoundingBox,
}

impl FromStr for Selection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::config(format!("invalid selection {s:?}, expected FRAME:X,Y,W,H"));

        let (frame, rect) = s.split_once(':').ok_or_else(invalid)?;
        let frame = frame.trim().parse().map_err(|_| invalid())?;
        let values = rect
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let [x, y, width, height] = values[..] else {
            return Err(invalid());
        };

        Ok(Selection {
            frame,
            bbox: BoundingBox::new(x, y, width, height),
        })
    }
}

/// Operator commands fixed up front instead of read from a keyboard.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    selections: BTreeMap<u64, BoundingBox>,
    quit_after: Option<u64>,
}

impl ScriptedInput {
    /// Fails on two selections for the same frame, since only one command is
    /// read per frame, and on `quit_after == Some(0)`.
    pub fn new(
        selections: impl IntoIterator<Item = Selection>,
        quit_after: Option<u64>,
    ) -> Result<Self> {
        if quit_after == Some(0) {
            return Err(Error::config("quit-after must be at least 1 frame"));
        }

        let mut scheduled = BTreeMap::new();
        for selection in selections {
            if let Some(first) = scheduled.insert(selection.frame, selection.bbox) {
                return Err(Error::config(format!(
                    "frame {} already has a selection {first:?}",
                    selection.frame
                )));
            }
        }
        Ok(Self {
            selections: scheduled,
            quit_after,
        })
    }
}

impl OperatorInput for ScriptedInput {
    type Error = std::convert::Infallible;

    fn poll(&mut self, shown: &AnnotatedFrame) -> std::result::Result<Command, Self::Error> {
        if self.quit_after.is_some_and(|limit| shown.index + 1 >= limit) {
            return Ok(Command::Quit);
        }
        Ok(match self.selections.remove(&shown.index) {
            Some(bbox) => Command::Select(bbox),
            None => Command::Continue,
        })
    }
}

/// Writes `frame_NNNNNN.png` and `shadow_NNNNNN.png` for every presented frame.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl RenderSink for DirectorySink {
    type Error = Error;

    fn present(&mut self, annotated: &AnnotatedFrame) -> Result<()> {
        let index = annotated.index;
        annotated
            .frame
            .save(self.dir.join(format!("frame_{index:06}.png")))?;
        annotated
            .shadow
            .save(self.dir.join(format!("shadow_{index:06}.png")))?;
        Ok(())
    }
}
