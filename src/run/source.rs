//! Frame sources.

use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::error::{PipelineError, Result};
use crate::graph::ImageData;

/// Supplies frames to a batch run, one at a time.
///
/// `frame_count` is best effort: container formats routinely misreport
/// their length, so callers must treat `next_frame` returning `None` as
/// the sole authority on where the material ends.
pub trait FrameSource: Send {
    /// Decodes and returns the next frame, or `None` past the end.
    fn next_frame(&mut self) -> Result<Option<ImageData>>;

    /// Rewinds to the first frame.
    fn reset(&mut self) -> Result<()>;

    /// Positions so the next `next_frame` call returns frame `index`.
    fn seek(&mut self, index: u64) -> Result<()>;

    /// Index of the frame the next `next_frame` call would return.
    fn current_index(&self) -> u64;

    /// Reported number of frames, if the container knows one.
    fn frame_count(&self) -> Option<u64>;

    fn frame_rate(&self) -> f64;

    fn resolution(&self) -> (u32, u32);

    /// Four-character codec tag of the material.
    fn codec_tag(&self) -> [u8; 4] {
        *b"raw "
    }
}

/// A directory of still images, sorted by file name, played as a video.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    index: u64,
    frame_rate: f64,
    resolution: (u32, u32),
}

impl ImageSequenceSource {
    /// Collects every file in `dir` with a supported image extension. The
    /// first frame is decoded immediately to establish the resolution.
    pub fn open(dir: &Path, frame_rate: f64) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("png" | "jpg" | "jpeg" | "bmp" | "tiff")
                )
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(PipelineError::Source {
                frame: 0,
                message: format!("no image files in {}", dir.display()),
            });
        }
        let first = decode(&paths[0], 0)?;
        Ok(Self {
            resolution: first.dimensions(),
            paths,
            index: 0,
            frame_rate,
        })
    }
}

fn decode(path: &Path, frame: u64) -> Result<ImageData> {
    let img = ImageReader::open(path)
        .map_err(|e| PipelineError::Source {
            frame,
            message: format!("{}: {e}", path.display()),
        })?
        .decode()
        .map_err(|e| PipelineError::Source {
            frame,
            message: format!("{}: {e}", path.display()),
        })?;
    Ok(ImageData::Rgb(img.to_rgb8()))
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<ImageData>> {
        let Some(path) = self.paths.get(self.index as usize) else {
            return Ok(None);
        };
        let frame = decode(path, self.index)?;
        self.index += 1;
        Ok(Some(frame))
    }

    fn reset(&mut self) -> Result<()> {
        self.index = 0;
        Ok(())
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        if index as usize > self.paths.len() {
            return Err(PipelineError::Source {
                frame: index,
                message: format!("seek past the end ({} frames)", self.paths.len()),
            });
        }
        self.index = index;
        Ok(())
    }

    fn current_index(&self) -> u64 {
        self.index
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.paths.len() as u64)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}
