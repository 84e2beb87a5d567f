//! Image sequence sink.

use std::path::PathBuf;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::graph::{ImageData, Value};

use super::sink::{Sink, SinkContext};

/// Writes each output frame as a numbered PNG under a directory.
pub struct ImageSequenceSink {
    dir: PathBuf,
    prefix: String,
    frames_written: u64,
}

impl ImageSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn sink_err(frame: u64, message: String) -> PipelineError {
        PipelineError::Sink {
            sink: "image_sequence".to_string(),
            frame,
            message,
        }
    }
}

impl Sink for ImageSequenceSink {
    fn name(&self) -> &str {
        "image_sequence"
    }

    fn enable(&mut self, _ctx: &SinkContext) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Self::sink_err(0, format!("{}: {e}", self.dir.display())))?;
        self.frames_written = 0;
        info!(dir = %self.dir.display(), "image sink enabled");
        Ok(())
    }

    fn write(&mut self, frame: u64, value: &Value) -> Result<()> {
        let Value::Image(image) = value else {
            return Err(Self::sink_err(
                frame,
                format!("expected an image, got {}", value.kind()),
            ));
        };
        let path = self.dir.join(format!("{}{frame:06}.png", self.prefix));
        let saved = match image {
            ImageData::Gray(img) => img.save(&path),
            ImageData::Rgb(img) => img.save(&path),
        };
        saved.map_err(|e| Self::sink_err(frame, format!("{}: {e}", path.display())))?;
        self.frames_written += 1;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        info!(frames = self.frames_written, "image sink closed");
        Ok(())
    }
}
