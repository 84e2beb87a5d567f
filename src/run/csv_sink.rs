//! CSV sink for feature records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::graph::Value;

use super::sink::{Sink, SinkContext};

/// Writes one CSV row per extracted object, prefixed with the frame's
/// timestamp and index. The file is created on `enable` and flushed on
/// `disable`; a run that aborts mid-way leaves the rows written so far.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    frame_rate: f64,
    rows_written: u64,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            frame_rate: 0.0,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn sink_err(&self, frame: u64, message: impl Into<String>) -> PipelineError {
        PipelineError::Sink {
            sink: self.name().to_string(),
            frame,
            message: message.into(),
        }
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn enable(&mut self, ctx: &SinkContext) -> Result<()> {
        let file = File::create(&self.path)
            .map_err(|e| self.sink_err(0, format!("{}: {e}", self.path.display())))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "timestamp_s,frame,{}", ctx.fields.join(","))
            .map_err(|e| self.sink_err(0, e.to_string()))?;
        self.frame_rate = ctx.frame_rate;
        self.rows_written = 0;
        self.writer = Some(writer);
        info!(path = %self.path.display(), "csv sink enabled");
        Ok(())
    }

    fn write(&mut self, frame: u64, value: &Value) -> Result<()> {
        let Value::Records(records) = value else {
            return Err(self.sink_err(frame, format!("expected records, got {}", value.kind())));
        };
        let timestamp = if self.frame_rate > 0.0 {
            frame as f64 / self.frame_rate
        } else {
            0.0
        };
        let Some(writer) = self.writer.as_mut() else {
            return Err(PipelineError::Sink {
                sink: "csv".to_string(),
                frame,
                message: "write on a disabled sink".to_string(),
            });
        };
        for record in records {
            writeln!(
                writer,
                "{timestamp:.3},{frame},{:.3},{:.3},{:.3}",
                record.x, record.y, record.area
            )
            .map_err(|e| PipelineError::Sink {
                sink: "csv".to_string(),
                frame,
                message: e.to_string(),
            })?;
        }
        self.rows_written += records.len() as u64;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| self.sink_err(0, e.to_string()))?;
            info!(rows = self.rows_written, "csv sink closed");
        }
        Ok(())
    }
}
