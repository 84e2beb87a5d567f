//! Sink abstraction for batch runs.

use crate::error::Result;
use crate::graph::Value;

/// Source metadata handed to sinks when a run enables them.
#[derive(Debug, Clone)]
pub struct SinkContext {
    pub resolution: (u32, u32),
    pub frame_rate: f64,
    pub codec_tag: [u8; 4],
    /// Column names for tabular sinks, in output order.
    pub fields: &'static [&'static str],
}

/// Receives per-frame values from a designated output port during a run.
///
/// The run controller drives the lifecycle strictly: `enable` once before
/// the first frame, `write` zero or more times in frame order, `disable`
/// exactly once on every exit path. `write` for frame N completes before
/// frame N+1 is read from the source.
pub trait Sink: Send {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Acquires the sink's resource (opens the file, writes headers).
    fn enable(&mut self, ctx: &SinkContext) -> Result<()>;

    /// Persists one frame's value.
    fn write(&mut self, frame: u64, value: &Value) -> Result<()>;

    /// Flushes and releases the resource.
    fn disable(&mut self) -> Result<()>;
}

/// Attaches a sink to one output port of a designated output stage.
pub struct SinkBinding {
    pub stage: String,
    pub port: String,
    pub sink: Box<dyn Sink>,
}

impl SinkBinding {
    pub fn new(stage: impl Into<String>, port: impl Into<String>, sink: Box<dyn Sink>) -> Self {
        Self {
            stage: stage.into(),
            port: port.into(),
            sink,
        }
    }
}
