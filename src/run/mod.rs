//! Batch execution: frame sources, sinks and the run controller.

pub mod controller;
pub mod csv_sink;
pub mod image_sink;
pub mod sink;
pub mod source;

pub use controller::{
    RunController, RunEvent, RunHandle, RunOutcome, RunReport, RunState, StopHandle,
};
pub use csv_sink::CsvSink;
pub use image_sink::ImageSequenceSink;
pub use sink::{Sink, SinkBinding, SinkContext};
pub use source::{FrameSource, ImageSequenceSource};
