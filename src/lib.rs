//! Dataflow pipeline engine for video segmentation.
//!
//! A pipeline is a directed acyclic graph of typed stages. Interactive
//! callers edit one frame's parameters and watch the graph recompute;
//! batch callers hand a [`run::RunController`] a frame source and sinks
//! and let it drive the whole material through the same graph.
//!
//! ```no_run
//! use videotracker::graph::{GraphBuilder, ParamValue};
//! use videotracker::run::{CsvSink, ImageSequenceSource, RunController, SinkBinding};
//! use videotracker::stages;
//!
//! # fn main() -> videotracker::Result<()> {
//! let mut graph = GraphBuilder::new()
//!     .stage("input", Box::new(stages::VideoInput))
//!     .stage("gray", Box::new(stages::Grayscale))
//!     .stage("threshold", Box::new(stages::AdaptiveThreshold))
//!     .stage("contours", Box::new(stages::ContourExtract))
//!     .stage("features", Box::new(stages::FeatureExtract))
//!     .stage("data", Box::new(stages::DataOutput))
//!     .connect("input", "frame", "gray", "image")
//!     .connect("gray", "image", "threshold", "image")
//!     .connect("threshold", "image", "contours", "image")
//!     .connect("contours", "contours", "features", "contours")
//!     .connect("features", "records", "data", "records")
//!     .input_stage("input")
//!     .output_stage("data")
//!     .build()?;
//! graph.set_parameter("threshold", "block_size", ParamValue::Int(15))?;
//!
//! let mut source = ImageSequenceSource::open("frames/".as_ref(), 30.0)?;
//! let mut sinks = vec![SinkBinding::new(
//!     "data",
//!     "records",
//!     Box::new(CsvSink::new("features.csv")),
//! )];
//! let report = RunController::new().run(&mut graph, &mut source, &mut sinks)?;
//! println!("processed {} frames", report.frames_processed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod run;
pub mod stages;

pub use config::ParameterMap;
pub use error::{PipelineError, Result};
