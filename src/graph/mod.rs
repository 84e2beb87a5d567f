//! Dataflow graph core: typed ports, pure stages, validated construction
//! and topological recomputation.
//!
//! The module splits along the lifecycle of a pipeline:
//! - [`stage`]: the [`StageImpl`] trait every processing stage implements,
//!   plus the input/output views handed to `compute`.
//! - [`builder`]: [`GraphBuilder`], the consuming, validating constructor.
//! - [`graph`]: the wired [`Graph`] and its recompute scheduler.
//! - [`description`] and [`registry`]: JSON persistence of graph topology.

pub mod builder;
pub mod description;
pub mod graph;
pub mod id;
pub mod params;
pub mod port;
pub mod registry;
pub mod stage;
pub mod value;

pub use builder::GraphBuilder;
pub use description::{EdgeDescription, GraphDescription, StageDescription};
pub use graph::{Graph, NoopTap, OutputTap};
pub use id::{PortId, StageId};
pub use params::{ParamDecl, ParamSet, ParamSpec, ParamValue};
pub use port::{PortDecl, PortRole};
pub use registry::StageRegistry;
pub use stage::{Inputs, Outputs, StageImpl, StageState};
pub use value::{Contour, FeatureRecord, ImageData, Point, Value, ValueKind};
