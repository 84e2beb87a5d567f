//! Built-in stage implementations.
//!
//! Every stage here is a pure function from parameters and inputs to
//! outputs; the graph supplies wiring, scheduling and state. The image
//! operators work on [`ImageData`](crate::graph::ImageData) buffers
//! directly, so the crate needs no native vision library at runtime.

mod blur;
mod contours;
mod convert;
mod features;
mod io;
mod morphology;
mod threshold;

pub use blur::GaussianBlur;
pub use contours::{ContourExtract, DrawContours, SizeFilter};
pub use convert::Grayscale;
pub use features::FeatureExtract;
pub use io::{DataOutput, ImageOutput, VideoInput};
pub use morphology::Morphology;
pub use threshold::AdaptiveThreshold;

use crate::error::PipelineError;

/// Compute failure local to a stage body; the scheduler fills in the stage
/// instance name.
pub(crate) fn compute_err(message: impl Into<String>) -> PipelineError {
    PipelineError::Compute {
        stage: String::new(),
        message: message.into(),
    }
}
