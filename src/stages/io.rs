//! Boundary stages: frame entry and the designated output pass-throughs.

use crate::error::Result;
use crate::graph::{Inputs, Outputs, ParamSet, PortDecl, StageImpl, Value, ValueKind};

/// Entry point of a pipeline. Its `frame` port is fed externally (by the
/// run controller or an interactive caller); `compute` deliberately leaves
/// the port untouched so the externally written value survives recompute
/// passes.
pub struct VideoInput;

static VIDEO_INPUT_OUT: &[PortDecl] = &[PortDecl::new("frame", ValueKind::Image)];

impl StageImpl for VideoInput {
    fn type_name(&self) -> &'static str {
        "video_input"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        &[]
    }

    fn outputs(&self) -> &'static [PortDecl] {
        VIDEO_INPUT_OUT
    }

    fn compute(&self, _params: &ParamSet, _inputs: &Inputs<'_>, _outputs: &mut Outputs) -> Result<()> {
        Ok(())
    }
}

/// Terminal image stage. Copies its input to an output port so run taps
/// (and interactive viewers) observe the finished frame.
pub struct ImageOutput;

static IMAGE_OUTPUT_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static IMAGE_OUTPUT_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];

impl StageImpl for ImageOutput {
    fn type_name(&self) -> &'static str {
        "image_output"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        IMAGE_OUTPUT_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        IMAGE_OUTPUT_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let image = inputs.image("image")?;
        outputs.set("image", Value::Image(image.clone()))
    }
}

/// Terminal record stage, mirroring [`ImageOutput`] for feature records.
pub struct DataOutput;

static DATA_OUTPUT_IN: &[PortDecl] = &[PortDecl::new("records", ValueKind::Record)];
static DATA_OUTPUT_OUT: &[PortDecl] = &[PortDecl::new("records", ValueKind::Record)];

impl StageImpl for DataOutput {
    fn type_name(&self) -> &'static str {
        "data_output"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        DATA_OUTPUT_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        DATA_OUTPUT_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let records = inputs.records("records")?;
        outputs.set("records", Value::Records(records.to_vec()))
    }
}
