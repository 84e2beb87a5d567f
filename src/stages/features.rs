//! Feature measurement over contour sets.

use crate::error::Result;
use crate::graph::{
    FeatureRecord, Inputs, Outputs, ParamSet, PortDecl, StageImpl, Value, ValueKind,
};

use super::compute_err;

/// Reduces each contour to a feature record: polygon centroid and enclosed
/// area. A contour without a defined centroid (zero enclosed area) is a
/// compute error rather than a silently dropped row; the size filter is
/// the place to exclude such fragments.
pub struct FeatureExtract;

static FEATURES_IN: &[PortDecl] = &[PortDecl::new("contours", ValueKind::ContourSet)];
static FEATURES_OUT: &[PortDecl] = &[PortDecl::new("records", ValueKind::Record)];

impl StageImpl for FeatureExtract {
    fn type_name(&self) -> &'static str {
        "feature_extract"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        FEATURES_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        FEATURES_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let contours = inputs.contours("contours")?;
        let mut records = Vec::with_capacity(contours.len());
        for contour in contours {
            let Some((x, y)) = contour.centroid() else {
                return Err(compute_err("contour with zero enclosed area has no centroid"));
            };
            records.push(FeatureRecord {
                x,
                y,
                area: contour.area(),
            });
        }
        outputs.set("records", Value::Records(records))
    }
}
