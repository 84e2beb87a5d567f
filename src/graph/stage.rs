//! The stage abstraction.
//!
//! A stage is a named pure computation unit: statically declared parameter
//! and port tables plus a `compute` body. "Shape" is just which ports a
//! stage declares — an image-to-image stage declares one image input and
//! one image output, nothing more.

use crate::error::{PipelineError, Result};

use super::params::{ParamDecl, ParamSet};
use super::port::PortDecl;
use super::value::{Contour, FeatureRecord, ImageData, Value};

/// A pipeline processing unit.
///
/// `compute` must be a pure function of the parameter set and the input
/// view: it reads nothing but its declared inputs and writes nothing but
/// its declared outputs. That property is what makes the scheduler's
/// topological order sufficient for correctness.
pub trait StageImpl: Send {
    /// Registry type name of this stage.
    fn type_name(&self) -> &'static str;

    /// Declared input ports.
    fn inputs(&self) -> &'static [PortDecl];

    /// Declared output ports.
    fn outputs(&self) -> &'static [PortDecl];

    /// Declared parameters.
    fn params(&self) -> &'static [ParamDecl] {
        &[]
    }

    /// Computes new output values from current inputs and parameters.
    ///
    /// Outputs left unset keep their previous port value; source-like
    /// stages whose output port is fed externally rely on this.
    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()>;
}

/// Read-only view of a stage's input values during `compute`.
///
/// The scheduler only invokes `compute` once every declared input holds a
/// value, so accessors here fail only on a stage-implementation bug (wrong
/// name or wrong payload variant).
pub struct Inputs<'a> {
    decls: &'static [PortDecl],
    values: Vec<&'a Value>,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(decls: &'static [PortDecl], values: Vec<&'a Value>) -> Self {
        debug_assert_eq!(decls.len(), values.len());
        Self { decls, values }
    }

    fn get(&self, name: &str) -> Result<&'a Value> {
        self.decls
            .iter()
            .position(|d| d.name == name)
            .map(|i| self.values[i])
            .ok_or_else(|| PipelineError::InvalidConnection(format!("no input port '{name}'")))
    }

    pub fn image(&self, name: &str) -> Result<&'a ImageData> {
        match self.get(name)? {
            Value::Image(img) => Ok(img),
            other => Err(input_mismatch(name, other)),
        }
    }

    pub fn contours(&self, name: &str) -> Result<&'a [Contour]> {
        match self.get(name)? {
            Value::Contours(c) => Ok(c.as_slice()),
            other => Err(input_mismatch(name, other)),
        }
    }

    pub fn records(&self, name: &str) -> Result<&'a [FeatureRecord]> {
        match self.get(name)? {
            Value::Records(r) => Ok(r.as_slice()),
            other => Err(input_mismatch(name, other)),
        }
    }

    pub fn scalar(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            Value::Scalar(v) => Ok(*v),
            other => Err(input_mismatch(name, other)),
        }
    }
}

fn input_mismatch(name: &str, value: &Value) -> PipelineError {
    PipelineError::Compute {
        stage: String::new(),
        message: format!("input '{name}' holds a {} payload", value.kind()),
    }
}

/// Write-only view of a stage's output values during `compute`.
pub struct Outputs {
    decls: &'static [PortDecl],
    values: Vec<Option<Value>>,
}

impl Outputs {
    pub(crate) fn new(decls: &'static [PortDecl]) -> Self {
        Self {
            decls,
            values: vec![None; decls.len()],
        }
    }

    /// Stores an output value; the kind must match the declaration.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let Some(idx) = self.decls.iter().position(|d| d.name == name) else {
            return Err(PipelineError::InvalidConnection(format!(
                "no output port '{name}'"
            )));
        };
        let expected = self.decls[idx].kind;
        if value.kind() != expected {
            return Err(PipelineError::TypeMismatch {
                port: name.to_string(),
                expected,
                got: value.kind(),
            });
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    pub(crate) fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

/// Evaluation state of one stage within a propagation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Not yet computed, or inputs were absent, or the last compute failed.
    Stale,
    /// Currently inside `compute`.
    Computing,
    /// Outputs reflect the current inputs and parameters.
    Settled,
}
