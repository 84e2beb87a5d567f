//! Serializable graph descriptions.
//!
//! A [`GraphDescription`] is the JSON form of a pipeline: stage instances
//! with type names and parameter overrides, edges as `"stage.port"` paths,
//! and the designated input/output stages. It builds into a [`Graph`]
//! through a [`StageRegistry`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::builder::{parse_endpoint, GraphBuilder};
use super::graph::Graph;
use super::params::ParamValue;
use super::registry::StageRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDescription {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    /// Overrides for declared parameters; unlisted parameters keep their
    /// defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDescription {
    /// `"stage.port"` output endpoint.
    pub from: String,
    /// `"stage.port"` input endpoint.
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDescription {
    pub stages: Vec<StageDescription>,
    pub edges: Vec<EdgeDescription>,
    pub input: String,
    pub outputs: Vec<String>,
}

impl GraphDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Persist(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Persist(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Instantiates every stage through the registry, wires the edges and
    /// applies parameter overrides.
    pub fn build(&self, registry: &StageRegistry) -> Result<Graph> {
        let mut builder = GraphBuilder::new();
        for stage in &self.stages {
            builder = builder.stage(stage.name.clone(), registry.instantiate(&stage.type_name)?);
        }
        for edge in &self.edges {
            let (fs, fp) = parse_endpoint(&edge.from)?;
            let (ts, tp) = parse_endpoint(&edge.to)?;
            builder = builder.connect(fs, fp, ts, tp);
        }
        builder = builder.input_stage(self.input.clone());
        for name in &self.outputs {
            builder = builder.output_stage(name.clone());
        }
        let mut graph = builder.build()?;
        for stage in &self.stages {
            for (param, value) in &stage.params {
                graph.set_parameter(&stage.name, param, value.clone())?;
            }
        }
        Ok(graph)
    }
}
