//! Parameter persistence.
//!
//! A [`ParameterMap`] is the JSON image of every stage's current parameter
//! values, keyed by stage name. Applying a saved map goes through the same
//! validation as interactive assignment, so a stale file cannot smuggle an
//! out-of-range value into a graph.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::graph::{Graph, NoopTap, ParamValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterMap(pub BTreeMap<String, BTreeMap<String, ParamValue>>);

impl ParameterMap {
    /// Snapshots every parameter of every stage in the graph.
    pub fn capture(graph: &Graph) -> Self {
        let mut map = BTreeMap::new();
        for stage in graph.stage_names() {
            let Some(params) = graph.stage_parameters(stage) else {
                continue;
            };
            let values: BTreeMap<String, ParamValue> = params
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect();
            if !values.is_empty() {
                map.insert(stage.to_string(), values);
            }
        }
        Self(map)
    }

    /// Applies the stored values to matching stages, then recomputes the
    /// graph once. The whole map is validated before anything is stored,
    /// so a rejected file leaves every parameter untouched. Stages or
    /// parameters the graph does not declare are rejected.
    pub fn apply(&self, graph: &mut Graph) -> Result<()> {
        for (stage, params) in &self.0 {
            for (param, value) in params {
                graph.validate_parameter(stage, param, value)?;
            }
        }
        for (stage, params) in &self.0 {
            for (param, value) in params {
                graph.set_parameter_quiet(stage, param, value.clone())?;
            }
        }
        debug!(stages = self.0.len(), "parameters applied");
        graph.recompute_all(&mut NoopTap)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Persist(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Persist(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
