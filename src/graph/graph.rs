//! The wired graph and its propagation scheduler.
//!
//! A [`Graph`] owns flat arenas of stage slots and port cells, a full
//! topological order computed at construction, and the designated
//! input/output stages. Recomputation is rooted at a changed stage and
//! walks that stage's forward closure in topological order; a stage whose
//! inputs are still absent is skipped (and stays `Stale`), which halts
//! propagation along that branch without any extra bookkeeping.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{PipelineError, Result};

use super::id::{PortId, StageId};
use super::params::ParamValue;
use super::port::{PortCell, PortRole};
use super::stage::{Inputs, Outputs, StageImpl, StageState};
use super::value::{ImageData, Value};

/// One stage instance and its wiring.
pub(crate) struct StageSlot {
    pub name: String,
    pub imp: Box<dyn StageImpl>,
    pub params: super::params::ParamSet,
    /// Input port ids, parallel to `imp.inputs()`.
    pub inputs: Vec<PortId>,
    /// Output port ids, parallel to `imp.outputs()`.
    pub outputs: Vec<PortId>,
    pub state: StageState,
}

/// Observer invoked whenever a designated output stage's port receives a
/// value, synchronously within the propagation pass. The run controller
/// implements this to feed sinks; interactive callers typically pass
/// [`NoopTap`].
pub trait OutputTap {
    fn on_output(&mut self, stage: &str, port: &str, value: &Value) -> Result<()>;
}

/// Tap that ignores all output writes.
pub struct NoopTap;

impl OutputTap for NoopTap {
    fn on_output(&mut self, _stage: &str, _port: &str, _value: &Value) -> Result<()> {
        Ok(())
    }
}

/// A validated, wired pipeline graph.
pub struct Graph {
    pub(crate) stages: Vec<StageSlot>,
    pub(crate) by_name: HashMap<String, StageId>,
    pub(crate) ports: Vec<PortCell>,
    pub(crate) input_stage: StageId,
    /// Port of the input stage that receives external frames.
    pub(crate) input_port: PortId,
    pub(crate) output_stages: Vec<StageId>,
    /// Full topological order over all stages.
    pub(crate) order: Vec<StageId>,
    /// Downstream stage adjacency, indexed by stage.
    pub(crate) downstream: Vec<Vec<StageId>>,
}

impl Graph {
    // ── Lookup ──

    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.by_name.get(name).copied()
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    pub fn input_stage_name(&self) -> &str {
        &self.stages[self.input_stage.index()].name
    }

    pub fn output_stage_names(&self) -> impl Iterator<Item = &str> {
        self.output_stages
            .iter()
            .map(|s| self.stages[s.index()].name.as_str())
    }

    pub fn state(&self, stage: &str) -> Option<StageState> {
        self.stage_id(stage).map(|id| self.stages[id.index()].state)
    }

    pub fn parameter(&self, stage: &str, param: &str) -> Option<&ParamValue> {
        let id = self.stage_id(stage)?;
        self.stages[id.index()].params.get(param)
    }

    pub fn stage_parameters(
        &self,
        stage: &str,
    ) -> Option<impl Iterator<Item = (&'static str, &ParamValue)>> {
        let id = self.stage_id(stage)?;
        Some(self.stages[id.index()].params.iter())
    }

    fn find_port(&self, stage: &str, port: &str) -> Option<PortId> {
        let id = self.stage_id(stage)?;
        let slot = &self.stages[id.index()];
        slot.outputs
            .iter()
            .chain(slot.inputs.iter())
            .copied()
            .find(|p| self.ports[p.index()].name == port)
    }

    /// Current value of a port, by stage and port name. Absent before the
    /// first computation reaches the port.
    pub fn port_value(&self, stage: &str, port: &str) -> Option<&Value> {
        let pid = self.find_port(stage, port)?;
        self.ports[pid.index()].value.as_ref()
    }

    /// Write counter of a port; bumps on every value write.
    pub fn port_version(&self, stage: &str, port: &str) -> Option<u64> {
        let pid = self.find_port(stage, port)?;
        Some(self.ports[pid.index()].version)
    }

    // ── Entry points ──

    /// Interactive entry point: validates and stores a parameter value,
    /// marks the stage stale and recomputes its forward closure.
    ///
    /// On a compute error the failing stage stays `Stale` with its previous
    /// outputs retained; the error is returned for the caller to report.
    pub fn set_parameter(&mut self, stage: &str, param: &str, value: ParamValue) -> Result<()> {
        let Some(id) = self.stage_id(stage) else {
            return Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: param.to_string(),
                detail: "no such stage".to_string(),
            });
        };
        let slot = &mut self.stages[id.index()];
        let name = slot.name.clone();
        slot.params.set(&name, param, value)?;
        slot.state = StageState::Stale;
        self.recompute_from(id, &mut NoopTap)
    }

    /// Checks a value against a parameter's declaration without storing it.
    pub fn validate_parameter(&self, stage: &str, param: &str, value: &ParamValue) -> Result<()> {
        let Some(id) = self.stage_id(stage) else {
            return Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: param.to_string(),
                detail: "no such stage".to_string(),
            });
        };
        self.stages[id.index()].params.check(stage, param, value)
    }

    /// Stores a parameter value without recomputing; the stage is marked
    /// stale. Bulk loaders use this to apply many values and recompute once.
    pub fn set_parameter_quiet(&mut self, stage: &str, param: &str, value: ParamValue) -> Result<()> {
        let Some(id) = self.stage_id(stage) else {
            return Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: param.to_string(),
                detail: "no such stage".to_string(),
            });
        };
        let slot = &mut self.stages[id.index()];
        let name = slot.name.clone();
        slot.params.set(&name, param, value)?;
        slot.state = StageState::Stale;
        Ok(())
    }

    /// Batch/interactive entry point: writes an external frame into the
    /// input stage's frame port and propagates downstream.
    pub fn feed_frame(&mut self, frame: ImageData, tap: &mut dyn OutputTap) -> Result<()> {
        self.write_port(self.input_port, Value::Image(frame), tap)?;
        self.recompute_from(self.input_stage, tap)
    }

    /// Recomputes every stage (the forward closure of the input stage,
    /// which construction guarantees is the whole graph).
    pub fn recompute_all(&mut self, tap: &mut dyn OutputTap) -> Result<()> {
        self.recompute_from(self.input_stage, tap)
    }

    // ── Scheduler ──

    /// Recomputes `root` and everything downstream of it, in dependency
    /// order. Stages with absent inputs are skipped and remain `Stale`.
    pub fn recompute_from(&mut self, root: StageId, tap: &mut dyn OutputTap) -> Result<()> {
        let reachable = self.forward_closure(root);
        let affected: Vec<StageId> = self
            .order
            .iter()
            .copied()
            .filter(|s| reachable[s.index()])
            .collect();
        debug!(
            root = %self.stages[root.index()].name,
            affected = affected.len(),
            "recompute"
        );
        for sid in affected {
            self.run_stage(sid, tap)?;
        }
        Ok(())
    }

    fn forward_closure(&self, root: StageId) -> Vec<bool> {
        let mut reachable = vec![false; self.stages.len()];
        let mut stack = vec![root];
        while let Some(sid) = stack.pop() {
            if reachable[sid.index()] {
                continue;
            }
            reachable[sid.index()] = true;
            for &next in &self.downstream[sid.index()] {
                stack.push(next);
            }
        }
        reachable
    }

    /// Runs one stage if all of its inputs hold values. No-op (stage stays
    /// `Stale`) on any absent input — a stage never computes on partial
    /// input.
    fn run_stage(&mut self, sid: StageId, tap: &mut dyn OutputTap) -> Result<()> {
        let idx = sid.index();
        let ready = self.stages[idx]
            .inputs
            .iter()
            .all(|p| self.ports[p.index()].value.is_some());
        if !ready {
            self.stages[idx].state = StageState::Stale;
            return Ok(());
        }

        self.stages[idx].state = StageState::Computing;
        let result = {
            let slot = &self.stages[idx];
            let values: Vec<&Value> = slot
                .inputs
                .iter()
                .filter_map(|p| self.ports[p.index()].value.as_ref())
                .collect();
            let inputs = Inputs::new(slot.imp.inputs(), values);
            let mut outputs = Outputs::new(slot.imp.outputs());
            slot.imp
                .compute(&slot.params, &inputs, &mut outputs)
                .map(|()| outputs.into_values())
        };

        let out_values = match result {
            Ok(values) => values,
            Err(e) => {
                // Last good outputs are retained; the stage is stale again.
                self.stages[idx].state = StageState::Stale;
                let message = match e {
                    PipelineError::Compute { message, .. } => message,
                    other => other.to_string(),
                };
                return Err(PipelineError::Compute {
                    stage: self.stages[idx].name.clone(),
                    message,
                });
            }
        };

        let out_ports = self.stages[idx].outputs.clone();
        for (i, value) in out_values.into_iter().enumerate() {
            if let Some(value) = value {
                if let Err(e) = self.write_port(out_ports[i], value, tap) {
                    self.stages[idx].state = StageState::Stale;
                    return Err(e);
                }
            }
        }
        self.stages[idx].state = StageState::Settled;
        Ok(())
    }

    /// Writes a value to a port: kind check, version bump, synchronous copy
    /// to every consumer, and tap fan-out when the port belongs to a
    /// designated output stage.
    fn write_port(&mut self, pid: PortId, value: Value, tap: &mut dyn OutputTap) -> Result<()> {
        let idx = pid.index();
        let expected = self.ports[idx].kind;
        if value.kind() != expected {
            return Err(PipelineError::TypeMismatch {
                port: self.port_path(pid),
                expected,
                got: value.kind(),
            });
        }

        let consumers = self.ports[idx].consumers.clone();
        for c in &consumers {
            let cell = &mut self.ports[c.index()];
            cell.value = Some(value.clone());
            cell.version += 1;
        }

        let cell = &mut self.ports[idx];
        cell.value = Some(value);
        cell.version += 1;

        let tapped = self.ports[idx].role == PortRole::Output
            && self.output_stages.contains(&self.ports[idx].stage);
        if tapped {
            let stage_name = &self.stages[self.ports[idx].stage.index()].name;
            let port_name = self.ports[idx].name;
            if let Some(v) = &self.ports[idx].value {
                tap.on_output(stage_name, port_name, v)?;
            }
        }
        Ok(())
    }

    fn port_path(&self, pid: PortId) -> String {
        let cell = &self.ports[pid.index()];
        format!("{}.{}", self.stages[cell.stage.index()].name, cell.name)
    }
}

// Stage slots hold trait objects, so the derive is unavailable.
impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("stages", &self.stage_names().collect::<Vec<_>>())
            .field("ports", &self.ports.len())
            .field("input", &self.input_stage_name())
            .finish()
    }
}
