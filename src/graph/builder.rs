//! Graph construction and validation.
//!
//! [`GraphBuilder`] collects stage instances and connection requests, then
//! validates the whole description in [`GraphBuilder::build`]: unique names,
//! declared ports, kind-equal connections, a single producer per input,
//! acyclicity, and reachability from the designated input stage. The builder
//! is consumed by `build`, so a rejected description leaves no partially
//! wired graph behind.

use std::collections::{HashMap, VecDeque};

use tracing::info;

use crate::error::{PipelineError, Result};

use super::graph::{Graph, StageSlot};
use super::id::{PortId, StageId};
use super::params::ParamSet;
use super::port::{PortCell, PortRole};
use super::stage::{StageImpl, StageState};
use super::value::ValueKind;

struct EdgeSpec {
    from_stage: String,
    from_port: String,
    to_stage: String,
    to_port: String,
}

/// Consuming builder for a [`Graph`].
#[derive(Default)]
pub struct GraphBuilder {
    stages: Vec<(String, Box<dyn StageImpl>)>,
    edges: Vec<EdgeSpec>,
    input: Option<String>,
    outputs: Vec<String>,
}

/// Splits a `"stage.port"` endpoint path.
pub(crate) fn parse_endpoint(path: &str) -> Result<(&str, &str)> {
    path.split_once('.')
        .filter(|(s, p)| !s.is_empty() && !p.is_empty())
        .ok_or_else(|| {
            PipelineError::InvalidConnection(format!(
                "endpoint '{path}' is not of the form 'stage.port'"
            ))
        })
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named stage instance.
    pub fn stage(mut self, name: impl Into<String>, imp: Box<dyn StageImpl>) -> Self {
        self.stages.push((name.into(), imp));
        self
    }

    /// Requests a connection from an output port to an input port.
    pub fn connect(
        mut self,
        from_stage: impl Into<String>,
        from_port: impl Into<String>,
        to_stage: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        self.edges.push(EdgeSpec {
            from_stage: from_stage.into(),
            from_port: from_port.into(),
            to_stage: to_stage.into(),
            to_port: to_port.into(),
        });
        self
    }

    /// Connection given as `"stage.port"` endpoint paths.
    pub fn connect_path(self, from: &str, to: &str) -> Result<Self> {
        let (fs, fp) = parse_endpoint(from)?;
        let (ts, tp) = parse_endpoint(to)?;
        Ok(self.connect(fs, fp, ts, tp))
    }

    /// Designates the stage that receives external frames.
    pub fn input_stage(mut self, name: impl Into<String>) -> Self {
        self.input = Some(name.into());
        self
    }

    /// Designates a stage whose outputs are observable by the run tap.
    pub fn output_stage(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// Validates the description and produces a wired [`Graph`].
    pub fn build(self) -> Result<Graph> {
        let mut by_name: HashMap<String, StageId> = HashMap::new();
        for (i, (name, _)) in self.stages.iter().enumerate() {
            if by_name.insert(name.clone(), StageId(i as u32)).is_some() {
                return Err(PipelineError::InvalidConnection(format!(
                    "duplicate stage name '{name}'"
                )));
            }
        }

        // Port arenas, one cell per declared port, inputs before outputs.
        let mut ports: Vec<PortCell> = Vec::new();
        let mut slots: Vec<StageSlot> = Vec::new();
        for (i, (name, imp)) in self.stages.into_iter().enumerate() {
            let sid = StageId(i as u32);
            let mut inputs = Vec::with_capacity(imp.inputs().len());
            for decl in imp.inputs() {
                inputs.push(PortId(ports.len() as u32));
                ports.push(PortCell::new(decl.name, sid, PortRole::Input, decl.kind));
            }
            let mut outputs = Vec::with_capacity(imp.outputs().len());
            for decl in imp.outputs() {
                outputs.push(PortId(ports.len() as u32));
                ports.push(PortCell::new(decl.name, sid, PortRole::Output, decl.kind));
            }
            let params = ParamSet::from_decls(imp.params());
            slots.push(StageSlot {
                name,
                imp,
                params,
                inputs,
                outputs,
                state: StageState::Stale,
            });
        }

        let lookup = |stage: &str| -> Result<StageId> {
            by_name.get(stage).copied().ok_or_else(|| {
                PipelineError::InvalidConnection(format!("unknown stage '{stage}'"))
            })
        };
        // Wire edges: kind equality and a single producer per input.
        let mut edge_pairs: Vec<(StageId, StageId)> = Vec::new();
        for edge in &self.edges {
            let from = lookup(&edge.from_stage)?;
            let to = lookup(&edge.to_stage)?;
            let out = find_port(&slots, &ports, from, &edge.from_port, PortRole::Output)?;
            let inp = find_port(&slots, &ports, to, &edge.to_port, PortRole::Input)?;
            if ports[out.index()].kind != ports[inp.index()].kind {
                return Err(PipelineError::TypeMismatch {
                    port: format!("{}.{}", edge.to_stage, edge.to_port),
                    expected: ports[inp.index()].kind,
                    got: ports[out.index()].kind,
                });
            }
            if ports[inp.index()].producer.is_some() {
                return Err(PipelineError::InvalidConnection(format!(
                    "input '{}.{}' already has a producer",
                    edge.to_stage, edge.to_port
                )));
            }
            ports[inp.index()].producer = Some(out);
            ports[out.index()].consumers.push(inp);
            edge_pairs.push((from, to));
        }

        // Every input port must be fed.
        for cell in &ports {
            if cell.role == PortRole::Input && cell.producer.is_none() {
                return Err(PipelineError::InvalidConnection(format!(
                    "input '{}.{}' is not connected",
                    slots[cell.stage.index()].name, cell.name
                )));
            }
        }

        // Designated input stage and its frame port.
        let input_name = self
            .input
            .ok_or_else(|| PipelineError::InvalidConnection("no input stage designated".into()))?;
        let input_stage = lookup(&input_name)?;
        let input_port = slots[input_stage.index()]
            .outputs
            .iter()
            .copied()
            .find(|p| ports[p.index()].kind == ValueKind::Image)
            .ok_or_else(|| {
                PipelineError::InvalidConnection(format!(
                    "input stage '{input_name}' has no image output"
                ))
            })?;

        if self.outputs.is_empty() {
            return Err(PipelineError::InvalidConnection(
                "no output stage designated".into(),
            ));
        }
        let mut output_stages = Vec::with_capacity(self.outputs.len());
        for name in &self.outputs {
            let sid = lookup(name)?;
            if !output_stages.contains(&sid) {
                output_stages.push(sid);
            }
        }

        // Stage-level adjacency, deduplicated.
        let mut downstream: Vec<Vec<StageId>> = vec![Vec::new(); slots.len()];
        for (from, to) in edge_pairs {
            if !downstream[from.index()].contains(&to) {
                downstream[from.index()].push(to);
            }
        }

        let order = topo_order(&slots, &downstream)?;

        // Everything must be reachable from the input stage, or editing the
        // input could leave silently-dead stages in the graph.
        let mut seen = vec![false; slots.len()];
        let mut queue = VecDeque::from([input_stage]);
        while let Some(sid) = queue.pop_front() {
            if std::mem::replace(&mut seen[sid.index()], true) {
                continue;
            }
            queue.extend(downstream[sid.index()].iter().copied());
        }
        if let Some(idx) = seen.iter().position(|s| !s) {
            return Err(PipelineError::InvalidConnection(format!(
                "stage '{}' is not reachable from input stage '{}'",
                slots[idx].name, input_name
            )));
        }

        info!(
            stages = slots.len(),
            ports = ports.len(),
            outputs = output_stages.len(),
            "graph built"
        );
        Ok(Graph {
            by_name,
            stages: slots,
            ports,
            input_stage,
            input_port,
            output_stages,
            order,
            downstream,
        })
    }
}

fn find_port(
    slots: &[StageSlot],
    ports: &[PortCell],
    sid: StageId,
    port: &str,
    role: PortRole,
) -> Result<PortId> {
    let slot = &slots[sid.index()];
    let ids = match role {
        PortRole::Input => &slot.inputs,
        PortRole::Output => &slot.outputs,
    };
    ids.iter()
        .copied()
        .find(|p| ports[p.index()].name == port)
        .ok_or_else(|| {
            PipelineError::InvalidConnection(format!(
                "stage '{}' has no {} port '{}'",
                slot.name,
                match role {
                    PortRole::Input => "input",
                    PortRole::Output => "output",
                },
                port
            ))
        })
}

/// Kahn's algorithm; on a cycle, extracts one concrete cycle for the error.
fn topo_order(slots: &[StageSlot], downstream: &[Vec<StageId>]) -> Result<Vec<StageId>> {
    let mut in_degree = vec![0usize; slots.len()];
    for next in downstream.iter().flatten() {
        in_degree[next.index()] += 1;
    }

    let mut queue: VecDeque<StageId> = (0..slots.len())
        .map(|i| StageId(i as u32))
        .filter(|s| in_degree[s.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(slots.len());
    while let Some(sid) = queue.pop_front() {
        order.push(sid);
        for &next in &downstream[sid.index()] {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                queue.push_back(next);
            }
        }
    }
    if order.len() == slots.len() {
        return Ok(order);
    }

    // Walk successors among the leftover nodes until one repeats.
    let start = StageId(
        in_degree
            .iter()
            .position(|&d| d > 0)
            .unwrap_or_default() as u32,
    );
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = downstream[current.index()]
            .iter()
            .copied()
            .find(|s| in_degree[s.index()] > 0)
            .unwrap_or(start);
        if let Some(pos) = path.iter().position(|&s| s == next) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|s| slots[s.index()].name.clone())
                .collect();
            cycle.push(slots[next.index()].name.clone());
            return Err(PipelineError::CyclicGraph { cycle });
        }
        path.push(next);
        current = next;
    }
}
