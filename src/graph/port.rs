//! Port declarations and port storage.
//!
//! Each stage type declares its ports via static [`PortDecl`] arrays; the
//! builder uses these to validate edges. At runtime a port is a
//! [`PortCell`] in the graph's arena: one optional value, a version counter
//! bumped on every write, and the wiring created during construction.

use super::id::{PortId, StageId};
use super::value::{Value, ValueKind};

/// Static descriptor for a stage's port.
#[derive(Debug, Clone, Copy)]
pub struct PortDecl {
    pub name: &'static str,
    pub kind: ValueKind,
}

impl PortDecl {
    pub const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind }
    }
}

/// Whether a port produces or consumes values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    Input,
    Output,
}

/// A single-valued, versioned data cell owned by one stage.
#[derive(Debug)]
pub(crate) struct PortCell {
    pub name: &'static str,
    pub stage: StageId,
    pub role: PortRole,
    pub kind: ValueKind,
    pub value: Option<Value>,
    /// Monotonically incremented on every value write.
    pub version: u64,
    /// The producer feeding this port, if it is a connected input.
    pub producer: Option<PortId>,
    /// Observer list: consumer ports receiving a copy of every write.
    pub consumers: Vec<PortId>,
}

impl PortCell {
    pub fn new(name: &'static str, stage: StageId, role: PortRole, kind: ValueKind) -> Self {
        Self {
            name,
            stage,
            role,
            kind,
            value: None,
            version: 0,
            producer: None,
            consumers: Vec::new(),
        }
    }
}
