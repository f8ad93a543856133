//! The cell-library contract: the interface the engine dispatches a gate's
//! combinational behavior through. The engine itself ships no real gate
//! library — it only needs to call `operation` on whatever cell a gate is
//! bound to, so that dispatch is expressed as an open trait rather than a
//! closed enum of built-in gate kinds.

use indexmap::IndexMap;

use crate::graph::PortId;
use crate::signal::Signal;

/// Special gate kinds whose outputs are driven externally and which the
/// scheduler never evaluates. `Subcircuit` and `Output` carry extra dispatch
/// behavior in the propagator; the rest are opaque to the engine beyond "do
/// not enqueue or evaluate this gate."
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecialKind {
    Subcircuit,
    Input,
    Output,
    Button,
    Lamp,
    NumEntry,
    NumDisplay,
}

/// The result of a cell's `operation`: the newly computed output signals, plus
/// an explicit flag a self-oscillating cell (a clock) sets to request its own
/// re-enqueue rather than smuggling a magic key into the output map.
#[derive(Clone, Debug, Default)]
pub struct CellOutputs {
    pub outputs: IndexMap<PortId, Signal>,
    pub reenqueue: bool,
}

impl CellOutputs {
    pub fn new(outputs: IndexMap<PortId, Signal>) -> Self {
        Self {
            outputs,
            reenqueue: false,
        }
    }

    pub fn reenqueuing(outputs: IndexMap<PortId, Signal>) -> Self {
        Self {
            outputs,
            reenqueue: true,
        }
    }
}

/// A gate type's combinational behavior: a pure `operation(inputs) -> outputs`
/// dispatch table plus a one-time `prepare` initializer. `operation` must be
/// pure over `(inputs, self)` — it must never reach into graph state or
/// enqueue directly; the only scheduling channel available to it is the
/// `reenqueue` flag on its return value.
pub trait Cell: std::fmt::Debug + Send + Sync {
    /// A human-readable type name, used for the `Gate::type` field and in update
    /// messages / diagnostics.
    fn type_name(&self) -> &str;

    /// Computes new output signals from current input signals. Called by the
    /// scheduler's drain loop with the gate's live input-signal map.
    fn operation(&mut self, inputs: &IndexMap<PortId, Signal>) -> CellOutputs;

    /// Called once at gate construction, before the gate is first enqueued.
    /// Default is a no-op; stateful cells (counters, clocks) use this to seed
    /// private state.
    fn prepare(&mut self) {}
}
