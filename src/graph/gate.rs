//! Gates: nodes bound to a cell, carrying current signals and adjacency.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::cell::{Cell, SpecialKind};
use crate::signal::Signal;

use super::types::{Endpoint, GateId, GraphId, LinkId, Port, PortId};

/// Cell-specific state a gate carries beyond its signals: the propagation
/// delay every cell declares, plus the extra fields subcircuit and
/// Output-type gates need for boundary crossing.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateParams {
    /// Ticks between an input change and the scheduler re-evaluating this gate.
    /// Meaningless for `special` gates, which are never scheduled.
    pub propagation: i64,
    /// For a subcircuit gate: the graph it instantiates.
    pub subgraph: Option<GraphId>,
    /// For a subcircuit gate: external port id -> inner Input/Output gate id.
    pub circuit_io_map: Option<IndexMap<PortId, GateId>>,
    /// For an Output-type gate: the port on the enclosing subcircuit gate that
    /// this gate's `in` input drives.
    pub net: Option<PortId>,
}

/// A node in a [`super::Graph`], bound to a cell (or marked `special`).
pub struct Gate {
    pub id: GateId,
    /// Cleared (`None`) when the gate is removed; a tombstone the scheduler's
    /// drain loop checks so pending entries for a removed gate become no-ops.
    pub graph: Option<GraphId>,
    pub type_name: String,
    pub special: Option<SpecialKind>,
    pub cell: Option<Box<dyn Cell>>,
    pub ports: IndexMap<PortId, Port>,
    pub input_signals: IndexMap<PortId, Signal>,
    pub output_signals: IndexMap<PortId, Signal>,
    /// For each out-port, the set of `(targetGate, targetPort)` it drives.
    pub links_by_output: IndexMap<PortId, IndexSet<Endpoint>>,
    /// All link ids incident on this gate, for O(degree) removal.
    pub links: IndexSet<LinkId>,
    pub params: GateParams,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("id", &self.id)
            .field("graph", &self.graph)
            .field("type_name", &self.type_name)
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

impl Gate {
    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }

    pub fn is_subcircuit(&self) -> bool {
        self.special == Some(SpecialKind::Subcircuit)
    }

    pub fn is_output(&self) -> bool {
        self.special == Some(SpecialKind::Output)
    }

    /// Snapshot of the current targets of `out_port`, for iterating while the
    /// set it's copied from may be mutated — a `removeLink` racing a gate's
    /// fan-out can't invalidate an iteration that's already snapshotted.
    pub fn output_targets(&self, out_port: &PortId) -> SmallVec<[Endpoint; 2]> {
        self.links_by_output
            .get(out_port)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
