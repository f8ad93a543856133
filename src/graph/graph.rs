//! Graphs: a named collection of gates and links.

use indexmap::IndexMap;

use super::gate::Gate;
use super::types::{GateId, GlobalGateId, GraphId, Link, LinkId};

/// A named directed multigraph of gates and links. May be top-level or
/// instantiated as a subcircuit, in which case [`Graph::subcircuit`] points back
/// at the gate that embeds it.
pub struct Graph {
    pub id: GraphId,
    pub gates: IndexMap<GateId, Gate>,
    pub links: IndexMap<LinkId, Link>,
    pub observed: bool,
    pub subcircuit: Option<GlobalGateId>,
}

impl Graph {
    pub fn new(id: GraphId) -> Self {
        Self {
            id,
            gates: IndexMap::new(),
            links: IndexMap::new(),
            observed: false,
            subcircuit: None,
        }
    }

    pub fn get_gate(&self, gate: &GateId) -> Option<&Gate> {
        self.gates.get(gate)
    }

    pub fn get_gate_mut(&mut self, gate: &GateId) -> Option<&mut Gate> {
        self.gates.get_mut(gate)
    }

    /// Dumps the graph in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language))
    /// format to `path`, for visualization with tools like graphviz or gephi.
    /// Gated behind `debug_gates`, since a host embedding this engine
    /// shouldn't pay for a `petgraph`/`dot` dependency it never exercises.
    #[cfg(feature = "debug_gates")]
    pub fn dump_dot(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        use petgraph::dot::{Config, Dot};
        use std::io::Write;

        let mut dot = petgraph::Graph::<&str, ()>::new();
        let mut index = IndexMap::new();
        for (id, gate) in &self.gates {
            index.insert(id.clone(), dot.add_node(gate.type_name.as_str()));
        }
        for link in self.links.values() {
            dot.add_edge(index[&link.source.gate], index[&link.target.gate], ());
        }

        let mut f = std::fs::File::create(path)?;
        write!(f, "{:?}", Dot::with_config(&dot, &[Config::EdgeNoLabel]))
    }
}
