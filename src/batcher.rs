//! The update batcher: tracks dirty `(gate, port)` pairs for observed graphs
//! and flushes them periodically into an [`UpdateMessage`].

use indexmap::{IndexMap, IndexSet};

use crate::graph::{Direction, GlobalGateId, Graph, GraphId, PortId};
use crate::message::{GateUpdate, UpdateMessage};

#[derive(Default)]
pub struct UpdateBatcher {
    to_update: IndexMap<GlobalGateId, IndexSet<PortId>>,
}

impl UpdateBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `port` on `gate` changed since the last flush. The
    /// observed-graph check happens at the call site (the propagator already
    /// has the graph in hand); this only records.
    pub fn mark_update(&mut self, gate: GlobalGateId, port: PortId) {
        self.to_update.entry(gate).or_default().insert(port);
    }

    /// Resyncs a newly observed graph: every out-port of every gate in it is
    /// marked dirty so a late observer catches up to current state on the
    /// next flush instead of only seeing changes from here on.
    pub fn resync_graph(&mut self, graph_id: &GraphId, graph: &Graph) {
        for (gate_id, gate) in &graph.gates {
            for port in gate.ports.values().filter(|p| p.dir == Direction::Out) {
                self.mark_update(GlobalGateId::new(graph_id.clone(), gate_id.clone()), port.id.clone());
            }
        }
    }

    /// Snapshots and clears the dirty set, resolving each `(gate, port)` pair
    /// against current graph state into an [`UpdateMessage`]. Pairs whose gate
    /// or port has since vanished (removed gate, late-removed port) are
    /// dropped rather than causing a flush failure — the spec treats this as a
    /// normal race, same as a stale scheduler entry.
    pub fn flush(&mut self, graphs: &IndexMap<GraphId, Graph>, tick: i64, has_pending_events: bool) -> UpdateMessage {
        let dirty = std::mem::take(&mut self.to_update);
        let mut updates = Vec::with_capacity(dirty.len());

        for (gate_ref, ports) in dirty {
            let Some(gate) = graphs.get(&gate_ref.graph).and_then(|g| g.get_gate(&gate_ref.gate)) else {
                continue;
            };
            let mut values = IndexMap::new();
            for port in ports {
                if let Some(sig) = gate.output_signals.get(&port) {
                    values.insert(port, sig.clone());
                }
            }
            if !values.is_empty() {
                updates.push(GateUpdate {
                    graph: gate_ref.graph,
                    gate: gate_ref.gate,
                    ports: values,
                });
            }
        }

        tracing::trace!(tick, updates = updates.len(), "flushing updates");
        UpdateMessage {
            tick,
            has_pending_events,
            updates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::test_cells::ConstCell;
    use crate::graph::{Direction, Gate, GateId, GateParams, Port};
    use crate::signal::Signal;

    fn gate_with_out(id: &str, value: bool) -> Gate {
        let mut ports = IndexMap::new();
        ports.insert(PortId::from("out"), Port::new("out", Direction::Out, 1));
        let mut output_signals = IndexMap::new();
        output_signals.insert(PortId::from("out"), Signal::bit(value));
        Gate {
            id: GateId::from(id),
            graph: Some(GraphId::from("g")),
            type_name: "Const".into(),
            special: None,
            cell: Some(Box::new(ConstCell {
                name: "Const",
                outputs: IndexMap::new(),
            })),
            ports,
            input_signals: IndexMap::new(),
            output_signals,
            links_by_output: IndexMap::new(),
            links: IndexSet::new(),
            params: GateParams::default(),
        }
    }

    #[test]
    fn flush_collects_marked_ports_and_clears() {
        let mut graph = Graph::new(GraphId::from("g"));
        graph.gates.insert(GateId::from("a"), gate_with_out("a", true));
        let mut graphs = IndexMap::new();
        graphs.insert(GraphId::from("g"), graph);

        let mut batcher = UpdateBatcher::new();
        batcher.mark_update(GlobalGateId::new(GraphId::from("g"), GateId::from("a")), PortId::from("out"));

        let msg = batcher.flush(&graphs, 7, false);
        assert_eq!(msg.tick, 7);
        assert_eq!(msg.updates.len(), 1);
        assert!(msg.updates[0].ports[&PortId::from("out")].equals(&Signal::bit(true)));

        let empty = batcher.flush(&graphs, 8, false);
        assert!(empty.updates.is_empty());
    }

    #[test]
    fn resync_marks_every_out_port() {
        let mut graph = Graph::new(GraphId::from("g"));
        graph.gates.insert(GateId::from("a"), gate_with_out("a", false));
        let mut batcher = UpdateBatcher::new();
        batcher.resync_graph(&GraphId::from("g"), &graph);

        graph.observed = true;
        let mut graphs = IndexMap::new();
        graphs.insert(GraphId::from("g"), graph);

        let msg = batcher.flush(&graphs, 0, false);
        assert_eq!(msg.updates.len(), 1);
    }

    #[test]
    fn flush_drops_entries_for_gates_that_no_longer_exist() {
        let graphs: IndexMap<GraphId, Graph> = IndexMap::new();
        let mut batcher = UpdateBatcher::new();
        batcher.mark_update(GlobalGateId::new(GraphId::from("gone"), GateId::from("a")), PortId::from("out"));

        let msg = batcher.flush(&graphs, 1, false);
        assert!(msg.updates.is_empty());
    }
}
