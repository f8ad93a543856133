//! Signal propagation: the rules that turn "an output port's signal
//! changed" into downstream effects — ordinary fan-out through the
//! scheduler, and the combinationally-transparent subcircuit-boundary crossing.
//!
//! These are free functions rather than methods on [`crate::engine::Engine`]
//! because they need simultaneous mutable access to the graph table, the
//! scheduler, and the update batcher; splitting them out lets `Engine` borrow
//! its three fields disjointly instead of fighting itself through `&mut self`.

use indexmap::IndexMap;

use crate::batcher::UpdateBatcher;
use crate::graph::{Direction, GateId, GlobalGateId, Graph, GraphId, PortId};
use crate::scheduler::Scheduler;
use crate::signal::Signal;

const INNER_OUT: &str = "out";

/// Applies a newly computed signal to `gate`'s `port` output, skipping the
/// work entirely if the value hasn't actually changed, and fanning it out to
/// every linked target input otherwise.
pub fn set_gate_output_signal(
    graphs: &mut IndexMap<GraphId, Graph>,
    scheduler: &mut Scheduler,
    batcher: &mut UpdateBatcher,
    graph_id: &GraphId,
    gate_id: &GateId,
    port: &PortId,
    sig: Signal,
) {
    let observed = {
        let Some(graph) = graphs.get_mut(graph_id) else {
            return;
        };
        let Some(gate) = graph.get_gate_mut(gate_id) else {
            return;
        };
        if gate
            .output_signals
            .get(port)
            .is_some_and(|current| current.equals(&sig))
        {
            return;
        }
        gate.output_signals.insert(port.clone(), sig.clone());
        graph.observed
    };

    if observed {
        batcher.mark_update(GlobalGateId::new(graph_id.clone(), gate_id.clone()), port.clone());
    }

    let targets = {
        let graph = graphs.get(graph_id).expect("graph vanished mid-propagation");
        let gate = graph.get_gate(gate_id).expect("gate vanished mid-propagation");
        gate.output_targets(port)
    };

    for target in targets {
        set_gate_input_signal(
            graphs,
            scheduler,
            batcher,
            graph_id,
            &target.gate,
            &target.port,
            sig.clone(),
        );
    }
}

/// Applies a batch of newly computed output signals, e.g. the result of
/// draining a gate's `operation` or driving an Input-type gate from
/// `changeInput`.
pub fn set_gate_output_signals(
    graphs: &mut IndexMap<GraphId, Graph>,
    scheduler: &mut Scheduler,
    batcher: &mut UpdateBatcher,
    graph_id: &GraphId,
    gate_id: &GateId,
    outputs: impl IntoIterator<Item = (PortId, Signal)>,
) {
    for (port, sig) in outputs {
        set_gate_output_signal(graphs, scheduler, batcher, graph_id, gate_id, &port, sig);
    }
}

/// Applies a newly arrived signal to `gate`'s `port` input, then dispatches
/// on what kind of gate it landed on: a subcircuit boundary crossing, an
/// Output-type gate terminating or forwarding through its enclosing
/// subcircuit, or an ordinary gate getting enqueued for re-evaluation.
pub fn set_gate_input_signal(
    graphs: &mut IndexMap<GraphId, Graph>,
    scheduler: &mut Scheduler,
    batcher: &mut UpdateBatcher,
    graph_id: &GraphId,
    gate_id: &GateId,
    port: &PortId,
    sig: Signal,
) {
    enum Dispatch {
        Subcircuit { subgraph: GraphId, inner_gate: GateId },
        Output { enclosing: GlobalGateId, net: PortId },
        Terminal,
        Enqueue { propagation: i64 },
    }

    let dispatch = {
        let Some(graph) = graphs.get_mut(graph_id) else {
            return;
        };
        let Some(gate) = graph.get_gate_mut(gate_id) else {
            return;
        };
        if gate
            .input_signals
            .get(port)
            .is_some_and(|current| current.equals(&sig))
        {
            return;
        }
        gate.input_signals.insert(port.clone(), sig.clone());

        if gate.is_subcircuit() {
            let subgraph = gate.params.subgraph.clone();
            let inner_gate = gate
                .params
                .circuit_io_map
                .as_ref()
                .and_then(|map| map.get(port))
                .cloned();
            match (subgraph, inner_gate) {
                (Some(subgraph), Some(inner_gate)) => Dispatch::Subcircuit { subgraph, inner_gate },
                _ => return,
            }
        } else if gate.is_output() {
            match graph.subcircuit.clone() {
                Some(enclosing) => {
                    let Some(net) = gate.params.net.clone() else {
                        return;
                    };
                    Dispatch::Output { enclosing, net }
                }
                None => Dispatch::Terminal,
            }
        } else {
            Dispatch::Enqueue {
                propagation: gate.params.propagation,
            }
        }
    };

    match dispatch {
        Dispatch::Subcircuit { subgraph, inner_gate } => {
            set_gate_output_signal(
                graphs,
                scheduler,
                batcher,
                &subgraph,
                &inner_gate,
                &PortId::from(INNER_OUT),
                sig,
            );
        }
        Dispatch::Output { enclosing, net } => {
            set_gate_output_signal(graphs, scheduler, batcher, &enclosing.graph, &enclosing.gate, &net, sig);
        }
        Dispatch::Terminal => {}
        Dispatch::Enqueue { propagation } => {
            tracing::trace!(graph = %graph_id, gate = %gate_id, "enqueueing gate after input change");
            scheduler.enqueue(GlobalGateId::new(graph_id.clone(), gate_id.clone()), propagation);
        }
    }
}

/// The boundary-initialization step `addSubcircuit` performs for each
/// `(port, innerId)` in the iomap: drive the boundary consistent before any
/// evaluation observes it. `direction` is the subcircuit gate's declared
/// direction for `port`.
pub fn initialize_subcircuit_boundary(
    graphs: &mut IndexMap<GraphId, Graph>,
    scheduler: &mut Scheduler,
    batcher: &mut UpdateBatcher,
    graph_id: &GraphId,
    gate_id: &GateId,
    subgraph_id: &GraphId,
    port: &PortId,
    inner_gate: &GateId,
    direction: Direction,
) {
    match direction {
        Direction::In => {
            let current = graphs
                .get(graph_id)
                .and_then(|g| g.get_gate(gate_id))
                .and_then(|g| g.input_signals.get(port))
                .cloned();
            if let Some(sig) = current {
                set_gate_output_signal(
                    graphs,
                    scheduler,
                    batcher,
                    subgraph_id,
                    inner_gate,
                    &PortId::from(INNER_OUT),
                    sig,
                );
            }
        }
        Direction::Out => {
            let current = graphs
                .get(subgraph_id)
                .and_then(|g| g.get_gate(inner_gate))
                .and_then(|g| g.input_signals.get(&PortId::from("in")))
                .cloned();
            if let Some(sig) = current {
                set_gate_output_signal(graphs, scheduler, batcher, graph_id, gate_id, port, sig);
            }
        }
    }
}
