//! The top-level engine: owns the graph table, the scheduler, and the update
//! batcher, and exposes the command surface as methods returning
//! `Result<(), EngineError>`.

use std::time::Duration;

use indexmap::{IndexMap, IndexSet};

use crate::batcher::UpdateBatcher;
use crate::cell::Cell;
use crate::error::EngineError;
use crate::graph::{Direction, Endpoint, Gate, GateId, GateParams, GlobalGateId, Graph, GraphId, Link, LinkId, Port, PortId};
use crate::message::UpdateMessage;
use crate::propagator;
use crate::scheduler::Scheduler;
use crate::signal::Signal;

/// Tunables exposed as command arguments rather than compiled-in constants.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Normal-mode tick interval, set via the `interval` command.
    pub normal_interval: Duration,
    /// Update-batcher flush interval.
    pub flush_interval: Duration,
    /// Wall-clock budget `startFast` spends draining per burst.
    pub fast_burst_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_millis(10),
            flush_interval: Duration::from_millis(25),
            fast_burst_budget: Duration::from_millis(10),
        }
    }
}

type CellFactory = Box<dyn Fn() -> Box<dyn Cell> + Send + Sync>;

pub struct Engine {
    graphs: IndexMap<GraphId, Graph>,
    scheduler: Scheduler,
    batcher: UpdateBatcher,
    config: EngineConfig,
    cell_types: IndexMap<String, CellFactory>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graphs: IndexMap::new(),
            scheduler: Scheduler::new(),
            batcher: UpdateBatcher::new(),
            config,
            cell_types: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_normal_interval(&mut self, interval: Duration) {
        self.config.normal_interval = interval;
    }

    pub fn tick(&self) -> i64 {
        self.scheduler.tick()
    }

    pub fn has_pending_events(&self) -> bool {
        self.scheduler.has_pending_events()
    }

    /// Read-only access to a graph, for hosts and tests that need to inspect
    /// gate state directly rather than wait on the update-batcher stream.
    pub fn graph(&self, graph_id: &GraphId) -> Option<&Graph> {
        self.graphs.get(graph_id)
    }

    /// Registers a factory for a cell type name so wire-level `addGate`
    /// commands (behind the `serde` feature) can look it up. Only needed
    /// by hosts that drive the engine through [`crate::command::Command`];
    /// [`Engine::add_gate`] itself takes a concrete `Box<dyn Cell>` directly.
    pub fn register_cell_type<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Cell> + Send + Sync + 'static,
    {
        self.cell_types.insert(type_name.into(), Box::new(factory));
    }

    // ---- Graph operations -------------------------------------------------

    pub fn add_graph(&mut self, graph_id: GraphId) -> Result<(), EngineError> {
        if self.graphs.contains_key(&graph_id) {
            return Err(EngineError::DuplicateGraph(graph_id));
        }
        tracing::debug!(graph = %graph_id, "graph added");
        self.graphs.insert(graph_id.clone(), Graph::new(graph_id));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_gate(
        &mut self,
        graph_id: GraphId,
        gate_id: GateId,
        type_name: impl Into<String>,
        special: Option<crate::cell::SpecialKind>,
        mut cell: Option<Box<dyn Cell>>,
        ports: Vec<Port>,
        params: GateParams,
        input_signals: IndexMap<PortId, Signal>,
        output_signals: IndexMap<PortId, Signal>,
    ) -> Result<(), EngineError> {
        let graph = self
            .graphs
            .get_mut(&graph_id)
            .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
        if graph.gates.contains_key(&gate_id) {
            return Err(EngineError::DuplicateGate {
                graph: graph_id,
                gate: gate_id,
            });
        }

        if let Some(cell) = cell.as_deref_mut() {
            cell.prepare();
        }

        let propagation = params.propagation;
        let gate = Gate {
            id: gate_id.clone(),
            graph: Some(graph_id.clone()),
            type_name: type_name.into(),
            special,
            cell,
            ports: ports.into_iter().map(|p| (p.id.clone(), p)).collect(),
            input_signals,
            output_signals,
            links_by_output: IndexMap::new(),
            links: IndexSet::new(),
            params,
        };
        graph.gates.insert(gate_id.clone(), gate);

        let gate_ref = GlobalGateId::new(graph_id, gate_id);
        tracing::debug!(gate = %gate_ref, "gate added");
        self.scheduler.enqueue(gate_ref, propagation);
        Ok(())
    }

    /// `addGate` via the wire command surface: resolves `type_name` through
    /// the registered cell factories rather than taking a `Box<dyn Cell>`
    /// directly.
    #[allow(clippy::too_many_arguments)]
    fn add_gate_by_type_name(
        &mut self,
        graph_id: GraphId,
        gate_id: GateId,
        type_name: String,
        special: Option<crate::cell::SpecialKind>,
        params: GateParams,
        ports: Vec<Port>,
        input_signals: IndexMap<PortId, Signal>,
        output_signals: IndexMap<PortId, Signal>,
    ) -> Result<(), EngineError> {
        let cell = match self.cell_types.get(&type_name) {
            Some(factory) => Some(factory()),
            None if special.is_some() => None,
            None => return Err(EngineError::UnknownCellType(type_name.clone())),
        };
        self.add_gate(
            graph_id,
            gate_id,
            type_name,
            special,
            cell,
            ports,
            params,
            input_signals,
            output_signals,
        )
    }

    pub fn add_link(&mut self, graph_id: GraphId, link_id: LinkId, source: Endpoint, target: Endpoint) -> Result<(), EngineError> {
        let initial_signal = {
            let graph = self
                .graphs
                .get(&graph_id)
                .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
            if graph.links.contains_key(&link_id) {
                return Err(EngineError::DuplicateLink {
                    graph: graph_id,
                    link: link_id,
                });
            }

            let source_gate = graph.get_gate(&source.gate).ok_or_else(|| EngineError::UnknownGate {
                graph: graph_id.clone(),
                gate: source.gate.clone(),
            })?;
            let source_port = source_gate.ports.get(&source.port).ok_or_else(|| EngineError::UnknownPort {
                gate: source.gate.clone(),
                port: source.port.clone(),
            })?;
            if source_port.dir != Direction::Out {
                return Err(EngineError::DirectionMismatch {
                    gate: source.gate.clone(),
                    port: source.port.clone(),
                    expected: Direction::Out,
                });
            }

            let target_gate = graph.get_gate(&target.gate).ok_or_else(|| EngineError::UnknownGate {
                graph: graph_id.clone(),
                gate: target.gate.clone(),
            })?;
            let target_port = target_gate.ports.get(&target.port).ok_or_else(|| EngineError::UnknownPort {
                gate: target.gate.clone(),
                port: target.port.clone(),
            })?;
            if target_port.dir != Direction::In {
                return Err(EngineError::DirectionMismatch {
                    gate: target.gate.clone(),
                    port: target.port.clone(),
                    expected: Direction::In,
                });
            }

            source_gate.output_signals.get(&source.port).cloned()
        };

        {
            let graph = self.graphs.get_mut(&graph_id).expect("graph checked above");
            graph.links.insert(
                link_id.clone(),
                Link {
                    id: link_id.clone(),
                    source: source.clone(),
                    target: target.clone(),
                },
            );
            let source_gate = graph.get_gate_mut(&source.gate).expect("source gate checked above");
            source_gate
                .links_by_output
                .entry(source.port.clone())
                .or_default()
                .insert(target.clone());
            source_gate.links.insert(link_id.clone());
            let target_gate = graph.get_gate_mut(&target.gate).expect("target gate checked above");
            target_gate.links.insert(link_id.clone());
        }

        tracing::debug!(graph = %graph_id, link = %link_id, "link added");
        if let Some(sig) = initial_signal {
            propagator::set_gate_input_signal(
                &mut self.graphs,
                &mut self.scheduler,
                &mut self.batcher,
                &graph_id,
                &target.gate,
                &target.port,
                sig,
            );
        }
        Ok(())
    }

    pub fn remove_link(&mut self, graph_id: GraphId, link_id: LinkId) -> Result<(), EngineError> {
        let link = {
            let graph = self
                .graphs
                .get(&graph_id)
                .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
            graph.links.get(&link_id).cloned().ok_or_else(|| EngineError::UnknownLink {
                graph: graph_id.clone(),
                link: link_id.clone(),
            })?
        };

        let target_width = self
            .graphs
            .get(&graph_id)
            .and_then(|g| g.get_gate(&link.target.gate))
            .and_then(|g| g.ports.get(&link.target.port))
            .map(|p| p.bits)
            .unwrap_or(0);

        {
            let graph = self.graphs.get_mut(&graph_id).expect("graph checked above");
            graph.links.shift_remove(&link_id);
            if let Some(source_gate) = graph.get_gate_mut(&link.source.gate) {
                if let Some(targets) = source_gate.links_by_output.get_mut(&link.source.port) {
                    targets.shift_remove(&link.target);
                }
                source_gate.links.shift_remove(&link_id);
            }
            if let Some(target_gate) = graph.get_gate_mut(&link.target.gate) {
                target_gate.links.shift_remove(&link_id);
            }
        }

        tracing::debug!(graph = %graph_id, link = %link_id, "link removed");
        propagator::set_gate_input_signal(
            &mut self.graphs,
            &mut self.scheduler,
            &mut self.batcher,
            &graph_id,
            &link.target.gate,
            &link.target.port,
            Signal::undefined(target_width),
        );
        Ok(())
    }

    pub fn remove_gate(&mut self, graph_id: GraphId, gate_id: GateId) -> Result<(), EngineError> {
        let incident: Vec<LinkId> = {
            let graph = self
                .graphs
                .get(&graph_id)
                .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
            let gate = graph.get_gate(&gate_id).ok_or_else(|| EngineError::UnknownGate {
                graph: graph_id.clone(),
                gate: gate_id.clone(),
            })?;
            gate.links.iter().cloned().collect()
        };

        for link_id in incident {
            self.remove_link(graph_id.clone(), link_id)?;
        }

        if let Some(graph) = self.graphs.get_mut(&graph_id) {
            if let Some(gate) = graph.get_gate_mut(&gate_id) {
                gate.graph = None;
            }
            graph.gates.shift_remove(&gate_id);
        }
        tracing::debug!(graph = %graph_id, gate = %gate_id, "gate removed");
        Ok(())
    }

    pub fn add_subcircuit(
        &mut self,
        graph_id: GraphId,
        gate_id: GateId,
        subgraph_id: GraphId,
        iomap: IndexMap<PortId, GateId>,
    ) -> Result<(), EngineError> {
        {
            let graph = self
                .graphs
                .get(&graph_id)
                .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
            graph.get_gate(&gate_id).ok_or_else(|| EngineError::UnknownGate {
                graph: graph_id.clone(),
                gate: gate_id.clone(),
            })?;
        }
        if !self.graphs.contains_key(&subgraph_id) {
            return Err(EngineError::UnknownGraph(subgraph_id));
        }

        let boundary: Vec<(PortId, GateId, Direction)> = {
            let graph = self.graphs.get(&graph_id).expect("graph checked above");
            let gate = graph.get_gate(&gate_id).expect("gate checked above");
            iomap
                .iter()
                .filter_map(|(port, inner)| gate.ports.get(port).map(|p| (port.clone(), inner.clone(), p.dir)))
                .collect()
        };

        {
            let graph = self.graphs.get_mut(&graph_id).expect("graph checked above");
            let gate = graph.get_gate_mut(&gate_id).expect("gate checked above");
            gate.params.subgraph = Some(subgraph_id.clone());
            gate.params.circuit_io_map = Some(iomap);
        }
        if let Some(subgraph) = self.graphs.get_mut(&subgraph_id) {
            subgraph.subcircuit = Some(GlobalGateId::new(graph_id.clone(), gate_id.clone()));
        }

        tracing::debug!(graph = %graph_id, gate = %gate_id, subgraph = %subgraph_id, "subcircuit bound");
        for (port, inner_gate, dir) in boundary {
            propagator::initialize_subcircuit_boundary(
                &mut self.graphs,
                &mut self.scheduler,
                &mut self.batcher,
                &graph_id,
                &gate_id,
                &subgraph_id,
                &port,
                &inner_gate,
                dir,
            );
        }
        Ok(())
    }

    pub fn change_input(&mut self, graph_id: GraphId, gate_id: GateId, sig: Signal) -> Result<(), EngineError> {
        {
            let graph = self
                .graphs
                .get(&graph_id)
                .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
            graph.get_gate(&gate_id).ok_or_else(|| EngineError::UnknownGate {
                graph: graph_id.clone(),
                gate: gate_id.clone(),
            })?;
        }
        propagator::set_gate_output_signals(
            &mut self.graphs,
            &mut self.scheduler,
            &mut self.batcher,
            &graph_id,
            &gate_id,
            std::iter::once((PortId::from("out"), sig)),
        );
        Ok(())
    }

    pub fn observe_graph(&mut self, graph_id: GraphId) -> Result<(), EngineError> {
        let graph = self
            .graphs
            .get_mut(&graph_id)
            .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
        graph.observed = true;
        self.batcher.resync_graph(&graph_id, graph);
        Ok(())
    }

    pub fn unobserve_graph(&mut self, graph_id: GraphId) -> Result<(), EngineError> {
        let graph = self
            .graphs
            .get_mut(&graph_id)
            .ok_or_else(|| EngineError::UnknownGraph(graph_id.clone()))?;
        graph.observed = false;
        Ok(())
    }

    // ---- Scheduler stepping -------------------------------------------------

    /// One manual event step (`updateGatesNext`). Returns `false` if there was
    /// nothing pending to drain.
    pub fn update_gates_next(&mut self) -> bool {
        let Some(tick) = self.scheduler.begin_drain() else {
            return false;
        };
        tracing::trace!(tick, "draining tick");
        while let Some(gate_ref) = self.scheduler.next_pending(tick) {
            self.evaluate_gate(&gate_ref, tick);
        }
        self.scheduler.end_drain(tick);
        true
    }

    /// One manual slow step (`updateGates`).
    pub fn update_gates(&mut self) {
        if self.scheduler.ready_now() {
            self.update_gates_next();
        } else {
            self.scheduler.advance_idle_tick();
        }
    }

    fn evaluate_gate(&mut self, gate_ref: &GlobalGateId, tick: i64) {
        let evaluated = {
            let Some(graph) = self.graphs.get_mut(&gate_ref.graph) else {
                return;
            };
            let Some(gate) = graph.get_gate_mut(&gate_ref.gate) else {
                return;
            };
            if gate.graph.is_none() {
                tracing::trace!(gate = %gate_ref, "skipping removed gate");
                return;
            }
            if gate.is_special() {
                return;
            }
            let Some(mut cell) = gate.cell.take() else {
                tracing::warn!(gate = %gate_ref, "gate has no bound cell, skipping");
                return;
            };
            let result = cell.operation(&gate.input_signals);
            gate.cell = Some(cell);

            let mut validated = IndexMap::new();
            for (port, sig) in result.outputs {
                match gate.ports.get(&port) {
                    Some(p) if p.dir == Direction::Out && p.bits == sig.width() => {
                        validated.insert(port, sig);
                    }
                    Some(p) if p.dir == Direction::Out => {
                        debug_assert!(false, "cell {} returned wrong-width signal on port {port}", gate.type_name);
                        tracing::warn!(
                            gate = %gate_ref, %port, expected = p.bits, found = sig.width(),
                            "dropping wrong-width cell output"
                        );
                    }
                    _ => {
                        debug_assert!(false, "cell {} returned undeclared output port {port}", gate.type_name);
                        tracing::warn!(gate = %gate_ref, %port, "dropping undeclared cell output port");
                    }
                }
            }
            (validated, result.reenqueue, gate.params.propagation)
        };

        let (validated, reenqueue, propagation) = evaluated;
        if reenqueue {
            tracing::debug!(gate = %gate_ref, "cell requested re-enqueue");
            self.scheduler.enqueue(gate_ref.clone(), propagation);
        }
        tracing::trace!(tick, gate = %gate_ref, "applying cell outputs");
        propagator::set_gate_output_signals(
            &mut self.graphs,
            &mut self.scheduler,
            &mut self.batcher,
            &gate_ref.graph,
            &gate_ref.gate,
            validated,
        );
    }

    // ---- Update batcher ----------------------------------------------------

    pub fn flush(&mut self) -> UpdateMessage {
        self.batcher.flush(&self.graphs, self.scheduler.tick(), self.scheduler.has_pending_events())
    }

    // ---- Wire command dispatch (serde feature) -----------------------------

    #[cfg(feature = "serde")]
    pub fn dispatch_command(&mut self, command: crate::command::Command) -> Result<(), EngineError> {
        use crate::command::Command;

        let result = match command {
            Command::Interval { ms } => {
                self.set_normal_interval(Duration::from_millis(ms));
                Ok(())
            }
            Command::Start | Command::StartFast | Command::Stop => {
                // Driver mode switches are handled by `crate::driver::Driver`,
                // which intercepts these variants before they reach the engine.
                Ok(())
            }
            Command::UpdateGates => {
                self.update_gates();
                Ok(())
            }
            Command::UpdateGatesNext => {
                self.update_gates_next();
                Ok(())
            }
            Command::AddGraph { graph } => self.add_graph(graph),
            Command::AddGate {
                graph,
                gate,
                type_name,
                special,
                params,
                ports,
                input_signals,
                output_signals,
            } => self.add_gate_by_type_name(
                graph,
                gate,
                type_name,
                special,
                params,
                ports,
                input_signals.into_iter().map(|(p, s)| (p, s.into())).collect(),
                output_signals.into_iter().map(|(p, s)| (p, s.into())).collect(),
            ),
            Command::AddLink { graph, link, source, target } => self.add_link(graph, link, source, target),
            Command::AddSubcircuit {
                graph,
                gate,
                subgraph,
                iomap,
            } => self.add_subcircuit(graph, gate, subgraph, iomap),
            Command::RemoveGate { graph, gate } => self.remove_gate(graph, gate),
            Command::RemoveLink { graph, link } => self.remove_link(graph, link),
            Command::ObserveGraph { graph } => self.observe_graph(graph),
            Command::UnobserveGraph { graph } => self.unobserve_graph(graph),
            Command::ChangeInput { graph, gate, signal } => self.change_input(graph, gate, signal.into()),
        };

        if let Err(ref e) = result {
            tracing::warn!(error = %e, "command rejected");
        }
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
