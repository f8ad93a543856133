//! Property tests covering the engine's core invariants: signal-equality
//! idempotence, adjacency consistency, boundary conservation, tick
//! monotonicity within a drain, and determinism.

use indexmap::IndexMap;
use proptest::prelude::*;

use circuitry::cell::SpecialKind;
use circuitry::cells::Not;
use circuitry::graph::{Direction, Endpoint, GateId, GateParams, GraphId, LinkId, Port, PortId};
use circuitry::signal::{Signal, Trit};
use circuitry::Engine;

fn port(id: &str, dir: Direction, bits: u32) -> Port {
    Port::new(id, dir, bits)
}

fn signals(entries: &[(&str, Signal)]) -> IndexMap<PortId, Signal> {
    entries.iter().map(|(p, s)| (PortId::from(*p), s.clone())).collect()
}

fn trit_strategy() -> impl Strategy<Value = Trit> {
    prop_oneof![Just(Trit::Zero), Just(Trit::One), Just(Trit::Unknown)]
}

fn signal_strategy(width: u32) -> impl Strategy<Value = Signal> {
    prop::collection::vec(trit_strategy(), width as usize).prop_map(|trits| Signal::from_trits(trits))
}

fn not_gate_engine() -> (Engine, GraphId) {
    let mut engine = Engine::default();
    let g = GraphId::from("g");
    engine.add_graph(g.clone()).unwrap();
    engine
        .add_gate(
            g.clone(),
            GateId::from("drv"),
            "Input",
            Some(SpecialKind::Input),
            None,
            vec![port("out", Direction::Out, 2)],
            GateParams::default(),
            IndexMap::new(),
            signals(&[("out", Signal::undefined(2))]),
        )
        .unwrap();
    engine
        .add_gate(
            g.clone(),
            GateId::from("n"),
            "Not",
            None,
            Some(Box::new(Not)),
            vec![port("in", Direction::In, 2), port("out", Direction::Out, 2)],
            GateParams {
                propagation: 1,
                ..Default::default()
            },
            signals(&[("in", Signal::undefined(2))]),
            signals(&[("out", Signal::undefined(2))]),
        )
        .unwrap();
    engine
        .add_link(g.clone(), LinkId::from("l"), Endpoint::new("drv", "out"), Endpoint::new("n", "in"))
        .unwrap();
    (engine, g)
}

proptest! {
    /// 1. Signal-equality idempotence: re-applying the current value of an
    /// output produces no dirty marks (and, transitively, no enqueue: the
    /// input it feeds never changes and the fed gate is never scheduled).
    #[test]
    fn signal_equality_idempotence(sig in signal_strategy(2)) {
        let (mut engine, g) = not_gate_engine();
        engine.observe_graph(g.clone()).unwrap();

        engine.change_input(g.clone(), GateId::from("drv"), sig.clone()).unwrap();
        while engine.has_pending_events() {
            engine.update_gates_next();
        }
        let _ = engine.flush(); // drain the dirty set from the first, real change

        engine.change_input(g.clone(), GateId::from("drv"), sig).unwrap();
        prop_assert!(!engine.has_pending_events(), "re-applying the same signal must not enqueue anything");
        let msg = engine.flush();
        prop_assert!(msg.updates.is_empty(), "re-applying the same signal must not mark anything dirty");
    }
}

/// 2. Adjacency consistency: after any sequence of `addLink`/`removeLink`/
/// `removeGate`, every surviving link's source registers its target in
/// `linksByOutput`, and every surviving gate's `links` set matches the link
/// ids actually incident on it.
fn assert_adjacency_consistent(engine: &Engine, graph_id: &GraphId) {
    let graph = engine.graph(graph_id).expect("graph must exist");
    let mut expected_incident: IndexMap<GateId, Vec<LinkId>> = IndexMap::new();
    for link in graph.links.values() {
        let source_gate = graph.get_gate(&link.source.gate).expect("link source must exist");
        let targets = source_gate
            .links_by_output
            .get(&link.source.port)
            .expect("source out-port must have a links_by_output entry");
        assert!(
            targets.contains(&link.target),
            "linksByOutput for {:?}.{} must contain {:?}",
            link.source.gate,
            link.source.port,
            link.target
        );
        expected_incident.entry(link.source.gate.clone()).or_default().push(link.id.clone());
        expected_incident.entry(link.target.gate.clone()).or_default().push(link.id.clone());
    }
    for (gate_id, gate) in &graph.gates {
        let mut expected: Vec<LinkId> = expected_incident.get(gate_id).cloned().unwrap_or_default();
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        let mut actual: Vec<LinkId> = gate.links.iter().cloned().collect();
        actual.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(actual, expected, "links set for gate {gate_id:?} must equal its incident link ids");
    }
}

#[derive(Clone, Debug)]
enum GraphOp {
    AddLink { source: usize, target: usize },
    RemoveLink(usize),
    RemoveGate(usize),
}

fn graph_op_strategy() -> impl Strategy<Value = GraphOp> {
    prop_oneof![
        (0usize..4, 0usize..4).prop_map(|(s, t)| GraphOp::AddLink { source: s, target: t }),
        (0usize..8).prop_map(GraphOp::RemoveLink),
        (0usize..4).prop_map(GraphOp::RemoveGate),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn adjacency_consistency(ops in prop::collection::vec(graph_op_strategy(), 0..40)) {
        let mut engine = Engine::default();
        let g = GraphId::from("g");
        engine.add_graph(g.clone()).unwrap();

        // 4 buffer-like gates, each with one in-port and one out-port, so any
        // gate can legally source or target a link.
        for i in 0..4 {
            engine
                .add_gate(
                    g.clone(),
                    GateId::from(format!("b{i}")),
                    "Not",
                    None,
                    Some(Box::new(Not)),
                    vec![port("in", Direction::In, 1), port("out", Direction::Out, 1)],
                    GateParams { propagation: 1, ..Default::default() },
                    signals(&[("in", Signal::bit(false))]),
                    signals(&[("out", Signal::bit(true))]),
                )
                .unwrap();
        }

        let mut next_link_id = 0usize;
        let mut live_links: Vec<LinkId> = Vec::new();

        for op in ops {
            match op {
                GraphOp::AddLink { source, target } => {
                    if source == target {
                        continue;
                    }
                    let Some(graph) = engine.graph(&g) else { continue };
                    if graph.get_gate(&GateId::from(format!("b{source}"))).is_none()
                        || graph.get_gate(&GateId::from(format!("b{target}"))).is_none()
                    {
                        continue;
                    }
                    // Skip if target.in already has an incoming link (source ports may
                    // fan out, but this harness only wires one link per target port at
                    // a time to keep the link-id bookkeeping simple).
                    let target_has_link = graph.links.values().any(|l| l.target == Endpoint::new(format!("b{target}"), "in"));
                    if target_has_link {
                        continue;
                    }
                    let link_id = LinkId::from(format!("l{next_link_id}"));
                    next_link_id += 1;
                    if engine
                        .add_link(g.clone(), link_id.clone(), Endpoint::new(format!("b{source}"), "out"), Endpoint::new(format!("b{target}"), "in"))
                        .is_ok()
                    {
                        live_links.push(link_id);
                    }
                }
                GraphOp::RemoveLink(idx) => {
                    if live_links.is_empty() {
                        continue;
                    }
                    let idx = idx % live_links.len();
                    let link_id = live_links.remove(idx);
                    let _ = engine.remove_link(g.clone(), link_id);
                }
                GraphOp::RemoveGate(idx) => {
                    let gate_id = GateId::from(format!("b{idx}"));
                    if engine.graph(&g).and_then(|gr| gr.get_gate(&gate_id)).is_none() {
                        continue;
                    }
                    let _ = engine.remove_gate(g.clone(), gate_id);
                    live_links.retain(|l| engine.graph(&g).map(|gr| gr.links.contains_key(l)).unwrap_or(false));
                }
            }
            assert_adjacency_consistent(&engine, &g);
        }
    }
}

/// 3. Boundary conservation: once propagation quiesces, a subcircuit gate's
/// inputs/outputs agree with its inner Input/Output gates across the iomap.
proptest! {
    #[test]
    fn boundary_conservation(v in any::<bool>()) {
        let mut engine = Engine::default();
        let top = GraphId::from("top");
        let sub = GraphId::from("sub");
        engine.add_graph(top.clone()).unwrap();
        engine.add_graph(sub.clone()).unwrap();

        engine
            .add_gate(
                sub.clone(), GateId::from("inner_in"), "Input", Some(SpecialKind::Input), None,
                vec![port("out", Direction::Out, 1)], GateParams::default(),
                IndexMap::new(), signals(&[("out", Signal::bit(false))]),
            )
            .unwrap();
        engine
            .add_gate(
                sub.clone(), GateId::from("inner_out"), "Output", Some(SpecialKind::Output), None,
                vec![port("in", Direction::In, 1)],
                GateParams { net: Some(PortId::from("out")), ..Default::default() },
                signals(&[("in", Signal::bit(false))]), IndexMap::new(),
            )
            .unwrap();
        engine
            .add_link(sub.clone(), LinkId::from("wire"), Endpoint::new("inner_in", "out"), Endpoint::new("inner_out", "in"))
            .unwrap();
        engine
            .add_gate(
                top.clone(), GateId::from("g"), "Subcircuit", Some(SpecialKind::Subcircuit), None,
                vec![port("in", Direction::In, 1), port("out", Direction::Out, 1)], GateParams::default(),
                signals(&[("in", Signal::bit(false))]), signals(&[("out", Signal::bit(false))]),
            )
            .unwrap();
        let mut iomap = IndexMap::new();
        iomap.insert(PortId::from("in"), GateId::from("inner_in"));
        iomap.insert(PortId::from("out"), GateId::from("inner_out"));
        engine.add_subcircuit(top.clone(), GateId::from("g"), sub.clone(), iomap).unwrap();

        engine
            .add_gate(
                top.clone(), GateId::from("drv"), "Input", Some(SpecialKind::Input), None,
                vec![port("out", Direction::Out, 1)], GateParams::default(),
                IndexMap::new(), signals(&[("out", Signal::bit(false))]),
            )
            .unwrap();
        engine
            .add_link(top.clone(), LinkId::from("drive_in"), Endpoint::new("drv", "out"), Endpoint::new("g", "in"))
            .unwrap();

        engine.change_input(top.clone(), GateId::from("drv"), Signal::bit(v)).unwrap();
        while engine.has_pending_events() {
            engine.update_gates_next();
        }

        let top_graph = engine.graph(&top).unwrap();
        let sub_graph = engine.graph(&sub).unwrap();
        let g_gate = top_graph.get_gate(&GateId::from("g")).unwrap();
        let inner_in = sub_graph.get_gate(&GateId::from("inner_in")).unwrap();
        let inner_out = sub_graph.get_gate(&GateId::from("inner_out")).unwrap();

        prop_assert!(inner_in.output_signals[&PortId::from("out")].equals(&g_gate.input_signals[&PortId::from("in")]));
        prop_assert!(g_gate.output_signals[&PortId::from("out")].equals(&inner_out.input_signals[&PortId::from("in")]));
    }
}

/// 4. Tick monotonicity within a drain: `tick` is constant throughout a
/// single `updateGatesNext`, and strictly increases between successive
/// drains (never backwards, even when intervening idle ticks pass).
#[test]
fn tick_monotonicity_within_and_across_drains() {
    // `Scheduler`'s own unit tests (src/scheduler.rs) exercise the mid-drain
    // invariant directly since they have crate-internal access to
    // `begin_drain`/`next_pending`/`end_drain`; this integration test checks
    // the externally-observable consequence through `Engine`: draining three
    // gates simultaneously pending at the same tick advances the clock by
    // exactly one step, not one step per gate, and successive drains never
    // move the clock backwards.
    let mut engine = Engine::default();
    let g = GraphId::from("g");
    engine.add_graph(g.clone()).unwrap();
    for name in ["a", "b", "c"] {
        engine
            .add_gate(
                g.clone(),
                GateId::from(name),
                "Not",
                None,
                Some(Box::new(Not)),
                vec![port("in", Direction::In, 1), port("out", Direction::Out, 1)],
                GateParams {
                    propagation: 3,
                    ..Default::default()
                },
                signals(&[("in", Signal::bit(false))]),
                signals(&[("out", Signal::bit(true))]),
            )
            .unwrap();
    }

    assert!(engine.update_gates_next(), "there is a tick to drain");
    assert_eq!(engine.tick(), 4, "three simultaneously-pending gates share a tick (3 + 1), not one tick each");
    assert!(!engine.has_pending_events(), "all three were drained by a single event step");

    // Across separate drains, ticks never repeat or move backwards.
    let mut seen_ticks = vec![engine.tick()];
    engine.add_gate(
        g.clone(),
        GateId::from("d"),
        "Not",
        None,
        Some(Box::new(Not)),
        vec![port("in", Direction::In, 1), port("out", Direction::Out, 1)],
        GateParams { propagation: 2, ..Default::default() },
        signals(&[("in", Signal::bit(false))]),
        signals(&[("out", Signal::bit(true))]),
    ).unwrap();
    engine.update_gates_next();
    seen_ticks.push(engine.tick());

    for pair in seen_ticks.windows(2) {
        assert!(pair[1] > pair[0], "successive drains must strictly increase the tick");
    }
}

/// 5. Determinism: two engines given identical command sequences produce
/// identical update streams when stepped with manual `updateGates`.
#[test]
fn determinism_across_identical_command_sequences() {
    fn build_and_run(value: bool) -> circuitry::UpdateMessage {
        let (mut engine, g) = not_gate_engine();
        engine.observe_graph(g.clone()).unwrap();
        engine.change_input(g.clone(), GateId::from("drv"), Signal::from_trits([if value { Trit::One } else { Trit::Zero }, Trit::Zero])).unwrap();
        for _ in 0..4 {
            engine.update_gates();
        }
        engine.flush()
    }

    let a = build_and_run(true);
    let b = build_and_run(true);
    assert_eq!(a, b, "identical command sequences stepped identically must produce identical update streams");

    let c = build_and_run(false);
    assert_ne!(a, c, "differing input must (generally) produce a differing stream");
}
