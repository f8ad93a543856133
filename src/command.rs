//! The command surface, as a wire-decodable enum. This module only exists
//! behind the `serde` feature: a `Command` is nothing but the wire encoding of
//! a call into one of [`crate::engine::Engine`]'s methods, and every one of
//! those methods is fully usable without ever constructing one.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cell::SpecialKind;
use crate::graph::{Endpoint, GateId, GateParams, GraphId, LinkId, Port, PortId};
use crate::signal::TransportSignal;

/// One message from the host to the engine. Argumentless commands are unit
/// variants; single- or multi-argument commands carry their fields as a
/// struct variant, serialized under `args`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", content = "args")]
pub enum Command {
    #[serde(rename = "interval")]
    Interval { ms: u64 },
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "startFast")]
    StartFast,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "updateGates")]
    UpdateGates,
    #[serde(rename = "updateGatesNext")]
    UpdateGatesNext,
    #[serde(rename = "addGraph")]
    AddGraph { graph: GraphId },
    #[serde(rename = "addGate")]
    AddGate {
        graph: GraphId,
        gate: GateId,
        /// The cell type name, looked up in the engine's registered cell
        /// factories — the minimal hook the core needs to dispatch a
        /// wire-level `addGate` to a concrete [`crate::cell::Cell`].
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        special: Option<SpecialKind>,
        params: GateParams,
        ports: Vec<Port>,
        #[serde(rename = "inputSignals")]
        input_signals: IndexMap<PortId, TransportSignal>,
        #[serde(rename = "outputSignals")]
        output_signals: IndexMap<PortId, TransportSignal>,
    },
    #[serde(rename = "addLink")]
    AddLink {
        graph: GraphId,
        link: LinkId,
        source: Endpoint,
        target: Endpoint,
    },
    #[serde(rename = "addSubcircuit")]
    AddSubcircuit {
        graph: GraphId,
        gate: GateId,
        subgraph: GraphId,
        iomap: IndexMap<PortId, GateId>,
    },
    #[serde(rename = "removeGate")]
    RemoveGate { graph: GraphId, gate: GateId },
    #[serde(rename = "removeLink")]
    RemoveLink { graph: GraphId, link: LinkId },
    #[serde(rename = "observeGraph")]
    ObserveGraph { graph: GraphId },
    #[serde(rename = "unobserveGraph")]
    UnobserveGraph { graph: GraphId },
    #[serde(rename = "changeInput")]
    ChangeInput {
        graph: GraphId,
        gate: GateId,
        signal: TransportSignal,
    },
}
