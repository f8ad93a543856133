//! The engine's error taxonomy, as a `thiserror` enum. Every variant here is a
//! programmer error in the command stream — an unknown id, a duplicate, a
//! dangling reference — reported before any state is mutated so the host can
//! discard the offending command and keep running rather than treat the whole
//! engine as corrupt.

use crate::graph::{GateId, GraphId, LinkId, PortId};

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum EngineError {
    #[error("graph {0} does not exist")]
    UnknownGraph(GraphId),

    #[error("graph {0} already exists")]
    DuplicateGraph(GraphId),

    #[error("gate {gate} does not exist in graph {graph}")]
    UnknownGate { graph: GraphId, gate: GateId },

    #[error("gate {gate} already exists in graph {graph}")]
    DuplicateGate { graph: GraphId, gate: GateId },

    #[error("link {link} does not exist in graph {graph}")]
    UnknownLink { graph: GraphId, link: LinkId },

    #[error("link {link} already exists in graph {graph}")]
    DuplicateLink { graph: GraphId, link: LinkId },

    #[error("no cell type registered under {0:?}")]
    UnknownCellType(String),

    #[error("gate {gate} has no port {port}")]
    UnknownPort { gate: GateId, port: PortId },

    #[error("port {port} on gate {gate} is not an {expected:?} port")]
    DirectionMismatch {
        gate: GateId,
        port: PortId,
        expected: crate::graph::Direction,
    },
}
