//! Identifiers and value types of the data model.

use std::fmt::{self, Display, Formatter};

macro_rules! string_id {
    ($name:ident) => {
        /// A host-assigned identifier. Newtype over `String` so a stray `GateId`
        /// can't be passed where a `GraphId` or `LinkId` is expected.
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(s)
            }
        }
        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                Ok(Self(String::deserialize(d)?))
            }
        }
    };
}

string_id!(GraphId);
string_id!(GateId);
string_id!(LinkId);
string_id!(PortId);

/// A gate identity that is unique across the whole engine, not just within one
/// graph. The scheduler and update batcher key on this rather than on `GateId`
/// alone because the same `GateId` may be reused across distinct graphs (a
/// top-level graph and a subcircuit's subgraph, for instance).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GlobalGateId {
    pub graph: GraphId,
    pub gate: GateId,
}

impl GlobalGateId {
    pub fn new(graph: GraphId, gate: GateId) -> Self {
        Self { graph, gate }
    }
}

impl Display for GlobalGateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.graph, self.gate)
    }
}

/// The direction of a [`Port`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    In,
    Out,
}

/// A named pin of a gate. Immutable once the owning gate is created.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Port {
    pub id: PortId,
    pub dir: Direction,
    pub bits: u32,
}

impl Port {
    pub fn new(id: impl Into<PortId>, dir: Direction, bits: u32) -> Self {
        Self {
            id: id.into(),
            dir,
            bits,
        }
    }
}

/// One endpoint of a [`Link`]: a `(gate, port)` pair within a single graph.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub gate: GateId,
    pub port: PortId,
}

impl Endpoint {
    pub fn new(gate: impl Into<GateId>, port: impl Into<PortId>) -> Self {
        Self {
            gate: gate.into(),
            port: port.into(),
        }
    }
}

/// A directed connection from one gate's out-port to another gate's in-port.
/// Both endpoints must exist in the same graph; the core does not
/// validate or rewidth beyond that — the cell library is responsible for
/// declaring compatible ports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub source: Endpoint,
    pub target: Endpoint,
}
