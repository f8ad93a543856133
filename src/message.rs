//! Update messages: what the batcher emits to the host.

use indexmap::IndexMap;

use crate::graph::{GateId, GraphId, PortId};
use crate::signal::Signal;

/// One gate's worth of dirty output ports, resolved to their current value at
/// flush time.
#[derive(Clone, Debug, PartialEq)]
pub struct GateUpdate {
    pub graph: GraphId,
    pub gate: GateId,
    pub ports: IndexMap<PortId, Signal>,
}

/// Serializes to `{ type: "update", args: [tick, hasPendingEvents, updates] }`
/// under the `serde` feature (see the `wire` submodule below).
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateMessage {
    pub tick: i64,
    pub has_pending_events: bool,
    pub updates: Vec<GateUpdate>,
}

#[cfg(feature = "serde")]
mod wire {
    use super::{GateUpdate, UpdateMessage};
    use crate::signal::TransportSignal;
    use serde::ser::{SerializeStruct, SerializeTuple};
    use serde::{Serialize, Serializer};

    impl Serialize for GateUpdate {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let ports: indexmap::IndexMap<_, TransportSignal> =
                self.ports.iter().map(|(p, s)| (p.clone(), TransportSignal::from(s))).collect();
            let mut tup = serializer.serialize_tuple(3)?;
            tup.serialize_element(&self.graph)?;
            tup.serialize_element(&self.gate)?;
            tup.serialize_element(&ports)?;
            tup.end()
        }
    }

    impl Serialize for UpdateMessage {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut st = serializer.serialize_struct("UpdateMessage", 2)?;
            st.serialize_field("type", "update")?;
            st.serialize_field("args", &(self.tick, self.has_pending_events, &self.updates))?;
            st.end()
        }
    }
}
