//! `circuitry` — an event-driven digital-logic circuit simulation engine.
//!
//! This crate is the core engine only: a tick-ordered scheduler, a
//! signal-propagation protocol across gate ports and subcircuit boundaries,
//! and an update-batching pipeline. The cell library (gate types), the
//! transport that delivers commands and receives update messages, persistence,
//! UI, netlist parsing and waveform rendering are all host concerns this crate
//! does not provide — see [`cell::Cell`] for the dispatch interface a cell
//! library implements, and [`command::Command`] / [`message::UpdateMessage`]
//! (behind the `serde` feature) for the wire shapes a transport carries.
//!
//! This library does not install a [`tracing`] subscriber; hosts that want the
//! `trace!`/`debug!`/`warn!` spans emitted by [`scheduler`], [`propagator`],
//! [`engine`] and [`batcher`] should set one up themselves.

pub mod batcher;
pub mod cell;
pub mod cells;
#[cfg(feature = "serde")]
pub mod command;
pub mod data_structures;
pub mod driver;
pub mod engine;
pub mod error;
pub mod graph;
pub mod message;
pub mod propagator;
pub mod scheduler;
pub mod signal;

pub use cell::{Cell, CellOutputs, SpecialKind};
pub use driver::{Driver, DriverMode};
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use message::{GateUpdate, UpdateMessage};
pub use scheduler::Scheduler;
pub use signal::{Signal, Trit};

#[cfg(feature = "serde")]
pub use command::Command;
