//! Built-in cells: test fixtures and a worked example of the [`Cell`] contract,
//! not a product gate library. Each boolean gate is expressed as a truth table
//! over [`Trit`] rather than `bool`, so a gate whose inputs haven't settled yet
//! produces `X` instead of a meaningless guess.

use indexmap::IndexMap;

use crate::cell::{Cell, CellOutputs};
use crate::graph::PortId;
use crate::signal::{Signal, Trit};

const IN: &str = "in";
const IN_A: &str = "a";
const IN_B: &str = "b";
const OUT: &str = "out";

fn bitwise<F: Fn(Trit, Trit) -> Trit>(a: &Signal, b: &Signal, f: F) -> Signal {
    debug_assert_eq!(a.width(), b.width(), "bitwise cell inputs of mismatched width");
    Signal::from_trits(a.trits().zip(b.trits()).map(|(x, y)| f(x, y)))
}

fn and_trit(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::Zero, _) | (_, Trit::Zero) => Trit::Zero,
        (Trit::One, Trit::One) => Trit::One,
        _ => Trit::Unknown,
    }
}

fn or_trit(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::One, _) | (_, Trit::One) => Trit::One,
        (Trit::Zero, Trit::Zero) => Trit::Zero,
        _ => Trit::Unknown,
    }
}

fn xor_trit(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::Unknown, _) | (_, Trit::Unknown) => Trit::Unknown,
        (x, y) => {
            if x == y {
                Trit::Zero
            } else {
                Trit::One
            }
        }
    }
}

fn invert_trit(t: Trit) -> Trit {
    match t {
        Trit::Zero => Trit::One,
        Trit::One => Trit::Zero,
        Trit::Unknown => Trit::Unknown,
    }
}

fn invert(sig: &Signal) -> Signal {
    Signal::from_trits(sig.trits().map(invert_trit))
}

macro_rules! two_input_cell {
    ($ty:ident, $combine:expr, $negate:expr) => {
        #[derive(Debug, Default)]
        pub struct $ty;

        impl Cell for $ty {
            fn type_name(&self) -> &str {
                stringify!($ty)
            }
            fn operation(&mut self, inputs: &IndexMap<PortId, Signal>) -> CellOutputs {
                let a = &inputs[&PortId::from(IN_A)];
                let b = &inputs[&PortId::from(IN_B)];
                let combined = bitwise(a, b, $combine);
                let result = if $negate { invert(&combined) } else { combined };
                let mut outputs = IndexMap::new();
                outputs.insert(PortId::from(OUT), result);
                CellOutputs::new(outputs)
            }
        }
    };
}

two_input_cell!(And, and_trit, false);
two_input_cell!(Nand, and_trit, true);
two_input_cell!(Or, or_trit, false);
two_input_cell!(Nor, or_trit, true);
two_input_cell!(Xor, xor_trit, false);
two_input_cell!(Xnor, xor_trit, true);

/// Single-input inverter.
#[derive(Debug, Default)]
pub struct Not;

impl Cell for Not {
    fn type_name(&self) -> &str {
        "Not"
    }
    fn operation(&mut self, inputs: &IndexMap<PortId, Signal>) -> CellOutputs {
        let a = &inputs[&PortId::from(IN)];
        let mut outputs = IndexMap::new();
        outputs.insert(PortId::from(OUT), invert(a));
        CellOutputs::new(outputs)
    }
}

/// A self-oscillating cell: on every evaluation it toggles its output and
/// requests re-enqueue, so the scheduler keeps bringing it back every
/// `propagation` ticks without anything else driving it.
#[derive(Debug)]
pub struct Clock {
    state: bool,
}

impl Clock {
    pub fn new(initial: bool) -> Self {
        Self { state: initial }
    }
}

impl Cell for Clock {
    fn type_name(&self) -> &str {
        "Clock"
    }
    fn operation(&mut self, _inputs: &IndexMap<PortId, Signal>) -> CellOutputs {
        self.state = !self.state;
        let mut outputs = IndexMap::new();
        outputs.insert(PortId::from(OUT), Signal::bit(self.state));
        CellOutputs::reenqueuing(outputs)
    }
}
