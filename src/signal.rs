//! Three-valued logic signals.
//!
//! [`Signal`] is the minimal opaque value the engine and a cell library need
//! to agree on: a gate's pins carry it, a cell's `operation` computes it, and
//! the update batcher reports it. Internally it packs one bit of value and one
//! bit of "is this bit unknown" per logical bit — two parallel bit vectors
//! rather than a single vector of an enum, so a whole signal's worth of bits
//! can be tested for "any unknown" or combined with bitwise ops in one shot.

use bitvec::prelude::*;

/// A single three-valued logic level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trit {
    Zero,
    One,
    Unknown,
}

impl Trit {
    fn from_bits(value: bool, unknown: bool) -> Trit {
        if unknown {
            Trit::Unknown
        } else if value {
            Trit::One
        } else {
            Trit::Zero
        }
    }
}

/// An opaque, fixed-width, three-valued (0/1/X) bit vector.
///
/// Equality is by content: two signals of different width are never equal, and an
/// unknown bit only equals another unknown bit regardless of its underlying value
/// bit (the value bit behind an `X` is not semantically meaningful, so it is
/// normalized to `0` by every constructor here to keep `PartialEq` content-honest).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Signal {
    value: BitVec<u8, Lsb0>,
    unknown: BitVec<u8, Lsb0>,
}

impl Signal {
    /// A signal of `width` bits, all unknown (`X`). This is the value delivered to
    /// an input whose link has just been removed.
    pub fn undefined(width: u32) -> Signal {
        Signal {
            value: bitvec![u8, Lsb0; 0; width as usize],
            unknown: bitvec![u8, Lsb0; 1; width as usize],
        }
    }

    /// A fully-defined signal built from known bits, least-significant bit first.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Signal {
        let value: BitVec<u8, Lsb0> = bits.into_iter().collect();
        let unknown = bitvec![u8, Lsb0; 0; value.len()];
        Signal { value, unknown }
    }

    /// A single-bit defined signal, for the common case of boolean-valued ports.
    pub fn bit(value: bool) -> Signal {
        Signal::from_bits(std::iter::once(value))
    }

    /// A signal built trit-by-trit, least-significant first. Unlike
    /// [`Signal::from_bits`], this can represent mixed known/unknown widths.
    pub fn from_trits<I: IntoIterator<Item = Trit>>(trits: I) -> Signal {
        let trits: Vec<Trit> = trits.into_iter().collect();
        let mut value = bitvec![u8, Lsb0; 0; trits.len()];
        let mut unknown = bitvec![u8, Lsb0; 0; trits.len()];
        for (i, trit) in trits.into_iter().enumerate() {
            match trit {
                Trit::Zero => {}
                Trit::One => value.set(i, true),
                Trit::Unknown => unknown.set(i, true),
            }
        }
        Signal { value, unknown }
    }

    pub fn width(&self) -> u32 {
        self.value.len() as u32
    }

    pub fn is_fully_defined(&self) -> bool {
        !self.unknown.any()
    }

    /// The trit at `index`, least-significant first. Panics if `index >= width()`.
    pub fn trit(&self, index: u32) -> Trit {
        Trit::from_bits(self.value[index as usize], self.unknown[index as usize])
    }

    pub fn trits(&self) -> impl Iterator<Item = Trit> + '_ {
        (0..self.width()).map(move |i| self.trit(i))
    }

    /// Content equality: two signals are equal iff every trit matches.
    pub fn equals(&self, other: &Signal) -> bool {
        self == other
    }
}

#[cfg(feature = "serde")]
mod transport {
    use super::{Signal, Trit};
    use serde::{Deserialize, Serialize};

    /// A transport-friendly form: a sequence of trits that round-trips through
    /// a host's wire format without exposing the internal bit-packed
    /// representation.
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct TransportSignal(Vec<TransportTrit>);

    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    enum TransportTrit {
        #[serde(rename = "0")]
        Zero,
        #[serde(rename = "1")]
        One,
        X,
    }

    impl From<Trit> for TransportTrit {
        fn from(t: Trit) -> Self {
            match t {
                Trit::Zero => TransportTrit::Zero,
                Trit::One => TransportTrit::One,
                Trit::Unknown => TransportTrit::X,
            }
        }
    }

    impl From<TransportTrit> for Trit {
        fn from(t: TransportTrit) -> Self {
            match t {
                TransportTrit::Zero => Trit::Zero,
                TransportTrit::One => Trit::One,
                TransportTrit::X => Trit::Unknown,
            }
        }
    }

    impl From<&Signal> for TransportSignal {
        fn from(sig: &Signal) -> Self {
            TransportSignal(sig.trits().map(TransportTrit::from).collect())
        }
    }

    impl From<TransportSignal> for Signal {
        fn from(t: TransportSignal) -> Self {
            Signal::from_trits(t.0.into_iter().map(Trit::from))
        }
    }
}
#[cfg(feature = "serde")]
pub use transport::TransportSignal;
