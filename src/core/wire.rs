// src/core/wire.rs

use std::fmt;

/// Label of a single wire (qubit) in the simulated register.
///
/// Wires are addressed by position: wire `0` is the most significant bit of
/// a basis-state index, wire `n - 1` the least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wire(pub usize);

impl From<usize> for Wire {
    fn from(index: usize) -> Self {
        Wire(index)
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire({})", self.0)
    }
}
