// src/operations/measurement.rs

use super::{Gate, Operation};
use crate::core::{InterpError, Result, Wire};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Single-wire Pauli observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

/// Tensor product of Paulis, one per measured wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PauliWord(pub Vec<Pauli>);

impl PauliWord {
    /// `Z` on a single wire, the most common observable.
    pub fn z() -> Self {
        PauliWord(vec![Pauli::Z])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PauliWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.0 {
            write!(f, "{:?}", p)?;
        }
        Ok(())
    }
}

/// The statistic a terminal measurement returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// Expectation value of a Pauli word.
    Expval(PauliWord),
    /// Variance of a Pauli word.
    Var(PauliWord),
    /// Computational-basis probabilities of the measured wires.
    Probs,
    /// The full state vector. Analytic mode only.
    State,
    /// Raw computational-basis samples. Finite shots only.
    Sample,
    /// Histogram of bitstrings. Finite shots only.
    Counts,
}

impl MeasurementKind {
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementKind::Expval(_) => "expval",
            MeasurementKind::Var(_) => "var",
            MeasurementKind::Probs => "probs",
            MeasurementKind::State => "state",
            MeasurementKind::Sample => "sample",
            MeasurementKind::Counts => "counts",
        }
    }
}

/// A terminal measurement bound to concrete wires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementProcess {
    kind: MeasurementKind,
    wires: Vec<Wire>,
}

impl MeasurementProcess {
    /// Binds a measurement kind to wires.
    ///
    /// Empty `wires` means "all wires" for `Probs`, `Sample` and `Counts`.
    ///
    /// # Errors
    /// `InvalidMeasurement` if wires repeat, if a Pauli word does not have
    /// exactly one entry per wire, or if `State` is given wires.
    pub fn new(kind: MeasurementKind, wires: Vec<Wire>) -> Result<Self> {
        let unique: HashSet<&Wire> = wires.iter().collect();
        if unique.len() != wires.len() {
            return Err(InterpError::invalid_measurement(format!(
                "{} measured on repeated wires {:?}",
                kind.name(),
                wires
            )));
        }
        match &kind {
            MeasurementKind::Expval(word) | MeasurementKind::Var(word) => {
                if word.is_empty() || word.len() != wires.len() {
                    return Err(InterpError::invalid_measurement(format!(
                        "observable {} needs one wire per factor, got {} wire(s)",
                        word,
                        wires.len()
                    )));
                }
            }
            MeasurementKind::State if !wires.is_empty() => {
                return Err(InterpError::invalid_measurement("state takes no wires"));
            }
            _ => {}
        }
        Ok(Self { kind, wires })
    }

    pub fn kind(&self) -> &MeasurementKind {
        &self.kind
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Wires to read, with "all wires" expanded for an `num_wires` register.
    pub fn resolved_wires(&self, num_wires: usize) -> Vec<Wire> {
        if self.wires.is_empty() {
            (0..num_wires).map(Wire).collect()
        } else {
            self.wires.clone()
        }
    }

    /// Returns a copy with every wire found in `wire_map` replaced.
    pub fn map_wires(&self, wire_map: &HashMap<Wire, Wire>) -> Self {
        Self {
            kind: self.kind.clone(),
            wires: self.wires.iter().map(|w| *wire_map.get(w).unwrap_or(w)).collect(),
        }
    }

    /// Rotations that take the observable into the computational basis.
    pub fn diagonalizing_gates(&self) -> Result<Vec<Operation>> {
        let word = match &self.kind {
            MeasurementKind::Expval(word) | MeasurementKind::Var(word) => word,
            _ => return Ok(Vec::new()),
        };
        let mut gates = Vec::new();
        for (pauli, wire) in word.0.iter().zip(&self.wires) {
            match pauli {
                Pauli::I | Pauli::Z => {}
                Pauli::X => gates.push(Operation::new(Gate::Hadamard, vec![], vec![*wire])?),
                Pauli::Y => {
                    gates.push(Operation::new(Gate::PauliZ, vec![], vec![*wire])?);
                    gates.push(Operation::new(Gate::S, vec![], vec![*wire])?);
                    gates.push(Operation::new(Gate::Hadamard, vec![], vec![*wire])?);
                }
            }
        }
        Ok(gates)
    }

    /// Eigenvalue of the observable for an outcome over the measured wires.
    ///
    /// `outcome` packs the measured bits with the first wire most significant.
    /// Non-observable kinds return `1.0`.
    pub fn eigenvalue(&self, outcome: usize) -> f64 {
        let word = match &self.kind {
            MeasurementKind::Expval(word) | MeasurementKind::Var(word) => word,
            _ => return 1.0,
        };
        let n = word.len();
        word.0
            .iter()
            .enumerate()
            .filter(|(_, p)| **p != Pauli::I)
            .fold(1.0, |acc, (j, _)| if (outcome >> (n - 1 - j)) & 1 == 1 { -acc } else { acc })
    }
}

impl fmt::Display for MeasurementProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wires: Vec<String> = self.wires.iter().map(|w| w.0.to_string()).collect();
        match &self.kind {
            MeasurementKind::Expval(word) | MeasurementKind::Var(word) => {
                write!(f, "{}({}) [{}]", self.kind.name(), word, wires.join(", "))
            }
            _ => write!(f, "{} [{}]", self.kind.name(), wires.join(", ")),
        }
    }
}

/// A mid-computation measurement of one wire.
///
/// Used as the key of a mid-measurement record, so it is hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidMeasure {
    pub wire: Wire,
    /// Reset the wire to `|0>` after measuring `1`.
    pub reset: bool,
    /// Keep only the branch with this outcome.
    pub postselect: Option<u8>,
}
