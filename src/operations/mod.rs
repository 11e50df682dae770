// src/operations/mod.rs

//! Quantum operations and measurement descriptions.
//!
//! An [`Operation`] is a fully resolved gate application: the gate kind, its
//! real parameters and the wires it acts on. Programs refer to gates through
//! [`Gate`] and supply parameters and wires at run time; the interpreter
//! assembles an `Operation` from the resolved inputs before handing it to the
//! simulation engine.

mod measurement;

pub use measurement::{MeasurementKind, MeasurementProcess, MidMeasure, Pauli, PauliWord};

use crate::core::{InterpError, Result, Wire};
use num_complex::Complex;
use num_traits::{One, Zero};
use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

/// Matrix of a single-wire gate.
pub type Matrix2 = [[Complex<f64>; 2]; 2];
/// Matrix of a two-wire gate in the `|first, second>` basis.
pub type Matrix4 = [[Complex<f64>; 4]; 4];

/// The gates understood by the simulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Identity,
    PauliX,
    PauliY,
    PauliZ,
    Hadamard,
    S,
    T,
    /// Square root of `PauliX`.
    SX,
    RX,
    RY,
    RZ,
    /// `diag(1, e^{iφ})`
    PhaseShift,
    CNOT,
    CZ,
    SWAP,
    /// Controlled `RZ`, control first.
    CRZ,
}

impl Gate {
    /// Number of real parameters the gate takes.
    pub fn num_params(&self) -> usize {
        match self {
            Gate::RX | Gate::RY | Gate::RZ | Gate::PhaseShift | Gate::CRZ => 1,
            _ => 0,
        }
    }

    /// Number of wires the gate acts on.
    pub fn num_wires(&self) -> usize {
        match self {
            Gate::CNOT | Gate::CZ | Gate::SWAP | Gate::CRZ => 2,
            _ => 1,
        }
    }

    /// Short mnemonic used when printing programs.
    pub fn name(&self) -> &'static str {
        match self {
            Gate::Identity => "I",
            Gate::PauliX => "X",
            Gate::PauliY => "Y",
            Gate::PauliZ => "Z",
            Gate::Hadamard => "H",
            Gate::S => "S",
            Gate::T => "T",
            Gate::SX => "SX",
            Gate::RX => "RX",
            Gate::RY => "RY",
            Gate::RZ => "RZ",
            Gate::PhaseShift => "PhaseShift",
            Gate::CNOT => "CNOT",
            Gate::CZ => "CZ",
            Gate::SWAP => "SWAP",
            Gate::CRZ => "CRZ",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A gate together with concrete parameters and wires.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    gate: Gate,
    params: Vec<f64>,
    wires: Vec<Wire>,
}

/// The unitary of an [`Operation`], sized by the number of wires it touches.
#[derive(Debug, Clone, PartialEq)]
pub enum GateMatrix {
    Single(Matrix2),
    Two(Matrix4),
}

impl Operation {
    /// Builds an operation, checking parameter and wire counts.
    ///
    /// # Errors
    /// `InvalidOperation` if counts do not match the gate or a wire repeats.
    pub fn new(gate: Gate, params: Vec<f64>, wires: Vec<Wire>) -> Result<Self> {
        if params.len() != gate.num_params() {
            return Err(InterpError::invalid_operation(format!(
                "{} takes {} parameter(s), got {}",
                gate,
                gate.num_params(),
                params.len()
            )));
        }
        if wires.len() != gate.num_wires() {
            return Err(InterpError::invalid_operation(format!(
                "{} acts on {} wire(s), got {}",
                gate,
                gate.num_wires(),
                wires.len()
            )));
        }
        if wires.len() == 2 && wires[0] == wires[1] {
            return Err(InterpError::invalid_operation(format!(
                "{} requires distinct wires, got {} twice",
                gate, wires[0]
            )));
        }
        Ok(Self { gate, params, wires })
    }

    /// Convenience constructor for parameter-free gates.
    pub fn fixed(gate: Gate, wires: &[usize]) -> Result<Self> {
        Self::new(gate, Vec::new(), wires.iter().copied().map(Wire).collect())
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Returns a copy with every wire found in `wire_map` replaced.
    /// Wires absent from the map are kept.
    pub fn map_wires(&self, wire_map: &HashMap<Wire, Wire>) -> Self {
        Self {
            gate: self.gate,
            params: self.params.clone(),
            wires: self.wires.iter().map(|w| *wire_map.get(w).unwrap_or(w)).collect(),
        }
    }

    /// The unitary matrix of this operation.
    pub fn matrix(&self) -> GateMatrix {
        let zero = Complex::zero();
        let one = Complex::one();
        let i = Complex::i();
        let theta = self.params.first().copied().unwrap_or(0.0);
        let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());

        match self.gate {
            Gate::Identity => GateMatrix::Single([[one, zero], [zero, one]]),
            Gate::PauliX => GateMatrix::Single([[zero, one], [one, zero]]),
            Gate::PauliY => GateMatrix::Single([[zero, -i], [i, zero]]),
            Gate::PauliZ => GateMatrix::Single([[one, zero], [zero, -one]]),
            Gate::Hadamard => {
                let h = Complex::new(FRAC_1_SQRT_2, 0.0);
                GateMatrix::Single([[h, h], [h, -h]])
            }
            Gate::S => GateMatrix::Single([[one, zero], [zero, i]]),
            Gate::T => GateMatrix::Single([[one, zero], [zero, Complex::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)]]),
            Gate::SX => GateMatrix::Single([
                [Complex::new(0.5, 0.5), Complex::new(0.5, -0.5)],
                [Complex::new(0.5, -0.5), Complex::new(0.5, 0.5)],
            ]),
            Gate::RX => GateMatrix::Single([
                [Complex::new(c, 0.0), Complex::new(0.0, -s)],
                [Complex::new(0.0, -s), Complex::new(c, 0.0)],
            ]),
            Gate::RY => GateMatrix::Single([
                [Complex::new(c, 0.0), Complex::new(-s, 0.0)],
                [Complex::new(s, 0.0), Complex::new(c, 0.0)],
            ]),
            Gate::RZ => GateMatrix::Single([
                [Complex::new(c, -s), zero],
                [zero, Complex::new(c, s)],
            ]),
            Gate::PhaseShift => GateMatrix::Single([
                [one, zero],
                [zero, Complex::new(theta.cos(), theta.sin())],
            ]),
            Gate::CNOT => GateMatrix::Two([
                [one, zero, zero, zero],
                [zero, one, zero, zero],
                [zero, zero, zero, one],
                [zero, zero, one, zero],
            ]),
            Gate::CZ => GateMatrix::Two([
                [one, zero, zero, zero],
                [zero, one, zero, zero],
                [zero, zero, one, zero],
                [zero, zero, zero, -one],
            ]),
            Gate::SWAP => GateMatrix::Two([
                [one, zero, zero, zero],
                [zero, zero, one, zero],
                [zero, one, zero, zero],
                [zero, zero, zero, one],
            ]),
            Gate::CRZ => GateMatrix::Two([
                [one, zero, zero, zero],
                [zero, one, zero, zero],
                [zero, zero, Complex::new(c, -s), zero],
                [zero, zero, zero, Complex::new(c, s)],
            ]),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gate)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| format!("{:.4}", p)).collect();
            write!(f, "({})", params.join(", "))?;
        }
        let wires: Vec<String> = self.wires.iter().map(|w| w.0.to_string()).collect();
        write!(f, " [{}]", wires.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_param_count() {
        let err = Operation::new(Gate::RX, vec![], vec![Wire(0)]).unwrap_err();
        assert!(matches!(err, InterpError::InvalidOperation { .. }));
    }

    #[test]
    fn new_rejects_repeated_wire() {
        assert!(Operation::fixed(Gate::CNOT, &[1, 1]).is_err());
    }

    #[test]
    fn map_wires_keeps_unmapped_wires() {
        let op = Operation::fixed(Gate::CNOT, &[0, 1]).unwrap();
        let map = HashMap::from([(Wire(0), Wire(3))]);
        assert_eq!(op.map_wires(&map).wires(), &[Wire(3), Wire(1)]);
        // the original is untouched
        assert_eq!(op.wires(), &[Wire(0), Wire(1)]);
    }

    #[test]
    fn display_lists_params_and_wires() {
        let op = Operation::new(Gate::RY, vec![0.5], vec![Wire(2)]).unwrap();
        assert_eq!(op.to_string(), "RY(0.5000) [2]");
    }
}
