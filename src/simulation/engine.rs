// src/simulation/engine.rs

//! Dense state-vector kernels: initial state, gate application and
//! mid-computation measurement.

use super::capture;
use crate::core::constants::AMPLITUDE_TOLERANCE;
use crate::core::{InterpError, PrngKey, Result, StateVector, Wire};
use crate::operations::{GateMatrix, Matrix2, Matrix4, MidMeasure, Operation};
use num_complex::Complex;
use num_traits::Zero;
use rand::distr::{Distribution, StandardUniform};
use std::collections::HashMap;

/// Outcomes of mid-computation measurements, keyed by the measurement.
///
/// Lives only for the duration of one handler call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidMeasureRecord {
    outcomes: HashMap<MidMeasure, i64>,
}

impl MidMeasureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, mp: MidMeasure, outcome: i64) {
        self.outcomes.insert(mp, outcome);
    }

    /// The sampled outcome of `mp`: `0`, `1`, or `-1` when postselection
    /// discarded the branch.
    pub fn get(&self, mp: &MidMeasure) -> Option<i64> {
        self.outcomes.get(mp).copied()
    }
}

/// Allocates the ground state `|0...0>` for `num_wires` wires.
pub fn create_initial_state(num_wires: usize) -> Result<StateVector> {
    StateVector::zero(num_wires)
}

/// Applies a unitary operation to `state` in place.
///
/// # Errors
/// `InvalidOperation` if the operation addresses a wire outside the register.
pub fn apply_operation(op: &Operation, state: &mut StateVector) -> Result<()> {
    for wire in op.wires() {
        check_wire(*wire, state)?;
    }
    capture::observe(op);

    match op.matrix() {
        GateMatrix::Single(matrix) => apply_single_wire_gate(state, op.wires()[0].0, &matrix),
        GateMatrix::Two(matrix) => apply_two_wire_gate(state, op.wires()[0].0, op.wires()[1].0, &matrix),
    }
    Ok(())
}

/// Measures one wire in the computational basis, collapsing `state`.
///
/// The outcome is drawn with `key` and stored in `record`. With `reset`, a
/// `1` outcome is flipped back to `|0>`. With `postselect`, an outcome that
/// differs from the requested one is recorded as `-1` and the state becomes
/// the zero vector.
///
/// # Errors
/// * `InvalidOperation` for a wire outside the register.
/// * `InvalidState` if the state has (numerically) zero norm.
pub fn apply_mid_measure(
    mp: &MidMeasure,
    state: &mut StateVector,
    record: &mut MidMeasureRecord,
    key: PrngKey,
) -> Result<()> {
    check_wire(mp.wire, state)?;
    let mask = 1usize << state.bit_position(mp.wire.0);

    let norm = state.norm_sqr();
    if norm < AMPLITUDE_TOLERANCE {
        return Err(InterpError::InvalidState {
            message: format!("cannot measure {} of a discarded (zero-norm) state", mp.wire),
        });
    }
    let p_one: f64 = state
        .amplitudes()
        .iter()
        .enumerate()
        .filter(|(idx, _)| idx & mask != 0)
        .map(|(_, amp)| amp.norm_sqr())
        .sum::<f64>()
        / norm;

    let draw: f64 = StandardUniform.sample(&mut key.rng());
    let outcome: u8 = if draw < p_one { 1 } else { 0 };

    if let Some(postselect) = mp.postselect {
        if postselect != outcome {
            record.record(*mp, -1);
            state.amplitudes_mut().iter_mut().for_each(|amp| *amp = Complex::zero());
            return Ok(());
        }
    }

    let p_outcome = if outcome == 1 { p_one } else { 1.0 - p_one };
    let scale = 1.0 / (p_outcome * norm).sqrt();
    for (idx, amp) in state.amplitudes_mut().iter_mut().enumerate() {
        let bit = u8::from(idx & mask != 0);
        if bit == outcome {
            *amp *= scale;
        } else {
            *amp = Complex::zero();
        }
    }

    if mp.reset && outcome == 1 {
        flip_wire(state, mask);
    }

    record.record(*mp, i64::from(outcome));
    Ok(())
}

fn check_wire(wire: Wire, state: &StateVector) -> Result<()> {
    if wire.0 >= state.num_wires() {
        return Err(InterpError::invalid_operation(format!(
            "{} is outside the {}-wire register",
            wire,
            state.num_wires()
        )));
    }
    Ok(())
}

/// Swaps the amplitudes of every basis pair differing in the `mask` bit.
fn flip_wire(state: &mut StateVector, mask: usize) {
    let amps = state.amplitudes_mut();
    for i0 in 0..amps.len() {
        if i0 & mask == 0 {
            amps.swap(i0, i0 | mask);
        }
    }
}

/// Applies a 2x2 matrix to one wire.
/// Iterates over pairs of basis states differing only at the target bit.
fn apply_single_wire_gate(state: &mut StateVector, wire: usize, matrix: &Matrix2) {
    let mask = 1usize << state.bit_position(wire);
    let amps = state.amplitudes_mut();

    for i0 in 0..amps.len() {
        if i0 & mask != 0 {
            continue;
        }
        let i1 = i0 | mask;
        let psi_0 = amps[i0];
        let psi_1 = amps[i1];
        amps[i0] = matrix[0][0] * psi_0 + matrix[0][1] * psi_1;
        amps[i1] = matrix[1][0] * psi_0 + matrix[1][1] * psi_1;
    }
}

/// Applies a 4x4 matrix to two wires.
/// The matrix is indexed in the `|first, second>` basis: `|00>, |01>, |10>, |11>`.
fn apply_two_wire_gate(state: &mut StateVector, first: usize, second: usize, matrix: &Matrix4) {
    let first_mask = 1usize << state.bit_position(first);
    let second_mask = 1usize << state.bit_position(second);
    let amps = state.amplitudes_mut();

    for base in 0..amps.len() {
        if base & (first_mask | second_mask) != 0 {
            continue;
        }
        let indices = [
            base,
            base | second_mask,
            base | first_mask,
            base | first_mask | second_mask,
        ];
        let psi = indices.map(|idx| amps[idx]);

        for (row, idx) in indices.iter().enumerate() {
            amps[*idx] = (0..4).fold(Complex::zero(), |acc, col| acc + matrix[row][col] * psi[col]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-9;

    /// Asserts that two complex state vectors are approximately equal component-wise.
    fn assert_complex_vec_approx_equal(actual: &[Complex<f64>], expected: &[Complex<f64>], context: &str) {
        assert_eq!(actual.len(), expected.len(), "Vector length mismatch - {}", context);
        for i in 0..actual.len() {
            let dist_sq = (actual[i] - expected[i]).norm_sqr();
            assert!(
                dist_sq < TEST_TOLERANCE * TEST_TOLERANCE,
                "Vector mismatch at index {} - Actual: {}, Expected: {}, Context: {}",
                i, actual[i], expected[i], context
            );
        }
    }

    fn c(re: f64) -> Complex<f64> {
        Complex::new(re, 0.0)
    }

    #[test]
    fn hadamard_then_cnot_makes_bell_state() -> Result<()> {
        let mut state = create_initial_state(2)?;
        apply_operation(&Operation::fixed(Gate::Hadamard, &[0])?, &mut state)?;
        apply_operation(&Operation::fixed(Gate::CNOT, &[0, 1])?, &mut state)?;
        assert_complex_vec_approx_equal(
            state.amplitudes(),
            &[c(FRAC_1_SQRT_2), c(0.0), c(0.0), c(FRAC_1_SQRT_2)],
            "H(0) CNOT(0,1) on |00>",
        );
        Ok(())
    }

    #[test]
    fn wire_zero_is_most_significant() -> Result<()> {
        let mut state = create_initial_state(3)?;
        apply_operation(&Operation::fixed(Gate::PauliX, &[0])?, &mut state)?;
        assert_eq!(state.amplitudes()[0b100], c(1.0));
        Ok(())
    }

    #[test]
    fn cnot_respects_control_order() -> Result<()> {
        // |01> with control on wire 1 flips wire 0 -> |11>
        let mut state = create_initial_state(2)?;
        apply_operation(&Operation::fixed(Gate::PauliX, &[1])?, &mut state)?;
        apply_operation(&Operation::fixed(Gate::CNOT, &[1, 0])?, &mut state)?;
        assert_complex_vec_approx_equal(state.amplitudes(), &[c(0.0), c(0.0), c(0.0), c(1.0)], "CNOT(1,0) on |01>");
        Ok(())
    }

    #[test]
    fn operation_outside_register_is_rejected() -> Result<()> {
        let mut state = create_initial_state(1)?;
        let err = apply_operation(&Operation::fixed(Gate::PauliX, &[1])?, &mut state).unwrap_err();
        assert!(matches!(err, InterpError::InvalidOperation { .. }));
        Ok(())
    }

    #[test]
    fn mid_measure_of_basis_state_is_deterministic() -> Result<()> {
        let mut state = create_initial_state(2)?;
        apply_operation(&Operation::fixed(Gate::PauliX, &[1])?, &mut state)?;
        let mp = MidMeasure { wire: Wire(1), reset: false, postselect: None };
        let mut record = MidMeasureRecord::new();
        apply_mid_measure(&mp, &mut state, &mut record, PrngKey::new(3))?;
        assert_eq!(record.get(&mp), Some(1));
        assert_complex_vec_approx_equal(state.amplitudes(), &[c(0.0), c(1.0), c(0.0), c(0.0)], "measure |01>");
        Ok(())
    }

    #[test]
    fn mid_measure_with_reset_returns_wire_to_zero() -> Result<()> {
        let mut state = create_initial_state(1)?;
        apply_operation(&Operation::fixed(Gate::PauliX, &[0])?, &mut state)?;
        let mp = MidMeasure { wire: Wire(0), reset: true, postselect: None };
        let mut record = MidMeasureRecord::new();
        apply_mid_measure(&mp, &mut state, &mut record, PrngKey::new(0))?;
        assert_eq!(record.get(&mp), Some(1));
        assert_complex_vec_approx_equal(state.amplitudes(), &[c(1.0), c(0.0)], "reset after measuring 1");
        Ok(())
    }

    #[test]
    fn mid_measure_collapses_superposition() -> Result<()> {
        let mut state = create_initial_state(1)?;
        apply_operation(&Operation::fixed(Gate::Hadamard, &[0])?, &mut state)?;
        let mp = MidMeasure { wire: Wire(0), reset: false, postselect: None };
        let mut record = MidMeasureRecord::new();
        apply_mid_measure(&mp, &mut state, &mut record, PrngKey::new(99))?;
        let outcome = record.get(&mp).unwrap();
        let expected = if outcome == 1 { [c(0.0), c(1.0)] } else { [c(1.0), c(0.0)] };
        assert_complex_vec_approx_equal(state.amplitudes(), &expected, "collapse of |+>");
        Ok(())
    }

    #[test]
    fn failed_postselection_discards_state() -> Result<()> {
        // |0> can never yield 1
        let mut state = create_initial_state(1)?;
        let mp = MidMeasure { wire: Wire(0), reset: false, postselect: Some(1) };
        let mut record = MidMeasureRecord::new();
        apply_mid_measure(&mp, &mut state, &mut record, PrngKey::new(5))?;
        assert_eq!(record.get(&mp), Some(-1));
        assert_eq!(state.norm_sqr(), 0.0);

        let again = apply_mid_measure(&mp, &mut state, &mut record, PrngKey::new(6));
        assert!(matches!(again, Err(InterpError::InvalidState { .. })));
        Ok(())
    }
}
