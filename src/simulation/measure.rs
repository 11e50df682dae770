// src/simulation/measure.rs

//! Exact (analytic) measurement statistics.

use super::engine;
use crate::core::{InterpError, Result, StateVector, Wire};
use crate::operations::{MeasurementKind, MeasurementProcess};
use crate::vm::Value;

/// Computes the exact statistic requested by `mp` from `state`.
///
/// Consumes no randomness.
///
/// # Errors
/// * `InvalidMeasurement` for `Sample`/`Counts`, which need finite shots,
///   and for wires outside the register.
pub fn measure(mp: &MeasurementProcess, state: &StateVector) -> Result<Value> {
    match mp.kind() {
        MeasurementKind::State => Ok(Value::Complex(state.amplitudes().to_vec())),
        MeasurementKind::Probs => {
            let wires = mp.resolved_wires(state.num_wires());
            Ok(Value::Real(marginal_probabilities(state, &wires)?))
        }
        MeasurementKind::Expval(_) => {
            let probs = diagonalized_probabilities(mp, state)?;
            Ok(Value::Float(moment(mp, &probs, 1)))
        }
        MeasurementKind::Var(_) => {
            let probs = diagonalized_probabilities(mp, state)?;
            let mean = moment(mp, &probs, 1);
            Ok(Value::Float(moment(mp, &probs, 2) - mean * mean))
        }
        MeasurementKind::Sample | MeasurementKind::Counts => Err(InterpError::invalid_measurement(format!(
            "{} requires a finite number of shots",
            mp.kind().name()
        ))),
    }
}

fn moment(mp: &MeasurementProcess, probs: &[f64], power: i32) -> f64 {
    probs
        .iter()
        .enumerate()
        .map(|(outcome, p)| p * mp.eigenvalue(outcome).powi(power))
        .sum()
}

/// Probabilities over the measured wires after rotating the observable into
/// the computational basis. The rotation is applied to a scratch copy.
pub(crate) fn diagonalized_probabilities(mp: &MeasurementProcess, state: &StateVector) -> Result<Vec<f64>> {
    let wires = mp.resolved_wires(state.num_wires());
    let gates = mp.diagonalizing_gates()?;
    if gates.is_empty() {
        return marginal_probabilities(state, &wires);
    }
    let mut rotated = state.clone();
    for op in &gates {
        engine::apply_operation(op, &mut rotated)?;
    }
    marginal_probabilities(&rotated, &wires)
}

/// Marginal computational-basis distribution of `wires`, first wire most
/// significant in the outcome index.
pub(crate) fn marginal_probabilities(state: &StateVector, wires: &[Wire]) -> Result<Vec<f64>> {
    if let Some(bad) = wires.iter().find(|w| w.0 >= state.num_wires()) {
        return Err(InterpError::invalid_measurement(format!(
            "{} is outside the {}-wire register",
            bad,
            state.num_wires()
        )));
    }
    let positions: Vec<usize> = wires.iter().map(|w| state.bit_position(w.0)).collect();
    let mut probs = vec![0.0; 1usize << wires.len()];
    for (idx, amp) in state.amplitudes().iter().enumerate() {
        let outcome = positions.iter().fold(0usize, |acc, pos| (acc << 1) | ((idx >> pos) & 1));
        probs[outcome] += amp.norm_sqr();
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Gate, Operation, Pauli, PauliWord};

    const TOL: f64 = 1e-9;

    fn state_after(num_wires: usize, ops: &[Operation]) -> StateVector {
        let mut state = engine::create_initial_state(num_wires).unwrap();
        for op in ops {
            engine::apply_operation(op, &mut state).unwrap();
        }
        state
    }

    fn expval(word: Vec<Pauli>, wires: &[usize]) -> MeasurementProcess {
        MeasurementProcess::new(MeasurementKind::Expval(PauliWord(word)), wires.iter().copied().map(Wire).collect())
            .unwrap()
    }

    #[test]
    fn expval_z_after_rx_is_cosine() -> Result<()> {
        let theta = 0.7;
        let state = state_after(1, &[Operation::new(Gate::RX, vec![theta], vec![Wire(0)])?]);
        let value = measure(&expval(vec![Pauli::Z], &[0]), &state)?.as_float()?;
        assert!((value - theta.cos()).abs() < TOL);
        Ok(())
    }

    #[test]
    fn expval_x_of_plus_state_is_one() -> Result<()> {
        let state = state_after(1, &[Operation::fixed(Gate::Hadamard, &[0])?]);
        let value = measure(&expval(vec![Pauli::X], &[0]), &state)?.as_float()?;
        assert!((value - 1.0).abs() < TOL);
        Ok(())
    }

    #[test]
    fn expval_y_after_rx_is_minus_sine() -> Result<()> {
        let theta = 0.4;
        let state = state_after(1, &[Operation::new(Gate::RX, vec![theta], vec![Wire(0)])?]);
        let value = measure(&expval(vec![Pauli::Y], &[0]), &state)?.as_float()?;
        assert!((value + theta.sin()).abs() < TOL);
        Ok(())
    }

    #[test]
    fn zz_correlation_of_bell_state() -> Result<()> {
        let state = state_after(2, &[Operation::fixed(Gate::Hadamard, &[0])?, Operation::fixed(Gate::CNOT, &[0, 1])?]);
        let zz = measure(&expval(vec![Pauli::Z, Pauli::Z], &[0, 1]), &state)?.as_float()?;
        let z0 = measure(&expval(vec![Pauli::Z], &[0]), &state)?.as_float()?;
        assert!((zz - 1.0).abs() < TOL);
        assert!(z0.abs() < TOL);
        Ok(())
    }

    #[test]
    fn variance_of_plus_state_in_z() -> Result<()> {
        let state = state_after(1, &[Operation::fixed(Gate::Hadamard, &[0])?]);
        let mp = MeasurementProcess::new(MeasurementKind::Var(PauliWord::z()), vec![Wire(0)])?;
        assert!((measure(&mp, &state)?.as_float()? - 1.0).abs() < TOL);
        Ok(())
    }

    #[test]
    fn marginal_probs_follow_wire_order() -> Result<()> {
        // |10>: wire 0 is 1, wire 1 is 0
        let state = state_after(2, &[Operation::fixed(Gate::PauliX, &[0])?]);
        assert_eq!(marginal_probabilities(&state, &[Wire(0)])?, vec![0.0, 1.0]);
        assert_eq!(marginal_probabilities(&state, &[Wire(1), Wire(0)])?, vec![0.0, 1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn sample_needs_shots() {
        let state = state_after(1, &[]);
        let mp = MeasurementProcess::new(MeasurementKind::Sample, vec![]).unwrap();
        assert!(matches!(measure(&mp, &state), Err(InterpError::InvalidMeasurement { .. })));
    }
}
