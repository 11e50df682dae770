// src/simulation/sampling.rs

//! Shot-based estimation of measurement statistics.

use super::measure::diagonalized_probabilities;
use crate::core::{InterpError, PrngKey, Result, StateVector};
use crate::operations::{MeasurementKind, MeasurementProcess};
use crate::validation::check_normalization;
use crate::vm::Value;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::num::NonZeroU64;

/// Tolerance on the total probability before sampling is refused.
const SAMPLING_NORM_TOLERANCE: f64 = 1e-6;

/// Estimates each measurement in `mps` from `shots` samples drawn with `key`.
///
/// Every measurement draws its own batch; measurements are not grouped.
///
/// # Errors
/// * `Sampling` if the state is not normalized (for example after a failed
///   postselection).
/// * `InvalidMeasurement` for `State`, which cannot be sampled.
pub fn measure_with_samples(
    mps: &[MeasurementProcess],
    state: &StateVector,
    shots: NonZeroU64,
    key: PrngKey,
) -> Result<Vec<Value>> {
    check_normalization(state, Some(SAMPLING_NORM_TOLERANCE))
        .map_err(|err| InterpError::Sampling { message: err.to_string() })?;

    let mut rng = key.rng();
    mps.iter().map(|mp| sample_one(mp, state, shots.get(), &mut rng)).collect()
}

fn sample_one(mp: &MeasurementProcess, state: &StateVector, shots: u64, rng: &mut StdRng) -> Result<Value> {
    let num_measured = mp.resolved_wires(state.num_wires()).len();
    let probs = diagonalized_probabilities(mp, state)?;
    let outcomes = draw(&probs, shots, rng)?;

    let value = match mp.kind() {
        MeasurementKind::Expval(_) => {
            let mean = outcomes.iter().map(|o| mp.eigenvalue(*o)).sum::<f64>() / shots as f64;
            Value::Float(mean)
        }
        MeasurementKind::Var(_) => {
            let eigvals: Vec<f64> = outcomes.iter().map(|o| mp.eigenvalue(*o)).collect();
            let mean = eigvals.iter().sum::<f64>() / shots as f64;
            let second = eigvals.iter().map(|e| e * e).sum::<f64>() / shots as f64;
            Value::Float(second - mean * mean)
        }
        MeasurementKind::Probs => {
            let mut freqs = vec![0.0; probs.len()];
            for o in &outcomes {
                freqs[*o] += 1.0;
            }
            freqs.iter_mut().for_each(|f| *f /= shots as f64);
            Value::Real(freqs)
        }
        MeasurementKind::Sample => {
            Value::Samples(outcomes.iter().map(|o| bits(*o, num_measured)).collect())
        }
        MeasurementKind::Counts => {
            let mut counts = BTreeMap::new();
            for o in &outcomes {
                let key: String = bits(*o, num_measured).iter().map(|b| if *b == 1 { '1' } else { '0' }).collect();
                *counts.entry(key).or_insert(0u64) += 1;
            }
            Value::Counts(counts)
        }
        MeasurementKind::State => {
            return Err(InterpError::invalid_measurement("state cannot be estimated from samples"));
        }
    };
    Ok(value)
}

/// Inverse-CDF sampling of outcome indices.
fn draw(probs: &[f64], shots: u64, rng: &mut StdRng) -> Result<Vec<usize>> {
    let mut cumulative = Vec::with_capacity(probs.len());
    let mut total = 0.0;
    for p in probs {
        total += p;
        cumulative.push(total);
    }
    if !total.is_finite() || total <= 0.0 {
        return Err(InterpError::Sampling { message: format!("cannot sample from total probability {}", total) });
    }
    let last = probs.len() - 1;
    Ok((0..shots)
        .map(|_| {
            let u: f64 = StandardUniform.sample(rng);
            cumulative.partition_point(|c| *c <= u * total).min(last)
        })
        .collect())
}

fn bits(outcome: usize, width: usize) -> Vec<u8> {
    (0..width).map(|j| ((outcome >> (width - 1 - j)) & 1) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Wire;
    use crate::operations::{Gate, Operation, PauliWord};
    use crate::simulation::engine;

    fn shots(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn basis_state_samples_are_exact() -> Result<()> {
        let mut state = engine::create_initial_state(2)?;
        engine::apply_operation(&Operation::fixed(Gate::PauliX, &[1])?, &mut state)?;
        let mps = [
            MeasurementProcess::new(MeasurementKind::Sample, vec![])?,
            MeasurementProcess::new(MeasurementKind::Counts, vec![])?,
            MeasurementProcess::new(MeasurementKind::Expval(PauliWord::z()), vec![Wire(1)])?,
        ];
        let values = measure_with_samples(&mps, &state, shots(10), PrngKey::new(1))?;
        assert_eq!(values[0], Value::Samples(vec![vec![0, 1]; 10]));
        assert_eq!(values[1], Value::Counts(BTreeMap::from([("01".to_string(), 10)])));
        assert_eq!(values[2], Value::Float(-1.0));
        Ok(())
    }

    #[test]
    fn same_key_gives_same_samples() -> Result<()> {
        let mut state = engine::create_initial_state(1)?;
        engine::apply_operation(&Operation::fixed(Gate::Hadamard, &[0])?, &mut state)?;
        let mps = [MeasurementProcess::new(MeasurementKind::Sample, vec![])?];
        let a = measure_with_samples(&mps, &state, shots(64), PrngKey::new(9))?;
        let b = measure_with_samples(&mps, &state, shots(64), PrngKey::new(9))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn probs_frequencies_sum_to_one() -> Result<()> {
        let mut state = engine::create_initial_state(1)?;
        engine::apply_operation(&Operation::fixed(Gate::Hadamard, &[0])?, &mut state)?;
        let mps = [MeasurementProcess::new(MeasurementKind::Probs, vec![Wire(0)])?];
        let values = measure_with_samples(&mps, &state, shots(1000), PrngKey::new(2))?;
        match &values[0] {
            Value::Real(freqs) => assert!((freqs.iter().sum::<f64>() - 1.0).abs() < 1e-12),
            other => panic!("expected probabilities, got {}", other),
        }
        Ok(())
    }

    #[test]
    fn zero_state_is_a_sampling_error() -> Result<()> {
        let state = StateVector::from_amplitudes(vec![num_complex::Complex::new(0.0, 0.0); 2])?;
        let mps = [MeasurementProcess::new(MeasurementKind::Probs, vec![])?];
        let err = measure_with_samples(&mps, &state, shots(5), PrngKey::new(0)).unwrap_err();
        assert!(matches!(err, InterpError::Sampling { .. }));
        Ok(())
    }

    #[test]
    fn state_cannot_be_sampled() -> Result<()> {
        let state = engine::create_initial_state(1)?;
        let mps = [MeasurementProcess::new(MeasurementKind::State, vec![])?];
        assert!(matches!(
            measure_with_samples(&mps, &state, shots(5), PrngKey::new(0)),
            Err(InterpError::InvalidMeasurement { .. })
        ));
        Ok(())
    }
}
