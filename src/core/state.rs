// src/core/state.rs

use super::error::{InterpError, Result};
use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;

/// Dense state vector of an `n`-wire register.
///
/// Basis index bit `n - 1 - w` holds the value of wire `w`, so wire `0` is
/// the most significant bit. Amplitudes are `Complex<f64>`.
#[derive(Debug, Clone, PartialEq)] // Avoid Eq for floating-point complex numbers
pub struct StateVector {
    amplitudes: Vec<Complex<f64>>,
    num_wires: usize,
}

impl StateVector {
    /// Returns the ground state `|0...0>` of `num_wires` wires.
    ///
    /// # Errors
    /// `InvalidState` if the dimension `2^num_wires` does not fit in `usize`.
    pub fn zero(num_wires: usize) -> Result<Self> {
        let dim = u32::try_from(num_wires)
            .ok()
            .and_then(|n| 1usize.checked_shl(n))
            .ok_or_else(|| InterpError::InvalidState {
                message: format!("{} wires overflow the state dimension", num_wires),
            })?;
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[0] = Complex::one();
        Ok(Self { amplitudes, num_wires })
    }

    /// Wraps an explicit amplitude vector. Its length must be a power of two.
    pub fn from_amplitudes(amplitudes: Vec<Complex<f64>>) -> Result<Self> {
        let dim = amplitudes.len();
        if dim == 0 || !dim.is_power_of_two() {
            return Err(InterpError::InvalidState {
                message: format!("state dimension {} is not a positive power of two", dim),
            });
        }
        Ok(Self { num_wires: dim.trailing_zeros() as usize, amplitudes })
    }

    /// Read-only view of the amplitudes.
    pub fn amplitudes(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    pub(crate) fn amplitudes_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.amplitudes
    }

    /// Number of wires this state describes.
    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    /// Squared norm of the vector.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Probability of each computational basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|c| c.norm_sqr()).collect()
    }

    /// Bit position of `wire` inside a basis index.
    pub(crate) fn bit_position(&self, wire: usize) -> usize {
        self.num_wires - 1 - wire
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_has_unit_amplitude_at_origin() {
        let state = StateVector::zero(3).unwrap();
        assert_eq!(state.amplitudes().len(), 8);
        assert_eq!(state.num_wires(), 3);
        assert_eq!(state.amplitudes()[0], Complex::one());
        assert!((state.norm_sqr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn from_amplitudes_rejects_non_power_of_two() {
        let err = StateVector::from_amplitudes(vec![Complex::one(); 3]).unwrap_err();
        assert!(matches!(err, InterpError::InvalidState { .. }));
    }

    #[test]
    fn bit_position_puts_wire_zero_first() {
        let state = StateVector::zero(2).unwrap();
        assert_eq!(state.bit_position(0), 1);
        assert_eq!(state.bit_position(1), 0);
    }
}
