//! Numerical tolerances shared by the simulator and validation.

/// Default allowed deviation of a squared norm from 1.
pub const NORM_TOLERANCE: f64 = 1e-9;
/// Amplitudes or probabilities below this are treated as zero.
pub const AMPLITUDE_TOLERANCE: f64 = 1e-12;
/// Upper bound on register size accepted by the interpreter.
pub const MAX_WIRES: usize = 24;
