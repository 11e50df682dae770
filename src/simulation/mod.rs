// src/simulation/mod.rs

//! State-vector collaborators used by the interpreter.
//!
//! These are plain functions over a [`StateVector`](crate::core::StateVector):
//! they know nothing about programs, frames or variables.
//!
//! * [`engine`] allocates states, applies gates and performs mid-computation
//!   measurements.
//! * [`measure`] computes exact statistics.
//! * [`sampling`] estimates statistics from a finite number of shots.
//! * [`capture`] journals applied operations and lets measurement code
//!   suspend that journal.

pub mod capture;
pub mod engine;
pub mod measure;
pub mod sampling;

pub use engine::{MidMeasureRecord, apply_mid_measure, apply_operation, create_initial_state};
pub use measure::measure;
pub use sampling::measure_with_samples;
