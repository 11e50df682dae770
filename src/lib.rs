// src/lib.rs

//! `qflow` - an interpreter for quantum programs with classical control flow.
//!
//! Programs are flat lists of equations over typed variables, with nested
//! sub-programs for loops and branches. The [`Interpreter`] evaluates them
//! against a dense state-vector simulation: gates update the state,
//! mid-computation measurements collapse it and feed their outcomes back into
//! classical control flow, and terminal measurements produce exact statistics
//! or finite-shot estimates.
//!
//! Randomness comes from a splittable [`PrngKey`] that is threaded through
//! every frame of an invocation, so a seeded interpreter is fully
//! reproducible.
//!
//! # Example: repeat-until-success
//! Measure a wire prepared in `|+>` until it reads `1`, counting attempts.
//! ```
//! use qflow::operations::{Gate, MeasurementKind};
//! use qflow::vm::{primitives, Atom, ProgramBuilder, VarType};
//! use qflow::{Interpreter, InterpreterConfig, Value};
//!
//! # fn main() -> qflow::Result<()> {
//! // cond(outcome, attempts) = outcome == 0
//! let mut cond = ProgramBuilder::new();
//! let outcome = cond.invar(VarType::Int);
//! let _attempts = cond.invar(VarType::Int);
//! let retry = cond.classical(primitives::EQ, &[outcome.into(), Atom::from(0i64)], VarType::Bool);
//! cond.outputs(&[retry.into()]);
//!
//! // body(outcome, attempts) = (measure(H |0>), attempts + 1)
//! let mut body = ProgramBuilder::new();
//! let _outcome = body.invar(VarType::Int);
//! let attempts = body.invar(VarType::Int);
//! body.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
//! let m = body.mid_measure(Atom::wire(0), true, None);
//! let next = body.classical(primitives::ADD, &[attempts.into(), Atom::from(1i64)], VarType::Int);
//! body.outputs(&[m.into(), next.into()]);
//!
//! let mut pb = ProgramBuilder::new();
//! let outs = pb.while_loop(cond.build()?, body.build()?, &[], &[], &[Atom::from(0i64), Atom::from(0i64)]);
//! let probs = pb.measure(MeasurementKind::Probs, &[]);
//! pb.outputs(&[outs[1].into(), probs.into()]);
//! let program = pb.build()?;
//!
//! let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(42))?;
//! let out = interp.call(&program, &[])?;
//! assert!(out[0].as_int()? >= 1);
//! // the last measurement reset the wire
//! match &out[1] {
//!     Value::Real(probs) => assert!((probs[0] - 1.0).abs() < 1e-9),
//!     other => panic!("expected probabilities, got {}", other),
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod operations;
pub mod simulation;
pub mod validation;
pub mod vm;

// Re-export the most common types for easier top-level use
pub use core::{InterpError, PrngKey, Result, ShotConfig, Shots, StateVector, UnsupportedFeature, Wire};
pub use operations::{Gate, MeasurementKind, MeasurementProcess, Operation};
pub use validation::{check_normalization, validate_program};
pub use vm::{Interpreter, InterpreterConfig, Program, ProgramBuilder, Value};
