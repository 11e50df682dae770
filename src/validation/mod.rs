// src/validation/mod.rs

//! Static checks on programs and states.

use crate::core::constants::NORM_TOLERANCE;
use crate::core::{InterpError, Result, StateVector};
use crate::vm::{Atom, Param, Program, VarId};
use std::collections::HashSet;

/// Checks that the squared norm of `state` is 1 within `tolerance`
/// (defaults to [`NORM_TOLERANCE`]).
///
/// # Errors
/// `InvalidState` if the deviation exceeds the tolerance or the norm is NaN.
pub fn check_normalization(state: &StateVector, tolerance: Option<f64>) -> Result<()> {
    let effective_tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm_sq = state.norm_sqr();
    if (norm_sq - 1.0).abs() > effective_tolerance || norm_sq.is_nan() {
        Err(InterpError::InvalidState {
            message: format!(
                "state vector normalization failed: sum(|c_i|^2) = {} (deviation > {})",
                norm_sq, effective_tolerance
            ),
        })
    } else {
        Ok(())
    }
}

/// Checks the variable scoping of `program`.
///
/// Every equation input must be a literal, a constvar, an invar, or an output
/// of an earlier equation; every outvar must be bound; no variable may be
/// bound twice. Nested programs found in equation parameters are checked in
/// their own, independent scope: they cannot see the enclosing program's
/// variables.
///
/// # Errors
/// `MalformedProgram` describing the first violation, prefixed with the
/// path of nested programs leading to it.
pub fn validate_program(program: &Program) -> Result<()> {
    validate_scope(program, "program")
}

fn validate_scope(program: &Program, path: &str) -> Result<()> {
    let mut bound: HashSet<VarId> = HashSet::new();
    for var in program.constvars.iter().chain(&program.invars) {
        if !bound.insert(var.id) {
            return Err(InterpError::malformed(format!("{}: {} declared twice", path, var.id)));
        }
    }

    for (index, eqn) in program.equations.iter().enumerate() {
        for atom in &eqn.inputs {
            if let Atom::Var(var) = atom {
                if !bound.contains(&var.id) {
                    return Err(InterpError::malformed(format!(
                        "{}: equation {} ({}) reads unbound {}",
                        path, index, eqn.primitive, var.id
                    )));
                }
            }
        }
        for (name, param) in eqn.params.iter() {
            match param {
                Param::Program(sub) => validate_scope(sub, &format!("{}/{}[{}]", path, name, index))?,
                Param::Branches(branches) => {
                    for (b, sub) in branches.iter().enumerate() {
                        if let Some(sub) = sub {
                            validate_scope(sub, &format!("{}/{}[{}].{}", path, name, index, b))?;
                        }
                    }
                }
                _ => {}
            }
        }
        for var in &eqn.outputs {
            if !bound.insert(var.id) {
                return Err(InterpError::malformed(format!(
                    "{}: equation {} rebinds {}",
                    path, index, var.id
                )));
            }
        }
    }

    for atom in &program.outvars {
        if let Atom::Var(var) = atom {
            if !bound.contains(&var.id) {
                return Err(InterpError::malformed(format!("{}: output {} is never bound", path, var.id)));
            }
        }
    }
    Ok(())
}
