// src/vm/control_flow.rs

//! Handlers for structured control flow and mid-computation measurement.
//!
//! Loop and branch bodies are evaluated in child frames: a fresh environment
//! over the same execution state, so gates applied in a body act on the
//! caller's state and keys consumed in a body advance the caller's key.

use super::interpreter::Interpreter;
use super::primitives::{self, PrimitiveTable};
use super::program::Params;
use super::value::Value;
use crate::core::{InterpError, Result, UnsupportedFeature};
use crate::operations::MidMeasure;
use crate::simulation::{MidMeasureRecord, apply_mid_measure};
use std::ops::Range;
use tracing::debug;

pub(crate) fn register(table: &mut PrimitiveTable) {
    table.register(primitives::FOR_LOOP, for_loop);
    table.register(primitives::WHILE_LOOP, while_loop);
    table.register(primitives::COND, cond);
    table.register(primitives::MEASURE, mid_measure);
    table.register(primitives::ADJOINT_TRANSFORM, |_, _, _| {
        Err(InterpError::Unsupported(UnsupportedFeature::AdjointTransform))
    });
    table.register(primitives::CTRL_TRANSFORM, |_, _, _| {
        Err(InterpError::Unsupported(UnsupportedFeature::ControlledTransform))
    });
}

/// Returns `values[range]`, or `MalformedProgram` if it is out of bounds.
fn slice<'a>(values: &'a [Value], range: Range<usize>, what: &str) -> Result<&'a [Value]> {
    values.get(range.clone()).ok_or_else(|| {
        InterpError::malformed(format!("{} {:?} exceeds {} available input(s)", what, range, values.len()))
    })
}

/// Indices visited by a loop from `start` towards `stop` (exclusive) by `step`.
///
/// Negative steps count down. A zero step visits nothing.
fn loop_indices(start: i64, stop: i64, step: i64) -> impl Iterator<Item = i64> {
    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let count = if step_wide == 0 || span.signum() != step_wide.signum() {
        0
    } else {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    };
    (0..count).map(move |k| (i128::from(start) + k * step_wide) as i64)
}

/// `for i in range(start, stop, step)` over a body program.
///
/// Inputs are `[start, stop, step, rest...]`. The `consts_slice` and
/// `args_slice` parameters index into `rest`. Each iteration evaluates `body`
/// with the constants as constvars and `(i, *carried)` as invars; its outputs
/// become the next carried values.
pub fn for_loop(interp: &mut Interpreter, invals: &[Value], params: &Params) -> Result<Vec<Value>> {
    if invals.len() < 3 {
        return Err(InterpError::ArityMismatch {
            context: primitives::FOR_LOOP.to_string(),
            expected: 3,
            found: invals.len(),
        });
    }
    let (start, stop, step) = (invals[0].as_int()?, invals[1].as_int()?, invals[2].as_int()?);
    let rest = &invals[3..];
    let body = params.program("body")?;
    let consts = slice(rest, params.range("consts_slice")?, "consts_slice")?;
    let mut carried = slice(rest, params.range("args_slice")?, "args_slice")?.to_vec();

    let mut iterations = 0usize;
    for i in loop_indices(start, stop, step) {
        let mut args = Vec::with_capacity(carried.len() + 1);
        args.push(Value::Int(i));
        args.extend(carried);
        carried = interp.eval_child(body, consts, &args)?;
        iterations += 1;
    }
    debug!(start, stop, step, iterations, "for_loop finished");
    Ok(carried)
}

/// `while cond(*carried): carried = body(*carried)`.
///
/// `cond` is evaluated in its own frame before every iteration and must
/// return a single truthy-or-falsy scalar.
pub fn while_loop(interp: &mut Interpreter, invals: &[Value], params: &Params) -> Result<Vec<Value>> {
    let body = params.program("body")?;
    let cond = params.program("cond")?;
    let body_consts = slice(invals, params.range("body_slice")?, "body_slice")?;
    let cond_consts = slice(invals, params.range("cond_slice")?, "cond_slice")?;
    let mut carried = slice(invals, params.range("args_slice")?, "args_slice")?.to_vec();

    let mut iterations = 0usize;
    loop {
        let verdict = interp.eval_child(cond, cond_consts, &carried)?;
        let proceed = match verdict.as_slice() {
            [value] => value.truthy()?,
            other => {
                return Err(InterpError::ArityMismatch {
                    context: "while_loop condition".to_string(),
                    expected: 1,
                    found: other.len(),
                });
            }
        };
        if !proceed {
            break;
        }
        carried = interp.eval_child(body, body_consts, &carried)?;
        iterations += 1;
    }
    debug!(iterations, "while_loop finished");
    Ok(carried)
}

/// Multi-way conditional.
///
/// Inputs start with one predicate per branch. The `consts_slices` and
/// `args_slice` parameters index into the full input list. The first branch
/// whose predicate is truthy and whose body is present runs; if there is none,
/// nothing runs and no values are returned, leaving the equation's outputs
/// unbound.
pub fn cond(interp: &mut Interpreter, invals: &[Value], params: &Params) -> Result<Vec<Value>> {
    let branches = params.branches("branches")?;
    let consts_slices = params.ranges("consts_slices")?;
    if consts_slices.len() != branches.len() {
        return Err(InterpError::malformed(format!(
            "cond has {} branch(es) but {} constant slice(s)",
            branches.len(),
            consts_slices.len()
        )));
    }
    let predicates = slice(invals, 0..branches.len(), "predicates")?;
    let args = slice(invals, params.range("args_slice")?, "args_slice")?;

    for (index, (predicate, branch)) in predicates.iter().zip(branches).enumerate() {
        let body = match branch {
            Some(body) => body,
            None => continue,
        };
        if predicate.truthy()? {
            debug!(branch = index, "cond selected branch");
            let consts = slice(invals, consts_slices[index].clone(), "consts_slices")?;
            return interp.eval_child(body, consts, args);
        }
    }
    debug!("cond selected no branch");
    Ok(Vec::new())
}

/// Measures one wire mid-computation and returns the outcome as an int.
///
/// Consumes randomness by splitting the frame's key: the carry half becomes
/// the new key, the draw half samples the outcome. Parameters `reset` (bool)
/// and `postselect` (0 or 1) are optional. A postselection that fails yields
/// `-1` and discards the state.
pub fn mid_measure(interp: &mut Interpreter, invals: &[Value], params: &Params) -> Result<Vec<Value>> {
    let wire = match invals {
        [wire] => wire.as_wire()?,
        _ => {
            return Err(InterpError::ArityMismatch {
                context: primitives::MEASURE.to_string(),
                expected: 1,
                found: invals.len(),
            });
        }
    };
    let reset = params.bool_or("reset", false)?;
    let postselect = match params.int_opt("postselect")? {
        None => None,
        Some(0) => Some(0),
        Some(1) => Some(1),
        Some(other) => return Err(InterpError::malformed(format!("postselect must be 0 or 1, got {}", other))),
    };
    let mp = MidMeasure { wire, reset, postselect };

    let draw = interp.split_key()?;
    let mut record = MidMeasureRecord::new();
    interp.with_state(|state| apply_mid_measure(&mp, state, &mut record, draw))?;
    let outcome = record
        .get(&mp)
        .ok_or_else(|| InterpError::invalid_operation(format!("no outcome recorded for {}", wire)))?;
    debug!(wire = wire.0, outcome, reset, "mid-measurement");
    Ok(vec![Value::Int(outcome)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(start: i64, stop: i64, step: i64) -> Vec<i64> {
        loop_indices(start, stop, step).collect()
    }

    #[test]
    fn loop_indices_follow_half_open_ranges() {
        assert_eq!(indices(0, 3, 1), vec![0, 1, 2]);
        assert_eq!(indices(1, 8, 3), vec![1, 4, 7]);
        assert_eq!(indices(5, 0, -2), vec![5, 3, 1]);
    }

    #[test]
    fn empty_and_degenerate_ranges() {
        assert!(indices(3, 3, 1).is_empty());
        assert!(indices(3, 0, 1).is_empty());
        assert!(indices(0, 3, -1).is_empty());
        assert!(indices(0, 3, 0).is_empty());
    }

    #[test]
    fn out_of_bounds_slice_is_malformed() {
        let values = [Value::Int(1)];
        assert!(matches!(slice(&values, 0..2, "args_slice"), Err(InterpError::MalformedProgram { .. })));
    }
}
