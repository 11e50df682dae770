// src/vm/classical.rs

//! Scalar arithmetic, comparison and logic primitives.
//!
//! Integer operands stay integers; any float operand promotes the result to a
//! float. Booleans count as integers. Division always yields a float.

use super::interpreter::Interpreter;
use super::primitives::{self, PrimitiveTable};
use super::program::Params;
use super::value::Value;
use crate::core::{InterpError, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Num::Int(i64::from(*b))),
            Value::Int(i) => Ok(Num::Int(*i)),
            Value::Float(x) => Ok(Num::Float(*x)),
            other => Err(InterpError::TypeMismatch { expected: "scalar", found: other.type_name() }),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(x) => x,
        }
    }
}

fn operands<const N: usize>(name: &str, invals: &[Value]) -> Result<[Num; N]> {
    if invals.len() != N {
        return Err(InterpError::ArityMismatch { context: name.to_string(), expected: N, found: invals.len() });
    }
    let mut nums = [Num::Int(0); N];
    for (slot, value) in nums.iter_mut().zip(invals) {
        *slot = Num::of(value)?;
    }
    Ok(nums)
}

fn arithmetic(
    name: &str,
    invals: &[Value],
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Vec<Value>> {
    let value = match operands::<2>(name, invals)? {
        [Num::Int(a), Num::Int(b)] => Value::Int(int_op(a, b)),
        [a, b] => Value::Float(float_op(a.to_f64(), b.to_f64())),
    };
    Ok(vec![value])
}

fn compare(name: &str, invals: &[Value], accept: fn(Ordering) -> bool) -> Result<Vec<Value>> {
    let ordering = match operands::<2>(name, invals)? {
        [Num::Int(a), Num::Int(b)] => Some(a.cmp(&b)),
        [a, b] => a.to_f64().partial_cmp(&b.to_f64()),
    };
    // NaN compares false under every ordering except `ne`
    let result = match ordering {
        Some(ordering) => accept(ordering),
        None => name == primitives::NE,
    };
    Ok(vec![Value::Bool(result)])
}

fn logic(name: &str, invals: &[Value], op: fn(bool, bool) -> bool) -> Result<Vec<Value>> {
    if invals.len() != 2 {
        return Err(InterpError::ArityMismatch { context: name.to_string(), expected: 2, found: invals.len() });
    }
    Ok(vec![Value::Bool(op(invals[0].truthy()?, invals[1].truthy()?))])
}

fn neg(_interp: &mut Interpreter, invals: &[Value], _params: &Params) -> Result<Vec<Value>> {
    let value = match operands::<1>(primitives::NEG, invals)? {
        [Num::Int(i)] => Value::Int(i.wrapping_neg()),
        [Num::Float(x)] => Value::Float(-x),
    };
    Ok(vec![value])
}

fn not(_interp: &mut Interpreter, invals: &[Value], _params: &Params) -> Result<Vec<Value>> {
    match invals {
        [value] => Ok(vec![Value::Bool(!value.truthy()?)]),
        _ => Err(InterpError::ArityMismatch { context: primitives::NOT.to_string(), expected: 1, found: invals.len() }),
    }
}

fn div(_interp: &mut Interpreter, invals: &[Value], _params: &Params) -> Result<Vec<Value>> {
    let [a, b] = operands::<2>(primitives::DIV, invals)?;
    Ok(vec![Value::Float(a.to_f64() / b.to_f64())])
}

pub(crate) fn register(table: &mut PrimitiveTable) {
    table.register(primitives::ADD, |_, invals, _| {
        arithmetic(primitives::ADD, invals, i64::wrapping_add, |a, b| a + b)
    });
    table.register(primitives::SUB, |_, invals, _| {
        arithmetic(primitives::SUB, invals, i64::wrapping_sub, |a, b| a - b)
    });
    table.register(primitives::MUL, |_, invals, _| {
        arithmetic(primitives::MUL, invals, i64::wrapping_mul, |a, b| a * b)
    });
    table.register(primitives::DIV, div);
    table.register(primitives::NEG, neg);

    table.register(primitives::LT, |_, invals, _| compare(primitives::LT, invals, Ordering::is_lt));
    table.register(primitives::LE, |_, invals, _| compare(primitives::LE, invals, Ordering::is_le));
    table.register(primitives::GT, |_, invals, _| compare(primitives::GT, invals, Ordering::is_gt));
    table.register(primitives::GE, |_, invals, _| compare(primitives::GE, invals, Ordering::is_ge));
    table.register(primitives::EQ, |_, invals, _| compare(primitives::EQ, invals, Ordering::is_eq));
    table.register(primitives::NE, |_, invals, _| compare(primitives::NE, invals, Ordering::is_ne));

    table.register(primitives::NOT, not);
    table.register(primitives::AND, |_, invals, _| logic(primitives::AND, invals, |a, b| a && b));
    table.register(primitives::OR, |_, invals, _| logic(primitives::OR, invals, |a, b| a || b));
}
