// src/vm/value.rs

use crate::core::{InterpError, Result, Wire};
use num_complex::Complex;
use std::collections::BTreeMap;
use std::fmt;

/// A concrete value bound to a variable inside one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Real tensor, e.g. a probability vector.
    Real(Vec<f64>),
    /// Complex tensor, e.g. a state vector.
    Complex(Vec<Complex<f64>>),
    /// One bit vector per shot.
    Samples(Vec<Vec<u8>>),
    /// Bitstring histogram.
    Counts(BTreeMap<String, u64>),
}

impl Value {
    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Real(_) => "real array",
            Value::Complex(_) => "complex array",
            Value::Samples(_) => "samples",
            Value::Counts(_) => "counts",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(mismatch("int", other)),
        }
    }

    /// Numeric value as `f64`; ints and bools are widened.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(f64::from(u8::from(*b))),
            other => Err(mismatch("float", other)),
        }
    }

    /// Interprets a non-negative integer as a wire label.
    pub fn as_wire(&self) -> Result<Wire> {
        let index = self.as_int()?;
        usize::try_from(index).map(Wire).map_err(|_| InterpError::invalid_operation(format!("negative wire label {}", index)))
    }

    /// Classical truthiness used by branch predicates and loop conditions:
    /// `false`, `0` and `0.0` are false, every other scalar is true.
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(x) => Ok(*x != 0.0),
            other => Err(mismatch("scalar predicate", other)),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> InterpError {
    InterpError::TypeMismatch { expected, found: found.type_name() }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:.6}", x),
            Value::Real(xs) => write!(f, "{:?}", xs),
            Value::Complex(cs) => {
                let parts: Vec<String> = cs.iter().map(|c| format!("{:.4}", c)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Samples(shots) => write!(f, "<{} samples>", shots.len()),
            Value::Counts(counts) => write!(f, "{:?}", counts),
        }
    }
}
