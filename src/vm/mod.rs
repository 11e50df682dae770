// src/vm/mod.rs

//! Program representation and the interpreter that evaluates it.
//!
//! A [`Program`] is a flat list of [`Equation`]s over typed variables. Gates
//! and terminal measurements are built into [`Primitive`]; control flow,
//! mid-computation measurement and classical arithmetic are named primitives
//! resolved through a [`PrimitiveTable`].

mod classical;
pub mod control_flow;
mod environment;
mod interpreter;
pub mod primitives;
mod program;
mod value;

pub use environment::Environment;
pub use interpreter::{ExecutionState, Interpreter, InterpreterConfig};
pub use primitives::{PrimitiveHandler, PrimitiveTable};
pub use program::{Atom, Branch, Equation, Param, Params, Primitive, Program, ProgramBuilder, Var, VarId, VarType};
pub use value::Value;
