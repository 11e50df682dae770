// src/vm/primitives.rs

//! Dispatch table for named primitives.
//!
//! Gates and terminal measurements are dispatched structurally by the
//! interpreter. Everything else (control flow, mid-computation measurement,
//! classical arithmetic, user extensions) is looked up here by name.

use super::interpreter::Interpreter;
use super::program::Params;
use super::value::Value;
use super::{classical, control_flow};
use crate::core::{InterpError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

pub const FOR_LOOP: &str = "for_loop";
pub const WHILE_LOOP: &str = "while_loop";
pub const COND: &str = "cond";
pub const MEASURE: &str = "measure";
pub const ADJOINT_TRANSFORM: &str = "adjoint_transform";
pub const CTRL_TRANSFORM: &str = "ctrl_transform";

pub const ADD: &str = "add";
pub const SUB: &str = "sub";
pub const MUL: &str = "mul";
pub const DIV: &str = "div";
pub const NEG: &str = "neg";
pub const LT: &str = "lt";
pub const LE: &str = "le";
pub const GT: &str = "gt";
pub const GE: &str = "ge";
pub const EQ: &str = "eq";
pub const NE: &str = "ne";
pub const NOT: &str = "not";
pub const AND: &str = "and";
pub const OR: &str = "or";

/// Handler for a named primitive.
///
/// Receives the interpreter frame that encountered the equation, the resolved
/// input values and the equation's static parameters. Returns one value per
/// equation output.
///
/// Nested programs must run through [`Interpreter::eval_child`]. Calling
/// [`Interpreter::eval`] on the frame itself replaces that frame's bindings,
/// and the equations after this one then fail with an unbound variable.
pub type PrimitiveHandler = Arc<dyn Fn(&mut Interpreter, &[Value], &Params) -> Result<Vec<Value>> + Send + Sync>;

/// Built-in table shared by every interpreter created with [`Interpreter::new`].
pub(crate) static DEFAULT_PRIMITIVES: LazyLock<Arc<PrimitiveTable>> =
    LazyLock::new(|| Arc::new(PrimitiveTable::default()));

/// Mapping from primitive name to handler.
///
/// `PrimitiveTable::default()` holds the built-in handlers; register more on
/// a copy and pass it to [`Interpreter::with_primitives`].
#[derive(Clone)]
pub struct PrimitiveTable {
    handlers: HashMap<String, PrimitiveHandler>,
}

impl PrimitiveTable {
    /// A table with no handlers at all.
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registers `handler` under `name`, returning the handler it replaces.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> Option<PrimitiveHandler>
    where
        F: Fn(&mut Interpreter, &[Value], &Params) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler))
    }

    /// # Errors
    /// `UnknownPrimitive` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&PrimitiveHandler> {
        self.handlers
            .get(name)
            .ok_or_else(|| InterpError::UnknownPrimitive { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for PrimitiveTable {
    fn default() -> Self {
        let mut table = Self::empty();
        control_flow::register(&mut table);
        classical::register(&mut table);
        table
    }
}

impl fmt::Debug for PrimitiveTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveTable").field("names", &self.names()).finish()
    }
}
