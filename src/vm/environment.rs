// src/vm/environment.rs

use super::program::{Atom, Var, VarId};
use super::value::Value;
use crate::core::{InterpError, Result};
use std::collections::HashMap;

/// Variable bindings of a single frame.
///
/// Each frame owns its environment; nested programs get a fresh one and
/// never see their parent's bindings.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<VarId, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, var: &Var, value: Value) {
        self.bindings.insert(var.id, value);
    }

    pub fn lookup(&self, var: &Var) -> Result<&Value> {
        self.bindings.get(&var.id).ok_or(InterpError::UnboundVariable { var: var.id })
    }

    /// Resolves an atom: literals are returned as-is, variables are looked up.
    pub fn read(&self, atom: &Atom) -> Result<Value> {
        match atom {
            Atom::Lit(value) => Ok(value.clone()),
            Atom::Var(var) => self.lookup(var).cloned(),
        }
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VarType;

    #[test]
    fn unbound_lookup_names_the_variable() {
        let env = Environment::new();
        let var = Var::new(VarId(7), VarType::Int);
        assert_eq!(env.lookup(&var), Err(InterpError::UnboundVariable { var: VarId(7) }));
    }

    #[test]
    fn literals_need_no_binding() {
        let env = Environment::new();
        assert_eq!(env.read(&Atom::from(2.5)), Ok(Value::Float(2.5)));
    }
}
