// src/vm/program.rs

//! Program representation: variables, equations, nested sub-programs and a
//! builder for assembling them.

use super::primitives;
use super::value::Value;
use crate::core::{InterpError, Result, Wire};
use crate::operations::{Gate, MeasurementKind};
use crate::validation::validate_program;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Opaque identity of a program variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Semantic type attached to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Bool,
    Int,
    Float,
    /// Any tensor-valued result (probabilities, states, samples, counts).
    Array,
}

impl VarType {
    fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => VarType::Bool,
            Value::Int(_) => VarType::Int,
            Value::Float(_) => VarType::Float,
            _ => VarType::Array,
        }
    }
}

/// A typed program variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var {
    pub id: VarId,
    pub ty: VarType,
}

impl Var {
    pub fn new(id: VarId, ty: VarType) -> Self {
        Self { id, ty }
    }
}

/// An equation input: a variable reference or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Var(Var),
    Lit(Value),
}

impl Atom {
    /// Literal wire label.
    pub fn wire(index: usize) -> Self {
        Atom::Lit(Value::Int(index as i64))
    }

    pub fn ty(&self) -> VarType {
        match self {
            Atom::Var(var) => var.ty,
            Atom::Lit(value) => VarType::of(value),
        }
    }
}

impl From<Var> for Atom {
    fn from(var: Var) -> Self {
        Atom::Var(var)
    }
}

impl From<Value> for Atom {
    fn from(value: Value) -> Self {
        Atom::Lit(value)
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Lit(Value::Int(i))
    }
}

impl From<f64> for Atom {
    fn from(x: f64) -> Self {
        Atom::Lit(Value::Float(x))
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Lit(Value::Bool(b))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Var(var) => write!(f, "{}", var.id),
            Atom::Lit(value) => write!(f, "{}", value),
        }
    }
}

/// Identity of the primitive an equation applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A gate; inputs are its parameters followed by its wires.
    Operation(Gate),
    /// A terminal measurement; inputs are wires.
    Measurement(MeasurementKind),
    /// A terminal statistic over mid-measurement outcomes.
    MidMeasureStatistic(MeasurementKind),
    /// Anything resolved through the primitive table.
    Named(Cow<'static, str>),
}

impl Primitive {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Primitive::Named(name.into())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Operation(gate) => write!(f, "{}", gate),
            Primitive::Measurement(kind) => match kind {
                MeasurementKind::Expval(word) | MeasurementKind::Var(word) => write!(f, "{}[{}]", kind.name(), word),
                _ => write!(f, "{}", kind.name()),
            },
            Primitive::MidMeasureStatistic(kind) => write!(f, "{}_mcm", kind.name()),
            Primitive::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A static equation parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Bool(bool),
    Range(Range<usize>),
    Ranges(Vec<Range<usize>>),
    Program(Arc<Program>),
    /// Branch bodies of a multi-way conditional; `None` is an omitted branch.
    Branches(Vec<Option<Arc<Program>>>),
}

/// Named static parameters of one equation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, param: Param) -> &mut Self {
        self.0.insert(name.into(), param);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Param)> {
        self.0.iter()
    }

    fn require(&self, name: &str) -> Result<&Param> {
        self.0
            .get(name)
            .ok_or_else(|| InterpError::malformed(format!("missing parameter '{}'", name)))
    }

    pub fn program(&self, name: &str) -> Result<&Arc<Program>> {
        match self.require(name)? {
            Param::Program(program) => Ok(program),
            other => Err(wrong_param(name, "program", other)),
        }
    }

    pub fn range(&self, name: &str) -> Result<Range<usize>> {
        match self.require(name)? {
            Param::Range(range) => Ok(range.clone()),
            other => Err(wrong_param(name, "range", other)),
        }
    }

    pub fn ranges(&self, name: &str) -> Result<&[Range<usize>]> {
        match self.require(name)? {
            Param::Ranges(ranges) => Ok(ranges),
            other => Err(wrong_param(name, "list of ranges", other)),
        }
    }

    pub fn branches(&self, name: &str) -> Result<&[Option<Arc<Program>>]> {
        match self.require(name)? {
            Param::Branches(branches) => Ok(branches),
            other => Err(wrong_param(name, "branch list", other)),
        }
    }

    /// Boolean parameter, `default` if absent.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.0.get(name) {
            None => Ok(default),
            Some(Param::Bool(b)) => Ok(*b),
            Some(other) => Err(wrong_param(name, "bool", other)),
        }
    }

    /// Optional integer parameter.
    pub fn int_opt(&self, name: &str) -> Result<Option<i64>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(Param::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(wrong_param(name, "int", other)),
        }
    }
}

fn wrong_param(name: &str, expected: &str, found: &Param) -> InterpError {
    InterpError::malformed(format!("parameter '{}' should be a {}, found {:?}", name, expected, found))
}

/// One step of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub primitive: Primitive,
    pub inputs: Vec<Atom>,
    pub outputs: Vec<Var>,
    pub params: Params,
}

impl Equation {
    pub fn new(primitive: Primitive, inputs: Vec<Atom>, outputs: Vec<Var>) -> Self {
        Self { primitive, inputs, outputs, params: Params::new() }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// An ordered list of equations over declared constants, inputs and outputs.
///
/// Constants (`constvars`) and inputs (`invars`) are both bound when a frame
/// starts; they differ only in who supplies them. Nested programs used by
/// control flow are stored in equation [`Params`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub constvars: Vec<Var>,
    pub invars: Vec<Var>,
    pub equations: Vec<Equation>,
    pub outvars: Vec<Atom>,
}

impl Program {
    /// Assembles a program without validating it.
    /// Prefer [`ProgramBuilder`], which checks variable scoping.
    pub fn new(constvars: Vec<Var>, invars: Vec<Var>, equations: Vec<Equation>, outvars: Vec<Atom>) -> Self {
        Self { constvars, invars, equations, outvars }
    }

    pub fn equation_count(&self) -> usize {
        self.equations.len()
    }

    /// Returns a copy with literal wire labels rewritten through `wire_map`.
    ///
    /// Rewrites the wire inputs of gate, measurement and mid-measurement
    /// equations, recursing into nested programs. Wires held in variables are
    /// only known at run time and are left untouched, as are wires absent from
    /// the map.
    pub fn map_wires(&self, wire_map: &HashMap<Wire, Wire>) -> Program {
        let equations = self.equations.iter().map(|eqn| map_equation_wires(eqn, wire_map)).collect();
        Program {
            constvars: self.constvars.clone(),
            invars: self.invars.clone(),
            equations,
            outvars: self.outvars.clone(),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = " ".repeat(indent);
        let ids = |vars: &[Var]| vars.iter().map(|v| v.id.to_string()).collect::<Vec<_>>().join(", ");
        writeln!(
            f,
            "{}program (consts: [{}], args: [{}], {} equations)",
            pad,
            ids(&self.constvars),
            ids(&self.invars),
            self.equation_count()
        )?;
        for (pc, eqn) in self.equations.iter().enumerate() {
            let inputs: Vec<String> = eqn.inputs.iter().map(|a| a.to_string()).collect();
            if eqn.outputs.is_empty() {
                writeln!(f, "{}  {:04}: {} {}", pad, pc, eqn.primitive, inputs.join(" "))?;
            } else {
                writeln!(f, "{}  {:04}: {} = {} {}", pad, pc, ids(&eqn.outputs), eqn.primitive, inputs.join(" "))?;
            }
            for (name, param) in eqn.params.iter() {
                match param {
                    Param::Program(sub) => {
                        writeln!(f, "{}        {}:", pad, name)?;
                        sub.fmt_indented(f, indent + 10)?;
                    }
                    Param::Branches(branches) => {
                        for (b, sub) in branches.iter().enumerate() {
                            match sub {
                                Some(sub) => {
                                    writeln!(f, "{}        {}[{}]:", pad, name, b)?;
                                    sub.fmt_indented(f, indent + 10)?;
                                }
                                None => writeln!(f, "{}        {}[{}]: <omitted>", pad, name, b)?,
                            }
                        }
                    }
                    other => writeln!(f, "{}        {} = {:?}", pad, name, other)?,
                }
            }
        }
        let outs: Vec<String> = self.outvars.iter().map(|a| a.to_string()).collect();
        writeln!(f, "{}  out: [{}]", pad, outs.join(", "))
    }
}

fn map_equation_wires(eqn: &Equation, wire_map: &HashMap<Wire, Wire>) -> Equation {
    let first_wire = match &eqn.primitive {
        Primitive::Operation(gate) => Some(gate.num_params()),
        Primitive::Measurement(_) | Primitive::MidMeasureStatistic(_) => Some(0),
        Primitive::Named(name) if name == primitives::MEASURE => Some(0),
        Primitive::Named(_) => None,
    };
    let inputs = eqn
        .inputs
        .iter()
        .enumerate()
        .map(|(i, atom)| match (first_wire, atom) {
            (Some(start), Atom::Lit(Value::Int(index))) if i >= start && *index >= 0 => {
                let wire = Wire(*index as usize);
                Atom::wire(wire_map.get(&wire).unwrap_or(&wire).0)
            }
            _ => atom.clone(),
        })
        .collect();

    let mut params = Params::new();
    for (name, param) in eqn.params.iter() {
        let mapped = match param {
            Param::Program(sub) => Param::Program(Arc::new(sub.map_wires(wire_map))),
            Param::Branches(branches) => Param::Branches(
                branches
                    .iter()
                    .map(|b| b.as_ref().map(|sub| Arc::new(sub.map_wires(wire_map))))
                    .collect(),
            ),
            other => other.clone(),
        };
        params.insert(name.clone(), mapped);
    }

    Equation { primitive: eqn.primitive.clone(), inputs, outputs: eqn.outputs.clone(), params }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

// --- Program Builder ---

/// One arm of a multi-way conditional passed to [`ProgramBuilder::cond`].
#[derive(Debug, Clone)]
pub struct Branch {
    pub predicate: Atom,
    /// `None` marks an omitted branch.
    pub body: Option<Program>,
    pub consts: Vec<Atom>,
}

impl Branch {
    pub fn new(predicate: impl Into<Atom>, body: Program) -> Self {
        Self { predicate: predicate.into(), body: Some(body), consts: Vec::new() }
    }

    pub fn omitted(predicate: impl Into<Atom>) -> Self {
        Self { predicate: predicate.into(), body: None, consts: Vec::new() }
    }

    pub fn with_consts(mut self, consts: Vec<Atom>) -> Self {
        self.consts = consts;
        self
    }
}

/// Facilitates the construction of [`Program`] instances.
///
/// Allocates fresh variables, emits equations in call order and validates
/// variable scoping on [`build`](ProgramBuilder::build).
///
/// # Examples
/// ```
/// # use qflow::vm::{Atom, ProgramBuilder, VarType};
/// # use qflow::operations::{Gate, MeasurementKind, PauliWord};
/// let mut pb = ProgramBuilder::new();
/// let theta = pb.invar(VarType::Float);
/// pb.gate(Gate::RX, &[theta.into()], &[Atom::wire(0)]);
/// let z = pb.measure(MeasurementKind::Expval(PauliWord::z()), &[Atom::wire(0)]);
/// pb.outputs(&[z.into()]);
/// let program = pb.build().expect("valid program");
/// assert_eq!(program.equation_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    next_id: u32,
    constvars: Vec<Var>,
    invars: Vec<Var>,
    equations: Vec<Equation>,
    outvars: Vec<Atom>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a variable without declaring it anywhere.
    pub fn fresh(&mut self, ty: VarType) -> Var {
        let var = Var::new(VarId(self.next_id), ty);
        self.next_id += 1;
        var
    }

    /// Declares a constant input.
    pub fn constvar(&mut self, ty: VarType) -> Var {
        let var = self.fresh(ty);
        self.constvars.push(var);
        var
    }

    /// Declares a positional argument.
    pub fn invar(&mut self, ty: VarType) -> Var {
        let var = self.fresh(ty);
        self.invars.push(var);
        var
    }

    /// Appends a raw equation.
    pub fn equation(&mut self, equation: Equation) -> &mut Self {
        self.equations.push(equation);
        self
    }

    /// Applies `gate` with the given parameters and wires.
    pub fn gate(&mut self, gate: Gate, params: &[Atom], wires: &[Atom]) -> &mut Self {
        let inputs = params.iter().chain(wires).cloned().collect();
        self.equation(Equation::new(Primitive::Operation(gate), inputs, vec![]))
    }

    /// Terminal measurement; returns the variable holding its result.
    pub fn measure(&mut self, kind: MeasurementKind, wires: &[Atom]) -> Var {
        let ty = match kind {
            MeasurementKind::Expval(_) | MeasurementKind::Var(_) => VarType::Float,
            _ => VarType::Array,
        };
        let out = self.fresh(ty);
        self.equation(Equation::new(Primitive::Measurement(kind), wires.to_vec(), vec![out]));
        out
    }

    /// Mid-computation measurement of `wire`; returns the outcome variable.
    pub fn mid_measure(&mut self, wire: Atom, reset: bool, postselect: Option<u8>) -> Var {
        let out = self.fresh(VarType::Int);
        let mut params = Params::new();
        params.insert("reset", Param::Bool(reset));
        if let Some(value) = postselect {
            params.insert("postselect", Param::Int(i64::from(value)));
        }
        self.equation(
            Equation::new(Primitive::named(primitives::MEASURE), vec![wire], vec![out]).with_params(params),
        );
        out
    }

    /// Applies a named classical primitive such as [`primitives::ADD`].
    pub fn classical(&mut self, name: &'static str, inputs: &[Atom], ty: VarType) -> Var {
        let out = self.fresh(ty);
        self.equation(Equation::new(Primitive::named(name), inputs.to_vec(), vec![out]));
        out
    }

    /// Bounded loop `for i in start..stop by step`.
    ///
    /// `body` receives `consts` as constvars and `(i, *carried)` as invars and
    /// must return the next carried values.
    pub fn for_loop(
        &mut self,
        bounds: [Atom; 3],
        body: Program,
        consts: &[Atom],
        args: &[Atom],
    ) -> Vec<Var> {
        let outputs = self.fresh_like(&body.outvars);
        let mut inputs: Vec<Atom> = bounds.into_iter().collect();
        inputs.extend(consts.iter().cloned());
        inputs.extend(args.iter().cloned());

        let mut params = Params::new();
        params
            .insert("body", Param::Program(Arc::new(body)))
            .insert("consts_slice", Param::Range(0..consts.len()))
            .insert("args_slice", Param::Range(consts.len()..consts.len() + args.len()));
        self.equation(
            Equation::new(Primitive::named(primitives::FOR_LOOP), inputs, outputs.clone()).with_params(params),
        );
        outputs
    }

    /// Conditional loop: runs `body` while `cond` returns a truthy value.
    pub fn while_loop(
        &mut self,
        cond: Program,
        body: Program,
        cond_consts: &[Atom],
        body_consts: &[Atom],
        args: &[Atom],
    ) -> Vec<Var> {
        let outputs = self.fresh_like(&body.outvars);
        let inputs: Vec<Atom> = body_consts.iter().chain(cond_consts).chain(args).cloned().collect();
        let body_end = body_consts.len();
        let cond_end = body_end + cond_consts.len();

        let mut params = Params::new();
        params
            .insert("body", Param::Program(Arc::new(body)))
            .insert("cond", Param::Program(Arc::new(cond)))
            .insert("body_slice", Param::Range(0..body_end))
            .insert("cond_slice", Param::Range(body_end..cond_end))
            .insert("args_slice", Param::Range(cond_end..cond_end + args.len()));
        self.equation(
            Equation::new(Primitive::named(primitives::WHILE_LOOP), inputs, outputs.clone()).with_params(params),
        );
        outputs
    }

    /// Multi-way branch; the first arm with a truthy predicate and a body runs.
    pub fn cond(&mut self, branches: Vec<Branch>, args: &[Atom]) -> Vec<Var> {
        let outputs = branches
            .iter()
            .find_map(|b| b.body.as_ref())
            .map(|body| self.fresh_like(&body.outvars))
            .unwrap_or_default();

        let mut inputs: Vec<Atom> = branches.iter().map(|b| b.predicate.clone()).collect();
        let mut consts_slices = Vec::with_capacity(branches.len());
        for branch in &branches {
            let start = inputs.len();
            inputs.extend(branch.consts.iter().cloned());
            consts_slices.push(start..inputs.len());
        }
        let args_start = inputs.len();
        inputs.extend(args.iter().cloned());

        let mut params = Params::new();
        params
            .insert(
                "branches",
                Param::Branches(branches.into_iter().map(|b| b.body.map(Arc::new)).collect()),
            )
            .insert("consts_slices", Param::Ranges(consts_slices))
            .insert("args_slice", Param::Range(args_start..inputs.len()));
        self.equation(Equation::new(Primitive::named(primitives::COND), inputs, outputs.clone()).with_params(params));
        outputs
    }

    /// Declares the program outputs.
    pub fn outputs(&mut self, outvars: &[Atom]) -> &mut Self {
        self.outvars = outvars.to_vec();
        self
    }

    /// Builds the final [`Program`], checking variable scoping.
    pub fn build(self) -> Result<Program> {
        let program = Program::new(self.constvars, self.invars, self.equations, self.outvars);
        validate_program(&program)?;
        Ok(program)
    }

    fn fresh_like(&mut self, atoms: &[Atom]) -> Vec<Var> {
        atoms.iter().map(|a| self.fresh(a.ty())).collect()
    }
}
