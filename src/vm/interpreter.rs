// src/vm/interpreter.rs

//! The program interpreter.

use super::environment::Environment;
use super::primitives::{self, DEFAULT_PRIMITIVES, PrimitiveTable};
use super::program::{Primitive, Program, Var};
use super::value::Value;
use crate::core::constants::MAX_WIRES;
use crate::core::{InterpError, PrngKey, Result, ShotConfig, Shots, StateVector, UnsupportedFeature};
use crate::operations::{Gate, MeasurementKind, MeasurementProcess, Operation};
use crate::simulation::{capture, engine, measure, sampling};
use crate::validation::check_normalization;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Settings fixed for the lifetime of an [`Interpreter`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    pub num_wires: usize,
    pub shots: ShotConfig,
    /// Seed of the first invocation's key. Drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl InterpreterConfig {
    pub fn new(num_wires: usize) -> Self {
        Self { num_wires, shots: ShotConfig::None, seed: None }
    }

    pub fn with_shots(mut self, shots: impl Into<ShotConfig>) -> Self {
        self.shots = shots.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The mutable state shared by all frames of one invocation.
#[derive(Debug)]
pub struct ExecutionState {
    pub state: StateVector,
    pub key: PrngKey,
}

/// Evaluates [`Program`]s against a simulated quantum state.
///
/// A top-level call to [`eval`](Interpreter::eval) allocates a fresh
/// [`ExecutionState`] (the `|0...0>` state plus the current key), evaluates
/// the program equation by equation and detaches the state again when it
/// returns, whether it succeeded or not. The key reached at that point seeds
/// the next top-level call, so repeated calls draw fresh randomness while a
/// fixed seed keeps a sequence of calls reproducible.
///
/// Control-flow handlers evaluate nested programs through
/// [`child_frame`](Interpreter::child_frame): a new frame with its own empty
/// environment that shares the caller's execution state.
///
/// # Examples
/// ```
/// # use qflow::vm::{Atom, Interpreter, InterpreterConfig, ProgramBuilder, Value, VarType};
/// # use qflow::operations::{Gate, MeasurementKind, PauliWord};
/// # fn main() -> qflow::Result<()> {
/// let mut pb = ProgramBuilder::new();
/// let theta = pb.invar(VarType::Float);
/// pb.gate(Gate::RX, &[theta.into()], &[Atom::wire(0)]);
/// let z = pb.measure(MeasurementKind::Expval(PauliWord::z()), &[Atom::wire(0)]);
/// pb.outputs(&[z.into()]);
/// let program = pb.build()?;
///
/// let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(7))?;
/// let out = interp.call(&program, &[Value::Float(std::f64::consts::PI)])?;
/// assert!((out[0].as_float()? + 1.0).abs() < 1e-12);
/// assert!(!interp.is_executing());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Interpreter {
    num_wires: usize,
    shots: Shots,
    /// Key the next top-level invocation starts from.
    initial_key: PrngKey,
    primitives: Arc<PrimitiveTable>,
    /// Present only while an invocation is running.
    state_ref: Option<Rc<RefCell<ExecutionState>>>,
    env: Environment,
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter using the built-in primitive table.
    ///
    /// # Errors
    /// * `InvalidConfig` for zero wires, more than [`MAX_WIRES`] wires, or zero shots.
    /// * `Unsupported(PartitionedShots)` for shot vectors.
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        Self::build(config, Arc::clone(&DEFAULT_PRIMITIVES))
    }

    /// Creates an interpreter dispatching named primitives through `primitives`.
    pub fn with_primitives(config: InterpreterConfig, primitives: PrimitiveTable) -> Result<Self> {
        Self::build(config, Arc::new(primitives))
    }

    fn build(config: InterpreterConfig, primitives: Arc<PrimitiveTable>) -> Result<Self> {
        if config.num_wires == 0 || config.num_wires > MAX_WIRES {
            return Err(InterpError::InvalidConfig {
                message: format!("num_wires must be between 1 and {}, got {}", MAX_WIRES, config.num_wires),
            });
        }
        let shots = Shots::from_config(&config.shots)?;
        let initial_key = config.seed.map_or_else(PrngKey::from_entropy, PrngKey::new);
        debug!(num_wires = config.num_wires, %shots, "interpreter created");
        Ok(Self {
            num_wires: config.num_wires,
            shots,
            initial_key,
            primitives,
            state_ref: None,
            env: Environment::new(),
            depth: 0,
        })
    }

    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    pub fn shots(&self) -> Shots {
        self.shots
    }

    pub fn primitives(&self) -> &PrimitiveTable {
        &self.primitives
    }

    /// True between setup and cleanup of a top-level invocation.
    pub fn is_executing(&self) -> bool {
        self.state_ref.is_some()
    }

    /// Key the next top-level invocation will start from.
    pub fn initial_key(&self) -> PrngKey {
        self.initial_key
    }

    /// The current key: the live one during an invocation, otherwise the key
    /// the next invocation starts from.
    pub fn key(&self) -> PrngKey {
        match &self.state_ref {
            Some(state_ref) => state_ref.borrow().key,
            None => self.initial_key,
        }
    }

    /// Replaces the live key.
    ///
    /// # Errors
    /// `StateLifecycle` outside of an invocation.
    pub fn set_key(&mut self, key: PrngKey) -> Result<()> {
        self.state_ref()?.borrow_mut().key = key;
        Ok(())
    }

    /// Snapshot of the live state.
    ///
    /// # Errors
    /// `StateLifecycle` outside of an invocation.
    pub fn state(&self) -> Result<StateVector> {
        Ok(self.state_ref()?.borrow().state.clone())
    }

    /// Replaces the live state.
    ///
    /// # Errors
    /// * `StateLifecycle` outside of an invocation.
    /// * `InvalidState` if `state` has the wrong dimension or is not normalized.
    pub fn set_state(&mut self, state: StateVector) -> Result<()> {
        if state.num_wires() != self.num_wires {
            return Err(InterpError::InvalidState {
                message: format!("expected a {}-wire state, got {} wires", self.num_wires, state.num_wires()),
            });
        }
        check_normalization(&state, None)?;
        self.state_ref()?.borrow_mut().state = state;
        Ok(())
    }

    /// Splits the live key, keeps the carry half and returns the draw half.
    ///
    /// Every consumer of randomness goes through here so that no key is ever
    /// used twice.
    pub fn split_key(&mut self) -> Result<PrngKey> {
        let state_ref = self.state_ref()?;
        let mut execution = state_ref.borrow_mut();
        let (carry, draw) = execution.key.split();
        execution.key = carry;
        trace!(%carry, "key split");
        Ok(draw)
    }

    /// Runs `f` on the live state.
    ///
    /// `f` must not re-enter the interpreter.
    pub fn with_state<T>(&mut self, f: impl FnOnce(&mut StateVector) -> Result<T>) -> Result<T> {
        let state_ref = self.state_ref()?;
        let mut execution = state_ref.borrow_mut();
        f(&mut execution.state)
    }

    fn state_ref(&self) -> Result<&Rc<RefCell<ExecutionState>>> {
        self.state_ref.as_ref().ok_or_else(|| InterpError::StateLifecycle {
            message: "no execution state: the interpreter is not running a program".to_string(),
        })
    }

    /// A new frame sharing this frame's configuration, primitive table and
    /// execution state, with an empty environment.
    pub fn child_frame(&self) -> Interpreter {
        Interpreter {
            num_wires: self.num_wires,
            shots: self.shots,
            initial_key: self.initial_key,
            primitives: Arc::clone(&self.primitives),
            state_ref: self.state_ref.clone(),
            env: Environment::new(),
            depth: self.depth + 1,
        }
    }

    /// Evaluates `program` in a [`child_frame`](Interpreter::child_frame).
    ///
    /// This is how handlers run nested programs: the calling frame keeps its
    /// bindings while the nested program advances the shared state and key.
    pub fn eval_child(&self, program: &Program, consts: &[Value], args: &[Value]) -> Result<Vec<Value>> {
        self.child_frame().eval(program, consts, args)
    }

    /// Evaluates `program` with no constants.
    pub fn call(&mut self, program: &Program, args: &[Value]) -> Result<Vec<Value>> {
        self.eval(program, &[], args)
    }

    /// Evaluates `program`, binding `consts` to its constvars and `args` to
    /// its invars, and returns the values of its outvars.
    ///
    /// If no execution state is attached, this call allocates one and
    /// detaches it before returning; otherwise it runs on the attached state.
    ///
    /// # Errors
    /// Any error raised while evaluating an equation, unchanged.
    #[instrument(level = "debug", skip_all, fields(depth = self.depth, equations = program.equations.len()))]
    pub fn eval(&mut self, program: &Program, consts: &[Value], args: &[Value]) -> Result<Vec<Value>> {
        let owns_state = self.setup()?;
        let result = self.eval_frame(program, consts, args);
        if owns_state {
            self.cleanup();
        }
        self.env.clear();
        result
    }

    fn setup(&mut self) -> Result<bool> {
        if self.state_ref.is_some() {
            return Ok(false);
        }
        let state = engine::create_initial_state(self.num_wires)?;
        debug!(key = %self.initial_key, "execution state attached");
        self.state_ref = Some(Rc::new(RefCell::new(ExecutionState { state, key: self.initial_key })));
        Ok(true)
    }

    fn cleanup(&mut self) {
        if let Some(state_ref) = self.state_ref.take() {
            self.initial_key = state_ref.borrow().key;
            debug!(key = %self.initial_key, "execution state detached");
        }
    }

    fn eval_frame(&mut self, program: &Program, consts: &[Value], args: &[Value]) -> Result<Vec<Value>> {
        self.env.clear();
        bind_all(&mut self.env, "constvars", &program.constvars, consts)?;
        bind_all(&mut self.env, "invars", &program.invars, args)?;

        for (pc, eqn) in program.equations.iter().enumerate() {
            trace!(pc, primitive = %eqn.primitive, "equation");
            let invals = eqn.inputs.iter().map(|atom| self.env.read(atom)).collect::<Result<Vec<_>>>()?;

            let outvals = match &eqn.primitive {
                Primitive::Operation(gate) => {
                    self.interpret_operation(*gate, &invals)?;
                    Vec::new()
                }
                Primitive::Measurement(kind) => vec![self.interpret_measurement_eqn(kind, &invals)?],
                Primitive::MidMeasureStatistic(_) => {
                    return Err(InterpError::Unsupported(UnsupportedFeature::MidMeasurePostprocessing));
                }
                Primitive::Named(name) => {
                    let handler = Arc::clone(self.primitives.get(name)?);
                    handler(self, &invals, &eqn.params)?
                }
            };

            // A cond that selected no branch leaves its outputs unbound.
            if outvals.is_empty() && is_cond(&eqn.primitive) {
                continue;
            }
            if outvals.len() != eqn.outputs.len() {
                return Err(InterpError::ArityMismatch {
                    context: format!("outputs of equation {} ({})", pc, eqn.primitive),
                    expected: eqn.outputs.len(),
                    found: outvals.len(),
                });
            }
            for (var, value) in eqn.outputs.iter().zip(outvals) {
                self.env.bind(var, value);
            }
        }

        program.outvars.iter().map(|atom| self.env.read(atom)).collect()
    }

    fn interpret_operation(&mut self, gate: Gate, invals: &[Value]) -> Result<()> {
        let num_params = gate.num_params();
        if invals.len() != num_params + gate.num_wires() {
            return Err(InterpError::ArityMismatch {
                context: format!("inputs of {}", gate),
                expected: num_params + gate.num_wires(),
                found: invals.len(),
            });
        }
        let params = invals[..num_params].iter().map(Value::as_float).collect::<Result<Vec<_>>>()?;
        let wires = invals[num_params..].iter().map(Value::as_wire).collect::<Result<Vec<_>>>()?;
        let op = Operation::new(gate, params, wires)?;
        self.with_state(|state| engine::apply_operation(&op, state))
    }

    fn interpret_measurement_eqn(&mut self, kind: &MeasurementKind, invals: &[Value]) -> Result<Value> {
        let wires = invals.iter().map(Value::as_wire).collect::<Result<Vec<_>>>()?;
        let mp = MeasurementProcess::new(kind.clone(), wires)?;
        self.interpret_measurement(&mp)
    }

    /// Computes a terminal measurement on the live state.
    ///
    /// Analytic mode computes the exact statistic. With finite shots the key
    /// is split and the draw half seeds the sampler. Basis rotations applied
    /// by the measurement code are kept out of the operation journal.
    ///
    /// # Errors
    /// `StateLifecycle` outside of an invocation, plus whatever the
    /// measurement collaborators report.
    pub fn interpret_measurement(&mut self, mp: &MeasurementProcess) -> Result<Value> {
        let _suspended = capture::suspend();
        match self.shots {
            Shots::Analytic => {
                let execution = self.state_ref()?.borrow();
                measure::measure(mp, &execution.state)
            }
            Shots::Finite(shots) => {
                let draw = self.split_key()?;
                let execution = self.state_ref()?.borrow();
                let mut values = sampling::measure_with_samples(std::slice::from_ref(mp), &execution.state, shots, draw)?;
                values.pop().ok_or_else(|| InterpError::Sampling {
                    message: format!("sampler returned no value for {}", mp),
                })
            }
        }
    }
}

fn is_cond(primitive: &Primitive) -> bool {
    matches!(primitive, Primitive::Named(name) if name == primitives::COND)
}

fn bind_all(env: &mut Environment, what: &str, vars: &[Var], values: &[Value]) -> Result<()> {
    if vars.len() != values.len() {
        return Err(InterpError::ArityMismatch {
            context: what.to_string(),
            expected: vars.len(),
            found: values.len(),
        });
    }
    for (var, value) in vars.iter().zip(values) {
        env.bind(var, value.clone());
    }
    Ok(())
}
