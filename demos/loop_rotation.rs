//! Example: A parameterised rotation loop.
//! Applies RY(theta / n) n times inside a `for_loop`, compares the analytic
//! expectation with a finite-shot estimate, and prints the program.

use qflow::operations::{Gate, MeasurementKind, PauliWord};
use qflow::vm::{primitives, Atom, ProgramBuilder, VarType};
use qflow::{Interpreter, InterpreterConfig, Value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("--- qflow Example: Rotation Loop ---");

    // body(step; i) = RY(step) on wire 0
    let mut body = ProgramBuilder::new();
    let step = body.constvar(VarType::Float);
    let _i = body.invar(VarType::Int);
    body.gate(Gate::RY, &[step.into()], &[Atom::wire(0)]);
    let body = body.build()?;

    let mut pb = ProgramBuilder::new();
    let theta = pb.invar(VarType::Float);
    let n = pb.invar(VarType::Int);
    let step = pb.classical(primitives::DIV, &[theta.into(), n.into()], VarType::Float);
    pb.for_loop([0i64.into(), n.into(), 1i64.into()], body, &[step.into()], &[]);
    let z = pb.measure(MeasurementKind::Expval(PauliWord::z()), &[Atom::wire(0)]);
    pb.outputs(&[z.into()]);
    let program = pb.build()?;

    println!("\nProgram:\n{}", program);

    let theta = 2.0f64;
    let args = [Value::Float(theta), Value::Int(8)];

    let mut analytic = Interpreter::new(InterpreterConfig::new(1).with_seed(7))?;
    let exact = analytic.call(&program, &args)?;
    println!("analytic <Z> = {}", exact[0]);

    let mut sampled = Interpreter::new(InterpreterConfig::new(1).with_shots(10_000u64).with_seed(7))?;
    let estimate = sampled.call(&program, &args)?;
    println!("10000-shot <Z> = {}", estimate[0]);
    println!("cos(theta) = {:.6}", theta.cos());

    Ok(())
}
