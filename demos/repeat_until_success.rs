//! Example: Repeat-until-success with a `while_loop`.
//! Measures a wire prepared in |+> until it reads 1, resetting it after each
//! attempt, and reports how many attempts each invocation needed.

use qflow::operations::Gate;
use qflow::vm::{primitives, Atom, ProgramBuilder, VarType};
use qflow::{Interpreter, InterpreterConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("--- qflow Example: Repeat Until Success ---");

    // cond(outcome, attempts) = outcome == 0
    let mut cond = ProgramBuilder::new();
    let outcome = cond.invar(VarType::Int);
    let _attempts = cond.invar(VarType::Int);
    let retry = cond.classical(primitives::EQ, &[outcome.into(), 0i64.into()], VarType::Bool);
    cond.outputs(&[retry.into()]);

    // body(outcome, attempts) = (measure(H|0>, reset), attempts + 1)
    let mut body = ProgramBuilder::new();
    let _outcome = body.invar(VarType::Int);
    let attempts = body.invar(VarType::Int);
    body.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
    let m = body.mid_measure(Atom::wire(0), true, None);
    let next = body.classical(primitives::ADD, &[attempts.into(), 1i64.into()], VarType::Int);
    body.outputs(&[m.into(), next.into()]);

    let mut pb = ProgramBuilder::new();
    let outs = pb.while_loop(cond.build()?, body.build()?, &[], &[], &[0i64.into(), 0i64.into()]);
    pb.outputs(&[outs[1].into()]);
    let program = pb.build()?;

    println!("\nProgram:\n{}", program);

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(99))?;
    let mut total = 0i64;
    let runs = 200;
    for _ in 0..runs {
        total += interp.call(&program, &[])?[0].as_int()?;
    }
    println!("average attempts over {} runs: {:.3} (expected 2)", runs, total as f64 / runs as f64);
    println!("next invocation starts from {}", interp.initial_key());

    Ok(())
}
