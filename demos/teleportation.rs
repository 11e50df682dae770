//! Example: Quantum teleportation with mid-circuit measurement.
//! Prepares RY(theta)|0> on wire 0, teleports it to wire 2, and applies the
//! classical corrections through `cond` branches driven by the measured bits.
//!
//! Run with `RUST_LOG=qflow=debug` to see frame and branch logging.

use qflow::operations::{Gate, MeasurementKind, Pauli, PauliWord};
use qflow::vm::{Atom, Branch, ProgramBuilder, VarType};
use qflow::{Interpreter, InterpreterConfig, Program, Value};
use tracing_subscriber::EnvFilter;

fn correction(gate: Gate) -> qflow::Result<Program> {
    let mut pb = ProgramBuilder::new();
    pb.gate(gate, &[], &[Atom::wire(2)]);
    pb.build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("--- qflow Example: Quantum Teleportation (mid-circuit measurement) ---");

    let mut pb = ProgramBuilder::new();
    let theta = pb.invar(VarType::Float);
    // 1. Message state on wire 0
    pb.gate(Gate::RY, &[theta.into()], &[Atom::wire(0)]);
    // 2. Bell pair between wires 1 and 2
    pb.gate(Gate::Hadamard, &[], &[Atom::wire(1)]);
    pb.gate(Gate::CNOT, &[], &[Atom::wire(1), Atom::wire(2)]);
    // 3. Bell-basis measurement of wires 0 and 1
    pb.gate(Gate::CNOT, &[], &[Atom::wire(0), Atom::wire(1)]);
    pb.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
    let m_msg = pb.mid_measure(Atom::wire(0), false, None);
    let m_alice = pb.mid_measure(Atom::wire(1), false, None);
    // 4. Corrections on wire 2
    pb.cond(vec![Branch::new(m_alice, correction(Gate::PauliX)?)], &[]);
    pb.cond(vec![Branch::new(m_msg, correction(Gate::PauliZ)?)], &[]);
    // 5. Verify on the receiving wire
    let z = pb.measure(MeasurementKind::Expval(PauliWord::z()), &[Atom::wire(2)]);
    let x = pb.measure(MeasurementKind::Expval(PauliWord(vec![Pauli::X])), &[Atom::wire(2)]);
    pb.outputs(&[m_msg.into(), m_alice.into(), z.into(), x.into()]);
    let program = pb.build()?;

    println!("\nTeleportation program:\n{}", program);

    let theta = 1.1f64;
    let mut interp = Interpreter::new(InterpreterConfig::new(3).with_seed(2024))?;
    for run in 0..4 {
        let out = interp.call(&program, &[Value::Float(theta)])?;
        println!(
            "run {}: m_msg={} m_alice={} <Z>={} <X>={}",
            run, out[0], out[1], out[2], out[3]
        );
    }
    println!("\nExpected on wire 2: <Z>={:.6} <X>={:.6}", theta.cos(), theta.sin());

    Ok(())
}
