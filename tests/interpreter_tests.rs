// tests/interpreter_tests.rs

use num_complex::Complex;
use qflow::operations::{Gate, MeasurementKind, MeasurementProcess, MidMeasure, Operation, Pauli, PauliWord};
use qflow::simulation::{MidMeasureRecord, apply_mid_measure, apply_operation, capture, create_initial_state, measure};
use qflow::vm::{
    primitives, Atom, Equation, Interpreter, InterpreterConfig, Param, Params, Primitive, PrimitiveTable, Program,
    ProgramBuilder, Value, Var, VarId, VarType,
};
use qflow::{InterpError, PrngKey, ShotConfig, StateVector, UnsupportedFeature, Wire, validate_program};
use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

/// `H(0); m = measure(0); CNOT(0, 1); probs()`
fn measure_then_entangle() -> Result<Program, Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
    let m = pb.mid_measure(Atom::wire(0), false, None);
    pb.gate(Gate::CNOT, &[], &[Atom::wire(0), Atom::wire(1)]);
    let probs = pb.measure(MeasurementKind::Probs, &[]);
    pb.outputs(&[m.into(), probs.into()]);
    Ok(pb.build()?)
}

#[test]
fn test_eval_matches_manually_threaded_simulation() -> Result<(), Box<dyn std::error::Error>> {
    let program = measure_then_entangle()?;
    let mut interp = Interpreter::new(InterpreterConfig::new(2).with_seed(123))?;
    let out = interp.call(&program, &[])?;

    let mut state = create_initial_state(2)?;
    apply_operation(&Operation::fixed(Gate::Hadamard, &[0])?, &mut state)?;
    let (carry, draw) = PrngKey::new(123).split();
    let mp = MidMeasure { wire: Wire(0), reset: false, postselect: None };
    let mut record = MidMeasureRecord::new();
    apply_mid_measure(&mp, &mut state, &mut record, draw)?;
    apply_operation(&Operation::fixed(Gate::CNOT, &[0, 1])?, &mut state)?;
    let probs = measure(&MeasurementProcess::new(MeasurementKind::Probs, vec![])?, &state)?;

    assert_eq!(out[0], Value::Int(record.get(&mp).ok_or("no outcome")?));
    assert_eq!(out[1], probs);
    assert_eq!(interp.key(), carry);
    Ok(())
}

#[test]
fn test_key_carries_over_between_invocations() -> Result<(), Box<dyn std::error::Error>> {
    let program = measure_then_entangle()?;
    let mut interp = Interpreter::new(InterpreterConfig::new(2).with_seed(5))?;
    assert!(!interp.is_executing());
    interp.call(&program, &[])?;
    let after_first = interp.initial_key();
    assert_eq!(after_first, PrngKey::new(5).split().0);

    // a fresh interpreter seeded with the carried key replays the second call
    let second = interp.call(&program, &[])?;
    let mut replay = Interpreter::new(InterpreterConfig::new(2).with_seed(after_first.seed()))?;
    assert_eq!(second, replay.call(&program, &[])?);
    assert_eq!(interp.key(), replay.key());
    Ok(())
}

#[test]
fn test_state_is_fresh_for_every_invocation() -> Result<(), Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::PauliX, &[], &[Atom::wire(0)]);
    let probs = pb.measure(MeasurementKind::Probs, &[]);
    pb.outputs(&[probs.into()]);
    let program = pb.build()?;

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    for _ in 0..3 {
        assert_eq!(interp.call(&program, &[])?, vec![Value::Real(vec![0.0, 1.0])]);
    }
    Ok(())
}

#[test]
fn test_failed_invocation_detaches_and_keeps_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
    let _m = pb.mid_measure(Atom::wire(0), false, None);
    pb.equation(Equation::new(Primitive::named("no_such_primitive"), vec![], vec![]));
    let program = pb.build()?;

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(17))?;
    let err = interp.call(&program, &[]).unwrap_err();
    assert_eq!(err, InterpError::UnknownPrimitive { name: "no_such_primitive".to_string() });
    assert!(!interp.is_executing());
    assert_eq!(interp.key(), PrngKey::new(17).split().0);
    Ok(())
}

#[test]
fn test_state_access_outside_invocation_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut interp = Interpreter::new(InterpreterConfig::new(2).with_seed(3))?;
    assert!(matches!(interp.state(), Err(InterpError::StateLifecycle { .. })));
    assert!(matches!(interp.set_state(StateVector::zero(2)?), Err(InterpError::StateLifecycle { .. })));
    assert!(matches!(interp.split_key(), Err(InterpError::StateLifecycle { .. })));
    assert_eq!(interp.key(), PrngKey::new(3));
    Ok(())
}

#[test]
fn test_partitioned_shots_are_unsupported() {
    let config = InterpreterConfig::new(1).with_shots(ShotConfig::Partitioned(vec![10, 20]));
    let err = Interpreter::new(config).unwrap_err();
    assert_eq!(err.unsupported_feature(), Some(UnsupportedFeature::PartitionedShots));
}

#[test]
fn test_transforms_and_mid_measure_statistics_are_unsupported() -> Result<(), Box<dyn std::error::Error>> {
    let cases = [
        (Primitive::named(primitives::ADJOINT_TRANSFORM), UnsupportedFeature::AdjointTransform),
        (Primitive::named(primitives::CTRL_TRANSFORM), UnsupportedFeature::ControlledTransform),
        (Primitive::MidMeasureStatistic(MeasurementKind::Probs), UnsupportedFeature::MidMeasurePostprocessing),
    ];
    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    for (primitive, feature) in cases {
        let program = Program::new(vec![], vec![], vec![Equation::new(primitive, vec![], vec![])], vec![]);
        let err = interp.call(&program, &[]).unwrap_err();
        assert_eq!(err.unsupported_feature(), Some(feature), "{}", err);
        assert!(!interp.is_executing());
    }
    Ok(())
}

#[test]
fn test_unbound_variable_is_reported_at_runtime() -> Result<(), Box<dyn std::error::Error>> {
    let ghost = Var::new(VarId(5), VarType::Float);
    let out = Var::new(VarId(6), VarType::Float);
    let program = Program::new(
        vec![],
        vec![],
        vec![Equation::new(Primitive::named(primitives::NEG), vec![ghost.into()], vec![out])],
        vec![out.into()],
    );
    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    assert_eq!(interp.call(&program, &[]), Err(InterpError::UnboundVariable { var: VarId(5) }));
    Ok(())
}

#[test]
fn test_nested_frames_do_not_see_parent_bindings() -> Result<(), Box<dyn std::error::Error>> {
    // the loop body reads v0, which is bound only in the enclosing frame
    let outer = Var::new(VarId(0), VarType::Int);
    let i = Var::new(VarId(1), VarType::Int);
    let y = Var::new(VarId(2), VarType::Int);
    let body = Program::new(
        vec![],
        vec![i],
        vec![Equation::new(Primitive::named(primitives::NEG), vec![outer.into()], vec![y])],
        vec![],
    );
    let mut eqn = Equation::new(
        Primitive::named(primitives::FOR_LOOP),
        vec![0i64.into(), 1i64.into(), 1i64.into()],
        vec![],
    );
    eqn.params
        .insert("body", Param::Program(body.into()))
        .insert("consts_slice", Param::Range(0..0))
        .insert("args_slice", Param::Range(0..0));
    let program = Program::new(vec![], vec![outer], vec![eqn], vec![]);
    assert!(validate_program(&program).is_err());

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    assert_eq!(interp.call(&program, &[Value::Int(1)]), Err(InterpError::UnboundVariable { var: VarId(0) }));
    Ok(())
}

#[test]
fn test_operation_journal_excludes_measurement_rotations() -> Result<(), Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::Hadamard, &[], &[Atom::wire(0)]);
    let x = pb.measure(MeasurementKind::Expval(PauliWord(vec![Pauli::X])), &[Atom::wire(0)]);
    let y = pb.measure(MeasurementKind::Var(PauliWord(vec![Pauli::Y])), &[Atom::wire(0)]);
    pb.outputs(&[x.into(), y.into()]);
    let program = pb.build()?;

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    let (out, journal) = capture::record(|| interp.call(&program, &[]));
    let out = out?;
    assert!((out[0].as_float()? - 1.0).abs() < 1e-9);
    assert!((out[1].as_float()? - 1.0).abs() < 1e-9);
    assert_eq!(journal, vec![Operation::fixed(Gate::Hadamard, &[0])?]);
    Ok(())
}

#[test]
fn test_journal_resumes_after_failing_measurement() -> Result<(), Box<dyn std::error::Error>> {
    // X observable on a wire outside the register fails while rotating
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::PauliX, &[], &[Atom::wire(0)]);
    let bad = pb.measure(MeasurementKind::Expval(PauliWord(vec![Pauli::X])), &[Atom::wire(4)]);
    pb.outputs(&[bad.into()]);
    let program = pb.build()?;

    let mut interp = Interpreter::new(InterpreterConfig::new(1).with_seed(0))?;
    let ((result, still_recording), journal) = capture::record(|| {
        let result = interp.call(&program, &[]);
        (result, capture::is_recording())
    });
    assert!(matches!(result, Err(InterpError::InvalidOperation { .. })));
    assert!(still_recording);
    assert_eq!(journal.len(), 1);
    Ok(())
}

#[test]
fn test_custom_primitive_can_drive_state() -> Result<(), Box<dyn std::error::Error>> {
    let mut table = PrimitiveTable::default();
    // prepare_plus(): overwrite the state with |+>, return the previous probabilities
    table.register("prepare_plus", |interp, _invals, _params| {
        let before = interp.state()?.probabilities();
        let h = Complex::new(FRAC_1_SQRT_2, 0.0);
        interp.set_state(StateVector::from_amplitudes(vec![h, h])?)?;
        Ok(vec![Value::Real(before)])
    });

    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::PauliX, &[], &[Atom::wire(0)]);
    let before = pb.fresh(VarType::Array);
    pb.equation(Equation::new(Primitive::named("prepare_plus"), vec![], vec![before]));
    let x = pb.measure(MeasurementKind::Expval(PauliWord(vec![Pauli::X])), &[Atom::wire(0)]);
    pb.outputs(&[before.into(), x.into()]);
    let program = pb.build()?;

    let mut interp = Interpreter::with_primitives(InterpreterConfig::new(1).with_seed(0), table)?;
    let out = interp.call(&program, &[])?;
    assert_eq!(out[0], Value::Real(vec![0.0, 1.0]));
    assert!((out[1].as_float()? - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_custom_primitive_runs_nested_program_in_child_frame() -> Result<(), Box<dyn std::error::Error>> {
    let mut table = PrimitiveTable::default();
    table.register("apply_body", |interp, invals, params| interp.eval_child(params.program("body")?, &[], invals));

    // double(n) = n + n
    let mut double = ProgramBuilder::new();
    let n = double.invar(VarType::Int);
    let twice = double.classical(primitives::ADD, &[n.into(), n.into()], VarType::Int);
    double.outputs(&[twice.into()]);
    let mut params = Params::new();
    params.insert("body", Param::Program(Arc::new(double.build()?)));

    let mut pb = ProgramBuilder::new();
    let x = pb.invar(VarType::Int);
    let y = pb.fresh(VarType::Int);
    pb.equation(Equation::new(Primitive::named("apply_body"), vec![x.into()], vec![y]).with_params(params));
    let z = pb.classical(primitives::ADD, &[x.into(), y.into()], VarType::Int);
    pb.outputs(&[z.into()]);
    let program = pb.build()?;

    let mut interp = Interpreter::with_primitives(InterpreterConfig::new(1).with_seed(0), table)?;
    assert_eq!(interp.call(&program, &[Value::Int(7)])?, vec![Value::Int(21)]);
    Ok(())
}

#[test]
fn test_set_state_rejects_unnormalized_vector() -> Result<(), Box<dyn std::error::Error>> {
    let mut table = PrimitiveTable::default();
    table.register("bad_state", |interp, _, _| {
        interp.set_state(StateVector::from_amplitudes(vec![Complex::new(1.0, 0.0); 2])?)?;
        Ok(vec![])
    });
    let program = Program::new(vec![], vec![], vec![Equation::new(Primitive::named("bad_state"), vec![], vec![])], vec![]);
    let mut interp = Interpreter::with_primitives(InterpreterConfig::new(1).with_seed(0), table)?;
    assert!(matches!(interp.call(&program, &[]), Err(InterpError::InvalidState { .. })));
    Ok(())
}

#[test]
fn test_empty_table_knows_no_control_flow() -> Result<(), Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    let _m = pb.mid_measure(Atom::wire(0), false, None);
    let program = pb.build()?;
    let mut interp = Interpreter::with_primitives(InterpreterConfig::new(1).with_seed(0), PrimitiveTable::empty())?;
    assert_eq!(
        interp.call(&program, &[]),
        Err(InterpError::UnknownPrimitive { name: primitives::MEASURE.to_string() })
    );
    Ok(())
}

#[test]
fn test_map_wires_relabels_program() -> Result<(), Box<dyn std::error::Error>> {
    let mut pb = ProgramBuilder::new();
    pb.gate(Gate::PauliX, &[], &[Atom::wire(0)]);
    let probs = pb.measure(MeasurementKind::Probs, &[Atom::wire(0), Atom::wire(1)]);
    pb.outputs(&[probs.into()]);
    let program = pb.build()?;
    let swapped = program.map_wires(&HashMap::from([(Wire(0), Wire(1)), (Wire(1), Wire(0))]));

    let mut interp = Interpreter::new(InterpreterConfig::new(2).with_seed(0))?;
    // X lands on wire 1, and the measurement reads wires in the order (1, 0)
    assert_eq!(interp.call(&program, &[])?, vec![Value::Real(vec![0.0, 0.0, 1.0, 0.0])]);
    assert_eq!(interp.call(&swapped, &[])?, vec![Value::Real(vec![0.0, 0.0, 1.0, 0.0])]);

    let mut state_only = ProgramBuilder::new();
    state_only.gate(Gate::PauliX, &[], &[Atom::wire(0)]);
    let state = state_only.measure(MeasurementKind::Probs, &[]);
    state_only.outputs(&[state.into()]);
    let moved = state_only.build()?.map_wires(&HashMap::from([(Wire(0), Wire(1))]));
    assert_eq!(interp.call(&moved, &[])?, vec![Value::Real(vec![0.0, 1.0, 0.0, 0.0])]);
    Ok(())
}
