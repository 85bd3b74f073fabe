use ministack_core::ScriptHash;
use ministack_vm::{
    ExecutionEngine, InteropHost, NullHost, Opcode, ScriptBuilder, StackItem, SyscallScope,
    VmError, VmState,
};
use num_bigint::BigInt;
use std::collections::HashMap;

fn run_to_end(engine: &mut ExecutionEngine, host: &mut dyn InteropHost) {
    while engine.state().is_none() {
        engine.step_into(host);
    }
}

fn run_script(script: Vec<u8>) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new();
    engine.load_script(script);
    run_to_end(&mut engine, &mut NullHost);
    engine
}

#[test]
fn test_push_and_ret() {
    // PUSH1
    // RET
    let engine = run_script(vec![0x51, 0x66]);

    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
}

#[test]
fn test_add() {
    // PUSH2, PUSH3, ADD, RET
    let engine = run_script(vec![0x52, 0x53, 0x93, 0x66]);

    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(5)));
}

#[test]
fn test_div_truncates_and_faults_on_zero() {
    // PUSH7, PUSH2, DIV, RET
    let engine = run_script(vec![0x57, 0x52, 0x96, 0x66]);
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(3)));

    // PUSH1, PUSH0, DIV
    let engine = run_script(vec![0x51, 0x00, 0x96]);
    assert!(engine.state().contains(VmState::FAULT));
    assert_eq!(engine.last_error(), Some(&VmError::DivisionByZero));
}

#[test]
fn test_literal_push_lands_as_bytes() {
    // PUSHBYTES2 [0xAB, 0xCD], RET
    let engine = run_script(vec![0x02, 0xAB, 0xCD, 0x66]);
    assert_eq!(engine.peek(0), Some(&StackItem::from_bytes(vec![0xAB, 0xCD])));
}

#[test]
fn test_implicit_ret_at_end_of_script() {
    // PUSH1 with no trailing RET
    let engine = run_script(vec![0x51]);

    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
}

#[test]
fn test_jmp_skips_instructions() {
    // JMP +5 jumps over PUSH2 to PUSH1
    // offsets: 0:JMP 3:PUSH2 4:RET 5:PUSH1 6:RET
    let engine = run_script(vec![0x62, 0x05, 0x00, 0x52, 0x66, 0x51, 0x66]);

    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.evaluation_stack().len(), 1);
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
}

#[test]
fn test_jmpif_pops_condition() {
    // PUSH0, JMPIF +5 (not taken), PUSH2, RET, PUSH1, RET
    let engine = run_script(vec![0x00, 0x63, 0x05, 0x00, 0x52, 0x66, 0x51, 0x66]);

    assert_eq!(engine.peek(0), Some(&StackItem::from_int(2)));
    assert_eq!(engine.evaluation_stack().len(), 1);
}

#[test]
fn test_jump_out_of_bounds_faults() {
    let engine = run_script(vec![0x62, 0x7F, 0x00]);
    assert!(engine.state().contains(VmState::FAULT));
}

#[test]
fn test_pack_pops_in_stack_order() {
    // PUSH1, PUSH2, PUSH3, PUSH3, PACK, RET
    let engine = run_script(vec![0x51, 0x52, 0x53, 0x53, 0xC1, 0x66]);

    let expected = StackItem::Array(vec![
        StackItem::from_int(3),
        StackItem::from_int(2),
        StackItem::from_int(1),
    ]);
    assert_eq!(engine.peek(0), Some(&expected));
}

#[test]
fn test_pack_of_reversed_literals() {
    // pushing 30, 20, 10 then PACK 3 yields [10, 20, 30]
    let mut sb = ScriptBuilder::new();
    for v in [30, 20, 10] {
        sb.push_integer(&BigInt::from(v));
    }
    sb.push_integer(&BigInt::from(3));
    sb.emit(Opcode::PACK);
    sb.emit(Opcode::RET);

    let engine = run_script(sb.into_bytes());
    match engine.peek(0) {
        Some(StackItem::Array(items)) => {
            let values: Vec<BigInt> = items.iter().map(|i| i.as_int().unwrap()).collect();
            assert_eq!(values, vec![10.into(), 20.into(), 30.into()]);
        }
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_unpack_restores_order() {
    // PUSH1, PUSH2, PUSH2, PACK, UNPACK, RET leaves count on top
    let engine = run_script(vec![0x51, 0x52, 0x52, 0xC1, 0xC2, 0x66]);

    assert_eq!(engine.peek(0), Some(&StackItem::from_int(2)));
    // array[0] (the old top) right below the count
    assert_eq!(engine.peek(1), Some(&StackItem::from_int(2)));
    assert_eq!(engine.peek(2), Some(&StackItem::from_int(1)));
}

#[test]
fn test_alt_stack_roundtrip() {
    // PUSH5, TOALTSTACK, DUPFROMALTSTACK, FROMALTSTACK, ADD, RET
    let engine = run_script(vec![0x55, 0x6B, 0x6A, 0x6C, 0x93, 0x66]);

    assert_eq!(engine.peek(0), Some(&StackItem::from_int(10)));
    assert!(engine.alt_stack().is_empty());
}

#[test]
fn test_stack_manipulation() {
    // PUSH1, PUSH2, SWAP, RET -> top is 1
    let engine = run_script(vec![0x51, 0x52, 0x7C, 0x66]);
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
    assert_eq!(engine.peek(1), Some(&StackItem::from_int(2)));

    // PUSH1, PUSH2, PUSH3, ROT, RET -> bottom item rotates to top
    let engine = run_script(vec![0x51, 0x52, 0x53, 0x7B, 0x66]);
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
}

#[test]
fn test_breakpoint_sets_break_flag() {
    // NOP, NOP, NOP, RET with a breakpoint at offset 2
    let mut engine = ExecutionEngine::new();
    engine.load_script(vec![0x61, 0x61, 0x61, 0x66]);
    engine.add_break_point(2);

    engine.step_into(&mut NullHost);
    assert!(engine.state().is_none());

    engine.step_into(&mut NullHost);
    assert!(engine.state().contains(VmState::BREAK));
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 2);

    // clearing the flag lets stepping resume
    engine.clear_break();
    run_to_end(&mut engine, &mut NullHost);
    assert!(engine.state().contains(VmState::HALT));
}

#[test]
fn test_throw_faults() {
    let engine = run_script(vec![0xF0]);
    assert!(engine.state().contains(VmState::FAULT));
    assert_eq!(engine.last_error(), Some(&VmError::Throw));
    // the faulting frame keeps its instruction pointer
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 0);
}

#[test]
fn test_unknown_syscall_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_syscall("No.Such.Api");
    let engine = run_script(sb.into_bytes());

    assert!(engine.state().contains(VmState::FAULT));
    assert_eq!(engine.last_syscall(), Some("No.Such.Api"));
}

#[test]
fn test_throwifnot_passes_on_true() {
    // PUSH1, THROWIFNOT, PUSH2, RET
    let engine = run_script(vec![0x51, 0xF1, 0x52, 0x66]);
    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(2)));
}

/// Serves contracts from a map; everything else behaves like NullHost.
struct ContractHost {
    contracts: HashMap<ScriptHash, Vec<u8>>,
}

impl InteropHost for ContractHost {
    fn invoke(&mut self, name: &str, _scope: &mut SyscallScope<'_>) -> Result<(), VmError> {
        Err(VmError::UnknownSyscall(name.to_string()))
    }

    fn check_signature(&mut self, _signature: &[u8], _public_key: &[u8]) -> bool {
        false
    }

    fn contract_script(&mut self, hash: &ScriptHash) -> Option<Vec<u8>> {
        self.contracts.get(hash).cloned()
    }
}

#[test]
fn test_appcall_runs_callee_and_returns() {
    let callee = vec![0x53, 0x66]; // PUSH3, RET
    let callee_hash = ScriptHash::of_script(&callee);

    let mut sb = ScriptBuilder::new();
    sb.emit_appcall(&callee_hash, false);
    sb.push_integer(&BigInt::from(1));
    sb.emit(Opcode::ADD);
    sb.emit(Opcode::RET);

    let mut host = ContractHost {
        contracts: HashMap::from([(callee_hash, callee)]),
    };
    let mut engine = ExecutionEngine::new();
    engine.load_script(sb.into_bytes());
    run_to_end(&mut engine, &mut host);

    assert!(engine.state().contains(VmState::HALT));
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(4)));
}

#[test]
fn test_appcall_missing_contract_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_appcall(&ScriptHash::of_script(b"missing"), false);

    let engine = run_script(sb.into_bytes());
    assert!(engine.state().contains(VmState::FAULT));
    assert_eq!(engine.last_error(), Some(&VmError::ContractNotFound));
}

#[test]
fn test_frame_ids_distinguish_contexts() {
    let mut engine = ExecutionEngine::new();
    engine.load_script(vec![0x66]); // contract
    engine.load_script(vec![0x51]); // prelude, executes first
    let prelude_id = engine.current_context().unwrap().id();

    engine.step_into(&mut NullHost); // PUSH1
    assert_eq!(engine.current_context().unwrap().id(), prelude_id);

    engine.step_into(&mut NullHost); // implicit RET pops the prelude
    assert_ne!(engine.current_context().unwrap().id(), prelude_id);
    assert_eq!(engine.peek(0), Some(&StackItem::from_int(1)));
}
