//! Stack-based virtual machine for ministack.
//!
//! The engine executes one instruction per `step_into` call and keeps its
//! status as a flag set, which is what lets an external debugger drive it.

pub mod engine;
pub mod opcode;
pub mod script_builder;
pub mod stack_item;

pub use engine::{
    ExecutionContext, ExecutionEngine, InteropHost, NullHost, SyscallScope, VmError, VmState,
};
pub use opcode::Opcode;
pub use script_builder::ScriptBuilder;
pub use stack_item::StackItem;
