//! Stepping emulator for the ministack VM.
//!
//! A debugger front-end binds a contract account, registers breakpoints
//! and variable assignments, then drives execution one instruction at a
//! time: each step prices the executed opcode, refreshes tracked
//! variables, and reports the session state (running, break, finished,
//! exception). Library only; the UI, ABI parsing, and test-case loading
//! live elsewhere.

pub mod abi;
pub mod emulator;
pub mod error;
pub mod gas;
pub mod host;
pub mod marshal;
pub mod params;
pub mod value;
pub mod variables;

pub use abi::{Abi, AbiFunction, AbiInput, VmType};
pub use emulator::{DebuggerState, Emulator, StateKind, StepInfo};
pub use error::DebuggerError;
pub use host::{InvokerContext, StorageMeter, TriggerType, WitnessMode};
pub use marshal::MarshalError;
pub use params::{ParamKind, ParamNode};
pub use value::Value;
pub use variables::Variable;
