//! VM execution engine.
//!
//! The engine owns an invocation stack of script contexts plus the shared
//! evaluation and alt stacks. It executes exactly one instruction per
//! `step_into` call and reports its status as a flag set, so an external
//! debugger can drive it, halt it on breakpoints, and inspect it between
//! steps. Host services (syscalls, signature checks, contract resolution)
//! are injected on every step instead of being wired in as back-pointers.

use crate::opcode::Opcode;
use crate::stack_item::StackItem;
use ministack_core::ScriptHash;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Shifts larger than this fault instead of allocating.
const MAX_SHIFT: usize = 256;

/// Arrays larger than this fault instead of allocating.
const MAX_ARRAY_SIZE: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("item is not of the expected kind")]
    TypeMismatch,

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("invalid jump destination: {0}")]
    InvalidJump(isize),

    #[error("script ended inside an instruction")]
    TruncatedInstruction,

    #[error("division by zero")]
    DivisionByZero,

    #[error("shift out of range")]
    ShiftOutOfRange,

    #[error("contract not found")]
    ContractNotFound,

    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),

    #[error("explicit throw")]
    Throw,

    #[error("assertion failed")]
    AssertionFailed,

    #[error("invocation stack is empty")]
    NoContext,
}

/// VM status flags. FAULT and BREAK may be set alongside other flags;
/// readers are expected to check in FAULT, BREAK, HALT priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VmState(u8);

impl VmState {
    pub const NONE: VmState = VmState(0);
    pub const HALT: VmState = VmState(1);
    pub const FAULT: VmState = VmState(1 << 1);
    pub const BREAK: VmState = VmState(1 << 2);

    pub fn contains(self, flag: VmState) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: VmState) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: VmState) {
        self.0 &= !flag.0;
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// One frame on the invocation stack.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    script: Rc<Vec<u8>>,
    hash: ScriptHash,
    ip: usize,
    id: u64,
}

impl ExecutionContext {
    pub fn instruction_pointer(&self) -> u32 {
        self.ip as u32
    }

    pub fn script(&self) -> &Rc<Vec<u8>> {
        &self.script
    }

    pub fn script_hash(&self) -> ScriptHash {
        self.hash
    }

    /// Monotonic identity of this frame; survives nothing but is never
    /// reused, so "the current context changed" is well-defined.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Evaluation-stack access handed to syscall handlers.
pub struct SyscallScope<'a> {
    eval: &'a mut Vec<StackItem>,
    script_hash: ScriptHash,
}

impl SyscallScope<'_> {
    /// Hash of the script executing the syscall (the storage context).
    pub fn script_hash(&self) -> ScriptHash {
        self.script_hash
    }

    pub fn push(&mut self, item: StackItem) {
        self.eval.push(item);
    }

    pub fn pop(&mut self) -> Result<StackItem, VmError> {
        self.eval.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn pop_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        self.pop()?.as_bytes().ok_or(VmError::TypeMismatch)
    }

    pub fn pop_int(&mut self) -> Result<BigInt, VmError> {
        self.pop()?.as_int().ok_or(VmError::TypeMismatch)
    }
}

/// Host services a step may call back into.
pub trait InteropHost {
    /// Dispatch a named syscall. Stack effects happen through `scope`.
    fn invoke(&mut self, name: &str, scope: &mut SyscallScope<'_>) -> Result<(), VmError>;

    /// Verify a signature over the current script container.
    fn check_signature(&mut self, signature: &[u8], public_key: &[u8]) -> bool;

    /// Resolve a contract script for APPCALL/TAILCALL.
    fn contract_script(&mut self, hash: &ScriptHash) -> Option<Vec<u8>>;
}

/// A host that provides no services: syscalls fault, signature checks
/// fail, and no contracts resolve.
pub struct NullHost;

impl InteropHost for NullHost {
    fn invoke(&mut self, name: &str, _scope: &mut SyscallScope<'_>) -> Result<(), VmError> {
        Err(VmError::UnknownSyscall(name.to_string()))
    }

    fn check_signature(&mut self, _signature: &[u8], _public_key: &[u8]) -> bool {
        false
    }

    fn contract_script(&mut self, _hash: &ScriptHash) -> Option<Vec<u8>> {
        None
    }
}

/// The virtual machine.
pub struct ExecutionEngine {
    frames: Vec<ExecutionContext>,
    eval: Vec<StackItem>,
    alt: Vec<StackItem>,
    state: VmState,
    breakpoints: HashSet<u32>,
    last_opcode: u8,
    last_syscall: Option<String>,
    last_error: Option<VmError>,
    next_frame_id: u64,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            eval: Vec::new(),
            alt: Vec::new(),
            state: VmState::NONE,
            breakpoints: HashSet::new(),
            last_opcode: Opcode::NOP as u8,
            last_syscall: None,
            last_error: None,
            next_frame_id: 0,
        }
    }

    /// Load a script on top of the invocation stack. The most recently
    /// loaded script executes first.
    pub fn load_script(&mut self, script: Vec<u8>) {
        let hash = ScriptHash::of_script(&script);
        self.push_frame(Rc::new(script), hash);
    }

    fn push_frame(&mut self, script: Rc<Vec<u8>>, hash: ScriptHash) {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frames.push(ExecutionContext {
            script,
            hash,
            ip: 0,
            id,
        });
    }

    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.frames.last()
    }

    pub fn invocation_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn set_state(&mut self, state: VmState) {
        self.state = state;
    }

    /// Clear the BREAK flag so stepping can resume past a breakpoint.
    pub fn clear_break(&mut self) {
        self.state.remove(VmState::BREAK);
    }

    pub fn add_break_point(&mut self, offset: u32) {
        self.breakpoints.insert(offset);
    }

    pub fn remove_break_point(&mut self, offset: u32) {
        self.breakpoints.remove(&offset);
    }

    pub fn evaluation_stack(&self) -> &[StackItem] {
        &self.eval
    }

    pub fn alt_stack(&self) -> &[StackItem] {
        &self.alt
    }

    /// Peek at depth `n` from the top of the evaluation stack.
    pub fn peek(&self, n: usize) -> Option<&StackItem> {
        self.eval.get(self.eval.len().checked_sub(1 + n)?)
    }

    /// The byte of the most recently executed opcode.
    pub fn last_opcode(&self) -> u8 {
        self.last_opcode
    }

    /// The name of the most recently dispatched syscall, if the last
    /// executed opcode was SYSCALL.
    pub fn last_syscall(&self) -> Option<&str> {
        self.last_syscall.as_deref()
    }

    /// The error behind the FAULT flag, if any.
    pub fn last_error(&self) -> Option<&VmError> {
        self.last_error.as_ref()
    }

    /// Execute one instruction. Errors set FAULT; running off the end of
    /// the invocation stack sets HALT; landing on a registered breakpoint
    /// sets BREAK.
    pub fn step_into(&mut self, host: &mut dyn InteropHost) {
        if self.state.contains(VmState::HALT) || self.state.contains(VmState::FAULT) {
            return;
        }
        if self.frames.is_empty() {
            self.state.insert(VmState::HALT);
            return;
        }
        if let Err(err) = self.execute_next(host) {
            tracing::debug!(error = %err, opcode = self.last_opcode, "vm fault");
            self.last_error = Some(err);
            self.state.insert(VmState::FAULT);
            return;
        }
        match self.frames.last() {
            None => self.state.insert(VmState::HALT),
            Some(ctx) => {
                if self.breakpoints.contains(&(ctx.ip as u32)) {
                    self.state.insert(VmState::BREAK);
                }
            }
        }
    }

    fn execute_next(&mut self, host: &mut dyn InteropHost) -> Result<(), VmError> {
        let idx = self.frames.len().checked_sub(1).ok_or(VmError::NoContext)?;
        let (script, hash, mut ip) = {
            let frame = &self.frames[idx];
            (Rc::clone(&frame.script), frame.hash, frame.ip)
        };

        // running off the end of a script is an implicit RET
        let opcode = if ip >= script.len() {
            Opcode::RET as u8
        } else {
            script[ip]
        };
        self.last_opcode = opcode;
        self.last_syscall = None;
        ip += 1;

        // 0x01-0x4B: the byte value is the length of a literal push
        if (0x01..=0x4B).contains(&opcode) {
            let data = read_slice(&script, ip, opcode as usize)?;
            self.eval.push(StackItem::ByteArray(data.to_vec()));
            self.frames[idx].ip = ip + opcode as usize;
            return Ok(());
        }

        let op = Opcode::from_byte(opcode).ok_or(VmError::InvalidOpcode(opcode))?;
        match op {
            // -- constants -----------------------------------------------
            Opcode::PUSH0 => {
                self.eval.push(StackItem::ByteArray(Vec::new()));
            }
            Opcode::PUSHDATA1 => {
                let len = *script.get(ip).ok_or(VmError::TruncatedInstruction)? as usize;
                let data = read_slice(&script, ip + 1, len)?;
                self.eval.push(StackItem::ByteArray(data.to_vec()));
                self.frames[idx].ip = ip + 1 + len;
                return Ok(());
            }
            Opcode::PUSHDATA2 => {
                let len = read_u16(&script, ip)? as usize;
                let data = read_slice(&script, ip + 2, len)?;
                self.eval.push(StackItem::ByteArray(data.to_vec()));
                self.frames[idx].ip = ip + 2 + len;
                return Ok(());
            }
            Opcode::PUSHDATA4 => {
                let len = read_u32(&script, ip)? as usize;
                let data = read_slice(&script, ip + 4, len)?;
                self.eval.push(StackItem::ByteArray(data.to_vec()));
                self.frames[idx].ip = ip + 4 + len;
                return Ok(());
            }
            Opcode::PUSHM1 => {
                self.eval.push(StackItem::from_int(-1));
            }
            Opcode::PUSH1
            | Opcode::PUSH2
            | Opcode::PUSH3
            | Opcode::PUSH4
            | Opcode::PUSH5
            | Opcode::PUSH6
            | Opcode::PUSH7
            | Opcode::PUSH8
            | Opcode::PUSH9
            | Opcode::PUSH10
            | Opcode::PUSH11
            | Opcode::PUSH12
            | Opcode::PUSH13
            | Opcode::PUSH14
            | Opcode::PUSH15
            | Opcode::PUSH16 => {
                self.eval
                    .push(StackItem::from_int(opcode - Opcode::PUSH1 as u8 + 1));
            }

            // -- flow control --------------------------------------------
            Opcode::NOP => {}
            Opcode::JMP | Opcode::JMPIF | Opcode::JMPIFNOT => {
                let base = (ip - 1) as isize;
                let offset = read_i16(&script, ip)? as isize;
                ip += 2;
                let jump = match op {
                    Opcode::JMP => true,
                    Opcode::JMPIF => self.pop()?.as_bool(),
                    _ => !self.pop()?.as_bool(),
                };
                if jump {
                    let target = base + offset;
                    if target < 0 || target > script.len() as isize {
                        return Err(VmError::InvalidJump(target));
                    }
                    self.frames[idx].ip = target as usize;
                } else {
                    self.frames[idx].ip = ip;
                }
                return Ok(());
            }
            Opcode::CALL => {
                let base = (ip - 1) as isize;
                let offset = read_i16(&script, ip)? as isize;
                ip += 2;
                let target = base + offset;
                if target < 0 || target > script.len() as isize {
                    return Err(VmError::InvalidJump(target));
                }
                self.frames[idx].ip = ip;
                self.push_frame(Rc::clone(&script), hash);
                if let Some(frame) = self.frames.last_mut() {
                    frame.ip = target as usize;
                }
                return Ok(());
            }
            Opcode::RET => {
                self.frames.pop();
                return Ok(());
            }
            Opcode::APPCALL | Opcode::TAILCALL => {
                let operand = read_slice(&script, ip, 20)?;
                ip += 20;
                let target = if operand.iter().all(|&b| b == 0) {
                    let bytes = self.pop_bytes()?;
                    ScriptHash::from_slice(&bytes).ok_or(VmError::TypeMismatch)?
                } else {
                    ScriptHash::from_slice(operand).ok_or(VmError::TypeMismatch)?
                };
                let code = host
                    .contract_script(&target)
                    .ok_or(VmError::ContractNotFound)?;
                if op == Opcode::TAILCALL {
                    self.frames.pop();
                } else {
                    self.frames[idx].ip = ip;
                }
                self.push_frame(Rc::new(code), target);
                return Ok(());
            }
            Opcode::SYSCALL => {
                let len = *script.get(ip).ok_or(VmError::TruncatedInstruction)? as usize;
                let name_bytes = read_slice(&script, ip + 1, len)?;
                let name = String::from_utf8_lossy(name_bytes).into_owned();
                ip += 1 + len;
                self.last_syscall = Some(name.clone());
                self.frames[idx].ip = ip;
                let mut scope = SyscallScope {
                    eval: &mut self.eval,
                    script_hash: hash,
                };
                host.invoke(&name, &mut scope)?;
                return Ok(());
            }

            // -- alt stack -----------------------------------------------
            Opcode::DUPFROMALTSTACK => {
                let item = self.alt.last().ok_or(VmError::StackUnderflow)?.clone();
                self.eval.push(item);
            }
            Opcode::TOALTSTACK => {
                let item = self.pop()?;
                self.alt.push(item);
            }
            Opcode::FROMALTSTACK => {
                let item = self.alt.pop().ok_or(VmError::StackUnderflow)?;
                self.eval.push(item);
            }

            // -- stack manipulation --------------------------------------
            Opcode::XDROP => {
                let n = self.pop_index()?;
                let i = self.depth_index(n)?;
                self.eval.remove(i);
            }
            Opcode::XSWAP => {
                let n = self.pop_index()?;
                if n > 0 {
                    let i = self.depth_index(n)?;
                    let top = self.eval.len() - 1;
                    self.eval.swap(i, top);
                }
            }
            Opcode::XTUCK => {
                let n = self.pop_index()?;
                if n > self.eval.len() {
                    return Err(VmError::StackUnderflow);
                }
                let item = self.eval.last().ok_or(VmError::StackUnderflow)?.clone();
                let at = self.eval.len() - n;
                self.eval.insert(at, item);
            }
            Opcode::DEPTH => {
                self.eval.push(StackItem::from_int(self.eval.len()));
            }
            Opcode::DROP => {
                self.pop()?;
            }
            Opcode::DUP => {
                let item = self.eval.last().ok_or(VmError::StackUnderflow)?.clone();
                self.eval.push(item);
            }
            Opcode::NIP => {
                let i = self.depth_index(1)?;
                self.eval.remove(i);
            }
            Opcode::OVER => {
                let i = self.depth_index(1)?;
                let item = self.eval[i].clone();
                self.eval.push(item);
            }
            Opcode::PICK => {
                let n = self.pop_index()?;
                let i = self.depth_index(n)?;
                let item = self.eval[i].clone();
                self.eval.push(item);
            }
            Opcode::ROLL => {
                let n = self.pop_index()?;
                if n > 0 {
                    let i = self.depth_index(n)?;
                    let item = self.eval.remove(i);
                    self.eval.push(item);
                }
            }
            Opcode::ROT => {
                let i = self.depth_index(2)?;
                let item = self.eval.remove(i);
                self.eval.push(item);
            }
            Opcode::SWAP => {
                let i = self.depth_index(1)?;
                let top = self.eval.len() - 1;
                self.eval.swap(i, top);
            }
            Opcode::TUCK => {
                let i = self.depth_index(1)?;
                let item = self.eval.last().ok_or(VmError::StackUnderflow)?.clone();
                self.eval.insert(i, item);
            }

            // -- splice --------------------------------------------------
            Opcode::CAT => {
                let b = self.pop_bytes()?;
                let mut a = self.pop_bytes()?;
                a.extend_from_slice(&b);
                self.eval.push(StackItem::ByteArray(a));
            }
            Opcode::SUBSTR => {
                let count = self.pop_index()?;
                let index = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                let end = index.checked_add(count).ok_or(VmError::IndexOutOfRange)?;
                if end > bytes.len() {
                    return Err(VmError::IndexOutOfRange);
                }
                self.eval.push(StackItem::ByteArray(bytes[index..end].to_vec()));
            }
            Opcode::LEFT => {
                let count = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                if count > bytes.len() {
                    return Err(VmError::IndexOutOfRange);
                }
                self.eval.push(StackItem::ByteArray(bytes[..count].to_vec()));
            }
            Opcode::RIGHT => {
                let count = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                if count > bytes.len() {
                    return Err(VmError::IndexOutOfRange);
                }
                self.eval
                    .push(StackItem::ByteArray(bytes[bytes.len() - count..].to_vec()));
            }
            Opcode::SIZE => {
                let bytes = self.pop_bytes()?;
                self.eval.push(StackItem::from_int(bytes.len()));
            }

            // -- bitwise logic -------------------------------------------
            Opcode::INVERT => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(!a));
            }
            Opcode::AND => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a & b));
            }
            Opcode::OR => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a | b));
            }
            Opcode::XOR => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a ^ b));
            }
            Opcode::EQUAL => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.eval.push(StackItem::Boolean(a.equals(&b)));
            }

            // -- arithmetic ----------------------------------------------
            Opcode::INC => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a + 1));
            }
            Opcode::DEC => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a - 1));
            }
            Opcode::SIGN => {
                let a = self.pop_int()?;
                let sign = match a.sign() {
                    Sign::Minus => -1,
                    Sign::NoSign => 0,
                    Sign::Plus => 1,
                };
                self.eval.push(StackItem::from_int(sign));
            }
            Opcode::NEGATE => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(-a));
            }
            Opcode::ABS => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a.abs()));
            }
            Opcode::NOT => {
                let a = self.pop()?.as_bool();
                self.eval.push(StackItem::Boolean(!a));
            }
            Opcode::NZ => {
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(!a.is_zero()));
            }
            Opcode::ADD => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a + b));
            }
            Opcode::SUB => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a - b));
            }
            Opcode::MUL => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a * b));
            }
            Opcode::DIV => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if b.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                self.eval.push(StackItem::Integer(a / b));
            }
            Opcode::MOD => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if b.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                self.eval.push(StackItem::Integer(a % b));
            }
            Opcode::SHL => {
                let shift = self.pop_shift()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a << shift));
            }
            Opcode::SHR => {
                let shift = self.pop_shift()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a >> shift));
            }
            Opcode::BOOLAND => {
                let b = self.pop()?.as_bool();
                let a = self.pop()?.as_bool();
                self.eval.push(StackItem::Boolean(a && b));
            }
            Opcode::BOOLOR => {
                let b = self.pop()?.as_bool();
                let a = self.pop()?.as_bool();
                self.eval.push(StackItem::Boolean(a || b));
            }
            Opcode::NUMEQUAL => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a == b));
            }
            Opcode::NUMNOTEQUAL => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a != b));
            }
            Opcode::LT => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a < b));
            }
            Opcode::GT => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a > b));
            }
            Opcode::LTE => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a <= b));
            }
            Opcode::GTE => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a >= b));
            }
            Opcode::MIN => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a.min(b)));
            }
            Opcode::MAX => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.eval.push(StackItem::Integer(a.max(b)));
            }
            Opcode::WITHIN => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let x = self.pop_int()?;
                self.eval.push(StackItem::Boolean(a <= x && x < b));
            }

            // -- crypto --------------------------------------------------
            Opcode::SHA1 => {
                let bytes = self.pop_bytes()?;
                let mut hasher = Sha1::new();
                hasher.update(&bytes);
                self.eval.push(StackItem::ByteArray(hasher.finalize().to_vec()));
            }
            Opcode::SHA256 => {
                let bytes = self.pop_bytes()?;
                self.eval
                    .push(StackItem::ByteArray(Sha256::digest(&bytes).to_vec()));
            }
            Opcode::HASH256 => {
                let bytes = self.pop_bytes()?;
                let digest = Sha256::digest(Sha256::digest(&bytes));
                self.eval.push(StackItem::ByteArray(digest.to_vec()));
            }
            Opcode::HASH160 => {
                let bytes = self.pop_bytes()?;
                let digest = Sha256::digest(Sha256::digest(&bytes));
                self.eval.push(StackItem::ByteArray(digest[..20].to_vec()));
            }
            Opcode::CHECKSIG => {
                let pubkey = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                let ok = host.check_signature(&signature, &pubkey);
                self.eval.push(StackItem::Boolean(ok));
            }
            Opcode::VERIFY => {
                let pubkey = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                if !host.check_signature(&signature, &pubkey) {
                    return Err(VmError::AssertionFailed);
                }
            }
            Opcode::CHECKMULTISIG => {
                let n = self.pop_index()?;
                if n == 0 || n > 16 {
                    return Err(VmError::IndexOutOfRange);
                }
                let mut pubkeys = Vec::with_capacity(n);
                for _ in 0..n {
                    pubkeys.push(self.pop_bytes()?);
                }
                let m = self.pop_index()?;
                if m == 0 || m > n {
                    return Err(VmError::IndexOutOfRange);
                }
                let mut signatures = Vec::with_capacity(m);
                for _ in 0..m {
                    signatures.push(self.pop_bytes()?);
                }
                let mut ok = true;
                let (mut i, mut j) = (0, 0);
                while ok && i < signatures.len() && j < pubkeys.len() {
                    if host.check_signature(&signatures[i], &pubkeys[j]) {
                        i += 1;
                    }
                    j += 1;
                    if signatures.len() - i > pubkeys.len() - j {
                        ok = false;
                    }
                }
                self.eval.push(StackItem::Boolean(ok && i == signatures.len()));
            }

            // -- arrays --------------------------------------------------
            Opcode::ARRAYSIZE => {
                let size = match self.pop()? {
                    StackItem::Array(items) => items.len(),
                    item => item.as_bytes().ok_or(VmError::TypeMismatch)?.len(),
                };
                self.eval.push(StackItem::from_int(size));
            }
            Opcode::PACK => {
                let n = self.pop_index()?;
                if n > self.eval.len() {
                    return Err(VmError::StackUnderflow);
                }
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.pop()?);
                }
                self.eval.push(StackItem::Array(items));
            }
            Opcode::UNPACK => {
                let items = self.pop_array()?;
                let count = items.len();
                for item in items.into_iter().rev() {
                    self.eval.push(item);
                }
                self.eval.push(StackItem::from_int(count));
            }
            Opcode::PICKITEM => {
                let index = self.pop_index()?;
                let items = self.pop_array()?;
                let item = items.get(index).ok_or(VmError::IndexOutOfRange)?.clone();
                self.eval.push(item);
            }
            Opcode::SETITEM => {
                let value = self.pop()?;
                let index = self.pop_index()?;
                let mut items = self.pop_array()?;
                *items.get_mut(index).ok_or(VmError::IndexOutOfRange)? = value;
                self.eval.push(StackItem::Array(items));
            }
            Opcode::NEWARRAY | Opcode::NEWSTRUCT => {
                let n = self.pop_index()?;
                if n > MAX_ARRAY_SIZE {
                    return Err(VmError::IndexOutOfRange);
                }
                self.eval
                    .push(StackItem::Array(vec![StackItem::Boolean(false); n]));
            }
            Opcode::APPEND => {
                let value = self.pop()?;
                let mut items = self.pop_array()?;
                items.push(value);
                self.eval.push(StackItem::Array(items));
            }
            Opcode::REVERSE => {
                let mut items = self.pop_array()?;
                items.reverse();
                self.eval.push(StackItem::Array(items));
            }
            Opcode::REMOVE => {
                let index = self.pop_index()?;
                let mut items = self.pop_array()?;
                if index >= items.len() {
                    return Err(VmError::IndexOutOfRange);
                }
                items.remove(index);
                self.eval.push(StackItem::Array(items));
            }

            // -- exceptions ----------------------------------------------
            Opcode::THROW => {
                return Err(VmError::Throw);
            }
            Opcode::THROWIFNOT => {
                if !self.pop()?.as_bool() {
                    return Err(VmError::AssertionFailed);
                }
            }
        }

        self.frames[idx].ip = ip;
        Ok(())
    }

    fn pop(&mut self) -> Result<StackItem, VmError> {
        self.eval.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_int(&mut self) -> Result<BigInt, VmError> {
        self.pop()?.as_int().ok_or(VmError::TypeMismatch)
    }

    fn pop_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        self.pop()?.as_bytes().ok_or(VmError::TypeMismatch)
    }

    fn pop_array(&mut self) -> Result<Vec<StackItem>, VmError> {
        match self.pop()? {
            StackItem::Array(items) => Ok(items),
            _ => Err(VmError::TypeMismatch),
        }
    }

    fn pop_index(&mut self) -> Result<usize, VmError> {
        self.pop_int()?.to_usize().ok_or(VmError::IndexOutOfRange)
    }

    fn pop_shift(&mut self) -> Result<usize, VmError> {
        self.pop_int()?
            .to_usize()
            .filter(|&s| s <= MAX_SHIFT)
            .ok_or(VmError::ShiftOutOfRange)
    }

    /// Stack index of the item at depth `n` from the top.
    fn depth_index(&self, n: usize) -> Result<usize, VmError> {
        self.eval
            .len()
            .checked_sub(1 + n)
            .ok_or(VmError::StackUnderflow)
    }
}

fn read_slice<'a>(script: &'a [u8], at: usize, len: usize) -> Result<&'a [u8], VmError> {
    let end = at.checked_add(len).ok_or(VmError::TruncatedInstruction)?;
    script.get(at..end).ok_or(VmError::TruncatedInstruction)
}

fn read_u16(script: &[u8], at: usize) -> Result<u16, VmError> {
    let bytes = read_slice(script, at, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_i16(script: &[u8], at: usize) -> Result<i16, VmError> {
    Ok(read_u16(script, at)? as i16)
}

fn read_u32(script: &[u8], at: usize) -> Result<u32, VmError> {
    let bytes = read_slice(script, at, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
