//! The stepping emulator facade and its session state machine.

use crate::abi::{Abi, AbiInput, VmType};
use crate::error::DebuggerError;
use crate::gas::GasTable;
use crate::host::{EmulatorHost, InvokerContext, TriggerType, WitnessMode};
use crate::marshal;
use crate::params::ParamNode;
use crate::value::Value;
use crate::variables::{Variable, VariableTracker};
use ministack_chain::{Blockchain, SessionToken, Transaction, TransactionOutput};
use ministack_core::{Fixed8, ScriptHash};
use ministack_vm::{ExecutionContext, ExecutionEngine, VmState};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Lifecycle states of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Invalid,
    Reset,
    Running,
    Break,
    Finished,
    Exception,
}

/// The last observed session state and the offset it was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerState {
    pub kind: StateKind,
    pub offset: u32,
}

/// Observation emitted once per executed instruction.
#[derive(Debug, Clone)]
pub struct StepInfo {
    /// The script the instruction belongs to.
    pub script: Rc<Vec<u8>>,
    pub offset: u32,
    pub opcode: u8,
    pub gas_cost: Fixed8,
    pub syscall: Option<String>,
}

type StepObserver = Box<dyn FnMut(&StepInfo)>;

/// One debug session over a contract account.
///
/// Drive it with `reset`, then `step` or `run` until the session reaches
/// `Finished` or `Exception`; those states absorb until the next `reset`.
pub struct Emulator {
    blockchain: Rc<RefCell<Blockchain>>,
    session: SessionToken,
    account: Option<ScriptHash>,
    bytecode: Option<Vec<u8>>,
    /// Hash the next `reset` rewrites placeholder outputs against.
    current_hash: ScriptHash,
    engine: Option<ExecutionEngine>,
    host: EmulatorHost,
    breakpoints: BTreeSet<u32>,
    last_state: DebuggerState,
    used_gas: Fixed8,
    used_opcode_count: u64,
    gas: GasTable,
    tracker: VariableTracker,
    entry_inputs: Vec<AbiInput>,
    return_type: VmType,
    current_transaction: Option<Transaction>,
    on_step: Option<StepObserver>,
}

impl Emulator {
    pub fn new(blockchain: Rc<RefCell<Blockchain>>) -> Self {
        let session = SessionToken(NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
        let host = EmulatorHost::new(Rc::clone(&blockchain));
        Self {
            blockchain,
            session,
            account: None,
            bytecode: None,
            current_hash: ScriptHash::ZERO,
            engine: None,
            host,
            breakpoints: BTreeSet::new(),
            last_state: DebuggerState {
                kind: StateKind::Invalid,
                offset: 0,
            },
            used_gas: Fixed8::ZERO,
            used_opcode_count: 0,
            gas: GasTable::default(),
            tracker: VariableTracker::new(),
            entry_inputs: Vec::new(),
            return_type: VmType::Unknown,
            current_transaction: None,
            on_step: None,
        }
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn state(&self) -> DebuggerState {
        self.last_state
    }

    pub fn used_gas(&self) -> Fixed8 {
        self.used_gas
    }

    pub fn used_opcode_count(&self) -> u64 {
        self.used_opcode_count
    }

    /// The account whose bytecode this session debugs.
    pub fn executing_account(&self) -> Option<ScriptHash> {
        self.account
    }

    /// Bind the contract to debug. Returns false when the account does
    /// not exist or carries no bytecode.
    pub fn set_executing_account(&mut self, hash: ScriptHash) -> bool {
        let bytecode = self
            .blockchain
            .borrow()
            .account(&hash)
            .and_then(|account| account.bytecode.clone());
        match bytecode {
            Some(code) => {
                self.account = Some(hash);
                self.bytecode = Some(code);
                true
            }
            None => false,
        }
    }

    pub fn set_breakpoint(&mut self, offset: u32, enabled: bool) {
        if enabled {
            self.breakpoints.insert(offset);
        } else {
            self.breakpoints.remove(&offset);
        }
        if let Some(engine) = self.engine.as_mut() {
            if enabled {
                engine.add_break_point(offset);
            } else {
                engine.remove_break_point(offset);
            }
        }
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.breakpoints.iter().copied()
    }

    pub fn set_witness_mode(&mut self, mode: WitnessMode) {
        self.host.witness = mode;
    }

    pub fn set_trigger(&mut self, trigger: TriggerType) {
        self.host.trigger = trigger;
    }

    /// Simulated block timestamp reported by Runtime.GetTime.
    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.host.timestamp = timestamp;
    }

    pub fn set_invoker(&mut self, invoker: InvokerContext) {
        self.host.invoker = Some(invoker);
    }

    pub fn register_assignment(&mut self, offset: u32, name: &str, ty: VmType) {
        self.tracker.register_assignment(offset, name, ty);
    }

    pub fn clear_assignments(&mut self) {
        self.tracker.clear_assignments();
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.tracker.get(name)
    }

    /// Install the single step observer.
    pub fn on_step(&mut self, observer: impl FnMut(&StepInfo) + 'static) {
        self.on_step = Some(Box::new(observer));
    }

    pub fn notifications(&self) -> &[String] {
        self.host.notifications()
    }

    /// The transaction reference held on the engine side of the session.
    pub fn container(&self) -> Option<&Transaction> {
        self.host.container()
    }

    /// Stage a synthetic funding transaction: a fresh block is generated,
    /// given a transaction paying `amount` to the current contract hash
    /// and the change to the invoker, and confirmed.
    pub fn set_transaction(&mut self, asset_id: &[u8], amount: i64) {
        let src_hash = self
            .host
            .invoker
            .as_ref()
            .map(|invoker| invoker.address)
            .unwrap_or(ScriptHash::ZERO);

        let mut tx = Transaction::new(self.session);
        tx.outputs.push(TransactionOutput {
            asset_id: asset_id.to_vec(),
            value: amount,
            script_hash: self.current_hash,
        });
        // placeholder for a balance that should come from the virtual
        // chain; the change output can go negative
        let total = amount.saturating_mul(10);
        tx.outputs.push(TransactionOutput {
            asset_id: asset_id.to_vec(),
            value: total.saturating_mul(100_000_000).saturating_sub(amount),
            script_hash: src_hash,
        });

        let mut chain = self.blockchain.borrow_mut();
        let mut block = chain.generate_block();
        block.transactions.push(tx.clone());
        if let Err(err) = chain.confirm_block(block) {
            tracing::warn!(error = %err, "synthetic block not confirmed");
        }
        drop(chain);

        self.current_transaction = Some(tx);
    }

    /// Rebuild the VM, load the contract and the argument prelude, and
    /// re-register breakpoints. A no-op when the session is already in
    /// `Reset`. The one entry point that may fail outward.
    pub fn reset(&mut self, inputs: &ParamNode, abi: &Abi) -> Result<(), DebuggerError> {
        if self.last_state.kind == StateKind::Reset {
            return Ok(());
        }
        let bytecode = self.bytecode.clone().ok_or(DebuggerError::BytecodeMissing)?;
        let prelude = marshal::build_prelude(inputs)?;

        let mut engine = ExecutionEngine::new();
        engine.load_script(bytecode.clone());
        engine.load_script(prelude);
        for &offset in &self.breakpoints {
            engine.add_break_point(offset);
        }

        // outputs staged against the old placeholder hash now belong to
        // the loaded contract
        let loaded_hash = ScriptHash::of_script(&bytecode);
        if let Some(tx) = self.current_transaction.as_mut() {
            for output in &mut tx.outputs {
                if output.script_hash == self.current_hash {
                    output.script_hash = loaded_hash;
                }
            }
        }
        self.current_hash = loaded_hash;
        self.host.container = self.current_transaction.clone();

        self.engine = Some(engine);
        self.used_gas = Fixed8::ZERO;
        self.used_opcode_count = 0;
        self.entry_inputs = abi.entry_point.inputs.clone();
        self.return_type = abi.entry_point.return_type;
        self.last_state = DebuggerState {
            kind: StateKind::Reset,
            offset: 0,
        };

        // the emulator's own transaction slot does not survive the reset;
        // the host keeps the engine-side reference
        self.current_transaction = None;
        self.tracker.clear_variables();
        tracing::debug!(contract = %loaded_hash, session = self.session.0, "session reset");
        Ok(())
    }

    /// Execute one instruction and report the resulting session state.
    /// `Finished` and `Exception` absorb; call `reset` to leave them.
    pub fn step(&mut self) -> DebuggerState {
        match self.last_state.kind {
            StateKind::Invalid | StateKind::Finished | StateKind::Exception => {
                return self.last_state
            }
            _ => {}
        }
        let Some(engine) = self.engine.as_mut() else {
            return self.last_state;
        };

        if self.last_state.kind == StateKind::Reset {
            // bootstrap: run the prelude frame off, then seed the entry
            // point's variables from the staged arguments
            engine.set_state(VmState::NONE);
            let entry = engine.current_context().map(ExecutionContext::id);
            while engine.state().is_none()
                && engine.current_context().map(ExecutionContext::id) == entry
            {
                engine.step_into(&mut self.host);
            }
            let mut seeds = Vec::new();
            for (depth, input) in self.entry_inputs.iter().enumerate() {
                match engine.peek(depth) {
                    Some(item) => seeds.push((input.name.clone(), item.clone(), input.ty)),
                    // short argument lists are tolerated
                    None => break,
                }
            }
            for (name, item, ty) in seeds {
                self.tracker.record(&name, &item, ty);
            }
        }

        // the frame about to execute; kept for the step observation
        let script = engine
            .current_context()
            .map(|ctx| Rc::clone(ctx.script()))
            .unwrap_or_default();

        if engine.state().is_none() {
            engine.step_into(&mut self.host);
            // a successful step landing on a registered assignment offset
            // refreshes that variable from the top of the stack
            if engine.state().is_none() {
                if let Some(offset) = engine
                    .current_context()
                    .map(ExecutionContext::instruction_pointer)
                {
                    if let Some(assignment) = self.tracker.assignment_at(offset).cloned() {
                        if let Some(item) = engine.peek(0).cloned() {
                            self.tracker.record(&assignment.name, &item, assignment.ty);
                        }
                    }
                }
            }
        }

        // introspection failures leave the previous offset in place
        let offset = engine
            .current_context()
            .map(ExecutionContext::instruction_pointer)
            .unwrap_or(self.last_state.offset);
        let opcode = engine.last_opcode();
        let syscall = engine.last_syscall().map(str::to_string);
        let gas_cost =
            self.gas
                .opcode_cost(opcode, syscall.as_deref(), self.host.meter.last_payload_bytes());
        self.used_gas = self.used_gas.saturating_add(gas_cost);
        self.used_opcode_count += 1;

        let info = StepInfo {
            script,
            offset,
            opcode,
            gas_cost,
            syscall,
        };
        if let Some(observer) = self.on_step.as_mut() {
            observer(&info);
        }

        let vm_state = engine.state();
        let kind = if vm_state.contains(VmState::FAULT) {
            StateKind::Exception
        } else if vm_state.contains(VmState::BREAK) {
            // zero the flag so the next step can resume
            engine.clear_break();
            StateKind::Break
        } else if vm_state.contains(VmState::HALT) {
            StateKind::Finished
        } else {
            StateKind::Running
        };
        self.last_state = DebuggerState { kind, offset };
        tracing::trace!(?kind, offset, gas = %gas_cost, "step");
        self.last_state
    }

    /// Step until the session leaves `Running`.
    pub fn run(&mut self) -> DebuggerState {
        loop {
            let state = self.step();
            if state.kind != StateKind::Running {
                return state;
            }
        }
    }

    /// Top of the evaluation stack, decoded under the entry point's
    /// declared return type.
    pub fn get_output(&self) -> Value {
        self.engine
            .as_ref()
            .and_then(|engine| engine.peek(0))
            .map(|item| Value::from_stack_item(item, self.return_type))
            .unwrap_or(Value::Unknown)
    }

    /// The evaluation stack, top first.
    pub fn evaluation_stack(&self) -> impl Iterator<Item = Value> + '_ {
        self.engine
            .iter()
            .flat_map(|engine| engine.evaluation_stack().iter().rev())
            .map(|item| Value::from_stack_item(item, VmType::Unknown))
    }

    /// The alt stack, top first.
    pub fn alt_stack(&self) -> impl Iterator<Item = Value> + '_ {
        self.engine
            .iter()
            .flat_map(|engine| engine.alt_stack().iter().rev())
            .map(|item| Value::from_stack_item(item, VmType::Unknown))
    }

    /// Script of the current frame, if execution has one.
    pub fn executing_bytecode(&self) -> Option<Rc<Vec<u8>>> {
        self.engine
            .as_ref()
            .and_then(|engine| engine.current_context())
            .map(|ctx| Rc::clone(ctx.script()))
    }
}
