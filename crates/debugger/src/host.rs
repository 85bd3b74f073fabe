//! Interop host: syscalls, witness checks, simulated runtime context.
//!
//! The engine receives this host on every step. Everything the source
//! kept in process-wide globals (invoker keys, last storage write size)
//! lives here as injected state instead.

use ministack_chain::{Blockchain, Transaction};
use ministack_core::{PublicKey, ScriptHash, Signature};
use ministack_vm::{InteropHost, StackItem, SyscallScope, VmError};
use std::cell::RefCell;
use std::rc::Rc;

/// Signature-check override used while debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessMode {
    #[default]
    Default,
    AlwaysTrue,
    AlwaysFalse,
}

/// Declared execution mode of the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TriggerType {
    Verification = 0x00,
    #[default]
    Application = 0x10,
}

/// The identity driving the session.
#[derive(Debug, Clone)]
pub struct InvokerContext {
    pub address: ScriptHash,
    pub public_key: Option<PublicKey>,
}

impl InvokerContext {
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self {
            address: public_key.to_script_hash(),
            public_key: Some(public_key),
        }
    }

    pub fn from_address(address: ScriptHash) -> Self {
        Self {
            address,
            public_key: None,
        }
    }
}

/// Records the size of the last storage write for gas scaling.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageMeter {
    last_payload: usize,
}

impl StorageMeter {
    pub fn record(&mut self, bytes: usize) {
        self.last_payload = bytes;
    }

    pub fn last_payload_bytes(&self) -> usize {
        self.last_payload
    }
}

/// Host services handed to the engine on every step.
pub struct EmulatorHost {
    pub(crate) blockchain: Rc<RefCell<Blockchain>>,
    pub(crate) witness: WitnessMode,
    pub(crate) trigger: TriggerType,
    pub(crate) timestamp: u32,
    pub(crate) invoker: Option<InvokerContext>,
    pub(crate) meter: StorageMeter,
    /// The engine-side transaction reference. `Reset` clears the
    /// emulator's own slot but this copy stays with the session.
    pub(crate) container: Option<Transaction>,
    /// Messages surfaced by Runtime.Log / Runtime.Notify.
    pub(crate) notifications: Vec<String>,
}

impl EmulatorHost {
    pub fn new(blockchain: Rc<RefCell<Blockchain>>) -> Self {
        Self {
            blockchain,
            witness: WitnessMode::default(),
            trigger: TriggerType::default(),
            timestamp: 0,
            invoker: None,
            meter: StorageMeter::default(),
            container: None,
            notifications: Vec::new(),
        }
    }

    pub fn container(&self) -> Option<&Transaction> {
        self.container.as_ref()
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    fn witness_matches(&self, claimed: &[u8]) -> bool {
        let Some(invoker) = &self.invoker else {
            return false;
        };
        claimed == invoker.address.as_bytes()
            || invoker
                .public_key
                .as_ref()
                .is_some_and(|pk| claimed == pk.as_bytes())
    }
}

impl InteropHost for EmulatorHost {
    fn invoke(&mut self, name: &str, scope: &mut SyscallScope<'_>) -> Result<(), VmError> {
        match name {
            "Neo.Runtime.GetTrigger" => {
                scope.push(StackItem::from_int(self.trigger as u8));
            }
            "Neo.Runtime.GetTime" => {
                scope.push(StackItem::from_int(self.timestamp));
            }
            "Neo.Runtime.CheckWitness" => {
                let claimed = scope.pop_bytes()?;
                let ok = match self.witness {
                    WitnessMode::AlwaysTrue => true,
                    WitnessMode::AlwaysFalse => false,
                    WitnessMode::Default => self.witness_matches(&claimed),
                };
                scope.push(StackItem::Boolean(ok));
            }
            "Neo.Runtime.Log" | "Neo.Runtime.Notify" => {
                let item = scope.pop()?;
                let text = match item.as_bytes() {
                    Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    None => format!("{:?}", item),
                };
                tracing::debug!(syscall = name, message = %text);
                self.notifications.push(text);
            }
            "Neo.Storage.GetContext" => {
                let context = scope.script_hash();
                scope.push(StackItem::ByteArray(context.as_bytes().to_vec()));
            }
            "Neo.Storage.Get" => {
                let context = scope.pop_bytes()?;
                let key = scope.pop_bytes()?;
                let hash = ScriptHash::from_slice(&context).ok_or(VmError::TypeMismatch)?;
                let value = self
                    .blockchain
                    .borrow()
                    .account(&hash)
                    .and_then(|account| account.storage.get(&key).cloned())
                    .unwrap_or_default();
                scope.push(StackItem::ByteArray(value));
            }
            "Neo.Storage.Put" => {
                let context = scope.pop_bytes()?;
                let key = scope.pop_bytes()?;
                let value = scope.pop_bytes()?;
                let hash = ScriptHash::from_slice(&context).ok_or(VmError::TypeMismatch)?;
                self.meter.record(value.len());
                tracing::trace!(account = %hash, key_len = key.len(), value_len = value.len(), "storage put");
                self.blockchain
                    .borrow_mut()
                    .get_or_create_account(hash)
                    .storage
                    .insert(key, value);
            }
            "Neo.Storage.Delete" => {
                let context = scope.pop_bytes()?;
                let key = scope.pop_bytes()?;
                let hash = ScriptHash::from_slice(&context).ok_or(VmError::TypeMismatch)?;
                if let Some(account) = self.blockchain.borrow_mut().account_mut(&hash) {
                    account.storage.remove(&key);
                }
            }
            "Neo.Blockchain.GetHeight" => {
                let height = self.blockchain.borrow().height();
                scope.push(StackItem::from_int(height));
            }
            _ => return Err(VmError::UnknownSyscall(name.to_string())),
        }
        Ok(())
    }

    fn check_signature(&mut self, signature: &[u8], public_key: &[u8]) -> bool {
        match self.witness {
            WitnessMode::AlwaysTrue => true,
            WitnessMode::AlwaysFalse => false,
            WitnessMode::Default => {
                let Some(container) = &self.container else {
                    return false;
                };
                let Ok(key) = PublicKey::from_slice(public_key) else {
                    return false;
                };
                let Some(signature) = Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(container.hash().as_bytes(), &signature).is_ok()
            }
        }
    }

    fn contract_script(&mut self, hash: &ScriptHash) -> Option<Vec<u8>> {
        self.blockchain
            .borrow()
            .account(hash)
            .and_then(|account| account.bytecode.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ministack_core::Keypair;

    fn host() -> EmulatorHost {
        EmulatorHost::new(Rc::new(RefCell::new(Blockchain::new())))
    }

    #[test]
    fn test_witness_overrides() {
        let mut h = host();
        h.witness = WitnessMode::AlwaysTrue;
        assert!(h.check_signature(&[], &[]));
        h.witness = WitnessMode::AlwaysFalse;
        assert!(!h.check_signature(&[], &[]));
    }

    #[test]
    fn test_default_witness_verifies_against_container() {
        let keypair = Keypair::generate();
        let mut h = host();
        let tx = Transaction::new(ministack_chain::SessionToken(1));
        let signature = keypair.sign(tx.hash().as_bytes());
        h.container = Some(tx);

        assert!(h.check_signature(
            signature.as_bytes(),
            &keypair.public_key.as_bytes()
        ));
        assert!(!h.check_signature(&[0u8; 64], &keypair.public_key.as_bytes()));
    }

    #[test]
    fn test_witness_matches_address_or_key() {
        let keypair = Keypair::generate();
        let mut h = host();
        h.invoker = Some(InvokerContext::from_public_key(keypair.public_key.clone()));

        assert!(h.witness_matches(keypair.script_hash().as_bytes()));
        assert!(h.witness_matches(&keypair.public_key.as_bytes()));
        assert!(!h.witness_matches(&[0u8; 20]));
    }
}
