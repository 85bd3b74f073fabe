//! Contract accounts with in-memory storage.

use ministack_core::ScriptHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An account on the synthetic chain.
///
/// Accounts with bytecode are debuggable contracts; plain accounts exist
/// only to hold storage written on their behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAccount {
    /// Identifier; for contracts, the hash of the bytecode.
    pub script_hash: ScriptHash,
    /// Human-readable label for the debugger UI.
    pub name: String,
    /// Compiled contract, if this account is a contract.
    pub bytecode: Option<Vec<u8>>,
    /// Key/value entries written by `Storage.Put`.
    pub storage: HashMap<Vec<u8>, Vec<u8>>,
}

impl ContractAccount {
    /// Create a plain account.
    pub fn new(script_hash: ScriptHash, name: impl Into<String>) -> Self {
        Self {
            script_hash,
            name: name.into(),
            bytecode: None,
            storage: HashMap::new(),
        }
    }

    /// Create a contract account; the script hash is derived from the
    /// bytecode.
    pub fn deploy(name: impl Into<String>, bytecode: Vec<u8>) -> Self {
        Self {
            script_hash: ScriptHash::of_script(&bytecode),
            name: name.into(),
            bytecode: Some(bytecode),
            storage: HashMap::new(),
        }
    }

    pub fn is_contract(&self) -> bool {
        self.bytecode.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_derives_hash() {
        let code = vec![0x51, 0x66];
        let account = ContractAccount::deploy("token", code.clone());
        assert!(account.is_contract());
        assert_eq!(account.script_hash, ScriptHash::of_script(&code));
    }

    #[test]
    fn test_plain_account() {
        let account = ContractAccount::new(ScriptHash::ZERO, "wallet");
        assert!(!account.is_contract());
    }
}
