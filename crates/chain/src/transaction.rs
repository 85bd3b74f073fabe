//! Synthetic transactions and their outputs.

use ministack_core::{hash, Hash, ScriptHash};
use serde::{Deserialize, Serialize};

/// Stable handle tying a transaction to the debug session that created
/// it. Collaborators correlate containers with sessions through this
/// token instead of holding a pointer back into the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SessionToken(pub u64);

/// One output of a synthetic transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub asset_id: Vec<u8>,
    /// Raw fixed-point units. The synthetic change output is allowed to
    /// go negative.
    pub value: i64,
    pub script_hash: ScriptHash,
}

/// A transaction on the synthetic chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub session: SessionToken,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new(session: SessionToken) -> Self {
        Self {
            session,
            outputs: Vec::new(),
        }
    }

    /// Hash of the full transaction; also the message signed by witness
    /// checks.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let mut tx = Transaction::new(SessionToken(7));
        tx.outputs.push(TransactionOutput {
            asset_id: vec![0xAA],
            value: 500,
            script_hash: ScriptHash::of_script(b"contract"),
        });

        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn test_hash_covers_outputs() {
        let tx1 = Transaction::new(SessionToken(1));
        let mut tx2 = Transaction::new(SessionToken(1));
        tx2.outputs.push(TransactionOutput {
            asset_id: vec![0xAA],
            value: 1,
            script_hash: ScriptHash::ZERO,
        });

        assert_ne!(tx1.hash(), tx2.hash());
    }
}
