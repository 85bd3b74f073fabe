//! Block structure for the synthetic chain.

use crate::transaction::Transaction;
use ministack_core::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A block on the synthetic chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block height (0 for genesis).
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u32,
    /// Hash of the previous block.
    pub prev_hash: Hash,
    /// Transactions confirmed with this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new empty block on top of a parent.
    pub fn new(height: u64, prev_hash: Hash) -> Self {
        Self {
            height,
            timestamp: Self::current_timestamp(),
            prev_hash,
            transactions: Vec::new(),
        }
    }

    /// Create the genesis block.
    pub fn genesis() -> Self {
        Self {
            height: 0,
            timestamp: Self::current_timestamp(),
            prev_hash: Hash::ZERO,
            transactions: Vec::new(),
        }
    }

    /// Get the block hash.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.prev_hash == Hash::ZERO
    }

    /// Get the current Unix timestamp.
    pub fn current_timestamp() -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.height, 0);
    }

    #[test]
    fn test_child_block_links_to_parent() {
        let genesis = Block::genesis();
        let child = Block::new(1, genesis.hash());
        assert!(!child.is_genesis());
        assert_eq!(child.prev_hash, genesis.hash());
    }
}
