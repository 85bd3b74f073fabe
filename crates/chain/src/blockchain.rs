//! The synthetic chain: blocks plus contract accounts.

use crate::account::ContractAccount;
use crate::block::Block;
use ministack_core::ScriptHash;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during chain operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block out of order (expected height {expected}, got {got})")]
    BlockOutOfOrder { expected: u64, got: u64 },
}

/// Blocks and accounts a debug session executes against.
#[derive(Debug)]
pub struct Blockchain {
    blocks: Vec<Block>,
    accounts: HashMap<ScriptHash, ContractAccount>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Create a chain holding only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            accounts: HashMap::new(),
        }
    }

    /// Current chain height.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    /// The most recently confirmed block.
    pub fn current_block(&self) -> &Block {
        // the chain is never empty; genesis is created in new()
        &self.blocks[self.blocks.len() - 1]
    }

    /// Start the next block. It joins the chain once confirmed.
    pub fn generate_block(&self) -> Block {
        Block::new(self.height() + 1, self.current_block().hash())
    }

    /// Append a generated block to the chain.
    pub fn confirm_block(&mut self, block: Block) -> Result<(), ChainError> {
        let expected = self.height() + 1;
        if block.height != expected {
            return Err(ChainError::BlockOutOfOrder {
                expected,
                got: block.height,
            });
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    pub fn account(&self, hash: &ScriptHash) -> Option<&ContractAccount> {
        self.accounts.get(hash)
    }

    pub fn account_mut(&mut self, hash: &ScriptHash) -> Option<&mut ContractAccount> {
        self.accounts.get_mut(hash)
    }

    /// Look up an account, creating an empty one on first touch. Storage
    /// writes against undeployed hashes land in such accounts.
    pub fn get_or_create_account(&mut self, hash: ScriptHash) -> &mut ContractAccount {
        self.accounts
            .entry(hash)
            .or_insert_with(|| ContractAccount::new(hash, String::new()))
    }

    pub fn add_account(&mut self, account: ContractAccount) {
        self.accounts.insert(account.script_hash, account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = Blockchain::new();
        assert_eq!(chain.height(), 0);
        assert!(chain.current_block().is_genesis());
    }

    #[test]
    fn test_generate_and_confirm_block() {
        let mut chain = Blockchain::new();
        let block = chain.generate_block();
        assert_eq!(block.height, 1);
        assert_eq!(block.prev_hash, chain.current_block().hash());

        chain.confirm_block(block).unwrap();
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn test_confirm_out_of_order_fails() {
        let mut chain = Blockchain::new();
        let block = Block::new(5, chain.current_block().hash());
        let err = chain.confirm_block(block).unwrap_err();
        assert_eq!(err, ChainError::BlockOutOfOrder { expected: 1, got: 5 });
    }

    #[test]
    fn test_get_or_create_account() {
        let mut chain = Blockchain::new();
        let hash = ScriptHash::of_script(b"contract");
        assert!(chain.account(&hash).is_none());

        chain
            .get_or_create_account(hash)
            .storage
            .insert(b"key".to_vec(), b"value".to_vec());
        assert_eq!(
            chain.account(&hash).unwrap().storage.get(b"key".as_slice()),
            Some(&b"value".to_vec())
        );
    }

    #[test]
    fn test_deployed_account_lookup() {
        let mut chain = Blockchain::new();
        let account = ContractAccount::deploy("token", vec![0x51, 0x66]);
        let hash = account.script_hash;
        chain.add_account(account);
        assert!(chain.account(&hash).unwrap().is_contract());
    }
}
