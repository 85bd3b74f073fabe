//! Synthetic blockchain for the ministack emulator.
//!
//! Debug sessions execute against this chain: it hands out blocks,
//! confirms them unconditionally, and keeps contract accounts with their
//! in-memory storage. Nothing here persists.

pub mod account;
pub mod block;
pub mod blockchain;
pub mod transaction;

pub use account::ContractAccount;
pub use blockchain::{Blockchain, ChainError};
pub use block::Block;
pub use transaction::{SessionToken, Transaction, TransactionOutput};
