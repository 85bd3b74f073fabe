//! Core primitives for ministack.
//!
//! This crate provides the fundamental types used throughout the emulator:
//! - Hashing (blake3) and 20-byte script hashes
//! - Fixed-point values with 8 fractional digits (gas, asset amounts)
//! - Ed25519 keys for witness checks

pub mod crypto;
pub mod fixed8;
pub mod hash;

pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use fixed8::Fixed8;
pub use hash::{hash, Hash, ScriptHash, H256};
