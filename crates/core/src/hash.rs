//! Blake3 hashing and script identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw bytes of a 256-bit digest.
pub type H256 = [u8; 32];

/// A 256-bit Blake3 digest.
///
/// Blocks and transactions on the synthetic chain are identified by
/// their `Hash`, and a transaction's hash is the message witness checks
/// sign. `ZERO` marks the genesis block's missing parent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The all-zero digest, used where no parent block exists.
    pub const ZERO: Self = Self([0u8; 32]);

    /// The digest bytes, as signed by witness checks.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// A 20-byte identifier derived from a contract's bytecode.
///
/// Accounts, storage contexts, and transaction outputs are all keyed by
/// script hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScriptHash(pub [u8; 20]);

impl ScriptHash {
    /// The zero hash, used where no account is bound yet.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Derive the script hash of a piece of bytecode.
    pub fn of_script(script: &[u8]) -> Self {
        let h = hash(script);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&h.0[..20]);
        Self(bytes)
    }

    /// Create a script hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create a script hash from a slice, if it is exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 20 {
            return None;
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Some(Self(arr))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptHash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for ScriptHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Digest an encoded block, transaction, or script with Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}
