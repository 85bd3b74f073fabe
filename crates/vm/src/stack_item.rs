//! Runtime values on the evaluation stack.

use num_bigint::BigInt;
use num_traits::Zero;

/// A value held on the VM's evaluation or alt stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackItem {
    ByteArray(Vec<u8>),
    Boolean(bool),
    Integer(BigInt),
    Array(Vec<StackItem>),
}

impl StackItem {
    pub fn from_int<T: Into<BigInt>>(value: T) -> Self {
        StackItem::Integer(value.into())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        StackItem::ByteArray(bytes.into())
    }

    /// Integer view of the item. Byte arrays decode as little-endian
    /// two's complement; arrays have no integer view.
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            StackItem::Integer(n) => Some(n.clone()),
            StackItem::Boolean(b) => Some(BigInt::from(*b as u8)),
            StackItem::ByteArray(bytes) => Some(bytes_to_int(bytes)),
            StackItem::Array(_) => None,
        }
    }

    /// Byte view of the item. Integers encode little-endian two's
    /// complement with zero as the empty string; arrays have no byte view.
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            StackItem::ByteArray(bytes) => Some(bytes.clone()),
            StackItem::Boolean(b) => Some(if *b { vec![1] } else { Vec::new() }),
            StackItem::Integer(n) => Some(int_to_bytes(n)),
            StackItem::Array(_) => None,
        }
    }

    /// Truthiness: any non-zero byte, non-zero integer, or any array.
    pub fn as_bool(&self) -> bool {
        match self {
            StackItem::Boolean(b) => *b,
            StackItem::Integer(n) => !n.is_zero(),
            StackItem::ByteArray(bytes) => bytes.iter().any(|&b| b != 0),
            StackItem::Array(_) => true,
        }
    }

    /// EQUAL semantics: primitives compare by byte representation,
    /// arrays compare element-wise.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Array(a), StackItem::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (StackItem::Array(_), _) | (_, StackItem::Array(_)) => false,
            _ => self.as_bytes() == other.as_bytes(),
        }
    }
}

/// Little-endian two's-complement decode; empty input is zero.
pub fn bytes_to_int(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        BigInt::zero()
    } else {
        BigInt::from_signed_bytes_le(bytes)
    }
}

/// Little-endian two's-complement encode; zero is the empty string.
pub fn int_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}
