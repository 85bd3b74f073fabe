//! Debugger-facing stack values.

use crate::abi::VmType;
use ministack_vm::stack_item::{bytes_to_int, int_to_bytes};
use ministack_vm::StackItem;
use num_bigint::BigInt;
use num_traits::Zero;

/// A decoded evaluation-stack value as shown to the debugger front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(BigInt),
    Array(Vec<Value>),
    ByteArray(Vec<u8>),
    Unknown,
}

impl Value {
    /// Decode a raw stack item under a declared-type hint. With an
    /// `Unknown` hint the item keeps its VM representation.
    pub fn from_stack_item(item: &StackItem, hint: VmType) -> Value {
        match item {
            StackItem::Integer(n) => match hint {
                VmType::Boolean => Value::Boolean(!n.is_zero()),
                VmType::String => Value::String(n.to_string()),
                VmType::ByteArray => Value::ByteArray(int_to_bytes(n)),
                _ => Value::Integer(n.clone()),
            },
            StackItem::Boolean(b) => match hint {
                VmType::Integer => Value::Integer(BigInt::from(*b as u8)),
                _ => Value::Boolean(*b),
            },
            StackItem::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::from_stack_item(item, VmType::Unknown))
                    .collect(),
            ),
            StackItem::ByteArray(bytes) => match hint {
                VmType::Integer => Value::Integer(bytes_to_int(bytes)),
                VmType::Boolean => Value::Boolean(bytes.iter().any(|&b| b != 0)),
                VmType::String => match String::from_utf8(bytes.clone()) {
                    Ok(text) => Value::String(text),
                    Err(_) => Value::ByteArray(bytes.clone()),
                },
                _ => Value::ByteArray(bytes.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_passthrough() {
        let item = StackItem::from_int(42);
        assert_eq!(
            Value::from_stack_item(&item, VmType::Unknown),
            Value::Integer(42.into())
        );
    }

    #[test]
    fn test_byte_array_hints() {
        let item = StackItem::from_bytes(vec![0x05]);
        assert_eq!(
            Value::from_stack_item(&item, VmType::Integer),
            Value::Integer(5.into())
        );
        assert_eq!(
            Value::from_stack_item(&item, VmType::Unknown),
            Value::ByteArray(vec![0x05])
        );

        let text = StackItem::from_bytes(b"hello".to_vec());
        assert_eq!(
            Value::from_stack_item(&text, VmType::String),
            Value::String("hello".into())
        );
    }

    #[test]
    fn test_invalid_utf8_stays_bytes() {
        let item = StackItem::from_bytes(vec![0xFF, 0xFE]);
        assert_eq!(
            Value::from_stack_item(&item, VmType::String),
            Value::ByteArray(vec![0xFF, 0xFE])
        );
    }

    #[test]
    fn test_array_decodes_recursively() {
        let item = StackItem::Array(vec![StackItem::from_int(1), StackItem::Boolean(true)]);
        assert_eq!(
            Value::from_stack_item(&item, VmType::Array),
            Value::Array(vec![Value::Integer(1.into()), Value::Boolean(true)])
        );
    }
}
