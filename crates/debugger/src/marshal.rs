//! Argument marshalling: parameter tree to stack-loading prelude.
//!
//! The prelude is loaded into the VM after the contract script, so it
//! executes first and returns into the contract with the arguments
//! staged on the shared evaluation stack.

use crate::params::{ParamKind, ParamNode};
use ministack_vm::{Opcode, ScriptBuilder};
use num_bigint::BigInt;
use num_traits::Zero;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// The marshaller cannot emit a value of this kind. Unreachable with
    /// the closed `Argument` type, but part of the `reset` contract.
    #[error("unsupported parameter kind")]
    UnsupportedParamKind,
}

/// A converted argument, ready for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Argument {
    Bytes(Vec<u8>),
    List(Vec<Argument>),
    Null,
    Bool(bool),
    Integer(BigInt),
    String(String),
}

/// Convert one tree node into an argument.
pub(crate) fn convert_argument(node: &ParamNode) -> Argument {
    match node.kind {
        ParamKind::Composite => {
            if !node.children.is_empty() && node.children.iter().all(is_byte_leaf) {
                let bytes = node
                    .children
                    .iter()
                    .filter_map(|c| c.value.as_deref())
                    .filter_map(|v| v.parse::<u8>().ok())
                    .collect();
                Argument::Bytes(bytes)
            } else {
                Argument::List(node.children.iter().map(convert_argument).collect())
            }
        }
        ParamKind::Null => Argument::Null,
        ParamKind::Numeric => {
            let Some(value) = node.value.as_deref() else {
                return Argument::Null;
            };
            Argument::Integer(value.parse().unwrap_or_else(|_| BigInt::zero()))
        }
        ParamKind::Boolean => {
            let Some(value) = node.value.as_deref() else {
                return Argument::Null;
            };
            Argument::Bool(value.eq_ignore_ascii_case("true"))
        }
        ParamKind::String => {
            let Some(value) = node.value.as_deref() else {
                return Argument::Null;
            };
            if let Some(hex_digits) = value.strip_prefix("0x") {
                // odd-length or malformed hex falls through as a string
                match hex::decode(hex_digits) {
                    Ok(bytes) => Argument::Bytes(bytes),
                    Err(_) => Argument::String(value.into()),
                }
            } else {
                Argument::String(value.into())
            }
        }
    }
}

fn is_byte_leaf(node: &ParamNode) -> bool {
    node.kind == ParamKind::Numeric
        && node
            .value
            .as_deref()
            .is_some_and(|v| v.parse::<u8>().is_ok())
}

/// Lower an argument tree to a prelude script. The root's children are
/// collected in order and emitted by popping that collection, so the
/// first argument is pushed last and sits on top of the stack in ABI
/// order.
pub fn build_prelude(root: &ParamNode) -> Result<Vec<u8>, MarshalError> {
    let mut pending: Vec<Argument> = root.children.iter().map(convert_argument).collect();
    let mut sb = ScriptBuilder::new();
    while let Some(argument) = pending.pop() {
        emit_argument(&mut sb, &argument)?;
    }
    Ok(sb.into_bytes())
}

/// Emit one argument. Collections are emitted element-last so PACK, which
/// pops top-first, rebuilds them in index order.
fn emit_argument(sb: &mut ScriptBuilder, argument: &Argument) -> Result<(), MarshalError> {
    match argument {
        Argument::Bytes(bytes) => {
            for &byte in bytes.iter().rev() {
                sb.push_integer(&BigInt::from(byte));
            }
            sb.push_integer(&BigInt::from(bytes.len()));
            sb.emit(Opcode::PACK);
        }
        Argument::List(items) => {
            for item in items.iter().rev() {
                emit_argument(sb, item)?;
            }
            sb.push_integer(&BigInt::from(items.len()));
            sb.emit(Opcode::PACK);
        }
        Argument::Null => {
            sb.push_bytes(&[]);
        }
        Argument::Bool(value) => {
            sb.push_bool(*value);
        }
        Argument::Integer(value) => {
            sb.push_integer(value);
        }
        Argument::String(value) => {
            sb.push_string(value);
        }
    }
    Ok(())
}
