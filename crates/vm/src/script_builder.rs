//! Programmatic bytecode emission.

use crate::opcode::Opcode;
use crate::stack_item::int_to_bytes;
use ministack_core::ScriptHash;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Builds a script opcode by opcode.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a bare opcode.
    pub fn emit(&mut self, op: Opcode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Push a boolean (PUSH1 / PUSH0).
    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { Opcode::PUSH1 } else { Opcode::PUSH0 })
    }

    /// Push an integer, using the dedicated opcodes for -1, 0 and 1..16
    /// and a little-endian literal otherwise.
    pub fn push_integer(&mut self, value: &BigInt) -> &mut Self {
        if *value == BigInt::from(-1) {
            return self.emit(Opcode::PUSHM1);
        }
        if value.is_zero() {
            return self.emit(Opcode::PUSH0);
        }
        if let Some(small) = value.to_u8().filter(|v| (1..=16).contains(v)) {
            self.script.push(Opcode::PUSH1 as u8 - 1 + small);
            return self;
        }
        let bytes = int_to_bytes(value);
        self.push_bytes(&bytes)
    }

    /// Push a byte string, choosing the shortest encoding for its length.
    pub fn push_bytes(&mut self, data: &[u8]) -> &mut Self {
        match data.len() {
            0 => {
                self.emit(Opcode::PUSH0);
            }
            len @ 1..=75 => {
                // the length byte itself is the opcode
                self.script.push(len as u8);
                self.script.extend_from_slice(data);
            }
            len @ 76..=255 => {
                self.emit(Opcode::PUSHDATA1);
                self.script.push(len as u8);
                self.script.extend_from_slice(data);
            }
            len @ 256..=65535 => {
                self.emit(Opcode::PUSHDATA2);
                self.script.extend_from_slice(&(len as u16).to_le_bytes());
                self.script.extend_from_slice(data);
            }
            len => {
                self.emit(Opcode::PUSHDATA4);
                self.script.extend_from_slice(&(len as u32).to_le_bytes());
                self.script.extend_from_slice(data);
            }
        }
        self
    }

    /// Push a UTF-8 string as its bytes.
    pub fn push_string(&mut self, value: &str) -> &mut Self {
        self.push_bytes(value.as_bytes())
    }

    /// Emit a syscall with its length-prefixed name.
    pub fn emit_syscall(&mut self, name: &str) -> &mut Self {
        self.emit(Opcode::SYSCALL);
        self.script.push(name.len() as u8);
        self.script.extend_from_slice(name.as_bytes());
        self
    }

    /// Emit a static call into another contract.
    pub fn emit_appcall(&mut self, hash: &ScriptHash, tail: bool) -> &mut Self {
        self.emit(if tail { Opcode::TAILCALL } else { Opcode::APPCALL });
        self.script.extend_from_slice(hash.as_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.script
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_small_integers() {
        let mut sb = ScriptBuilder::new();
        sb.push_integer(&BigInt::from(-1));
        sb.push_integer(&BigInt::from(0));
        sb.push_integer(&BigInt::from(1));
        sb.push_integer(&BigInt::from(16));
        assert_eq!(sb.as_bytes(), &[0x4F, 0x00, 0x51, 0x60]);
    }

    #[test]
    fn test_push_literal_integer() {
        let mut sb = ScriptBuilder::new();
        sb.push_integer(&BigInt::from(30));
        // one-byte literal: length prefix then the value
        assert_eq!(sb.as_bytes(), &[0x01, 0x1E]);
    }

    #[test]
    fn test_push_bytes_encodings() {
        let mut sb = ScriptBuilder::new();
        sb.push_bytes(&[]);
        assert_eq!(sb.as_bytes(), &[0x00]);

        let mut sb = ScriptBuilder::new();
        sb.push_bytes(&[0xAB; 75]);
        assert_eq!(sb.as_bytes()[0], 75);
        assert_eq!(sb.len(), 76);

        let mut sb = ScriptBuilder::new();
        sb.push_bytes(&[0xAB; 80]);
        assert_eq!(sb.as_bytes()[0], Opcode::PUSHDATA1 as u8);
        assert_eq!(sb.as_bytes()[1], 80);

        let mut sb = ScriptBuilder::new();
        sb.push_bytes(&[0xAB; 300]);
        assert_eq!(sb.as_bytes()[0], Opcode::PUSHDATA2 as u8);
        assert_eq!(&sb.as_bytes()[1..3], &300u16.to_le_bytes());
    }

    #[test]
    fn test_emit_syscall() {
        let mut sb = ScriptBuilder::new();
        sb.emit_syscall("Neo.Runtime.GetTime");
        let bytes = sb.as_bytes();
        assert_eq!(bytes[0], Opcode::SYSCALL as u8);
        assert_eq!(bytes[1] as usize, "Neo.Runtime.GetTime".len());
        assert_eq!(&bytes[2..], b"Neo.Runtime.GetTime");
    }

    #[test]
    fn test_emit_appcall() {
        let hash = ScriptHash::of_script(b"callee");
        let mut sb = ScriptBuilder::new();
        sb.emit_appcall(&hash, false);
        assert_eq!(sb.as_bytes()[0], Opcode::APPCALL as u8);
        assert_eq!(&sb.as_bytes()[1..], hash.as_bytes());
        assert_eq!(sb.len(), 21);
    }
}
