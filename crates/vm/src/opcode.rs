//! Opcode definitions for the stack VM.

/// All interpreted opcodes, with their wire byte values.
///
/// Bytes 0x01-0x4B are literal pushes: the byte value is the number of
/// bytes that follow. They are decoded as a length by the engine and have
/// no enum variant.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    // Constants (0x00-0x60)
    PUSH0 = 0x00,
    PUSHDATA1 = 0x4C,
    PUSHDATA2 = 0x4D,
    PUSHDATA4 = 0x4E,
    PUSHM1 = 0x4F,
    PUSH1 = 0x51,
    PUSH2 = 0x52,
    PUSH3 = 0x53,
    PUSH4 = 0x54,
    PUSH5 = 0x55,
    PUSH6 = 0x56,
    PUSH7 = 0x57,
    PUSH8 = 0x58,
    PUSH9 = 0x59,
    PUSH10 = 0x5A,
    PUSH11 = 0x5B,
    PUSH12 = 0x5C,
    PUSH13 = 0x5D,
    PUSH14 = 0x5E,
    PUSH15 = 0x5F,
    PUSH16 = 0x60,

    // Flow control (0x61-0x69)
    NOP = 0x61,
    JMP = 0x62,
    JMPIF = 0x63,
    JMPIFNOT = 0x64,
    CALL = 0x65,
    RET = 0x66,
    APPCALL = 0x67,
    SYSCALL = 0x68,
    TAILCALL = 0x69,

    // Stack (0x6A-0x7D)
    DUPFROMALTSTACK = 0x6A,
    TOALTSTACK = 0x6B,
    FROMALTSTACK = 0x6C,
    XDROP = 0x6D,
    XSWAP = 0x72,
    XTUCK = 0x73,
    DEPTH = 0x74,
    DROP = 0x75,
    DUP = 0x76,
    NIP = 0x77,
    OVER = 0x78,
    PICK = 0x79,
    ROLL = 0x7A,
    ROT = 0x7B,
    SWAP = 0x7C,
    TUCK = 0x7D,

    // Splice (0x7E-0x82)
    CAT = 0x7E,
    SUBSTR = 0x7F,
    LEFT = 0x80,
    RIGHT = 0x81,
    SIZE = 0x82,

    // Bitwise logic (0x83-0x87)
    INVERT = 0x83,
    AND = 0x84,
    OR = 0x85,
    XOR = 0x86,
    EQUAL = 0x87,

    // Arithmetic (0x8B-0xA5)
    INC = 0x8B,
    DEC = 0x8C,
    SIGN = 0x8D,
    NEGATE = 0x8F,
    ABS = 0x90,
    NOT = 0x91,
    NZ = 0x92,
    ADD = 0x93,
    SUB = 0x94,
    MUL = 0x95,
    DIV = 0x96,
    MOD = 0x97,
    SHL = 0x98,
    SHR = 0x99,
    BOOLAND = 0x9A,
    BOOLOR = 0x9B,
    NUMEQUAL = 0x9C,
    NUMNOTEQUAL = 0x9E,
    LT = 0x9F,
    GT = 0xA0,
    LTE = 0xA1,
    GTE = 0xA2,
    MIN = 0xA3,
    MAX = 0xA4,
    WITHIN = 0xA5,

    // Crypto (0xA7-0xAE)
    SHA1 = 0xA7,
    SHA256 = 0xA8,
    HASH160 = 0xA9,
    HASH256 = 0xAA,
    CHECKSIG = 0xAC,
    VERIFY = 0xAD,
    CHECKMULTISIG = 0xAE,

    // Arrays (0xC0-0xCA)
    ARRAYSIZE = 0xC0,
    PACK = 0xC1,
    UNPACK = 0xC2,
    PICKITEM = 0xC3,
    SETITEM = 0xC4,
    NEWARRAY = 0xC5,
    NEWSTRUCT = 0xC6,
    APPEND = 0xC8,
    REVERSE = 0xC9,
    REMOVE = 0xCA,

    // Exceptions (0xF0-0xF1)
    THROW = 0xF0,
    THROWIFNOT = 0xF1,
}

impl Opcode {
    /// Parse a byte as an opcode. Literal pushes (0x01-0x4B) return None;
    /// the engine decodes them by length.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::PUSH0),
            0x4C => Some(Opcode::PUSHDATA1),
            0x4D => Some(Opcode::PUSHDATA2),
            0x4E => Some(Opcode::PUSHDATA4),
            0x4F => Some(Opcode::PUSHM1),
            0x51 => Some(Opcode::PUSH1),
            0x52 => Some(Opcode::PUSH2),
            0x53 => Some(Opcode::PUSH3),
            0x54 => Some(Opcode::PUSH4),
            0x55 => Some(Opcode::PUSH5),
            0x56 => Some(Opcode::PUSH6),
            0x57 => Some(Opcode::PUSH7),
            0x58 => Some(Opcode::PUSH8),
            0x59 => Some(Opcode::PUSH9),
            0x5A => Some(Opcode::PUSH10),
            0x5B => Some(Opcode::PUSH11),
            0x5C => Some(Opcode::PUSH12),
            0x5D => Some(Opcode::PUSH13),
            0x5E => Some(Opcode::PUSH14),
            0x5F => Some(Opcode::PUSH15),
            0x60 => Some(Opcode::PUSH16),

            0x61 => Some(Opcode::NOP),
            0x62 => Some(Opcode::JMP),
            0x63 => Some(Opcode::JMPIF),
            0x64 => Some(Opcode::JMPIFNOT),
            0x65 => Some(Opcode::CALL),
            0x66 => Some(Opcode::RET),
            0x67 => Some(Opcode::APPCALL),
            0x68 => Some(Opcode::SYSCALL),
            0x69 => Some(Opcode::TAILCALL),

            0x6A => Some(Opcode::DUPFROMALTSTACK),
            0x6B => Some(Opcode::TOALTSTACK),
            0x6C => Some(Opcode::FROMALTSTACK),
            0x6D => Some(Opcode::XDROP),
            0x72 => Some(Opcode::XSWAP),
            0x73 => Some(Opcode::XTUCK),
            0x74 => Some(Opcode::DEPTH),
            0x75 => Some(Opcode::DROP),
            0x76 => Some(Opcode::DUP),
            0x77 => Some(Opcode::NIP),
            0x78 => Some(Opcode::OVER),
            0x79 => Some(Opcode::PICK),
            0x7A => Some(Opcode::ROLL),
            0x7B => Some(Opcode::ROT),
            0x7C => Some(Opcode::SWAP),
            0x7D => Some(Opcode::TUCK),

            0x7E => Some(Opcode::CAT),
            0x7F => Some(Opcode::SUBSTR),
            0x80 => Some(Opcode::LEFT),
            0x81 => Some(Opcode::RIGHT),
            0x82 => Some(Opcode::SIZE),

            0x83 => Some(Opcode::INVERT),
            0x84 => Some(Opcode::AND),
            0x85 => Some(Opcode::OR),
            0x86 => Some(Opcode::XOR),
            0x87 => Some(Opcode::EQUAL),

            0x8B => Some(Opcode::INC),
            0x8C => Some(Opcode::DEC),
            0x8D => Some(Opcode::SIGN),
            0x8F => Some(Opcode::NEGATE),
            0x90 => Some(Opcode::ABS),
            0x91 => Some(Opcode::NOT),
            0x92 => Some(Opcode::NZ),
            0x93 => Some(Opcode::ADD),
            0x94 => Some(Opcode::SUB),
            0x95 => Some(Opcode::MUL),
            0x96 => Some(Opcode::DIV),
            0x97 => Some(Opcode::MOD),
            0x98 => Some(Opcode::SHL),
            0x99 => Some(Opcode::SHR),
            0x9A => Some(Opcode::BOOLAND),
            0x9B => Some(Opcode::BOOLOR),
            0x9C => Some(Opcode::NUMEQUAL),
            0x9E => Some(Opcode::NUMNOTEQUAL),
            0x9F => Some(Opcode::LT),
            0xA0 => Some(Opcode::GT),
            0xA1 => Some(Opcode::LTE),
            0xA2 => Some(Opcode::GTE),
            0xA3 => Some(Opcode::MIN),
            0xA4 => Some(Opcode::MAX),
            0xA5 => Some(Opcode::WITHIN),

            0xA7 => Some(Opcode::SHA1),
            0xA8 => Some(Opcode::SHA256),
            0xA9 => Some(Opcode::HASH160),
            0xAA => Some(Opcode::HASH256),
            0xAC => Some(Opcode::CHECKSIG),
            0xAD => Some(Opcode::VERIFY),
            0xAE => Some(Opcode::CHECKMULTISIG),

            0xC0 => Some(Opcode::ARRAYSIZE),
            0xC1 => Some(Opcode::PACK),
            0xC2 => Some(Opcode::UNPACK),
            0xC3 => Some(Opcode::PICKITEM),
            0xC4 => Some(Opcode::SETITEM),
            0xC5 => Some(Opcode::NEWARRAY),
            0xC6 => Some(Opcode::NEWSTRUCT),
            0xC8 => Some(Opcode::APPEND),
            0xC9 => Some(Opcode::REVERSE),
            0xCA => Some(Opcode::REMOVE),

            0xF0 => Some(Opcode::THROW),
            0xF1 => Some(Opcode::THROWIFNOT),

            _ => None,
        }
    }

    /// Whether a raw byte is in the push range (PUSH0 through PUSH16,
    /// including literal pushes and PUSHDATA forms).
    pub fn is_push(byte: u8) -> bool {
        byte <= Opcode::PUSH16 as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte_roundtrip() {
        for byte in [0x00u8, 0x51, 0x60, 0x61, 0x66, 0x68, 0xC1, 0xF0] {
            let op = Opcode::from_byte(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn test_literal_push_range_has_no_variant() {
        assert_eq!(Opcode::from_byte(0x01), None);
        assert_eq!(Opcode::from_byte(0x4B), None);
    }

    #[test]
    fn test_unknown_byte() {
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_is_push() {
        assert!(Opcode::is_push(Opcode::PUSH0 as u8));
        assert!(Opcode::is_push(0x4B));
        assert!(Opcode::is_push(Opcode::PUSH16 as u8));
        assert!(!Opcode::is_push(Opcode::NOP as u8));
        assert!(!Opcode::is_push(Opcode::RET as u8));
    }
}
