//! Per-opcode gas pricing.

use ministack_core::Fixed8;
use ministack_vm::Opcode;
use std::collections::HashMap;

// Cost tiers, in raw 10^-8 units.
const DEFAULT_COST: Fixed8 = Fixed8::from_raw(100_000); // 0.001
const CALL_COST: Fixed8 = Fixed8::from_raw(1_000_000); // 0.01: APPCALL, TAILCALL, SHA1, SHA256
const HASH_COST: Fixed8 = Fixed8::from_raw(2_000_000); // 0.02: HASH160, HASH256
const SIG_COST: Fixed8 = Fixed8::from_raw(10_000_000); // 0.1: CHECKSIG, CHECKMULTISIG

const STORAGE_READ_COST: Fixed8 = Fixed8::from_raw(10_000_000);
const STORAGE_WRITE_COST: Fixed8 = Fixed8::ONE;
const WITNESS_COST: Fixed8 = Fixed8::from_raw(20_000_000);

/// Storage writes are priced per started kilobyte of payload.
const STORAGE_PRICE_UNIT: i64 = 1024;

/// Prices executed opcodes and named syscalls.
#[derive(Debug)]
pub struct GasTable {
    syscalls: HashMap<&'static str, Fixed8>,
}

impl Default for GasTable {
    fn default() -> Self {
        let syscalls = HashMap::from([
            ("Neo.Storage.Get", STORAGE_READ_COST),
            ("Neo.Storage.Put", STORAGE_WRITE_COST),
            ("Neo.Storage.Delete", STORAGE_WRITE_COST),
            ("Neo.Runtime.CheckWitness", WITNESS_COST),
        ]);
        Self { syscalls }
    }
}

impl GasTable {
    /// Base cost of a syscall; unknown names are free.
    pub fn syscall_cost(&self, name: &str) -> Fixed8 {
        self.syscalls.get(name).copied().unwrap_or(Fixed8::ZERO)
    }

    /// Cost of one executed opcode. `storage_payload` is the byte length
    /// of the most recent storage write, used to scale `Storage.Put`.
    pub fn opcode_cost(&self, opcode: u8, syscall: Option<&str>, storage_payload: usize) -> Fixed8 {
        if Opcode::is_push(opcode) || opcode == Opcode::NOP as u8 {
            return Fixed8::ZERO;
        }
        if opcode == Opcode::CHECKSIG as u8 || opcode == Opcode::CHECKMULTISIG as u8 {
            return SIG_COST;
        }
        if opcode == Opcode::APPCALL as u8
            || opcode == Opcode::TAILCALL as u8
            || opcode == Opcode::SHA256 as u8
            || opcode == Opcode::SHA1 as u8
        {
            return CALL_COST;
        }
        if opcode == Opcode::HASH256 as u8 || opcode == Opcode::HASH160 as u8 {
            return HASH_COST;
        }
        if opcode == Opcode::SYSCALL as u8 {
            let Some(name) = syscall else {
                return Fixed8::ZERO;
            };
            let base = self.syscall_cost(name);
            if name.ends_with("Storage.Put") {
                // scale by payload size; anything under one unit rounds up
                let scaled = base.scale_by(storage_payload as i64, STORAGE_PRICE_UNIT);
                return scaled.max(Fixed8::ONE);
            }
            return base;
        }
        DEFAULT_COST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(opcode: Opcode) -> Fixed8 {
        GasTable::default().opcode_cost(opcode as u8, None, 0)
    }

    #[test]
    fn test_pushes_and_nop_are_free() {
        let table = GasTable::default();
        assert_eq!(table.opcode_cost(Opcode::PUSH0 as u8, None, 0), Fixed8::ZERO);
        assert_eq!(table.opcode_cost(0x4B, None, 0), Fixed8::ZERO);
        assert_eq!(table.opcode_cost(Opcode::PUSH16 as u8, None, 0), Fixed8::ZERO);
        assert_eq!(cost(Opcode::NOP), Fixed8::ZERO);
    }

    #[test]
    fn test_cost_classes() {
        assert_eq!(cost(Opcode::CHECKSIG), Fixed8::from_raw(10_000_000));
        assert_eq!(cost(Opcode::CHECKMULTISIG), Fixed8::from_raw(10_000_000));
        assert_eq!(cost(Opcode::APPCALL), Fixed8::from_raw(1_000_000));
        assert_eq!(cost(Opcode::SHA1), Fixed8::from_raw(1_000_000));
        assert_eq!(cost(Opcode::HASH160), Fixed8::from_raw(2_000_000));
        assert_eq!(cost(Opcode::ADD), Fixed8::from_raw(100_000));
        assert_eq!(cost(Opcode::RET), Fixed8::from_raw(100_000));
    }

    #[test]
    fn test_unknown_syscall_is_free() {
        let table = GasTable::default();
        assert_eq!(
            table.opcode_cost(Opcode::SYSCALL as u8, Some("No.Such.Api"), 0),
            Fixed8::ZERO
        );
    }

    #[test]
    fn test_storage_put_scales_with_payload() {
        let table = GasTable::default();
        let put = |payload| table.opcode_cost(Opcode::SYSCALL as u8, Some("Neo.Storage.Put"), payload);

        assert_eq!(put(2048), Fixed8::from_int(2));
        assert_eq!(put(1024), Fixed8::ONE);
        // small payloads clamp up to one unit
        assert_eq!(put(100), Fixed8::ONE);
        assert_eq!(put(0), Fixed8::ONE);
    }

    #[test]
    fn test_storage_get_uses_base_cost() {
        let table = GasTable::default();
        assert_eq!(
            table.opcode_cost(Opcode::SYSCALL as u8, Some("Neo.Storage.Get"), 4096),
            Fixed8::from_raw(10_000_000)
        );
    }
}
