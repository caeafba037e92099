//! Raw EVM opcode bytes (component C10). Only the subset this generator
//! actually emits; there is no exhaustive `Opcode` enum because nothing
//! here ever needs to decode bytecode, only produce it.

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const SIGNEXTEND: u8 = 0x0b;

pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const NOT: u8 = 0x19;

pub const SHA3: u8 = 0x20;

pub const ADDRESS: u8 = 0x30;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODECOPY: u8 = 0x39;

pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;

pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const JUMPDEST: u8 = 0x5b;
pub const PUSH0: u8 = 0x5f;

pub const PUSH1: u8 = 0x60;
pub const PUSH2: u8 = 0x61;
pub const PUSH32: u8 = 0x7f;

pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8f;

pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9f;

pub const RETURN: u8 = 0xf3;

/// `DUPn`, `n` in `1..=16`.
pub fn dup(n: u8) -> u8 {
    assert!((1..=16).contains(&n), "DUP position out of range: {n}");
    DUP1 + (n - 1)
}

/// `SWAPn`, `n` in `1..=16`.
pub fn swap(n: u8) -> u8 {
    assert!((1..=16).contains(&n), "SWAP position out of range: {n}");
    SWAP1 + (n - 1)
}

/// `PUSHn` for `n` immediate bytes, `n` in `1..=32`.
pub fn push_n(n: u8) -> u8 {
    assert!((1..=32).contains(&n), "PUSH width out of range: {n}");
    PUSH1 + (n - 1)
}

/// The minimal big-endian encoding of `value` with leading zero bytes
/// stripped, as `PUSHn` would encode it. Empty for zero (callers use
/// `PUSH0` instead of a zero-width `PUSHn`).
pub fn minimal_be_bytes(value: &alloy_primitives::U256) -> Vec<u8> {
    let full = value.to_be_bytes::<32>();
    let first_nonzero = full.iter().position(|b| *b != 0);
    match first_nonzero {
        Some(i) => full[i..].to_vec(),
        None => Vec::new(),
    }
}
