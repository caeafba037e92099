//! `EVM001`-`EVM999` diagnostic codes (spec.md §4.7, §6.4): structured
//! codes for every invariant violation the generator can detect. Kept as
//! one list, in the numeric order the spec names them, rather than
//! free-form strings scattered across `emit.rs`.

use bugc_diagnostics::Code;

pub const STACK_UNDERFLOW: Code = Code("EVM001");
pub const DUP_OUT_OF_RANGE: Code = Code("EVM002");
pub const SWAP_OUT_OF_RANGE: Code = Code("EVM003");
pub const VALUE_UNLOADABLE: Code = Code("EVM004");
pub const UNRESOLVED_PHI_SOURCE: Code = Code("EVM005");
pub const MISSING_JUMP_TARGET: Code = Code("EVM006");
pub const UNKNOWN_CALLEE: Code = Code("EVM007");

/// Unsupported IR instruction kinds degrade to warnings rather than
/// aborting codegen (spec.md §7), so partial bytecode stays inspectable.
pub const UNSUPPORTED_INSTRUCTION: Code = Code("EVM900");
