//! `TYPE_*` diagnostic codes emitted by the checker. Kept as one exhaustive
//! list rather than inline string literals so the set of codes this crate
//! can produce is visible at a glance.

use bugc_diagnostics::Code;

pub const UNDEFINED_VARIABLE: Code = Code("TYPE_UNDEFINED_VARIABLE");
pub const UNDEFINED_FUNCTION: Code = Code("TYPE_UNDEFINED_FUNCTION");
pub const UNKNOWN_STRUCT: Code = Code("TYPE_UNKNOWN_STRUCT");
pub const DUPLICATE_DECL: Code = Code("TYPE_DUPLICATE_DECL");
pub const TYPE_MISMATCH: Code = Code("TYPE_MISMATCH");
pub const INVALID_CAST: Code = Code("TYPE_INVALID_CAST");
pub const NO_SUCH_FIELD: Code = Code("TYPE_NO_SUCH_FIELD");
pub const INVALID_CONDITION: Code = Code("TYPE_INVALID_CONDITION");
pub const INVALID_INDEX: Code = Code("TYPE_INVALID_INDEX");
pub const INVALID_SLICE: Code = Code("TYPE_INVALID_SLICE");
pub const INVALID_OPERAND: Code = Code("TYPE_INVALID_OPERAND");
pub const INVALID_ASSIGN_TARGET: Code = Code("TYPE_INVALID_ASSIGN_TARGET");
pub const ARITY_MISMATCH: Code = Code("TYPE_ARITY_MISMATCH");
pub const RETURN_MISMATCH: Code = Code("TYPE_RETURN_MISMATCH");
pub const BREAK_OUTSIDE_LOOP: Code = Code("TYPE_BREAK_OUTSIDE_LOOP");
pub const INVALID_SLOT: Code = Code("TYPE_INVALID_SLOT");
