//! `IRGEN_*` diagnostic codes (spec.md §6.4, §7).

use bugc_diagnostics::Code;

pub const UNKNOWN_IDENTIFIER: Code = Code("IRGEN_UNKNOWN_IDENTIFIER");
pub const UNSUPPORTED_STORAGE_PATTERN: Code = Code("IRGEN_UNSUPPORTED_STORAGE_PATTERN");
pub const UNSUPPORTED_VALUE_PATTERN: Code = Code("IRGEN_UNSUPPORTED_VALUE_PATTERN");
