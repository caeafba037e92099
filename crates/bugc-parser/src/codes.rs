//! `PARSE_*` diagnostic codes (spec.md §6.4, §6.1: "Parse errors are
//! themselves diagnostics; a parse failure aborts the pipeline").

use bugc_diagnostics::Code;

pub const UNEXPECTED_TOKEN: Code = Code("PARSE_UNEXPECTED_TOKEN");
pub const UNEXPECTED_EOF: Code = Code("PARSE_UNEXPECTED_EOF");
pub const INVALID_LITERAL: Code = Code("PARSE_INVALID_LITERAL");
pub const INVALID_TYPE: Code = Code("PARSE_INVALID_TYPE");
pub const LEX_ERROR: Code = Code("PARSE_LEX_ERROR");
