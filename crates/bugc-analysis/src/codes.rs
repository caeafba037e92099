//! `ANALYSIS_*` diagnostic codes for C6-C9. A sibling namespace to
//! `IRGEN_*`: these fire over IR that already lowered cleanly, when the
//! shape of the control-flow graph itself is suspect.

use bugc_diagnostics::Code;

pub const UNREACHABLE_BLOCK: Code = Code("ANALYSIS_UNREACHABLE_BLOCK");
