//! Internal invariant violations the generator can hit when the IR handed
//! to it is malformed — stack underflow, an out-of-range `DUP`/`SWAP`, a
//! value that can neither be duplicated nor reloaded, an unresolved phi
//! source, or a jump to a block the layout never emitted. Every variant is
//! an `Error`-severity diagnostic (spec.md §4.7, §7); none of these should
//! ever fire against IR that passed `bugc-check`/`bugc-irgen`/`bugc-analysis`
//! cleanly, so hitting one downstream of those stages is itself a bug report.

use bugc_diagnostics::{Code, Diagnostic};

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("stack underflow in function `{function}`: expected at least {needed} operand(s), found {found}")]
    StackUnderflow { function: String, needed: usize, found: usize },

    #[error("DUP{0} is out of range (EVM limits DUP to the top 16 stack slots)")]
    DupOutOfRange(u8),

    #[error("SWAP{0} is out of range (EVM limits SWAP to the top 16 stack slots)")]
    SwapOutOfRange(u8),

    #[error("value in function `{function}` has no memory offset and is no longer within DUP's reach")]
    ValueUnloadable { function: String },

    #[error("phi in block `{block}` of function `{function}` has no source for predecessor `{pred}`")]
    UnresolvedPhiSource { function: String, block: String, pred: String },

    #[error("jump in function `{function}` targets block `{target}`, which block layout never emitted")]
    MissingJumpTarget { function: String, target: String },

    #[error("call to undefined function `{0}`")]
    UnknownCallee(String),
}

impl CodegenError {
    fn code(&self) -> Code {
        match self {
            CodegenError::StackUnderflow { .. } => crate::codes::STACK_UNDERFLOW,
            CodegenError::DupOutOfRange(_) => crate::codes::DUP_OUT_OF_RANGE,
            CodegenError::SwapOutOfRange(_) => crate::codes::SWAP_OUT_OF_RANGE,
            CodegenError::ValueUnloadable { .. } => crate::codes::VALUE_UNLOADABLE,
            CodegenError::UnresolvedPhiSource { .. } => crate::codes::UNRESOLVED_PHI_SOURCE,
            CodegenError::MissingJumpTarget { .. } => crate::codes::MISSING_JUMP_TARGET,
            CodegenError::UnknownCallee(_) => crate::codes::UNKNOWN_CALLEE,
        }
    }
}

impl From<CodegenError> for Diagnostic {
    fn from(e: CodegenError) -> Self {
        let code = e.code();
        Diagnostic::error(code, e.to_string())
    }
}
