//! Component C9: linearizes a function's blocks for code emission.
//!
//! Blocks are emitted in reverse post-order from the entry (spec.md §4.6) —
//! this keeps a block's fallthrough successor adjacent whenever the CFG
//! allows it, which is what lets codegen elide a `JUMP` in favor of falling
//! through. Blocks unreachable from the entry are dropped and reported as
//! a warning rather than silently compiled away.

use crate::cfg;
use crate::codes;
use bugc_diagnostics::{Diagnostic, Diagnostics};
use bugc_ir::{BlockLabel, Function};

pub fn block_layout(func: &Function, diagnostics: &mut Diagnostics) -> Vec<BlockLabel> {
    let rpo = cfg::reverse_postorder(func);
    for label in func.block_labels() {
        if !rpo.contains(&label) {
            diagnostics.push(Diagnostic::warning(
                codes::UNREACHABLE_BLOCK,
                format!("block `{label}` in function `{}` is unreachable and was not emitted", func.name),
            ));
        }
    }
    rpo
}

/// The block immediately preceding `label` in `layout`, if any — codegen
/// uses this to decide whether a phi's value is already on the stack from
/// straight-line fallthrough or must be materialized at every predecessor's
/// tail (SPEC_FULL.md §4).
pub fn layout_predecessor(layout: &[BlockLabel], label: BlockLabel) -> Option<BlockLabel> {
    let idx = layout.iter().position(|&l| l == label)?;
    if idx == 0 {
        None
    } else {
        Some(layout[idx - 1])
    }
}
