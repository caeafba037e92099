//! Components C6-C9: turns the straight-line-mutable IR that `bugc-irgen`
//! produces into the form `bugc-codegen` wants — locals promoted to SSA
//! with phis at their merge points, liveness, a memory layout for whatever
//! can't live on the stack, and a concrete block emission order.
//!
//! Run order matters: phi insertion (C6) must happen before liveness (C7),
//! since liveness treats phi sources as uses on the predecessor edge; the
//! memory planner (C8) consumes C7's output; block layout (C9) is
//! independent of the other three but is bundled here since codegen wants
//! all four results together.

mod cfg;
mod codes;
mod layout;
mod liveness;
mod memory;
mod phi;
mod var;

use bugc_diagnostics::Diagnostics;
use bugc_ir::{BlockLabel, Function, Module};
use std::collections::BTreeMap;

pub use liveness::{compute_liveness, Liveness};
pub use memory::{plan_memory, MemoryLayout};
pub use phi::promote_locals;
pub use var::VarId;

/// Everything `bugc-codegen` needs for one function: SSA-complete IR
/// (mutated in place), its liveness, its memory layout, and its linear
/// block order.
pub struct FunctionAnalysis {
    pub liveness: Liveness,
    pub memory: MemoryLayout,
    pub layout: Vec<BlockLabel>,
}

/// Runs C6-C9 over `func` in place and returns the analyses C10 needs.
pub fn analyze_function(func: &mut Function, diagnostics: &mut Diagnostics) -> FunctionAnalysis {
    promote_locals(func);
    let liveness = compute_liveness(func);
    let memory = plan_memory(func, &liveness);
    let layout = layout::block_layout(func, diagnostics);
    FunctionAnalysis { liveness, memory, layout }
}

pub use layout::layout_predecessor;

/// Runs C6-C9 over every function in `module` (the `create` constructor,
/// `main`, and every user-defined function), in declaration order.
pub fn analyze_module(module: &mut Module) -> (BTreeMap<String, FunctionAnalysis>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut analyses = BTreeMap::new();

    if let Some(create) = &mut module.create {
        analyses.insert("create".to_string(), analyze_function(create, &mut diagnostics));
    }
    analyses.insert("main".to_string(), analyze_function(&mut module.main, &mut diagnostics));
    for (name, func) in module.functions.iter_mut() {
        analyses.insert(name.clone(), analyze_function(func, &mut diagnostics));
    }

    (analyses, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugc_check::check_program;
    use bugc_irgen::lower_program;

    fn analyze(src: &str) -> (Module, BTreeMap<String, FunctionAnalysis>, Diagnostics) {
        let program = bugc_parser::parse(src).expect("parses");
        let checked = check_program(&program);
        assert!(!checked.diagnostics.has_errors(), "type errors: {:?}", checked.diagnostics.into_vec());
        let out = lower_program(&program, &checked);
        assert!(out.diagnostics.is_empty(), "irgen diagnostics: {:?}", out.diagnostics.into_vec());
        let mut module = out.module;
        let (analyses, diagnostics) = analyze_module(&mut module);
        (module, analyses, diagnostics)
    }

    #[test]
    fn loop_counter_is_promoted_to_a_phi() {
        let (module, _, diags) = analyze(
            "name C;
             code {
                 let i = 0;
                 for (; i < 10; i = i + 1) { }
             }",
        );
        assert!(diags.is_empty());
        let has_phi = module.main.blocks.values().any(|b| !b.phis.is_empty());
        assert!(has_phi, "loop header should carry a phi for the promoted counter `i`");
        let no_local_traffic = module
            .main
            .blocks
            .values()
            .all(|b| !b.instrs.iter().any(|i| matches!(i, bugc_ir::Instr::LoadLocal { .. } | bugc_ir::Instr::StoreLocal { .. })));
        assert!(no_local_traffic, "a fully-promoted scalar local leaves no load/store behind");
    }

    #[test]
    fn phi_sources_cover_every_predecessor() {
        let (module, _, _) = analyze(
            "name C;
             code {
                 let x = 0;
                 if (msg.value > 0) { x = 1; } else { x = 2; }
                 return x;
             }",
        );
        let phi_block = module.main.blocks.values().find(|b| !b.phis.is_empty());
        if let Some(block) = phi_block {
            let phi = &block.phis[0];
            assert_eq!(phi.sources.len(), block.preds.len());
            for pred in &block.preds {
                assert!(phi.sources.contains_key(pred));
            }
        }
    }

    #[test]
    fn block_layout_visits_every_reachable_block_once() {
        let (module, analyses, _) = analyze(
            "name C;
             code {
                 let x = 0;
                 if (msg.value > 0) { x = 1; } else { x = 2; }
                 return x;
             }",
        );
        let analysis = &analyses["main"];
        assert_eq!(analysis.layout.len(), module.main.blocks.len());
        assert_eq!(analysis.layout[0], module.main.entry);
    }

    #[test]
    fn unreachable_block_is_warned_and_dropped() {
        let (mut module, _, _) = analyze("name C; code { return 1; }");
        let extra = BlockLabel(9999);
        module.main.blocks.insert(extra, bugc_ir::Block::new(extra));
        let mut diagnostics = Diagnostics::new();
        let layout = layout::block_layout(&module.main, &mut diagnostics);
        assert!(!layout.contains(&extra));
        assert!(diagnostics.into_vec().iter().any(|d| d.code.0 == "ANALYSIS_UNREACHABLE_BLOCK"));
    }
}
