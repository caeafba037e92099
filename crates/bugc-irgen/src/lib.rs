//! Component C5: lowers a type-checked BUG [`Program`] into a [`bugc_ir::Module`].
//!
//! The heavy lifting lives in [`builder`] (per-function lowering state),
//! [`lower_expr`] (expression → `Value`), and [`lower_stmt`] (statement →
//! block-building side effects). This module is just the outer loop that
//! drives those three over every declaration, plus the `create`/`main`
//! bodies spec.md §2 names.

mod builder;
mod codes;
mod lower_expr;
mod lower_stmt;

use bugc_ast::{Decl, Program};
use bugc_check::CheckedProgram;
use bugc_diagnostics::Diagnostics;
use bugc_ir::{Function, Module, StorageSlotDecl};
use builder::Builder;
use indexmap::IndexMap;
use lower_stmt::lower_block;
use tracing::debug;

/// The result of IR generation: the lowered module plus any `IRGEN_*`
/// diagnostics recorded while lowering (unknown identifiers, unsupported
/// storage-access patterns — spec.md §7).
pub struct IrGenOutput {
    pub module: Module,
    pub diagnostics: Diagnostics,
}

/// Lowers `program` (already validated by `bugc-check`) into an IR module.
///
/// Declaration order is preserved throughout: storage slots keep their
/// source order, user functions are lowered and inserted into the module's
/// function map in the order they appear among `program.decls` (spec.md §5:
/// "iteration over ordered sequences uses insertion order").
pub fn lower_program(program: &Program, checked: &CheckedProgram) -> IrGenOutput {
    let mut diagnostics = Diagnostics::new();
    let mut b = Builder::new(checked);

    let storage = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Storage(s) => {
                let ty = checked
                    .symbols
                    .root_scope()
                    .get(&s.name)
                    .map(|sym| sym.ty.clone())
                    .unwrap_or_else(|| bugc_types::Type::failure("unresolved storage type"));
                Some(StorageSlotDecl { name: s.name.clone(), slot: s.slot, ty })
            }
            _ => None,
        })
        .collect();

    let create = program.create.as_ref().map(|block| {
        b.start_function("create");
        lower_block(&mut b, block);
        let func = b.finish_function();
        debug!("lowered `create` to {} blocks", func.blocks.len());
        func
    });
    diagnostics.extend(std::mem::take(&mut b.diagnostics));

    b.start_function("main");
    lower_block(&mut b, &program.body);
    let main = b.finish_function();
    debug!("lowered `main` to {} blocks", main.blocks.len());
    diagnostics.extend(std::mem::take(&mut b.diagnostics));

    let mut functions: IndexMap<String, Function> = IndexMap::new();
    for decl in &program.decls {
        if let Decl::Function(f) = decl {
            b.start_function(f.name.clone());
            for (name, ty_expr) in &f.params {
                let ty = resolve_param_type(checked, ty_expr);
                b.bind_param(name, ty, f.span);
            }
            lower_block(&mut b, &f.body);
            let func = b.finish_function();
            debug!("lowered function `{}` to {} blocks", f.name, func.blocks.len());
            functions.insert(f.name.clone(), func);
        }
    }
    diagnostics.extend(std::mem::take(&mut b.diagnostics));

    let module = Module {
        name: program.name.clone(),
        storage,
        create,
        main,
        functions,
    };

    IrGenOutput { module, diagnostics }
}

/// Parameter types are re-resolved from the checker's function-signature
/// table (populated in C3 pass 1) rather than re-walking `TypeExpr`, so a
/// `Named` struct parameter resolves through the same struct table the
/// checker used.
fn resolve_param_type(checked: &CheckedProgram, ty_expr: &bugc_ast::TypeExpr) -> bugc_types::Type {
    use bugc_ast::TypeExpr;
    use bugc_types::Type;
    match ty_expr {
        TypeExpr::Bool => Type::Bool,
        TypeExpr::Uint(bits) => Type::Uint(*bits),
        TypeExpr::Int(bits) => Type::Int(*bits),
        TypeExpr::Address => Type::Address,
        TypeExpr::Bytes(n) => Type::Bytes(n.map(|n| n as u8)),
        TypeExpr::String => Type::String,
        TypeExpr::Array(elem, len) => Type::Array(Box::new(resolve_param_type(checked, elem)), *len),
        TypeExpr::Mapping(key, value) => Type::Mapping(
            Box::new(resolve_param_type(checked, key)),
            Box::new(resolve_param_type(checked, value)),
        ),
        TypeExpr::Named(name) => checked
            .structs
            .get(name)
            .map(|s| Type::Struct(s.clone()))
            .unwrap_or_else(|| Type::failure("unknown struct")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugc_check::check_program;
    use bugc_parser::parse;

    fn lower(src: &str) -> (Module, Diagnostics) {
        let program = parse(src).expect("parses");
        let checked = check_program(&program);
        assert!(!checked.diagnostics.has_errors(), "unexpected type errors: {:?}", checked.diagnostics.into_vec());
        let out = lower_program(&program, &checked);
        (out.module, out.diagnostics)
    }

    #[test]
    fn empty_body_lowers_to_a_single_return_block() {
        let (module, diags) = lower("name C; code { }");
        assert!(diags.is_empty());
        assert_eq!(module.main.blocks.len(), 1);
        let entry = module.main.block(module.main.entry);
        assert!(matches!(entry.terminator, Some(bugc_ir::Terminator::Return(None))));
    }

    #[test]
    fn storage_write_lowers_without_hashing() {
        let (module, diags) = lower(
            "name C;
             storage x: uint256 @ 0;
             code { x = 42; }",
        );
        assert!(diags.is_empty());
        let entry = module.main.block(module.main.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, bugc_ir::Instr::StoreStorage { .. })));
        assert!(!entry.instrs.iter().any(|i| matches!(i, bugc_ir::Instr::Hash { .. })));
    }

    #[test]
    fn if_statement_produces_branch_and_two_jumps() {
        let (module, diags) = lower(
            "name C;
             code {
                 let x = 0;
                 if (msg.value > 0) { x = 2; } else { x = 3; }
             }",
        );
        assert!(diags.is_empty());
        let branches = module
            .main
            .blocks
            .values()
            .filter(|blk| matches!(blk.terminator, Some(bugc_ir::Terminator::Branch { .. })))
            .count();
        assert_eq!(branches, 1);
    }
}
