//! A hand-written lexer and recursive-descent parser for BUG source text.
//!
//! spec.md treats the parser as an external collaborator, specified only by
//! its interface (§6.1: source text in, a [`bugc_ast::Program`] with stable
//! node identities and a source-location table out). This crate is the
//! concrete implementation of that collaborator — supplied so the top-level
//! `bugc::compile_source` entrypoint (SPEC_FULL.md §6.2) is runnable end to
//! end rather than stopping at "assume an AST exists".

mod codes;
mod lexer;
mod parser;

use bugc_ast::Program;
use bugc_diagnostics::{Diagnostic, Diagnostics};
use lexer::Lexer;
use parser::Parser;
use tracing::debug;

pub use lexer::{LexError, TokKind, Token};
pub use parser::ParseError;

/// Parses `source` into a [`Program`]. Per spec.md §6.1, a parse failure is
/// itself diagnostic-shaped and aborts the pipeline before the type checker
/// runs — callers should treat `Err` as "stop, these are the diagnostics",
/// not retry with partial output.
pub fn parse(source: &str) -> Result<Program, Diagnostics> {
    let tokens = Lexer::new(source).tokenize().map_err(|e| {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(codes::LEX_ERROR, e.message.clone()).with_location(e.span));
        diags
    })?;
    let mut parser = Parser::new(&tokens);
    let program = parser.parse_program().map_err(|e| {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::from(e));
        diags
    })?;
    debug!("parsed program `{}`: {} declarations", program.name, program.decls.len());
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugc_ast::{Decl, ExprKind, SpecialExpr, StmtKind};

    #[test]
    fn parses_empty_program() {
        let program = parse("name C; code { }").unwrap();
        assert_eq!(program.name, "C");
        assert!(program.decls.is_empty());
        assert!(program.create.is_none());
        assert!(program.body.stmts.is_empty());
    }

    #[test]
    fn parses_storage_decl_and_assignment() {
        let program = parse(
            "name C;
             storage x: uint256 @ 0;
             code { x = 42; }",
        )
        .unwrap();
        assert_eq!(program.decls.len(), 1);
        let Decl::Storage(s) = &program.decls[0] else { panic!("expected storage decl") };
        assert_eq!(s.name, "x");
        assert_eq!(s.slot, 0);
        assert_eq!(program.body.stmts.len(), 1);
        assert!(matches!(program.body.stmts[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn parses_array_type_with_length() {
        let program = parse(
            "name C;
             storage items: array<uint256, 3> @ 0;
             code { }",
        )
        .unwrap();
        let Decl::Storage(s) = &program.decls[0] else { panic!() };
        assert!(matches!(s.ty, bugc_ast::TypeExpr::Array(_, Some(3))));
    }

    #[test]
    fn parses_mapping_index_and_msg_sender() {
        let program = parse(
            "name C;
             storage balances: mapping<address,uint256> @ 1;
             code { return balances[msg.sender]; }",
        )
        .unwrap();
        let StmtKind::Return(Some(expr)) = &program.body.stmts[0].kind else { panic!("expected return") };
        let ExprKind::Index(_, idx) = &expr.kind else { panic!("expected index") };
        assert!(matches!(idx.kind, ExprKind::Special(SpecialExpr::MsgSender)));
    }

    #[test]
    fn parses_if_else() {
        let program = parse(
            "name C;
             code {
                 let x = 0;
                 if (msg.value > 0) { x = 2; } else { x = 3; }
             }",
        )
        .unwrap();
        assert!(matches!(program.body.stmts[1].kind, StmtKind::If { .. }));
    }

    #[test]
    fn parses_for_loop() {
        let program = parse(
            "name C;
             code { for (let i = 0; i < 10; i = i + 1) { } }",
        )
        .unwrap();
        assert!(matches!(program.body.stmts[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn classifies_forty_digit_hex_as_address() {
        let program = parse(
            "name C;
             code { let a = 0x000000000000000000000000000000000000aa; }",
        )
        .unwrap();
        let StmtKind::Let { init, .. } = &program.body.stmts[0].kind else { panic!() };
        assert!(matches!(init.kind, ExprKind::Address(_)));
    }

    #[test]
    fn classifies_other_hex_lengths_as_bytes() {
        let program = parse(
            "name C;
             code { let a = 0xdead; }",
        )
        .unwrap();
        let StmtKind::Let { init, .. } = &program.body.stmts[0].kind else { panic!() };
        assert!(matches!(&init.kind, ExprKind::Hex(bytes) if bytes == &vec![0xde, 0xad]));
    }

    #[test]
    fn rejects_malformed_input_with_a_diagnostic() {
        let err = parse("name C; code { let = 1; }").unwrap_err();
        assert!(!err.is_empty());
    }
}
