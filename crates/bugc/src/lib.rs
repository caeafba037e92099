//! The BUGC pipeline's single entrypoint (SPEC_FULL.md §6.2): a validated AST
//! in, bytecode and accumulated diagnostics out.
//!
//! `compile` threads a `bugc_ast::Program` through every stage — C2/C3 type
//! checking, C4/C5 IR generation, C6-C9 analysis, C10 code generation —
//! stopping at the first stage whose diagnostics include an `Error` (spec.md
//! §2, §7). Each stage's diagnostics are folded into one `Diagnostics`
//! accumulator rather than discarded, so a `CompileOutput` with no bytecode
//! still explains why.

use anyhow::Result;
use bugc_ast::Program;
use bugc_diagnostics::Diagnostics;

/// Tunables for a single compilation. There is no persistent compiler
/// configuration (spec.md §5: "no shared state") — just the one knob the
/// pipeline itself exposes.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Demote `Severity::Warning` diagnostics to `Severity::Info`, for
    /// snapshot-friendly test output that doesn't churn on every new
    /// best-effort warning this pipeline starts emitting.
    pub emit_warnings_as_info: bool,
}

/// The result of a compilation. Bytecode fields are `None` when an earlier
/// stage reported a fatal diagnostic — a failed compile is a normal
/// `CompileOutput`, not an `Err` (spec.md §6.2).
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub runtime: Option<Vec<u8>>,
    pub deployment: Option<Vec<u8>>,
    pub diagnostics: Diagnostics,
}

/// Runs the full pipeline over an already-parsed `program`.
pub fn compile(program: &Program, options: &CompileOptions) -> CompileOutput {
    let mut diagnostics = Diagnostics::new();

    let checked = bugc_check::check_program(program);
    let had_check_errors = checked.diagnostics.has_errors();
    diagnostics.extend(checked.diagnostics);
    if had_check_errors {
        return finish(diagnostics, options);
    }

    let irgen = bugc_irgen::lower_program(program, &checked);
    diagnostics.extend(irgen.diagnostics);
    if diagnostics.has_errors() {
        return finish(diagnostics, options);
    }

    let mut module = irgen.module;
    let (analyses, analysis_diags) = bugc_analysis::analyze_module(&mut module);
    diagnostics.extend(analysis_diags);
    if diagnostics.has_errors() {
        return finish(diagnostics, options);
    }

    let codegen = bugc_codegen::compile_module(&module, &analyses);
    diagnostics.extend(codegen.diagnostics);
    if diagnostics.has_errors() {
        return finish(diagnostics, options);
    }

    CompileOutput {
        runtime: Some(codegen.runtime),
        deployment: Some(codegen.deployment),
        diagnostics: demote(diagnostics, options),
    }
}

/// Parses `source` then runs [`compile`] — the convenience spec.md §6.2
/// describes the entrypoint as ("source text in"), supplied here because
/// `compile` itself takes an already-parsed AST per the stricter §6.2
/// contract above it.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<CompileOutput> {
    match bugc_parser::parse(source) {
        Ok(program) => Ok(compile(&program, options)),
        Err(diagnostics) => Ok(CompileOutput {
            runtime: None,
            deployment: None,
            diagnostics: demote(diagnostics, options),
        }),
    }
}

fn finish(diagnostics: Diagnostics, options: &CompileOptions) -> CompileOutput {
    CompileOutput {
        runtime: None,
        deployment: None,
        diagnostics: demote(diagnostics, options),
    }
}

fn demote(diagnostics: Diagnostics, options: &CompileOptions) -> Diagnostics {
    if !options.emit_warnings_as_info {
        return diagnostics;
    }
    diagnostics
        .into_vec()
        .into_iter()
        .map(|d| {
            if d.severity == bugc_diagnostics::Severity::Warning {
                bugc_diagnostics::Diagnostic::new(bugc_diagnostics::Severity::Info, d.code, d.message)
            } else {
                d
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> CompileOutput {
        let out = compile_source(source, &CompileOptions::default()).expect("driver failure");
        assert!(!out.diagnostics.has_errors(), "unexpected errors: {:?}", out.diagnostics);
        out
    }

    #[test]
    fn empty_contract_compiles_to_an_empty_runtime() {
        let out = compile_ok("name C; code { }");
        assert_eq!(out.runtime.as_deref(), Some(&[][..]));
    }

    #[test]
    fn syntax_error_reports_diagnostics_without_panicking() {
        let out = compile_source("name C; code { return", &CompileOptions::default()).unwrap();
        assert!(out.diagnostics.has_errors());
        assert!(out.runtime.is_none());
        assert!(out.deployment.is_none());
    }

    #[test]
    fn type_error_stops_before_codegen_runs() {
        let out = compile_source("name C; code { return true + 1; }", &CompileOptions::default()).unwrap();
        assert!(out.diagnostics.has_errors());
        assert!(out.runtime.is_none());
    }

    #[test]
    fn warnings_can_be_demoted_for_snapshot_tests() {
        let program = bugc_parser::parse(
            "name C;
             fn unused() -> uint256 { return 0; }
             code { return 1; }",
        )
        .unwrap();
        let out = compile(
            &program,
            &CompileOptions {
                emit_warnings_as_info: true,
            },
        );
        assert!(out.diagnostics.by_severity(bugc_diagnostics::Severity::Warning).is_empty());
    }
}
