//! Whole-module assembly (spec.md §4.7, §4.8): assigns every function its
//! private memory region and call linkage, emits each function's bytecode,
//! then concatenates and patches two independent blobs — the runtime
//! (reachable from `main`) and, if the contract declares a constructor, the
//! deployment blob (`create` plus whatever it reaches, followed by the
//! CODECOPY/RETURN epilogue that appends the runtime blob).
//!
//! Functions reachable from both `create` and `main` are emitted twice, once
//! per blob, at independent code offsets. That's fine: deployment-time and
//! runtime-time execution never share a call stack or a memory image, so
//! reusing the same linkage memory addresses across the two blobs is safe.

use crate::error::CodegenError;
use crate::function::{self, Linkage, PatchTarget, Role};
use alloy_primitives::U256;
use bugc_analysis::FunctionAnalysis;
use bugc_diagnostics::Diagnostics;
use bugc_ir::{Function, Instr, Module};
use std::collections::{BTreeMap, BTreeSet};

/// Byte span reserved for each function's private memory region (spec.md
/// §4.7's per-function relocation; DESIGN.md "cross-function memory
/// regions"). Generous relative to anything this toy language's functions
/// actually allocate, so regions never collide.
const REGION_STRIDE: u64 = 0x0800;

/// Fixed byte length of [`deployment_epilogue`], emitted with `PUSH2`
/// throughout specifically so this constant doesn't depend on the values it
/// pushes (which include its own position).
const EPILOGUE_LEN: u64 = 17;

pub struct CodegenOutput {
    pub runtime: Vec<u8>,
    pub deployment: Vec<u8>,
    pub diagnostics: Diagnostics,
}

pub fn compile_module(module: &Module, analyses: &BTreeMap<String, FunctionAnalysis>) -> CodegenOutput {
    let mut diagnostics = Diagnostics::new();

    let mut order: Vec<String> = Vec::new();
    if module.create.is_some() {
        order.push("create".to_string());
    }
    order.push("main".to_string());
    for name in module.functions.keys() {
        order.push(name.clone());
    }

    let mut region_extra: BTreeMap<String, u64> = BTreeMap::new();
    let mut linkages: BTreeMap<String, Linkage> = BTreeMap::new();
    for (i, name) in order.iter().enumerate() {
        let extra = i as u64 * REGION_STRIDE;
        region_extra.insert(name.clone(), extra);

        let func = get_function(module, name);
        let analysis = &analyses[name];
        let param_base = analysis.memory.free_pointer + extra;
        let param_slots: Vec<u64> = (0..func.params.len() as u64).map(|k| param_base + k * 32).collect();
        let ret_addr_slot = param_base + func.params.len() as u64 * 32;
        let ret_value_slot = ret_addr_slot + 32;
        linkages.insert(
            name.clone(),
            Linkage {
                param_slots,
                ret_addr_slot,
                ret_value_slot,
            },
        );
    }

    let runtime = assemble_blob(module, analyses, &linkages, &region_extra, "main", &mut diagnostics, None);
    let deployment = if module.create.is_some() {
        assemble_blob(module, analyses, &linkages, &region_extra, "create", &mut diagnostics, Some(&runtime))
    } else {
        deployment_epilogue(EPILOGUE_LEN, runtime.len() as u64)
    };

    CodegenOutput {
        runtime,
        deployment,
        diagnostics,
    }
}

fn get_function<'a>(module: &'a Module, name: &str) -> &'a Function {
    if name == "create" {
        module.create.as_ref().expect("create present")
    } else if name == "main" {
        &module.main
    } else {
        module.functions.get(name).expect("function enumerated from module.functions")
    }
}

/// Transitive closure of direct calls reachable from `entry_name`, in
/// declaration order with `entry_name` placed first (so its bytes sit at
/// blob offset 0, the only offset `Role::Create`/`Role::Main` can rely on
/// landing on without an explicit `JUMPDEST`).
fn reachable_functions(module: &Module, entry_name: &str) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut stack = vec![entry_name.to_string()];
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let func = get_function(module, &name);
        for block in func.blocks.values() {
            for instr in &block.instrs {
                if let Instr::Call { name: callee, .. } = instr {
                    if module.functions.contains_key(callee) && !seen.contains(callee) {
                        stack.push(callee.clone());
                    }
                }
            }
        }
    }
    let mut ordered = vec![entry_name.to_string()];
    for name in module.functions.keys() {
        if name != entry_name && seen.contains(name) {
            ordered.push(name.clone());
        }
    }
    ordered
}

#[allow(clippy::too_many_arguments)]
fn assemble_blob(
    module: &Module,
    analyses: &BTreeMap<String, FunctionAnalysis>,
    linkages: &BTreeMap<String, Linkage>,
    region_extra: &BTreeMap<String, u64>,
    entry_name: &str,
    diagnostics: &mut Diagnostics,
    runtime_for_epilogue: Option<&[u8]>,
) -> Vec<u8> {
    let ordered = reachable_functions(module, entry_name);

    let last_index = ordered.len() - 1;
    let codes: Vec<(String, function::FunctionCode)> = ordered
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let func = get_function(module, name);
            let analysis = &analyses[name];
            let role = if name == "create" {
                Role::Create
            } else if name == "main" {
                Role::Main
            } else {
                Role::User
            };
            let linkage = if role == Role::User { linkages.get(name.as_str()) } else { None };
            let extra = region_extra[name];
            let code = function::emit_function(
                module,
                func,
                role,
                analysis,
                extra,
                linkage,
                linkages,
                i == 0,
                i == last_index,
                diagnostics,
            );
            (name.clone(), code)
        })
        .collect();

    let mut bases: BTreeMap<String, usize> = BTreeMap::new();
    let mut prefix_len = 0usize;
    for (name, code) in &codes {
        bases.insert(name.clone(), prefix_len);
        prefix_len += code.bytes.len();
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(prefix_len);
    for (_, code) in &codes {
        bytes.extend_from_slice(&code.bytes);
    }

    for (name, code) in &codes {
        let base = bases[name];
        for patch in &code.patches {
            let target = match &patch.target {
                PatchTarget::Block(label) => match code.block_offsets.get(label) {
                    Some(off) => (base + off) as u64,
                    None => {
                        diagnostics.push(
                            CodegenError::MissingJumpTarget {
                                function: name.clone(),
                                target: label.to_string(),
                            }
                            .into(),
                        );
                        0
                    }
                },
                PatchTarget::Local(id) => (base + code.local_labels[id]) as u64,
                PatchTarget::FunctionEntry(callee) => match bases.get(callee) {
                    Some(b) => *b as u64,
                    None => {
                        diagnostics.push(CodegenError::UnknownCallee(callee.clone()).into());
                        0
                    }
                },
                PatchTarget::Epilogue => prefix_len as u64,
            };
            let pos = base + patch.pos;
            let be = target.to_be_bytes();
            bytes[pos] = be[6];
            bytes[pos + 1] = be[7];
        }
    }

    if let Some(runtime) = runtime_for_epilogue {
        let src_offset = prefix_len as u64 + EPILOGUE_LEN;
        bytes.extend_from_slice(&deployment_epilogue(src_offset, runtime.len() as u64));
    }

    bytes
}

fn push2_fixed(value: u64, out: &mut Vec<u8>) {
    out.push(crate::opcodes::PUSH2);
    out.extend_from_slice(&(value as u16).to_be_bytes());
    debug_assert!(U256::from(value) <= U256::from(u16::MAX), "value exceeds PUSH2 range: {value}");
}

/// `CODECOPY(destOffset=0, offset=src_offset, size=len)` followed by
/// `RETURN(offset=0, size=len)` — copies the runtime blob starting at
/// `src_offset` (the byte right after this epilogue, i.e. the end of the
/// deployment blob) into memory and returns it as the account's code.
fn deployment_epilogue(src_offset: u64, len: u64) -> Vec<u8> {
    let mut out = Vec::new();
    push2_fixed(len, &mut out);
    push2_fixed(src_offset, &mut out);
    push2_fixed(0, &mut out);
    out.push(crate::opcodes::CODECOPY);
    push2_fixed(len, &mut out);
    push2_fixed(0, &mut out);
    out.push(crate::opcodes::RETURN);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugc_analysis::analyze_module;
    use bugc_check::check_program;
    use bugc_irgen::lower_program;

    fn compile(source: &str) -> CodegenOutput {
        let program = bugc_parser::parse(source).expect("parse");
        let checked = check_program(&program);
        assert!(!checked.diagnostics.has_errors(), "typecheck errors: {:?}", checked.diagnostics);
        let mut irgen = lower_program(&program, &checked);
        assert!(!irgen.diagnostics.has_errors(), "irgen errors: {:?}", irgen.diagnostics);
        let (analyses, analysis_diags) = analyze_module(&mut irgen.module);
        assert!(!analysis_diags.has_errors(), "analysis errors: {analysis_diags:?}");
        compile_module(&irgen.module, &analyses)
    }

    #[test]
    fn contract_without_constructor_gets_a_bare_epilogue_as_its_deployment_blob() {
        let out = compile("name C; code { }");
        assert_eq!(out.deployment.len() as u64, EPILOGUE_LEN);
        assert_eq!(*out.deployment.last().unwrap(), crate::opcodes::RETURN);
        assert!(out.deployment.contains(&crate::opcodes::CODECOPY));
        assert!(out.runtime.is_empty());
    }

    #[test]
    fn constructor_blob_ends_with_codecopy_and_return() {
        let out = compile("name C; create { } code { }");
        assert!(out.deployment.len() as u64 >= EPILOGUE_LEN);
        assert_eq!(*out.deployment.last().unwrap(), crate::opcodes::RETURN);
        assert!(out.deployment.contains(&crate::opcodes::CODECOPY));
    }

    #[test]
    fn arithmetic_expression_lowers_to_add() {
        let out = compile("name C; code { return 1 + 2; }");
        assert!(out.runtime.contains(&crate::opcodes::ADD));
        assert_eq!(*out.runtime.last().unwrap(), crate::opcodes::RETURN);
    }

    #[test]
    fn storage_write_then_read_uses_sstore_and_sload() {
        let out = compile("name C; storage x: uint256 @ 0; code { x = 5; return x; }");
        assert!(out.runtime.contains(&crate::opcodes::SSTORE));
        assert!(out.runtime.contains(&crate::opcodes::SLOAD));
    }

    #[test]
    fn internal_call_lowers_to_dynamic_jump_and_return() {
        let out = compile(
            "name C;
             fn add_one(x: uint256) -> uint256 { return x + 1; }
             code { return add_one(41); }",
        );
        assert!(out.runtime.contains(&crate::opcodes::JUMP));
        assert!(out.runtime.contains(&crate::opcodes::JUMPDEST));
    }

    #[test]
    fn unreachable_user_function_is_not_linked_into_the_runtime_blob() {
        let with = compile(
            "name C;
             fn unused() -> uint256 { return 0; }
             code { return 1; }",
        );
        let without = compile("name C; code { return 1; }");
        assert_eq!(with.runtime.len(), without.runtime.len());
    }
}
