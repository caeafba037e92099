//! Component C8: assigns fixed memory-word offsets to values that can't
//! live purely on the EVM operand stack — either because their lifetime
//! crosses a block boundary, or because a stack-disturbing instruction
//! (`CALL`, `SHA3`, ...) separates their definition from a later use within
//! the same block (spec.md §4.5).
//!
//! Composite locals left un-promoted by C6 are unconditionally
//! memory-resident: their `LocalId` is itself the base pointer later
//! `FieldAddr`/`IndexAddr` arithmetic is relative to.

use crate::liveness::Liveness;
use crate::var::VarId;
use bugc_ir::{Function, Instr, LocalId, TempId, Terminator, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The first free memory word, per spec.md §4.5 — below this, scratch
/// space is reserved for hashing inputs and the free-memory pointer itself
/// (a detail owned by codegen, not the planner).
const MEMORY_BASE: u64 = 0x80;

#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    locals: BTreeMap<LocalId, u64>,
    temps: BTreeMap<TempId, u64>,
    /// First byte offset past every slot this planner assigned — codegen's
    /// scratch area (e.g. for staging a `return` value) starts here.
    pub free_pointer: u64,
}

impl MemoryLayout {
    pub fn local_offset(&self, id: LocalId) -> Option<u64> {
        self.locals.get(&id).copied()
    }

    pub fn temp_offset(&self, id: TempId) -> Option<u64> {
        self.temps.get(&id).copied()
    }
}

pub fn plan_memory(func: &Function, liveness: &Liveness) -> MemoryLayout {
    let mut cross_block: BTreeSet<TempId> = BTreeSet::new();
    for set in liveness.live_in.values() {
        for v in set {
            if let VarId::Temp(t) = v {
                cross_block.insert(*t);
            }
        }
    }

    let mut disturbed: BTreeSet<TempId> = BTreeSet::new();
    for block in func.blocks.values() {
        let mut disturbed_since_def: BTreeSet<TempId> = BTreeSet::new();
        let mut defined_in_block: BTreeSet<TempId> = BTreeSet::new();
        for instr in &block.instrs {
            for v in instr.uses() {
                if let Value::Temp(id, _) = v {
                    if disturbed_since_def.contains(id) {
                        disturbed.insert(*id);
                    }
                }
            }
            if let Some(d) = instr.dest() {
                defined_in_block.insert(d);
            }
            if instr.is_stack_disturbing() {
                disturbed_since_def.extend(defined_in_block.iter().copied());
            }
        }
        if let Some(term) = &block.terminator {
            let tail_use = match term {
                Terminator::Branch { cond, .. } => Some(cond),
                Terminator::Return(Some(v)) => Some(v),
                _ => None,
            };
            if let Some(Value::Temp(id, _)) = tail_use {
                if disturbed_since_def.contains(id) {
                    disturbed.insert(*id);
                }
            }
        }
    }

    let mut needs_offset = cross_block;
    needs_offset.extend(disturbed);

    // Every phi destination is memory-resident unconditionally: codegen
    // materializes a phi's value by writing it straight to memory at each
    // predecessor's tail (function.rs's `materialize_phis_for_target`) and
    // never pushes it onto the stack on entry to the merge block, so a phi
    // dest that's only live within its own block (excluded from `live_in`
    // by construction — it's a `def`, not a `use`, there) still needs a
    // slot for that write to land in.
    for block in func.blocks.values() {
        for phi in &block.phis {
            needs_offset.insert(phi.dest);
        }
    }

    // Locals still referenced anywhere (the composite ones C6 left alone).
    let mut remaining: BTreeSet<LocalId> = BTreeSet::new();
    for block in func.blocks.values() {
        for instr in &block.instrs {
            for v in instr.uses() {
                if let Value::Local(id, _) = v {
                    remaining.insert(*id);
                }
            }
            match instr {
                Instr::LoadLocal { local, .. } | Instr::StoreLocal { local, .. } => {
                    remaining.insert(*local);
                }
                _ => {}
            }
        }
    }

    let mut offset = MEMORY_BASE;
    let mut locals = BTreeMap::new();
    for decl in &func.locals {
        if !remaining.contains(&decl.id) {
            continue;
        }
        locals.insert(decl.id, offset);
        offset += decl.ty.fixed_byte_len().unwrap_or(32);
    }

    let mut temps = BTreeMap::new();
    for id in needs_offset {
        temps.insert(id, offset);
        offset += 32;
    }

    MemoryLayout { locals, temps, free_pointer: offset }
}
