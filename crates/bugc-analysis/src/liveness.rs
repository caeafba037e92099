//! Component C7: per-block live-in/live-out sets over the post-C6 IR.
//!
//! Phi sources are attributed to the predecessor edge they travel, not to
//! the block containing the phi (spec.md §4.4) — a phi's operand is "used"
//! at the end of the predecessor, regardless of what else is live there.

use crate::cfg;
use crate::var::{var_of, VarId};
use bugc_ir::{BlockLabel, Function, Instr, Terminator};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

pub struct Liveness {
    pub live_in: BTreeMap<BlockLabel, BTreeSet<VarId>>,
    pub live_out: BTreeMap<BlockLabel, BTreeSet<VarId>>,
}

impl Liveness {
    pub fn live_in(&self, label: BlockLabel) -> &BTreeSet<VarId> {
        &self.live_in[&label]
    }

    pub fn live_out(&self, label: BlockLabel) -> &BTreeSet<VarId> {
        &self.live_out[&label]
    }
}

fn instr_def(instr: &Instr) -> Option<VarId> {
    if let Instr::StoreLocal { local, .. } = instr {
        return Some(VarId::Local(*local));
    }
    instr.dest().map(VarId::Temp)
}

fn instr_uses(instr: &Instr) -> Vec<VarId> {
    let mut out: Vec<VarId> = instr.uses().iter().filter_map(|v| var_of(v)).collect();
    if let Instr::LoadLocal { local, .. } = instr {
        out.push(VarId::Local(*local));
    }
    out
}

fn term_uses(term: &Terminator) -> Vec<VarId> {
    match term {
        Terminator::Jump(_) => vec![],
        Terminator::Branch { cond, .. } => var_of(cond).into_iter().collect(),
        Terminator::Return(v) => v.as_ref().and_then(var_of).into_iter().collect(),
    }
}

pub fn compute_liveness(func: &Function) -> Liveness {
    let rpo = cfg::reverse_postorder(func);

    let mut use_set: BTreeMap<BlockLabel, BTreeSet<VarId>> = BTreeMap::new();
    let mut def_set: BTreeMap<BlockLabel, BTreeSet<VarId>> = BTreeMap::new();
    for &label in &rpo {
        let block = func.block(label);
        let mut defined_so_far: BTreeSet<VarId> = BTreeSet::new();
        let mut uses = BTreeSet::new();
        let mut defs = BTreeSet::new();
        for phi in &block.phis {
            defined_so_far.insert(VarId::Temp(phi.dest));
            defs.insert(VarId::Temp(phi.dest));
        }
        for instr in &block.instrs {
            for u in instr_uses(instr) {
                if !defined_so_far.contains(&u) {
                    uses.insert(u);
                }
            }
            if let Some(d) = instr_def(instr) {
                defined_so_far.insert(d);
                defs.insert(d);
            }
        }
        if let Some(term) = &block.terminator {
            for u in term_uses(term) {
                if !defined_so_far.contains(&u) {
                    uses.insert(u);
                }
            }
        }
        use_set.insert(label, uses);
        def_set.insert(label, defs);
    }

    let mut live_in: BTreeMap<BlockLabel, BTreeSet<VarId>> = rpo.iter().map(|l| (*l, BTreeSet::new())).collect();
    let mut live_out: BTreeMap<BlockLabel, BTreeSet<VarId>> = rpo.iter().map(|l| (*l, BTreeSet::new())).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for &label in rpo.iter().rev() {
            let mut out: BTreeSet<VarId> = BTreeSet::new();
            if let Some(term) = &func.block(label).terminator {
                for succ in term.successors() {
                    let succ_block = func.block(succ);
                    let phi_dests: BTreeSet<VarId> = succ_block.phis.iter().map(|p| VarId::Temp(p.dest)).collect();
                    out.extend(live_in[&succ].difference(&phi_dests).copied());
                    for phi in &succ_block.phis {
                        if let Some(src) = phi.sources.get(&label) {
                            if let Some(v) = var_of(src) {
                                out.insert(v);
                            }
                        }
                    }
                }
            }
            if out != live_out[&label] {
                live_out.insert(label, out.clone());
                changed = true;
            }
            let mut new_in = use_set[&label].clone();
            new_in.extend(out.difference(&def_set[&label]).copied());
            if new_in != live_in[&label] {
                live_in.insert(label, new_in);
                changed = true;
            }
        }
    }

    Liveness { live_in, live_out }
}
