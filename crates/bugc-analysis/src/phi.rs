//! Component C6: promotes scalar locals to SSA temporaries, inserting phi
//! nodes at dominance-frontier blocks (semi-pruned: a phi is only placed
//! where the local is live-in, per spec.md §4.3).
//!
//! A local whose type is composite (`Struct` or a fixed-size `Array`) is
//! never promoted — its `LocalId` is used as a memory base pointer directly
//! by `FieldAddr`/`IndexAddr`/`LoadField`/`StoreField`, so C8 must still
//! give it a fixed memory slot (spec.md §4.5: "the planner treats all
//! locals as memory-resident" describes exactly this leftover set).

use crate::cfg;
use bugc_ir::{BlockLabel, Function, Instr, LocalId, Phi, TempId, Value};
use bugc_types::Type;
use std::collections::{BTreeMap, BTreeSet};

fn is_composite(ty: &Type) -> bool {
    matches!(ty, Type::Struct(_) | Type::Array(_, Some(_)))
}

struct TempAllocator {
    next: u32,
}

impl TempAllocator {
    fn for_function(func: &Function) -> Self {
        let mut max = 0u32;
        for (t, _) in &func.params {
            max = max.max(t.0);
        }
        for block in func.blocks.values() {
            for instr in &block.instrs {
                if let Some(d) = instr.dest() {
                    max = max.max(d.0);
                }
            }
        }
        TempAllocator { next: max + 1 }
    }

    fn fresh(&mut self) -> TempId {
        let id = TempId(self.next);
        self.next += 1;
        id
    }
}

/// Promotes every non-composite local in `func` to SSA form in place.
pub fn promote_locals(func: &mut Function) {
    let promotable: BTreeSet<LocalId> = func
        .locals
        .iter()
        .filter(|l| !is_composite(&l.ty))
        .map(|l| l.id)
        .collect();
    if promotable.is_empty() {
        return;
    }

    let rpo = cfg::reverse_postorder(func);
    if rpo.is_empty() {
        return;
    }
    let idom = cfg::compute_dominators(func, &rpo);
    let df = cfg::dominance_frontiers(func, &idom, &rpo);
    let live_in = local_live_in(func, &promotable, &rpo);

    let mut allocator = TempAllocator::for_function(func);
    let mut phi_for: BTreeMap<(BlockLabel, LocalId), TempId> = BTreeMap::new();

    for &local in &promotable {
        let ty = func.locals.iter().find(|l| l.id == local).unwrap().ty.clone();
        let def_blocks: Vec<BlockLabel> = rpo
            .iter()
            .copied()
            .filter(|b| {
                func.block(*b)
                    .instrs
                    .iter()
                    .any(|i| matches!(i, Instr::StoreLocal { local: l, .. } if *l == local))
            })
            .collect();
        if def_blocks.is_empty() {
            continue;
        }
        let mut has_phi: BTreeSet<BlockLabel> = BTreeSet::new();
        let mut in_worklist: BTreeSet<BlockLabel> = def_blocks.iter().copied().collect();
        let mut worklist: Vec<BlockLabel> = def_blocks;
        while let Some(b) = worklist.pop() {
            let Some(frontier) = df.get(&b) else { continue };
            for &d in frontier {
                if has_phi.contains(&d) {
                    continue;
                }
                let live = live_in.get(&d).is_some_and(|s| s.contains(&local));
                if !live {
                    continue;
                }
                let dest = allocator.fresh();
                func.block_mut(d).phis.push(Phi {
                    dest,
                    ty: ty.clone(),
                    sources: BTreeMap::new(),
                });
                phi_for.insert((d, local), dest);
                has_phi.insert(d);
                if in_worklist.insert(d) {
                    worklist.push(d);
                }
            }
        }
    }

    let children = cfg::dominator_tree_children(&idom, func.entry);
    let mut stacks: BTreeMap<LocalId, Vec<Value>> = BTreeMap::new();
    let mut subst: BTreeMap<TempId, Value> = BTreeMap::new();
    rename_block(func, func.entry, &promotable, &phi_for, &children, &mut stacks, &mut subst);
}

fn resolve(v: &mut Value, subst: &BTreeMap<TempId, Value>) {
    if let Value::Temp(id, _) = v {
        if let Some(replacement) = subst.get(id) {
            *v = replacement.clone();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rename_block(
    func: &mut Function,
    label: BlockLabel,
    promotable: &BTreeSet<LocalId>,
    phi_for: &BTreeMap<(BlockLabel, LocalId), TempId>,
    children: &BTreeMap<BlockLabel, Vec<BlockLabel>>,
    stacks: &mut BTreeMap<LocalId, Vec<Value>>,
    subst: &mut BTreeMap<TempId, Value>,
) {
    let marks: BTreeMap<LocalId, usize> = promotable
        .iter()
        .map(|&l| (l, stacks.get(&l).map(Vec::len).unwrap_or(0)))
        .collect();

    for &local in promotable {
        if let Some(&dest) = phi_for.get(&(label, local)) {
            let ty = func.block(label).phis.iter().find(|p| p.dest == dest).unwrap().ty.clone();
            stacks.entry(local).or_default().push(Value::Temp(dest, ty));
        }
    }

    let old_instrs = std::mem::take(&mut func.block_mut(label).instrs);
    let mut new_instrs = Vec::with_capacity(old_instrs.len());
    for mut instr in old_instrs {
        for v in instr.values_mut() {
            resolve(v, subst);
        }
        match &instr {
            Instr::LoadLocal { dest, local } if promotable.contains(local) => {
                let cur = stacks
                    .get(local)
                    .and_then(|s| s.last())
                    .cloned()
                    .expect("a promotable local is read only after an initializing store dominates it");
                subst.insert(*dest, cur);
                continue;
            }
            Instr::StoreLocal { local, value } if promotable.contains(local) => {
                stacks.entry(*local).or_default().push(value.clone());
                continue;
            }
            _ => {}
        }
        new_instrs.push(instr);
    }
    func.block_mut(label).instrs = new_instrs;

    if let Some(term) = &mut func.block_mut(label).terminator {
        for v in term.values_mut() {
            resolve(v, subst);
        }
    }

    let successors = func.block(label).terminator.as_ref().map(|t| t.successors()).unwrap_or_default();
    for succ in successors {
        for &local in promotable {
            if let Some(&dest) = phi_for.get(&(succ, local)) {
                let cur = stacks
                    .get(&local)
                    .and_then(|s| s.last())
                    .cloned()
                    .expect("every predecessor of a phi block carries a value for the local it promotes");
                let phi = func.block_mut(succ).phis.iter_mut().find(|p| p.dest == dest).unwrap();
                phi.sources.insert(label, cur);
            }
        }
    }

    if let Some(kids) = children.get(&label) {
        for &kid in kids {
            rename_block(func, kid, promotable, phi_for, children, stacks, subst);
        }
    }

    for (local, mark) in marks {
        if let Some(stack) = stacks.get_mut(&local) {
            stack.truncate(mark);
        }
    }
}

/// Upward-exposed-use / kill-set liveness over `Local` reads and writes
/// only, computed before any phi exists — used purely to decide where a
/// phi is actually needed (semi-pruning), not as C7's final liveness.
fn local_live_in(
    func: &Function,
    promotable: &BTreeSet<LocalId>,
    rpo: &[BlockLabel],
) -> BTreeMap<BlockLabel, BTreeSet<LocalId>> {
    let mut ue_use: BTreeMap<BlockLabel, BTreeSet<LocalId>> = BTreeMap::new();
    let mut full_def: BTreeMap<BlockLabel, BTreeSet<LocalId>> = BTreeMap::new();
    for &label in rpo {
        let block = func.block(label);
        let mut locally_defined: BTreeSet<LocalId> = BTreeSet::new();
        let mut use_set = BTreeSet::new();
        let mut def_set = BTreeSet::new();
        for instr in &block.instrs {
            match instr {
                Instr::LoadLocal { local, .. } if promotable.contains(local) => {
                    if !locally_defined.contains(local) {
                        use_set.insert(*local);
                    }
                }
                Instr::StoreLocal { local, .. } if promotable.contains(local) => {
                    locally_defined.insert(*local);
                    def_set.insert(*local);
                }
                _ => {}
            }
        }
        ue_use.insert(label, use_set);
        full_def.insert(label, def_set);
    }

    let mut live_in: BTreeMap<BlockLabel, BTreeSet<LocalId>> = rpo.iter().map(|l| (*l, BTreeSet::new())).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for &label in rpo.iter().rev() {
            let mut live_out: BTreeSet<LocalId> = BTreeSet::new();
            if let Some(term) = &func.block(label).terminator {
                for succ in term.successors() {
                    if let Some(s) = live_in.get(&succ) {
                        live_out.extend(s.iter().copied());
                    }
                }
            }
            let mut new_live_in = ue_use[&label].clone();
            new_live_in.extend(live_out.difference(&full_def[&label]).copied());
            if new_live_in != live_in[&label] {
                live_in.insert(label, new_live_in);
                changed = true;
            }
        }
    }
    live_in
}
