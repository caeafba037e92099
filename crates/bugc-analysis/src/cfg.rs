//! Shared control-flow primitives used by phi insertion (C6) and block
//! layout (C9): reverse post-order, dominator tree, dominance frontiers.
//!
//! `BlockLabel`s are assigned in creation order during lowering (C5), so
//! sorting by label is equivalent to sorting by insertion order — the
//! `BTreeMap`/`BTreeSet`s below give us spec.md §5's "iteration order is
//! deterministic" for free rather than as an extra invariant to maintain.

use bugc_ir::{BlockLabel, Function};
use std::collections::{BTreeMap, BTreeSet};

/// Depth-first post-order from `entry`, reversed. Blocks unreachable from
/// `entry` are simply never visited — this is also how C9 determines which
/// blocks to skip (and warn about).
pub fn reverse_postorder(func: &Function) -> Vec<BlockLabel> {
    let mut visited = BTreeSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(func.entry, false)];
    while let Some((label, expanded)) = stack.pop() {
        if expanded {
            postorder.push(label);
            continue;
        }
        if !visited.insert(label) {
            continue;
        }
        stack.push((label, true));
        let block = func.block(label);
        if let Some(term) = &block.terminator {
            for succ in term.successors() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
    }
    postorder.reverse();
    postorder
}

/// Immediate dominators via the iterative Cooper/Harvey/Kennedy algorithm,
/// keyed over the reachable subgraph only. `rpo` must be `reverse_postorder`
/// of the same function (the algorithm needs an RPO numbering to converge in
/// few passes, though it's correct at any fixed point regardless of input
/// order).
pub fn compute_dominators(func: &Function, rpo: &[BlockLabel]) -> BTreeMap<BlockLabel, BlockLabel> {
    let rpo_index: BTreeMap<BlockLabel, usize> = rpo.iter().enumerate().map(|(i, l)| (*l, i)).collect();
    let mut idom: BTreeMap<BlockLabel, BlockLabel> = BTreeMap::new();
    idom.insert(func.entry, func.entry);

    let preds_in_rpo = |label: BlockLabel| -> Vec<BlockLabel> {
        func.block(label)
            .preds
            .iter()
            .copied()
            .filter(|p| rpo_index.contains_key(p))
            .collect()
    };

    let mut changed = true;
    while changed {
        changed = false;
        for &label in rpo.iter().skip(1) {
            let preds = preds_in_rpo(label);
            let mut new_idom = None;
            for p in preds {
                if !idom.contains_key(&p) {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => p,
                    Some(other) => intersect(&idom, &rpo_index, p, other),
                });
            }
            if let Some(new_idom) = new_idom {
                if idom.get(&label) != Some(&new_idom) {
                    idom.insert(label, new_idom);
                    changed = true;
                }
            }
        }
    }
    idom
}

fn intersect(
    idom: &BTreeMap<BlockLabel, BlockLabel>,
    rpo_index: &BTreeMap<BlockLabel, usize>,
    mut a: BlockLabel,
    mut b: BlockLabel,
) -> BlockLabel {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}

/// Dominance frontiers per the standard Cytron et al. formulation: `b` is in
/// `DF(a)` if `a` dominates a predecessor of `b` but does not strictly
/// dominate `b` itself.
pub fn dominance_frontiers(
    func: &Function,
    idom: &BTreeMap<BlockLabel, BlockLabel>,
    rpo: &[BlockLabel],
) -> BTreeMap<BlockLabel, BTreeSet<BlockLabel>> {
    let mut df: BTreeMap<BlockLabel, BTreeSet<BlockLabel>> = rpo.iter().map(|l| (*l, BTreeSet::new())).collect();
    for &label in rpo {
        let preds: Vec<BlockLabel> = func.block(label).preds.iter().copied().filter(|p| idom.contains_key(p)).collect();
        if preds.len() < 2 {
            continue;
        }
        for runner in preds {
            let mut cur = runner;
            while Some(&cur) != idom.get(&label) && cur != label {
                df.entry(cur).or_default().insert(label);
                match idom.get(&cur) {
                    Some(next) if *next != cur => cur = *next,
                    _ => break,
                }
            }
        }
    }
    df
}

/// Children of each block in the dominator tree, in `BlockLabel` order.
pub fn dominator_tree_children(idom: &BTreeMap<BlockLabel, BlockLabel>, entry: BlockLabel) -> BTreeMap<BlockLabel, Vec<BlockLabel>> {
    let mut children: BTreeMap<BlockLabel, Vec<BlockLabel>> = BTreeMap::new();
    for (&label, &parent) in idom {
        if label == entry {
            continue;
        }
        children.entry(parent).or_default().push(label);
    }
    for kids in children.values_mut() {
        kids.sort();
    }
    children
}
