//! Move planning for keyed reconciliation.
//!
//! Given the surviving entries in their old order and the same keys in the
//! wanted order, the planner emits a minimal sequence of subtree moves: the
//! longest increasing subsequence of old positions stays put, everything
//! else is relocated. Positions in the emitted ops are target-child offsets
//! (entries span `count` children each) and assume earlier ops have already
//! been applied.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::view::Key;

/// One subtree relocation: remove `count` target children starting at
/// `from`, then re-insert them starting at `to` (offsets after the removal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MoveOp {
    pub key: Key,
    pub from: usize,
    pub to: usize,
    pub count: usize,
}

/// Plans moves turning `old` (key, target count) into `want` order. Both
/// sides must hold exactly the same keys.
pub(crate) fn plan_moves(old: &[(Key, usize)], want: &[Key]) -> Vec<MoveOp> {
    debug_assert_eq!(old.len(), want.len());
    if old.len() < 2 {
        return Vec::new();
    }

    let index_of: FxHashMap<&Key, usize> = old
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (k, i))
        .collect();
    let seq: Vec<usize> = want
        .iter()
        .map(|k| {
            *index_of
                .get(k)
                .unwrap_or_else(|| panic!("key {k} appeared without an existing entry"))
        })
        .collect();
    let keep: FxHashSet<usize> = lis_indices(&seq).into_iter().collect();

    let mut model: Vec<(Key, usize)> = old.to_vec();
    let mut ops = Vec::new();

    // Right to left: by the time entry i is placed, everything after it is
    // already in final relative order, so the next wanted key anchors the
    // destination.
    for i in (0..want.len()).rev() {
        if keep.contains(&i) {
            continue;
        }
        let key = &want[i];
        let at = model
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or_else(|| panic!("key {key} lost during move planning"));
        let from = child_offset(&model, at);
        let (key, count) = model.remove(at);
        let anchor = match want.get(i + 1) {
            Some(next) => model
                .iter()
                .position(|(k, _)| k == next)
                .unwrap_or(model.len()),
            None => model.len(),
        };
        let to = child_offset(&model, anchor);
        ops.push(MoveOp {
            key: key.clone(),
            from,
            to,
            count,
        });
        model.insert(anchor, (key, count));
    }
    ops
}

fn child_offset(entries: &[(Key, usize)], index: usize) -> usize {
    entries[..index].iter().map(|(_, c)| c).sum()
}

/// Indices of one longest strictly increasing subsequence of `seq`.
fn lis_indices(seq: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for i in 0..seq.len() {
        let pos = tails.partition_point(|&t| seq[t] < seq[i]);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut indices = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        indices.push(i);
        cursor = prev[i];
    }
    indices.reverse();
    indices
}

// --- Tests ------------------------------------------------------------------
