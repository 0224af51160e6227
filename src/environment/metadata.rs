//! Per-view-type cache of declared environment reads.
//!
//! A view type's reads never change at runtime, so the set is computed once
//! per type and kept in a process-wide cache. Deciding whether a changed
//! environment forces a subtree update is then a set intersection.

use std::any::TypeId;
use std::sync::{Mutex, OnceLock, PoisonError};

use rustc_hash::{FxHashMap, FxHashSet};

use super::{EnvironmentDiff, EnvironmentReads};
use crate::view::AnyView;

static READS: OnceLock<Mutex<FxHashMap<TypeId, FxHashSet<TypeId>>>> = OnceLock::new();

fn with_reads<R>(view: &AnyView, f: impl FnOnce(&FxHashSet<TypeId>) -> R) -> R {
    let cache = READS.get_or_init(|| Mutex::new(FxHashMap::default()));
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    let reads = cache.entry(view.view_type()).or_insert_with(|| {
        let mut reads = EnvironmentReads::default();
        view.environment_reads_into(&mut reads);
        reads.into_keys()
    });
    f(reads)
}

/// Whether the keys changed in `diff` intersect the keys `view`'s type reads.
pub(crate) fn should_update(view: &AnyView, diff: &EnvironmentDiff) -> bool {
    if diff.is_empty() {
        return false;
    }
    with_reads(view, |reads| diff.intersects(reads))
}

/// Whether `view`'s type declares any environment reads at all.
pub(crate) fn declares_reads(view: &AnyView) -> bool {
    with_reads(view, |reads| !reads.is_empty())
}
