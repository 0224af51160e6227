//! Per-update context threaded down the graph, plus mutation counters.

use std::cell::Cell;
use std::rc::Rc;

use crate::attributes::AttributeStash;
use crate::environment::{EnvironmentDiff, EnvironmentStore};
use crate::target::TargetHandle;

// --- Context ----------------------------------------------------------------

/// Everything an update pass carries from a parent into its edges.
/// Contexts are values; deriving one for a subtree never affects siblings.
#[derive(Clone)]
pub struct Context {
    /// Attributes still looking for a target.
    pub(crate) attributes: AttributeStash,
    /// Set between a state cell write and the owning node's update.
    pub(crate) state_changed: bool,
    pub(crate) environment: EnvironmentStore,
    pub(crate) changed_environment: EnvironmentDiff,
    /// Nearest target above the current position. Insertions, removals, and
    /// moves of whole subtrees apply here.
    pub(crate) parent_target: Option<TargetHandle>,
    pub(crate) stats: UpdateStats,
}

impl Context {
    /// Context for a headless root: no target above, empty environment.
    pub fn root() -> Self {
        Self {
            attributes: AttributeStash::new(),
            state_changed: false,
            environment: EnvironmentStore::new(),
            changed_environment: EnvironmentDiff::new(),
            parent_target: None,
            stats: UpdateStats::default(),
        }
    }

    /// Context for a root mounted inside an existing target container.
    pub fn attached(container: TargetHandle) -> Self {
        Self {
            parent_target: Some(container),
            ..Self::root()
        }
    }

    pub(crate) fn setting_state_change(mut self) -> Self {
        self.state_changed = true;
        self
    }

    /// The context a node stores for later replay: same surroundings and
    /// environment values, but no stale diff and no lingering state flag.
    pub(crate) fn for_replay(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            state_changed: false,
            environment: self.environment.clone(),
            changed_environment: EnvironmentDiff::new(),
            parent_target: self.parent_target.clone(),
            stats: self.stats.clone(),
        }
    }
}

// --- Stats ------------------------------------------------------------------

/// Shared counters for target-tree mutations. Cloned handles observe the
/// same totals, so re-renders triggered mid-pass by state writes are
/// counted too.
#[derive(Clone, Default)]
pub struct UpdateStats {
    inner: Rc<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    inserts: Cell<usize>,
    removes: Cell<usize>,
    moves: Cell<usize>,
    attribute_sets: Cell<usize>,
}

impl UpdateStats {
    pub(crate) fn record_insert(&self) {
        self.inner.inserts.set(self.inner.inserts.get() + 1);
    }

    pub(crate) fn record_remove(&self) {
        self.inner.removes.set(self.inner.removes.get() + 1);
    }

    pub(crate) fn record_move(&self) {
        self.inner.moves.set(self.inner.moves.get() + 1);
    }

    pub(crate) fn record_attribute_set(&self) {
        self.inner.attribute_sets.set(self.inner.attribute_sets.get() + 1);
    }

    /// Returns the totals accumulated since the last drain and zeroes them.
    pub fn drain(&self) -> UpdateSummary {
        UpdateSummary {
            inserts: self.inner.inserts.take(),
            removes: self.inner.removes.take(),
            moves: self.inner.moves.take(),
            attribute_sets: self.inner.attribute_sets.take(),
        }
    }
}

/// Target-tree mutation totals for one or more update passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub inserts: usize,
    pub removes: usize,
    /// One per subtree relocated by keyed reconciliation.
    pub moves: usize,
    pub attribute_sets: usize,
}

impl UpdateSummary {
    /// True when the pass touched the target tree in no way at all.
    pub fn is_noop(&self) -> bool {
        *self == UpdateSummary::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stats_are_shared_across_clones() {
        let stats = UpdateStats::default();
        let clone = stats.clone();
        stats.record_insert();
        clone.record_insert();
        clone.record_attribute_set();

        let summary = stats.drain();
        assert_eq!(summary.inserts, 2);
        assert_eq!(summary.attribute_sets, 1);
        assert!(!summary.is_noop());

        // Drained.
        assert!(stats.drain().is_noop());
    }
}
