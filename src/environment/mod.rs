//! Typed ambient values flowing from the root toward the leaves.
//!
//! Environment values are keyed by a marker type implementing
//! [`EnvironmentKey`]. A setter view overrides one key for its subtree;
//! everything below reads the nearest override, or the key's default when
//! nothing upstream set it. Alongside the store, an [`EnvironmentDiff`]
//! records which keys changed during the current pass so subtrees that read
//! none of them can be skipped.

use std::any::{Any, TypeId};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

mod metadata;

pub(crate) use metadata::{declares_reads, should_update};

// --- Keys -------------------------------------------------------------------

/// A typed environment key. Implemented on a marker type:
///
/// ```
/// use trellis_ui::environment::EnvironmentKey;
///
/// struct Theme;
///
/// impl EnvironmentKey for Theme {
///     type Value = String;
///     fn default_value() -> String {
///         "light".into()
///     }
/// }
/// ```
pub trait EnvironmentKey: 'static {
    type Value: Clone + PartialEq + 'static;

    /// The value observed when no ancestor set this key.
    fn default_value() -> Self::Value;
}

// --- Store ------------------------------------------------------------------

/// An immutable snapshot of environment values. Overriding a key clones the
/// snapshot, so sibling subtrees never observe each other's overrides.
#[derive(Clone, Default)]
pub struct EnvironmentStore {
    values: FxHashMap<TypeId, Rc<dyn Any>>,
}

impl EnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a key, falling back to its default.
    pub fn get<K: EnvironmentKey>(&self) -> K::Value {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|v| v.downcast_ref::<K::Value>())
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    /// Returns a snapshot with `K` overridden.
    pub fn with<K: EnvironmentKey>(&self, value: K::Value) -> Self {
        self.with_erased(TypeId::of::<K>(), Rc::new(value))
    }

    pub(crate) fn with_erased(&self, key: TypeId, value: Rc<dyn Any>) -> Self {
        let mut next = self.clone();
        next.values.insert(key, value);
        next
    }
}

// --- Diff -------------------------------------------------------------------

/// The set of environment keys that changed during the current update pass.
#[derive(Clone, Default, Debug)]
pub struct EnvironmentDiff {
    changed: FxHashSet<TypeId>,
}

impl EnvironmentDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Marks one key as changed or unchanged for the subtree below a setter.
    pub(crate) fn mark(&mut self, key: TypeId, changed: bool) {
        if changed {
            self.changed.insert(key);
        } else {
            self.changed.remove(&key);
        }
    }

    /// Clears a single key. A setter updated without a fresh value knows its
    /// own override did not change, even when an outer setter's did.
    pub(crate) fn reset(&mut self, key: TypeId) {
        self.changed.remove(&key);
    }

    pub(crate) fn is_changed(&self, key: TypeId) -> bool {
        self.changed.contains(&key)
    }

    pub(crate) fn intersects(&self, reads: &FxHashSet<TypeId>) -> bool {
        if self.changed.len() <= reads.len() {
            self.changed.iter().any(|k| reads.contains(k))
        } else {
            reads.iter().any(|k| self.changed.contains(k))
        }
    }
}

// --- Declared reads ---------------------------------------------------------

/// Collects the environment keys a view type reads. Populated once per view
/// type and cached; see [`crate::view::ViewValue::environment_reads`].
#[derive(Default)]
pub struct EnvironmentReads {
    keys: FxHashSet<TypeId>,
}

impl EnvironmentReads {
    /// Declares that the view reads `K`.
    pub fn read<K: EnvironmentKey>(&mut self) {
        self.keys.insert(TypeId::of::<K>());
    }

    pub(crate) fn into_keys(self) -> FxHashSet<TypeId> {
        self.keys
    }
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Theme;

    impl EnvironmentKey for Theme {
        type Value = String;
        fn default_value() -> String {
            "light".into()
        }
    }

    struct Scale;

    impl EnvironmentKey for Scale {
        type Value = u32;
        fn default_value() -> u32 {
            1
        }
    }

    #[test]
    fn get_falls_back_to_default() {
        let store = EnvironmentStore::new();
        assert_eq!(store.get::<Theme>(), "light");
        assert_eq!(store.get::<Scale>(), 1);
    }

    #[test]
    fn with_overrides_without_touching_original() {
        let base = EnvironmentStore::new();
        let dark = base.with::<Theme>("dark".into());
        assert_eq!(dark.get::<Theme>(), "dark");
        assert_eq!(base.get::<Theme>(), "light");
        // Unrelated keys pass through.
        assert_eq!(dark.get::<Scale>(), 1);
    }

    #[test]
    fn diff_marks_and_resets() {
        let mut diff = EnvironmentDiff::new();
        let key = TypeId::of::<Theme>();
        assert!(!diff.is_changed(key));

        diff.mark(key, true);
        assert!(diff.is_changed(key));
        assert!(!diff.is_empty());

        diff.reset(key);
        assert!(!diff.is_changed(key));
        assert!(diff.is_empty());
    }

    #[test]
    fn diff_intersects_reads() {
        let mut diff = EnvironmentDiff::new();
        diff.mark(TypeId::of::<Theme>(), true);

        let mut reads = EnvironmentReads::default();
        reads.read::<Scale>();
        let scale_only = reads.into_keys();
        assert!(!diff.intersects(&scale_only));

        let mut reads = EnvironmentReads::default();
        reads.read::<Theme>();
        reads.read::<Scale>();
        let both = reads.into_keys();
        assert!(diff.intersects(&both));
    }
}
