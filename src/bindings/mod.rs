//! Durables behind dynamic view properties.
//!
//! Views are values, rebuilt on every render, so anything that must survive
//! a render lives in the node instead. Each node owns a [`BindingStore`];
//! during `make` the view claims slots from it through [`Bindings`] in
//! declaration order. The first render creates each slot, later renders
//! hand the stored value back. Claiming a different number of slots, or the
//! same slot with a different type, is a contract violation and panics.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::environment::{EnvironmentDiff, EnvironmentKey, EnvironmentStore};
use crate::graph::{Graph, NodeKey};

// --- Store ------------------------------------------------------------------

enum Slot {
    State {
        value: Rc<RefCell<Box<dyn Any>>>,
        type_id: TypeId,
    },
    Environment {
        key: TypeId,
        cached: Box<dyn Any>,
        refresh: fn(&EnvironmentStore) -> Box<dyn Any>,
    },
}

fn refresh_slot<K: EnvironmentKey>(store: &EnvironmentStore) -> Box<dyn Any> {
    Box::new(store.get::<K>())
}

/// Slot storage owned by one graph node. Lives as long as the node does.
#[derive(Default)]
pub struct BindingStore {
    slots: Vec<Slot>,
}

impl BindingStore {
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Re-reads every environment slot whose key changed this pass. Runs
    /// before `make` so the view observes current values.
    pub(crate) fn refresh_environment(
        &mut self,
        store: &EnvironmentStore,
        diff: &EnvironmentDiff,
    ) {
        if diff.is_empty() {
            return;
        }
        for slot in &mut self.slots {
            if let Slot::Environment { key, cached, refresh } = slot {
                if diff.is_changed(*key) {
                    *cached = refresh(store);
                }
            }
        }
    }
}

// --- Claiming ---------------------------------------------------------------

/// Hands slots out to a view's `make`, one claim per dynamic property.
pub struct Bindings<'a> {
    store: &'a mut BindingStore,
    cursor: usize,
    owner: NodeKey,
    graph: Weak<RefCell<Graph>>,
    environment: &'a EnvironmentStore,
}

impl<'a> Bindings<'a> {
    pub(crate) fn new(
        store: &'a mut BindingStore,
        owner: NodeKey,
        graph: Weak<RefCell<Graph>>,
        environment: &'a EnvironmentStore,
    ) -> Self {
        Self {
            store,
            cursor: 0,
            owner,
            graph,
            environment,
        }
    }

    /// A claiming context with no graph behind it. Writing through a cell
    /// claimed this way panics; reads work.
    #[cfg(test)]
    pub(crate) fn detached(
        store: &'a mut BindingStore,
        owner: NodeKey,
        environment: &'a EnvironmentStore,
    ) -> Self {
        Self::new(store, owner, Weak::new(), environment)
    }

    /// Claims a state slot. `default` runs only on the slot's first render.
    pub fn state<T: Clone + PartialEq + 'static>(
        &mut self,
        default: impl FnOnce() -> T,
    ) -> StateCell<T> {
        let index = self.cursor;
        self.cursor += 1;
        let value = if index < self.store.slots.len() {
            match &self.store.slots[index] {
                Slot::State { value, type_id } if *type_id == TypeId::of::<T>() => {
                    Rc::clone(value)
                }
                _ => panic!(
                    "binding {index} changed shape between renders; claim bindings in a stable order"
                ),
            }
        } else {
            let value: Rc<RefCell<Box<dyn Any>>> = Rc::new(RefCell::new(Box::new(default())));
            self.store.slots.push(Slot::State {
                value: Rc::clone(&value),
                type_id: TypeId::of::<T>(),
            });
            value
        };
        StateCell {
            value,
            owner: self.owner,
            graph: self.graph.clone(),
            _value: PhantomData,
        }
    }

    /// Claims an environment slot and reads its current value.
    pub fn environment<K: EnvironmentKey>(&mut self) -> K::Value {
        let index = self.cursor;
        self.cursor += 1;
        if index < self.store.slots.len() {
            match &self.store.slots[index] {
                Slot::Environment { key, cached, .. } if *key == TypeId::of::<K>() => cached
                    .downcast_ref::<K::Value>()
                    .cloned()
                    .expect("environment slot type mismatch"),
                _ => panic!(
                    "binding {index} changed shape between renders; claim bindings in a stable order"
                ),
            }
        } else {
            let value = self.environment.get::<K>();
            self.store.slots.push(Slot::Environment {
                key: TypeId::of::<K>(),
                cached: Box::new(value.clone()),
                refresh: refresh_slot::<K>,
            });
            value
        }
    }

    /// Checks that every stored slot was claimed.
    pub(crate) fn finish(self) {
        let stored = self.store.slots.len();
        if self.cursor != stored {
            panic!(
                "make claimed {} of {stored} bindings; claim bindings unconditionally",
                self.cursor
            );
        }
    }
}

// --- State cells ------------------------------------------------------------

/// Read-write handle to one state slot. Cloneable; clones share the slot.
/// Writing a value that differs from the stored one synchronously re-renders
/// the owning node's subtree.
pub struct StateCell<T> {
    value: Rc<RefCell<Box<dyn Any>>>,
    owner: NodeKey,
    graph: Weak<RefCell<Graph>>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            owner: self.owner,
            graph: self.graph.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Clone + PartialEq + 'static> StateCell<T> {
    pub fn get(&self) -> T {
        self.value
            .borrow()
            .downcast_ref::<T>()
            .cloned()
            .expect("state cell type mismatch")
    }

    /// Stores `value` and re-renders the owning subtree. Writing a value
    /// equal to the stored one does nothing.
    pub fn set(&self, value: T) {
        {
            let current = self.value.borrow();
            let current = current
                .downcast_ref::<T>()
                .expect("state cell type mismatch");
            if *current == value {
                return;
            }
        }
        *self.value.borrow_mut() = Box::new(value);
        let graph = self
            .graph
            .upgrade()
            .expect("state write after the graph was dropped");
        graph.borrow_mut().notify_state_change(self.owner);
    }

    /// Reads, transforms, and writes back through [`StateCell::set`].
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentKey;
    use pretty_assertions::assert_eq;
    use slotmap::Key as _;

    struct Scale;

    impl EnvironmentKey for Scale {
        type Value = u32;
        fn default_value() -> u32 {
            1
        }
    }

    #[test]
    fn state_slot_survives_across_claims() {
        let mut store = BindingStore::default();
        let environment = EnvironmentStore::new();

        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let cell = bindings.state(|| 10u32);
        bindings.finish();
        assert_eq!(cell.get(), 10);

        // Second render: the default must not run again.
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let cell = bindings.state(|| 99u32);
        bindings.finish();
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn set_equal_value_is_a_no_op() {
        let mut store = BindingStore::default();
        let environment = EnvironmentStore::new();
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let cell = bindings.state(|| 5i32);
        bindings.finish();
        // No graph behind this cell, so a real write would panic; an equal
        // write must return before reaching the graph.
        cell.set(5);
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn environment_slot_caches_and_refreshes() {
        let mut store = BindingStore::default();
        let base = EnvironmentStore::new();
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &base);
        assert_eq!(bindings.environment::<Scale>(), 1);
        bindings.finish();

        // Stale until the key is marked changed.
        let scaled = base.with::<Scale>(3);
        let mut diff = EnvironmentDiff::new();
        store.refresh_environment(&scaled, &diff);
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &scaled);
        assert_eq!(bindings.environment::<Scale>(), 1);
        bindings.finish();

        diff.mark(std::any::TypeId::of::<Scale>(), true);
        store.refresh_environment(&scaled, &diff);
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &scaled);
        assert_eq!(bindings.environment::<Scale>(), 3);
        bindings.finish();
    }

    #[test]
    #[should_panic(expected = "changed shape")]
    fn slot_kind_mismatch_panics() {
        let mut store = BindingStore::default();
        let environment = EnvironmentStore::new();
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let _ = bindings.state(|| 1u32);
        bindings.finish();

        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let _ = bindings.environment::<Scale>();
    }

    #[test]
    #[should_panic(expected = "claim bindings unconditionally")]
    fn short_claim_panics() {
        let mut store = BindingStore::default();
        let environment = EnvironmentStore::new();
        let mut bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        let _ = bindings.state(|| 1u32);
        bindings.finish();

        let bindings = Bindings::detached(&mut store, NodeKey::null(), &environment);
        bindings.finish();
    }
}
