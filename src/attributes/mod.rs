//! Attribute collection and application.
//!
//! Views declare attributes as part of their value description. During an
//! update each node collects its own attributes into a stash, merges them
//! into the pending stash inherited from its parent, and carries the result
//! downward until a node that owns a target consumes it. Application is
//! change-gated: only entries whose value differs from the snapshot applied
//! on the previous pass reach the target.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::graph::NodeKey;
use crate::target::TargetHandle;

// --- Keys -------------------------------------------------------------------

/// Identifies one attribute on a target, e.g. `"text"` or `"color"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AttributeKey(pub &'static str);

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// How entries for the same key combine while flowing down the tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttributePolicy {
    /// One value per key. A setter closer to the view overwrites one further
    /// out.
    Discard,
    /// Every setter contributes; entries are kept per originating node.
    Append,
}

// --- Entries ----------------------------------------------------------------

/// Compares two erased values of the same concrete type.
pub(crate) fn any_eq<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[derive(Clone)]
pub(crate) struct AttributeSlot {
    pub key: AttributeKey,
    pub policy: AttributePolicy,
    /// The node whose view declared this entry. Assigned when the stash is
    /// collected; appended entries are keyed by it on the target.
    pub source: Option<NodeKey>,
    pub value: Rc<dyn Any>,
    pub eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl AttributeSlot {
    fn value_eq(&self, other: &AttributeSlot) -> bool {
        (self.eq)(self.value.as_ref(), other.value.as_ref())
    }
}

// --- Stash ------------------------------------------------------------------

/// An ordered collection of attribute entries in transit toward a target.
#[derive(Clone, Default)]
pub struct AttributeStash {
    entries: Vec<AttributeSlot>,
}

impl AttributeStash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adds a single-valued entry, replacing an earlier one for the same key.
    pub fn discard<T: PartialEq + 'static>(&mut self, key: AttributeKey, value: T) {
        let slot = AttributeSlot {
            key,
            policy: AttributePolicy::Discard,
            source: None,
            value: Rc::new(value),
            eq: any_eq::<T>,
        };
        match self.find_discard_mut(key) {
            Some(existing) => *existing = slot,
            None => self.entries.push(slot),
        }
    }

    /// Adds an accumulating entry. Entries from distinct source nodes
    /// coexist on the target.
    pub fn append<T: PartialEq + 'static>(&mut self, key: AttributeKey, value: T) {
        self.entries.push(AttributeSlot {
            key,
            policy: AttributePolicy::Append,
            source: None,
            value: Rc::new(value),
            eq: any_eq::<T>,
        });
    }

    /// Stamps `source` on every entry that does not carry one yet. Called
    /// once per collection, with the key of the collecting node.
    pub(crate) fn assign_source(&mut self, source: NodeKey) {
        for slot in &mut self.entries {
            if slot.source.is_none() {
                slot.source = Some(source);
            }
        }
    }

    /// Merges `own` over `self`: discard entries from `own` overwrite
    /// same-key entries already pending, append entries replace only a
    /// pending entry from the same source.
    pub(crate) fn merge(&self, own: &AttributeStash) -> AttributeStash {
        let mut merged = self.clone();
        for slot in &own.entries {
            let existing = match slot.policy {
                AttributePolicy::Discard => merged
                    .entries
                    .iter_mut()
                    .find(|s| s.policy == AttributePolicy::Discard && s.key == slot.key),
                AttributePolicy::Append => merged.entries.iter_mut().find(|s| {
                    s.policy == AttributePolicy::Append
                        && s.key == slot.key
                        && s.source == slot.source
                }),
            };
            match existing {
                Some(entry) => *entry = slot.clone(),
                None => merged.entries.push(slot.clone()),
            }
        }
        merged
    }

    /// Extends `self` with every entry of `other`, keeping `other`'s entries
    /// authoritative on conflicts. Used by view combinators that stack
    /// attribute modifiers before any node exists.
    pub(crate) fn extend_from(&mut self, other: &AttributeStash) {
        *self = self.merge(other);
    }

    /// Writes every entry whose value differs from `previous` to the target
    /// and returns the new applied snapshot.
    pub(crate) fn apply_delta(
        &self,
        previous: &AttributeStash,
        target: &TargetHandle,
        mut on_write: impl FnMut(),
    ) -> AttributeStash {
        for slot in &self.entries {
            let prior = match slot.policy {
                AttributePolicy::Discard => previous.find_discard(slot.key),
                AttributePolicy::Append => previous.find_append(slot.key, slot.source),
            };
            let changed = prior.map_or(true, |p| !slot.value_eq(p));
            if changed {
                let source = slot
                    .source
                    .unwrap_or_else(|| panic!("attribute {} has no source node", slot.key));
                target
                    .borrow_mut()
                    .set_attribute(slot.key, source, slot.value.as_ref());
                on_write();
            }
        }
        self.clone()
    }

    /// Structural equality between two stashes, in entry order.
    pub(crate) fn stash_eq(&self, other: &AttributeStash) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.key == b.key && a.policy == b.policy && a.value_eq(b))
    }

    fn find_discard(&self, key: AttributeKey) -> Option<&AttributeSlot> {
        self.entries
            .iter()
            .find(|s| s.policy == AttributePolicy::Discard && s.key == key)
    }

    fn find_discard_mut(&mut self, key: AttributeKey) -> Option<&mut AttributeSlot> {
        self.entries
            .iter_mut()
            .find(|s| s.policy == AttributePolicy::Discard && s.key == key)
    }

    fn find_append(&self, key: AttributeKey, source: Option<NodeKey>) -> Option<&AttributeSlot> {
        self.entries
            .iter()
            .find(|s| s.policy == AttributePolicy::Append && s.key == key && s.source == source)
    }
}

impl fmt::Debug for AttributeStash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|s| (s.key, s.policy)))
            .finish()
    }
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEXT: AttributeKey = AttributeKey("text");
    const TAGS: AttributeKey = AttributeKey("tags");

    fn keyed(stash: &AttributeStash) -> Vec<AttributeKey> {
        stash.entries.iter().map(|s| s.key).collect()
    }

    #[test]
    fn discard_replaces_same_key() {
        let mut stash = AttributeStash::new();
        stash.discard(TEXT, String::from("a"));
        stash.discard(TEXT, String::from("b"));
        assert_eq!(stash.len(), 1);
        let value = stash.entries[0].value.downcast_ref::<String>();
        assert_eq!(value.map(String::as_str), Some("b"));
    }

    #[test]
    fn append_keeps_every_entry() {
        let mut stash = AttributeStash::new();
        stash.append(TAGS, String::from("x"));
        stash.append(TAGS, String::from("y"));
        assert_eq!(stash.len(), 2);
    }

    #[test]
    fn merge_inner_discard_wins() {
        // The pending stash carries the outer setter; the node's own stash
        // is closer to the view and overwrites it.
        let mut pending = AttributeStash::new();
        pending.discard(TEXT, String::from("outer"));
        let mut own = AttributeStash::new();
        own.discard(TEXT, String::from("inner"));

        let merged = pending.merge(&own);
        assert_eq!(merged.len(), 1);
        let value = merged.entries[0].value.downcast_ref::<String>();
        assert_eq!(value.map(String::as_str), Some("inner"));
    }

    #[test]
    fn merge_keeps_unrelated_keys() {
        let mut pending = AttributeStash::new();
        pending.discard(TEXT, String::from("t"));
        let mut own = AttributeStash::new();
        own.append(TAGS, String::from("x"));

        let merged = pending.merge(&own);
        assert_eq!(keyed(&merged), vec![TEXT, TAGS]);
    }

    #[test]
    fn stash_eq_compares_values() {
        let mut a = AttributeStash::new();
        a.discard(TEXT, String::from("same"));
        let mut b = AttributeStash::new();
        b.discard(TEXT, String::from("same"));
        assert!(a.stash_eq(&b));

        let mut c = AttributeStash::new();
        c.discard(TEXT, String::from("other"));
        assert!(!a.stash_eq(&c));
    }

    #[test]
    fn any_eq_rejects_type_mismatch() {
        assert!(!any_eq::<i32>(&1i32 as &dyn Any, &String::from("1") as &dyn Any));
        assert!(any_eq::<i32>(&3i32 as &dyn Any, &3i32 as &dyn Any));
    }
}
