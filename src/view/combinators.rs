//! Structural view combinators: tuples, `Option`, [`Either`], [`ForEach`],
//! environment setters, and attribute modifiers.

use std::any::TypeId;
use std::marker::PhantomData;
use std::rc::Rc;

use super::any::AnyView;
use super::output::{Branch, Key, Output};
use super::{EnvOverride, ViewValue};
use crate::attributes::{any_eq, AttributeStash};
use crate::bindings::Bindings;
use crate::environment::EnvironmentKey;

// --- Tuples -----------------------------------------------------------------

impl ViewValue for () {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Static(Vec::new())
    }

    fn value_eq(&self, _other: &Self) -> bool {
        true
    }
}

macro_rules! impl_tuple_view {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ViewValue),+> ViewValue for ($($name,)+) {
            fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
                Output::Static(vec![$(AnyView::new(self.$idx.clone())),+])
            }

            fn value_eq(&self, other: &Self) -> bool {
                $(self.$idx.value_eq(&other.$idx))&&+
            }
        }
    };
}

impl_tuple_view!(A:0);
impl_tuple_view!(A:0, B:1);
impl_tuple_view!(A:0, B:1, C:2);
impl_tuple_view!(A:0, B:1, C:2, D:3);
impl_tuple_view!(A:0, B:1, C:2, D:3, E:4);
impl_tuple_view!(A:0, B:1, C:2, D:3, E:4, F:5);
impl_tuple_view!(A:0, B:1, C:2, D:3, E:4, F:5, G:6);
impl_tuple_view!(A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7);

// --- Option -----------------------------------------------------------------

impl<V: ViewValue> ViewValue for Option<V> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Optional(self.as_ref().map(|v| AnyView::new(v.clone())))
    }

    fn value_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.value_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

// --- Either -----------------------------------------------------------------

/// One of two alternative subtrees. Switching sides tears the old subtree
/// down and builds the other from scratch.
#[derive(Clone)]
pub enum Either<A: ViewValue, B: ViewValue> {
    First(A),
    Second(B),
}

impl<A: ViewValue, B: ViewValue> ViewValue for Either<A, B> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        match self {
            Either::First(a) => Output::Either(Branch::First, AnyView::new(a.clone())),
            Either::Second(b) => Output::Either(Branch::Second, AnyView::new(b.clone())),
        }
    }

    fn value_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Either::First(a), Either::First(b)) => a.value_eq(b),
            (Either::Second(a), Either::Second(b)) => a.value_eq(b),
            _ => false,
        }
    }
}

// --- ForEach ----------------------------------------------------------------

/// Keyed dynamic content. Each entry carries a stable [`Key`]; across
/// updates, entries follow their key through insertions, removals, and
/// reorders.
#[derive(Clone)]
pub struct ForEach<V: ViewValue> {
    entries: Vec<(Key, V)>,
}

impl<V: ViewValue> ForEach<V> {
    pub fn new<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(mut self, key: impl Into<Key>, view: V) -> Self {
        self.entries.push((key.into(), view));
        self
    }
}

impl<V: ViewValue> ViewValue for ForEach<V> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Keyed(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), AnyView::new(v.clone())))
                .collect(),
        )
    }

    fn value_eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((ka, va), (kb, vb))| ka == kb && va.value_eq(vb))
    }
}

// --- Environment setter -----------------------------------------------------

/// Overrides one environment key for everything below `child`. Built with
/// [`super::ViewValueExt::environment`].
pub struct WithEnvironment<K: EnvironmentKey, V: ViewValue> {
    value: K::Value,
    child: V,
    _key: PhantomData<fn() -> K>,
}

impl<K: EnvironmentKey, V: ViewValue> WithEnvironment<K, V> {
    pub fn new(value: K::Value, child: V) -> Self {
        Self {
            value,
            child,
            _key: PhantomData,
        }
    }
}

impl<K: EnvironmentKey, V: ViewValue> Clone for WithEnvironment<K, V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            child: self.child.clone(),
            _key: PhantomData,
        }
    }
}

impl<K: EnvironmentKey, V: ViewValue> ViewValue for WithEnvironment<K, V> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Environment(AnyView::new(self.child.clone()))
    }

    fn value_eq(&self, other: &Self) -> bool {
        self.value == other.value && self.child.value_eq(&other.child)
    }

    fn environment_override(&self) -> Option<EnvOverride> {
        Some(EnvOverride {
            key: TypeId::of::<K>(),
            value: Rc::new(self.value.clone()),
            eq: any_eq::<K::Value>,
        })
    }
}

// --- Attribute modifier -----------------------------------------------------

/// Wraps a view and contributes attributes on its behalf. The attributes
/// flow down to the nearest target below. Built with
/// [`super::ViewValueExt::attribute`] and
/// [`super::ViewValueExt::append_attribute`].
#[derive(Clone)]
pub struct Attributed<V: ViewValue> {
    inner: V,
    attributes: AttributeStash,
}

impl<V: ViewValue> Attributed<V> {
    pub(crate) fn new(inner: V, attributes: AttributeStash) -> Self {
        Self { inner, attributes }
    }
}

impl<V: ViewValue> ViewValue for Attributed<V> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Static(vec![AnyView::new(self.inner.clone())])
    }

    fn value_eq(&self, other: &Self) -> bool {
        self.inner.value_eq(&other.inner) && self.attributes.stash_eq(&other.attributes)
    }

    fn collect_attributes(&self, stash: &mut AttributeStash) {
        stash.extend_from(&self.attributes);
    }
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingStore;
    use crate::environment::EnvironmentStore;
    use crate::graph::NodeKey;
    use slotmap::Key as _;

    #[derive(Clone, PartialEq)]
    struct Item(u32);

    impl ViewValue for Item {
        fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
            Output::Leaf
        }

        fn value_eq(&self, other: &Self) -> bool {
            self == other
        }
    }

    fn probe_make(view: &impl ViewValue) -> Output {
        let mut store = BindingStore::default();
        let environment = EnvironmentStore::new();
        let mut bindings =
            Bindings::detached(&mut store, NodeKey::null(), &environment);
        let output = view.make(&mut bindings);
        bindings.finish();
        output
    }

    #[test]
    fn tuple_expands_to_static() {
        let output = probe_make(&(Item(1), Item(2), Item(3)));
        match output {
            Output::Static(children) => assert_eq!(children.len(), 3),
            other => panic!("expected static output, got {other:?}"),
        }
    }

    #[test]
    fn tuple_value_eq_is_positional() {
        let a = (Item(1), Item(2));
        assert!(a.value_eq(&(Item(1), Item(2))));
        assert!(!a.value_eq(&(Item(2), Item(1))));
    }

    #[test]
    fn option_expands_to_optional() {
        assert!(matches!(
            probe_make(&Some(Item(1))),
            Output::Optional(Some(_))
        ));
        assert!(matches!(probe_make(&None::<Item>), Output::Optional(None)));
    }

    #[test]
    fn either_tracks_branch() {
        let first: Either<Item, Item> = Either::First(Item(1));
        match probe_make(&first) {
            Output::Either(branch, _) => assert_eq!(branch, Branch::First),
            other => panic!("expected either output, got {other:?}"),
        }
        assert!(!first.value_eq(&Either::Second(Item(1))));
    }

    #[test]
    fn for_each_preserves_entry_order() {
        let list = ForEach::new([("a", Item(1)), ("b", Item(2))]);
        match probe_make(&list) {
            Output::Keyed(entries) => {
                let keys: Vec<Key> = entries.into_iter().map(|(k, _)| k).collect();
                assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);
            }
            other => panic!("expected keyed output, got {other:?}"),
        }
    }

    #[test]
    fn for_each_value_eq_compares_keys_and_values() {
        let a = ForEach::new([("a", Item(1))]);
        assert!(a.value_eq(&ForEach::new([("a", Item(1))])));
        assert!(!a.value_eq(&ForEach::new([("b", Item(1))])));
        assert!(!a.value_eq(&ForEach::new([("a", Item(2))])));
    }
}
