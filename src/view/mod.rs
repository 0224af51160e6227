//! The view value model.
//!
//! A view is a cheap, immutable description of a piece of UI, rebuilt from
//! scratch whenever something above it re-renders. The framework compares
//! the new description against the last one and only walks into subtrees
//! that could have changed. Implement [`ViewValue`] for leaves and
//! composed views; the combinators in this module handle structure.

mod any;
mod combinators;
mod output;

pub use any::AnyView;
pub use combinators::{Attributed, Either, ForEach, WithEnvironment};
pub use output::{Branch, Key, Output};

use std::any::TypeId;
use std::rc::Rc;

use crate::attributes::{AttributeKey, AttributeStash};
use crate::bindings::Bindings;
use crate::environment::{EnvironmentKey, EnvironmentReads};
use crate::target::TargetHandle;

/// A view value: comparable, cloneable, and expandable into [`Output`].
///
/// The output variant a type produces is part of its shape and must be the
/// same on every call; changing it between updates is a contract violation
/// and panics inside the graph.
pub trait ViewValue: Clone + 'static {
    /// Expands this value one level. Dynamic properties (state cells,
    /// environment reads) are claimed from `bindings` in declaration order.
    fn make(&self, bindings: &mut Bindings<'_>) -> Output;

    /// Whether `self` describes the same UI as `other`. Usually `==` on the
    /// stored fields.
    fn value_eq(&self, other: &Self) -> bool;

    /// Name used in logs. Defaults to the type name without path or
    /// generic arguments.
    fn display_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Creates the target this view owns, or `None` for views that only
    /// structure other views. Called once per node, on creation.
    fn make_target(&self) -> Option<TargetHandle> {
        None
    }

    /// Contributes attribute entries for the nearest target below.
    fn collect_attributes(&self, _stash: &mut AttributeStash) {}

    /// Declares every environment key [`Bindings::environment`] may read.
    /// Computed once per type and cached; an update whose changed keys miss
    /// this set can skip an otherwise-equal subtree.
    fn environment_reads(_reads: &mut EnvironmentReads) {}

    /// The environment override this view applies, if it is a setter.
    fn environment_override(&self) -> Option<EnvOverride> {
        None
    }
}

/// A type-erased environment override carried by a setter view.
pub struct EnvOverride {
    pub(crate) key: TypeId,
    pub(crate) value: Rc<dyn std::any::Any>,
    pub(crate) eq: fn(&dyn std::any::Any, &dyn std::any::Any) -> bool,
}

/// Builder-style helpers available on every view value.
pub trait ViewValueExt: ViewValue + Sized {
    /// Overrides environment key `K` for this subtree.
    fn environment<K: EnvironmentKey>(self, value: K::Value) -> WithEnvironment<K, Self> {
        WithEnvironment::new(value, self)
    }

    /// Sets a single-valued attribute on the nearest target below.
    fn attribute<T: PartialEq + 'static>(self, key: AttributeKey, value: T) -> Attributed<Self> {
        let mut stash = AttributeStash::new();
        stash.discard(key, value);
        Attributed::new(self, stash)
    }

    /// Contributes an accumulating attribute to the nearest target below.
    fn append_attribute<T: PartialEq + 'static>(
        self,
        key: AttributeKey,
        value: T,
    ) -> Attributed<Self> {
        let mut stash = AttributeStash::new();
        stash.append(key, value);
        Attributed::new(self, stash)
    }

    /// Boxes the value into an [`AnyView`].
    fn boxed(self) -> AnyView {
        AnyView::new(self)
    }
}

impl<V: ViewValue> ViewValueExt for V {}

/// `core::option::Option<app::Text>` becomes `Option`.
pub(crate) fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
