//! Type-erased view values.

use std::any::{Any, TypeId};
use std::fmt;

use super::output::Output;
use super::{EnvOverride, ViewValue};
use crate::attributes::AttributeStash;
use crate::bindings::Bindings;
use crate::environment::EnvironmentReads;
use crate::target::TargetHandle;

/// Object-safe mirror of [`ViewValue`], implemented for every view type.
pub(crate) trait ErasedView: Any {
    fn clone_view(&self) -> Box<dyn ErasedView>;
    fn make(&self, bindings: &mut Bindings<'_>) -> Output;
    fn value_eq_erased(&self, other: &dyn ErasedView) -> bool;
    fn display_name(&self) -> &'static str;
    fn make_target(&self) -> Option<TargetHandle>;
    fn collect_attributes(&self, stash: &mut AttributeStash);
    fn environment_reads_into(&self, reads: &mut EnvironmentReads);
    fn environment_override(&self) -> Option<EnvOverride>;
    fn as_any(&self) -> &dyn Any;
}

impl<V: ViewValue> ErasedView for V {
    fn clone_view(&self) -> Box<dyn ErasedView> {
        Box::new(self.clone())
    }

    fn make(&self, bindings: &mut Bindings<'_>) -> Output {
        ViewValue::make(self, bindings)
    }

    fn value_eq_erased(&self, other: &dyn ErasedView) -> bool {
        match other.as_any().downcast_ref::<V>() {
            Some(other) => self.value_eq(other),
            None => false,
        }
    }

    fn display_name(&self) -> &'static str {
        V::display_name()
    }

    fn make_target(&self) -> Option<TargetHandle> {
        ViewValue::make_target(self)
    }

    fn collect_attributes(&self, stash: &mut AttributeStash) {
        ViewValue::collect_attributes(self, stash);
    }

    fn environment_reads_into(&self, reads: &mut EnvironmentReads) {
        V::environment_reads(reads);
    }

    fn environment_override(&self) -> Option<EnvOverride> {
        ViewValue::environment_override(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A boxed view value of any concrete type. Equality, attribute collection,
/// and expansion all dispatch to the original type.
pub struct AnyView(Box<dyn ErasedView>);

impl AnyView {
    pub fn new<V: ViewValue>(view: V) -> AnyView {
        AnyView(Box::new(view))
    }

    /// The concrete type behind the box.
    pub fn view_type(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    pub fn display_name(&self) -> &'static str {
        self.0.display_name()
    }

    /// Value equality. Differing concrete types are never equal.
    pub fn value_eq(&self, other: &AnyView) -> bool {
        self.0.value_eq_erased(other.0.as_ref())
    }

    pub fn downcast_ref<V: ViewValue>(&self) -> Option<&V> {
        self.0.as_any().downcast_ref::<V>()
    }

    pub(crate) fn make(&self, bindings: &mut Bindings<'_>) -> Output {
        self.0.make(bindings)
    }

    pub(crate) fn make_target(&self) -> Option<TargetHandle> {
        self.0.make_target()
    }

    pub(crate) fn collect_attributes(&self, stash: &mut AttributeStash) {
        self.0.collect_attributes(stash);
    }

    pub(crate) fn environment_reads_into(&self, reads: &mut EnvironmentReads) {
        self.0.environment_reads_into(reads);
    }

    pub(crate) fn environment_override(&self) -> Option<EnvOverride> {
        self.0.environment_override()
    }
}

impl Clone for AnyView {
    fn clone(&self) -> Self {
        AnyView(self.0.clone_view())
    }
}

impl fmt::Debug for AnyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
