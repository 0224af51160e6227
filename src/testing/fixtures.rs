//! Small views used throughout the test suite.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::attributes::AttributeStash;
use crate::bindings::{Bindings, StateCell};
use crate::target::TargetHandle;
use crate::view::{AnyView, Output, ViewValue};

use super::target::TestTarget;

/// Attribute keys the fixtures write.
pub mod keys {
    use crate::attributes::AttributeKey;

    pub const TEXT: AttributeKey = AttributeKey("text");
    pub const COLOR: AttributeKey = AttributeKey("color");
    pub const TAG: AttributeKey = AttributeKey("tag");
    pub const TAGS: AttributeKey = AttributeKey("tags");
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    Red,
    Green,
    Blue,
}

// --- Leaf fixtures ----------------------------------------------------------

/// A leaf view owning a `Text` target with one text attribute.
#[derive(Clone, PartialEq)]
pub struct Text {
    content: String,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl ViewValue for Text {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Leaf
    }

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn make_target(&self) -> Option<TargetHandle> {
        Some(TestTarget::shared("Text") as TargetHandle)
    }

    fn collect_attributes(&self, stash: &mut AttributeStash) {
        stash.discard(keys::TEXT, self.content.clone());
    }
}

/// A leaf view owning a `Rectangle` target with one color attribute.
#[derive(Clone, PartialEq)]
pub struct Rectangle {
    color: Color,
}

impl Rectangle {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl ViewValue for Rectangle {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Leaf
    }

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn make_target(&self) -> Option<TargetHandle> {
        Some(TestTarget::shared("Rectangle") as TargetHandle)
    }

    fn collect_attributes(&self, stash: &mut AttributeStash) {
        stash.discard(keys::COLOR, self.color);
    }
}

// --- Container fixture ------------------------------------------------------

/// A substantial container: owns a `Column` target, children nest inside it.
#[derive(Clone)]
pub struct Column<C: ViewValue> {
    content: C,
}

impl<C: ViewValue> Column<C> {
    pub fn new(content: C) -> Self {
        Self { content }
    }
}

impl<C: ViewValue> ViewValue for Column<C> {
    fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
        Output::Static(vec![AnyView::new(self.content.clone())])
    }

    fn value_eq(&self, other: &Self) -> bool {
        self.content.value_eq(&other.content)
    }

    fn make_target(&self) -> Option<TargetHandle> {
        Some(TestTarget::shared("Column") as TargetHandle)
    }
}

// --- Instrumented handles ---------------------------------------------------

/// Smuggles a [`StateCell`] out of a view's `make` so tests can write state
/// from outside. Transparent to value comparison.
pub struct Probe<T> {
    slot: Rc<RefCell<Option<StateCell<T>>>>,
}

impl<T> Probe<T> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn publish(&self, cell: StateCell<T>) {
        *self.slot.borrow_mut() = Some(cell);
    }

    pub fn cell(&self) -> StateCell<T> {
        self.slot
            .borrow()
            .clone()
            .expect("probe was never published to")
    }
}

impl<T> Default for Probe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Probe<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for Probe<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Counts how many times a view's `make` ran. Transparent to value
/// comparison, like [`Probe`].
#[derive(Clone, Default)]
pub struct MakeCounter {
    count: Rc<Cell<usize>>,
}

impl MakeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.count.set(self.count.get() + 1);
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl PartialEq for MakeCounter {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
