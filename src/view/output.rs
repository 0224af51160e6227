//! Structural output of a view's `make`.

use std::fmt;

use super::any::AnyView;
use super::ViewValue;

/// Which side of an [`super::Either`] is live.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Branch {
    First,
    Second,
}

/// Identity of one entry in keyed dynamic content. Stable across reorders.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Index(usize),
    Int(i64),
    Str(String),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<i64> for Key {
    fn from(id: i64) -> Self {
        Key::Int(id)
    }
}

impl From<i32> for Key {
    fn from(id: i32) -> Self {
        Key::Int(id.into())
    }
}

impl From<&str> for Key {
    fn from(id: &str) -> Self {
        Key::Str(id.into())
    }
}

impl From<String> for Key {
    fn from(id: String) -> Self {
        Key::Str(id)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "#{i}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

/// What a view expands into. The variant is part of the view type's shape
/// and must never change between updates of the same node.
pub enum Output {
    /// A single composed child, re-made lazily. The usual output of user
    /// views; body-producing nodes are always stateful, so their updates
    /// are gated by value equality.
    Body(AnyView),
    /// A fixed-arity list of children, one slot per position, forever.
    Static(Vec<AnyView>),
    /// Zero or one child.
    Optional(Option<AnyView>),
    /// Exactly one of two alternative child shapes.
    Either(Branch, AnyView),
    /// Keyed dynamic content; entries move with their key.
    Keyed(Vec<(Key, AnyView)>),
    /// One child observed under an overridden environment.
    Environment(AnyView),
    /// No children at all.
    Leaf,
}

impl Output {
    /// Wraps a composed child, the common case for user views.
    pub fn body(view: impl ViewValue) -> Output {
        Output::Body(AnyView::new(view))
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Output::Body(_) => "body",
            Output::Static(_) => "static",
            Output::Optional(_) => "optional",
            Output::Either(..) => "either",
            Output::Keyed(_) => "keyed",
            Output::Environment(_) => "environment",
            Output::Leaf => "leaf",
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}
