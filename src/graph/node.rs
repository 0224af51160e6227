//! Node storage for the graph arena.

use smallvec::SmallVec;
use std::any::TypeId;
use std::rc::Rc;

use super::context::Context;
use crate::attributes::AttributeStash;
use crate::bindings::BindingStore;
use crate::target::TargetHandle;
use crate::view::{AnyView, Branch, Key};

slotmap::new_key_type! {
    /// Stable handle to a node in the graph arena.
    pub struct NodeKey;
}

/// Outgoing edges of one node. The variant mirrors the node's output kind
/// and never changes after the first update.
pub(crate) enum Edges {
    /// No update has expanded this node yet.
    Uninit,
    Leaf,
    Body(Option<NodeKey>),
    Static(SmallVec<[Option<NodeKey>; 4]>),
    Optional(Option<NodeKey>),
    Either(Option<(Branch, NodeKey)>),
    Keyed(Vec<(Key, NodeKey)>),
    Environment(Option<NodeKey>),
}

impl Edges {
    /// Child keys in declaration order.
    pub(crate) fn keys(&self) -> SmallVec<[NodeKey; 4]> {
        match self {
            Edges::Uninit | Edges::Leaf => SmallVec::new(),
            Edges::Body(slot) | Edges::Optional(slot) | Edges::Environment(slot) => {
                slot.iter().copied().collect()
            }
            Edges::Static(slots) => slots.iter().filter_map(|s| *s).collect(),
            Edges::Either(slot) => slot.iter().map(|(_, k)| *k).collect(),
            Edges::Keyed(entries) => entries.iter().map(|(_, k)| *k).collect(),
        }
    }
}

/// One long-lived node: the last view value seen at this position, plus
/// everything that must survive between renders.
pub(crate) struct Node {
    /// Last value this node was updated with.
    pub value: Option<AnyView>,
    pub view_type: TypeId,
    pub display_name: &'static str,
    /// Set once the node is known to hold dynamic properties: a body
    /// output, claimed binding slots, or declared environment reads.
    /// Stateful nodes are the only ones whose updates are gated by value
    /// comparison.
    pub stateful: bool,
    /// The target this node owns, when substantial.
    pub target: Option<TargetHandle>,
    /// Number of target children this subtree contributes to the nearest
    /// target above it. 1 for substantial nodes.
    pub target_count: usize,
    /// Attributes collected from the value on the last pass, kept so an
    /// update-with-nothing can still flow them downward.
    pub collected: AttributeStash,
    /// Snapshot last applied to the owned target; the delta base.
    pub applied: AttributeStash,
    pub edges: Edges,
    pub bindings: BindingStore,
    /// For environment setters: the overridden key and its previous value.
    pub env_key: Option<TypeId>,
    pub env_prev: Option<Rc<dyn std::any::Any>>,
    /// Context and position of the last update, replayed when a state cell
    /// write re-renders this subtree from within.
    pub stored_context: Option<Context>,
    pub stored_position: usize,
}

impl Node {
    pub(crate) fn new(value: &AnyView, target: Option<TargetHandle>) -> Self {
        Self {
            value: None,
            view_type: value.view_type(),
            display_name: value.display_name(),
            stateful: false,
            target,
            target_count: 0,
            collected: AttributeStash::new(),
            applied: AttributeStash::new(),
            edges: Edges::Uninit,
            bindings: BindingStore::default(),
            env_key: None,
            env_prev: None,
            stored_context: None,
            stored_position: 0,
        }
    }
}
