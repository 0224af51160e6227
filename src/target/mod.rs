//! The platform-facing side of the graph.
//!
//! A target node is a long-lived, mutable object in the platform tree (a DOM
//! element, a native view, a scene-graph node). The graph never stores
//! render state of its own; it edits targets in place through this trait.
//! Child indices are positions among *target* children only, since most
//! graph nodes contribute no target of their own.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::attributes::AttributeKey;
use crate::graph::NodeKey;

/// Shared handle to a target node. The graph holds one per substantial node;
/// platforms keep their own clones.
pub type TargetHandle = Rc<RefCell<dyn TargetNode>>;

/// One mutable node in the platform tree.
pub trait TargetNode: 'static {
    /// Human-readable type name, used in logs.
    fn display_name(&self) -> &str;

    /// Inserts `child` so it becomes target child number `at`.
    fn insert_child(&mut self, child: TargetHandle, at: usize);

    /// Removes target child number `at`.
    fn remove_child(&mut self, at: usize);

    /// Writes one attribute value. `source` distinguishes accumulating
    /// entries contributed by different views for the same key.
    fn set_attribute(&mut self, key: AttributeKey, source: NodeKey, value: &dyn Any);

    /// Called once after the initial update pass has set every attribute,
    /// so the target can run creation work that needs them all.
    fn attributes_did_set(&mut self) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
