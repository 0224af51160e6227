//! An in-memory target tree that records everything done to it.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::attributes::AttributeKey;
use crate::graph::NodeKey;
use crate::target::{TargetHandle, TargetNode};

use super::fixtures::Color;

// --- Instrumentation --------------------------------------------------------

/// One recorded mutation of the test target tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOp {
    Insert {
        parent: String,
        child: String,
        at: usize,
    },
    Remove {
        parent: String,
        at: usize,
    },
    SetAttribute {
        target: String,
        key: AttributeKey,
        value: String,
    },
    AttributesDidSet {
        target: String,
    },
}

thread_local! {
    static OPS: RefCell<Vec<TargetOp>> = const { RefCell::new(Vec::new()) };
    static CREATED: Cell<usize> = const { Cell::new(0) };
    static DROPPED: Cell<usize> = const { Cell::new(0) };
}

/// Clears the op log and the creation counters.
pub fn reset_instrumentation() {
    OPS.with(|ops| ops.borrow_mut().clear());
    CREATED.with(|c| c.set(0));
    DROPPED.with(|c| c.set(0));
}

/// Takes every op recorded since the last drain.
pub fn drain_ops() -> Vec<TargetOp> {
    OPS.with(|ops| ops.borrow_mut().split_off(0))
}

/// Test targets constructed since the last reset.
pub fn targets_created() -> usize {
    CREATED.with(Cell::get)
}

/// Test targets dropped since the last reset.
pub fn targets_dropped() -> usize {
    DROPPED.with(Cell::get)
}

fn record(op: TargetOp) {
    OPS.with(|ops| ops.borrow_mut().push(op));
}

// --- The target -------------------------------------------------------------

/// A target node holding its children and attribute writes in memory.
pub struct TestTarget {
    name: &'static str,
    attributes: Vec<((AttributeKey, NodeKey), String)>,
    children: Vec<TargetHandle>,
    ready: bool,
}

impl TestTarget {
    pub fn new(name: &'static str) -> Self {
        CREATED.with(|c| c.set(c.get() + 1));
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            ready: false,
        }
    }

    pub fn shared(name: &'static str) -> Rc<RefCell<TestTarget>> {
        Rc::new(RefCell::new(Self::new(name)))
    }

    /// First recorded value for `key`, regardless of source.
    pub fn attribute(&self, key: AttributeKey) -> Option<&str> {
        self.attributes
            .iter()
            .find(|((k, _), _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every recorded value for `key`, one per contributing source.
    pub fn attribute_values(&self, key: AttributeKey) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|((k, _), _)| *k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Whether the post-creation hook has run.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> TargetHandle {
        self.children[index].clone()
    }

    /// `"Text(hello)"` style one-liner for this node.
    pub fn describe(&self) -> String {
        if self.attributes.is_empty() {
            self.name.to_string()
        } else {
            let values: Vec<&str> = self.attributes.iter().map(|(_, v)| v.as_str()).collect();
            format!("{}({})", self.name, values.join(", "))
        }
    }

    /// One-liners for the direct children, in tree order.
    pub fn child_descriptions(&self) -> Vec<String> {
        self.children
            .iter()
            .map(|child| {
                let child = child.borrow();
                match child.as_any().downcast_ref::<TestTarget>() {
                    Some(target) => target.describe(),
                    None => child.display_name().to_string(),
                }
            })
            .collect()
    }
}

impl TargetNode for TestTarget {
    fn display_name(&self) -> &str {
        self.name
    }

    fn insert_child(&mut self, child: TargetHandle, at: usize) {
        record(TargetOp::Insert {
            parent: self.name.to_string(),
            child: child.borrow().display_name().to_string(),
            at,
        });
        self.children.insert(at, child);
    }

    fn remove_child(&mut self, at: usize) {
        record(TargetOp::Remove {
            parent: self.name.to_string(),
            at,
        });
        self.children.remove(at);
    }

    fn set_attribute(&mut self, key: AttributeKey, source: NodeKey, value: &dyn Any) {
        let value = format_value(value);
        record(TargetOp::SetAttribute {
            target: self.name.to_string(),
            key,
            value: value.clone(),
        });
        match self
            .attributes
            .iter_mut()
            .find(|((k, s), _)| *k == key && *s == source)
        {
            Some((_, stored)) => *stored = value,
            None => self.attributes.push(((key, source), value)),
        }
    }

    fn attributes_did_set(&mut self) {
        record(TargetOp::AttributesDidSet {
            target: self.name.to_string(),
        });
        self.ready = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for TestTarget {
    fn drop(&mut self) {
        DROPPED.with(|c| c.set(c.get() + 1));
    }
}

/// Best-effort rendering of an erased attribute value.
fn format_value(value: &dyn Any) -> String {
    if let Some(s) = value.downcast_ref::<String>() {
        s.clone()
    } else if let Some(c) = value.downcast_ref::<Color>() {
        format!("{c:?}")
    } else if let Some(n) = value.downcast_ref::<i32>() {
        n.to_string()
    } else if let Some(n) = value.downcast_ref::<i64>() {
        n.to_string()
    } else if let Some(n) = value.downcast_ref::<u32>() {
        n.to_string()
    } else if let Some(n) = value.downcast_ref::<usize>() {
        n.to_string()
    } else if let Some(b) = value.downcast_ref::<bool>() {
        b.to_string()
    } else if let Some(f) = value.downcast_ref::<f64>() {
        f.to_string()
    } else {
        "<opaque>".to_string()
    }
}
