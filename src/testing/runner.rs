//! Scripted driver around a mounted test hierarchy.

use std::cell::RefCell;
use std::rc::Rc;

use crate::driver::Root;
use crate::graph::UpdateSummary;
use crate::target::TargetHandle;
use crate::view::ViewValue;

use super::target::{reset_instrumentation, TestTarget};

/// Mounts a view into a fresh [`TestTarget`] container and exposes the
/// container for assertions. Creating a runner resets the thread-local
/// instrumentation, so op logs and counters cover exactly one scenario.
pub struct Runner {
    root: Root,
    container: Rc<RefCell<TestTarget>>,
}

impl Runner {
    pub fn mount<V: ViewValue>(view: V) -> Self {
        reset_instrumentation();
        let container = TestTarget::shared("Root");
        let root = Root::attached(view, container.clone() as TargetHandle);
        Self { root, container }
    }

    /// Runs an update pass with a fresh root value.
    pub fn update<V: ViewValue>(&mut self, view: V) -> UpdateSummary {
        self.root.update(view)
    }

    /// Runs an update pass with no fresh value.
    pub fn rerender(&mut self) -> UpdateSummary {
        self.root.rerender()
    }

    /// Mutation totals since the last drain (mounting included, until the
    /// first drain).
    pub fn summary(&self) -> UpdateSummary {
        self.root.drain_summary()
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn container(&self) -> Rc<RefCell<TestTarget>> {
        Rc::clone(&self.container)
    }

    /// One-line descriptions of the container's direct children.
    pub fn children(&self) -> Vec<String> {
        self.container.borrow().child_descriptions()
    }
}
