//! Owning handle for a mounted view hierarchy.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::graph::{Context, Graph, NodeKey, UpdateSummary};
use crate::target::TargetHandle;
use crate::view::{AnyView, ViewValue};

/// Owns a graph and the root node of a mounted hierarchy, and drives update
/// passes into it. Dropping the root drops the whole graph; state cells that
/// outlive it panic on write.
pub struct Root {
    graph: Rc<RefCell<Graph>>,
    root: NodeKey,
    context: Context,
}

impl Root {
    /// Mounts `view` with no target container above it. Useful for graphs
    /// whose substantial nodes manage their own rendering.
    pub fn new<V: ViewValue>(view: V) -> Self {
        Self::build(AnyView::new(view), Context::root())
    }

    /// Mounts `view` inside `container`; top-level targets of the hierarchy
    /// become the container's children.
    pub fn attached<V: ViewValue>(view: V, container: TargetHandle) -> Self {
        Self::build(AnyView::new(view), Context::attached(container))
    }

    fn build(view: AnyView, context: Context) -> Self {
        debug!("mounting {}", view.display_name());
        let graph = Graph::new_shared();
        let root = graph.borrow_mut().create_node(view, 0, &context);
        Self {
            graph,
            root,
            context,
        }
    }

    /// Runs an update pass with a fresh root value. The value's concrete
    /// type must match the mounted one.
    ///
    /// Returns the mutation totals accumulated since the last drain,
    /// including state-change re-renders that happened in between.
    pub fn update<V: ViewValue>(&mut self, view: V) -> UpdateSummary {
        self.update_any(Some(AnyView::new(view)))
    }

    /// Runs an update pass without a fresh value, re-walking the hierarchy
    /// as "unchanged from above".
    pub fn rerender(&mut self) -> UpdateSummary {
        self.update_any(None)
    }

    pub fn update_any(&mut self, view: Option<AnyView>) -> UpdateSummary {
        self.graph
            .borrow_mut()
            .compare_and_update(self.root, view, 0, &self.context);
        self.drain_summary()
    }

    /// Mutation totals since the last drain.
    pub fn drain_summary(&self) -> UpdateSummary {
        self.context.stats.drain()
    }

    /// Number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.borrow().len()
    }

    /// Target children the hierarchy contributes to its container.
    pub fn target_count(&self) -> usize {
        self.graph.borrow().target_count(self.root)
    }
}
