//! The node graph and its reconciliation algorithm.
//!
//! The graph is the persistent half of the framework: one long-lived node
//! per view position, stored in a slotmap arena. An update pass walks the
//! graph with a fresh view value (or with nothing, meaning "unchanged, but
//! keep walking"), diffs each node against what it saw last time, and edits
//! the target tree through the handles it finds along the way.
//!
//! Positions are threaded as running totals of target counts: a node's
//! children contribute consecutive target positions starting at the node's
//! own incoming position, or at zero when the node owns a target itself.

mod context;
mod keyed;
mod node;

pub use context::{Context, UpdateStats, UpdateSummary};
pub use node::NodeKey;

pub(crate) use node::{Edges, Node};

use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::smallvec;

use crate::attributes::AttributeStash;
use crate::bindings::Bindings;
use crate::environment;
use crate::target::TargetHandle;
use crate::view::{AnyView, Key, Output};

/// The node arena. Shared behind `Rc<RefCell<_>>` so state cells can reach
/// back into it when they are written.
pub struct Graph {
    nodes: SlotMap<NodeKey, Node>,
    self_ref: Weak<RefCell<Graph>>,
}

impl Graph {
    pub(crate) fn new_shared() -> Rc<RefCell<Graph>> {
        let graph = Rc::new(RefCell::new(Graph {
            nodes: SlotMap::with_key(),
            self_ref: Weak::new(),
        }));
        graph.borrow_mut().self_ref = Rc::downgrade(&graph);
        graph
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn target_count(&self, key: NodeKey) -> usize {
        self.nodes[key].target_count
    }

    // --- Node creation ------------------------------------------------------

    /// Builds a fresh node for `value`, runs its first update pass, and only
    /// then attaches its target to the parent, so a half-built subtree is
    /// never visible in the target tree.
    pub(crate) fn create_node(
        &mut self,
        value: AnyView,
        target_position: usize,
        ctx: &Context,
    ) -> NodeKey {
        trace!(
            "creating {} at position {target_position}",
            value.display_name()
        );
        let target = value.make_target();
        let key = self.nodes.insert(Node::new(&value, target));
        self.update(key, Some(value), target_position, ctx, true);

        let target = self.nodes[key].target.clone();
        if let (Some(target), Some(parent)) = (target, ctx.parent_target.as_ref()) {
            parent.borrow_mut().insert_child(target, target_position);
            ctx.stats.record_insert();
        }
        key
    }

    // --- Update entry points ------------------------------------------------

    /// Updates an existing node, skipping the re-make when the node is
    /// stateful and nothing observable changed. Returns the subtree's
    /// target count.
    pub(crate) fn compare_and_update(
        &mut self,
        key: NodeKey,
        value: Option<AnyView>,
        target_position: usize,
        ctx: &Context,
    ) -> usize {
        if !self.nodes[key].stateful {
            return self.update(key, value, target_position, ctx, false);
        }
        match value {
            None => {
                // Nothing new from above, but a changed environment key this
                // node reads still forces a re-make from the stored value.
                let forced = self.environment_forces(key, ctx);
                if forced {
                    let stored = self.nodes[key].value.clone();
                    self.update(key, stored, target_position, ctx, false)
                } else {
                    self.update(key, None, target_position, ctx, false)
                }
            }
            Some(value) => {
                let forced =
                    ctx.state_changed || environment::should_update(&value, &ctx.changed_environment);
                let changed = self.nodes[key]
                    .value
                    .as_ref()
                    .map_or(true, |stored| !stored.value_eq(&value));
                if forced || changed {
                    self.update(key, Some(value), target_position, ctx, false)
                } else {
                    trace!("skipping equal {}", self.nodes[key].display_name);
                    self.update(key, None, target_position, ctx, false)
                }
            }
        }
    }

    fn environment_forces(&self, key: NodeKey, ctx: &Context) -> bool {
        self.nodes[key]
            .value
            .as_ref()
            .map_or(false, |v| environment::should_update(v, &ctx.changed_environment))
    }

    /// Re-runs a node's last update after one of its state cells changed.
    pub(crate) fn notify_state_change(&mut self, key: NodeKey) {
        let (value, ctx, position) = {
            let node = self
                .nodes
                .get(key)
                .expect("state write on a node that was removed from the graph");
            let value = node
                .value
                .clone()
                .expect("state write before the node's first update");
            let ctx = node
                .stored_context
                .clone()
                .expect("state write before the node's first update");
            (value, ctx.setting_state_change(), node.stored_position)
        };
        debug!(
            "state change re-renders {} at position {position}",
            self.nodes[key].display_name
        );
        self.update(key, Some(value), position, &ctx, false);
    }

    // --- The update pass ----------------------------------------------------

    /// One update pass over a node. `value` is the fresh description, or
    /// `None` to keep the stored one while still walking the edges. Returns
    /// the subtree's target count.
    fn update(
        &mut self,
        key: NodeKey,
        value: Option<AnyView>,
        target_position: usize,
        ctx: &Context,
        initial: bool,
    ) -> usize {
        trace!(
            "updating {} at position {target_position}",
            self.nodes[key].display_name
        );

        // Collect attributes and derive the environment seen below.
        let collected;
        let environment;
        let mut changed_environment;
        match &value {
            Some(v) => {
                if v.view_type() != self.nodes[key].view_type {
                    panic!(
                        "node {} was updated with a {} value; a position never changes type",
                        self.nodes[key].display_name,
                        v.display_name()
                    );
                }
                let mut stash = AttributeStash::new();
                v.collect_attributes(&mut stash);
                stash.assign_source(key);
                collected = stash;

                if let Some(setter) = v.environment_override() {
                    let node = &mut self.nodes[key];
                    let changed = match &node.env_prev {
                        Some(prev) => !(setter.eq)(prev.as_ref(), setter.value.as_ref()),
                        // First pass: nothing below has seen any value yet.
                        None => false,
                    };
                    node.env_key = Some(setter.key);
                    node.env_prev = Some(setter.value.clone());
                    environment = ctx.environment.with_erased(setter.key, setter.value);
                    changed_environment = ctx.changed_environment.clone();
                    changed_environment.mark(setter.key, changed);
                } else {
                    environment = ctx.environment.clone();
                    changed_environment = ctx.changed_environment.clone();
                }
            }
            None => {
                collected = self.nodes[key].collected.clone();
                environment = ctx.environment.clone();
                changed_environment = ctx.changed_environment.clone();
                // A setter updated without a new value keeps its override;
                // its own key cannot have changed underneath it.
                if let Some(env_key) = self.nodes[key].env_key {
                    changed_environment.reset(env_key);
                }
            }
        }

        // Merge pending attributes; a substantial node consumes them all.
        let pending = ctx.attributes.merge(&collected);
        let own_target = self.nodes[key].target.clone();
        let edge_attributes = match &own_target {
            Some(target) => {
                let previous = mem::take(&mut self.nodes[key].applied);
                let applied =
                    pending.apply_delta(&previous, target, || ctx.stats.record_attribute_set());
                self.nodes[key].applied = applied;
                AttributeStash::new()
            }
            None => pending,
        };

        // Expand the value, refreshing bound environment reads first.
        let output = match &value {
            Some(v) => {
                let mut store = mem::take(&mut self.nodes[key].bindings);
                store.refresh_environment(&environment, &changed_environment);
                let graph = self.self_ref.clone();
                let mut bindings = Bindings::new(&mut store, key, graph, &environment);
                let output = v.make(&mut bindings);
                bindings.finish();
                let claimed = !store.is_empty();
                self.nodes[key].bindings = store;
                // A node holding dynamic properties replays on state writes
                // and gates itself against the environment diff.
                if matches!(output, Output::Body(_)) || claimed || environment::declares_reads(v) {
                    self.nodes[key].stateful = true;
                }
                Some(output)
            }
            None => None,
        };

        let edges_ctx = Context {
            attributes: edge_attributes,
            state_changed: false,
            environment,
            changed_environment,
            parent_target: own_target.clone().or_else(|| ctx.parent_target.clone()),
            stats: ctx.stats.clone(),
        };
        // A node with its own target starts a fresh coordinate space.
        let edge_base = if own_target.is_some() { 0 } else { target_position };
        let edge_count = self.update_edges(key, output, edge_base, &edges_ctx);

        let node = &mut self.nodes[key];
        node.target_count = if node.target.is_some() { 1 } else { edge_count };
        if let Some(v) = value {
            node.value = Some(v);
            node.collected = collected;
        }
        if node.stateful {
            node.stored_context = Some(ctx.for_replay());
            node.stored_position = target_position;
        }
        let count = node.target_count;
        if initial {
            if let Some(target) = &node.target {
                target.borrow_mut().attributes_did_set();
            }
        }
        count
    }

    // --- Edges --------------------------------------------------------------

    fn update_edges(
        &mut self,
        key: NodeKey,
        output: Option<Output>,
        base: usize,
        ctx: &Context,
    ) -> usize {
        let edges = mem::replace(&mut self.nodes[key].edges, Edges::Uninit);
        let edges = match edges {
            Edges::Uninit => match &output {
                Some(out) => empty_edges_for(out),
                None => panic!(
                    "{} has no edges yet and no output to build them from",
                    self.nodes[key].display_name
                ),
            },
            other => other,
        };

        let (edges, count) = match edges {
            Edges::Uninit => unreachable!("uninitialized edges were just normalized"),
            Edges::Leaf => {
                if let Some(out) = &output {
                    self.check_kind(key, out, "leaf");
                }
                (Edges::Leaf, 0)
            }
            Edges::Body(slot) => {
                let child = match output {
                    Some(Output::Body(v)) => Some(v),
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "body"),
                };
                let (slot, count) = self.update_single(slot, child, base, ctx);
                (Edges::Body(slot), count)
            }
            Edges::Environment(slot) => {
                let child = match output {
                    Some(Output::Environment(v)) => Some(v),
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "environment"),
                };
                let (slot, count) = self.update_single(slot, child, base, ctx);
                (Edges::Environment(slot), count)
            }
            Edges::Static(slots) => {
                let children = match output {
                    Some(Output::Static(children)) => {
                        if children.len() != slots.len() {
                            panic!(
                                "{} produced {} static children, expected {}",
                                self.nodes[key].display_name,
                                children.len(),
                                slots.len()
                            );
                        }
                        Some(children)
                    }
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "static"),
                };
                let mut children = children.map(|c| c.into_iter().map(Some).collect::<Vec<_>>());
                let mut new_slots = smallvec![];
                let mut total = 0;
                for (i, slot) in slots.into_iter().enumerate() {
                    let child = children.as_mut().and_then(|c| c[i].take());
                    let (slot, count) = self.update_single(slot, child, base + total, ctx);
                    new_slots.push(slot);
                    total += count;
                }
                (Edges::Static(new_slots), total)
            }
            Edges::Optional(slot) => {
                let child = match output {
                    Some(Output::Optional(child)) => Some(child),
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "optional"),
                };
                match (slot, child) {
                    // Nothing from above: keep whatever is there.
                    (Some(existing), None) => {
                        let count = self.compare_and_update(existing, None, base, ctx);
                        (Edges::Optional(Some(existing)), count)
                    }
                    (None, None) | (None, Some(None)) => (Edges::Optional(None), 0),
                    (Some(existing), Some(Some(v))) => {
                        let count = self.compare_and_update(existing, Some(v), base, ctx);
                        (Edges::Optional(Some(existing)), count)
                    }
                    (None, Some(Some(v))) => {
                        let created = self.create_node(v, base, ctx);
                        let count = self.nodes[created].target_count;
                        (Edges::Optional(Some(created)), count)
                    }
                    (Some(existing), Some(None)) => {
                        self.remove_node(existing, base, ctx);
                        (Edges::Optional(None), 0)
                    }
                }
            }
            Edges::Either(slot) => {
                let incoming = match output {
                    Some(Output::Either(branch, v)) => Some((branch, v)),
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "either"),
                };
                match (slot, incoming) {
                    (Some((branch, existing)), None) => {
                        let count = self.compare_and_update(existing, None, base, ctx);
                        (Edges::Either(Some((branch, existing))), count)
                    }
                    (None, None) => panic!(
                        "conditional edge of {} has no output to build from",
                        self.nodes[key].display_name
                    ),
                    (Some((branch, existing)), Some((incoming_branch, v)))
                        if branch == incoming_branch =>
                    {
                        let count = self.compare_and_update(existing, Some(v), base, ctx);
                        (Edges::Either(Some((branch, existing))), count)
                    }
                    // Branch switch: tear the old side down, build the other
                    // from scratch at the same position.
                    (Some((_, existing)), Some((branch, v))) => {
                        self.remove_node(existing, base, ctx);
                        let created = self.create_node(v, base, ctx);
                        let count = self.nodes[created].target_count;
                        (Edges::Either(Some((branch, created))), count)
                    }
                    (None, Some((branch, v))) => {
                        let created = self.create_node(v, base, ctx);
                        let count = self.nodes[created].target_count;
                        (Edges::Either(Some((branch, created))), count)
                    }
                }
            }
            Edges::Keyed(entries) => {
                let incoming = match output {
                    Some(Output::Keyed(pairs)) => Some(pairs),
                    None => None,
                    Some(out) => self.kind_mismatch(key, &out, "keyed"),
                };
                match incoming {
                    None => {
                        let mut total = 0;
                        for (_, child) in &entries {
                            total += self.compare_and_update(*child, None, base + total, ctx);
                        }
                        (Edges::Keyed(entries), total)
                    }
                    Some(pairs) => self.reconcile_keyed(entries, pairs, base, ctx),
                }
            }
        };

        self.nodes[key].edges = edges;
        count
    }

    /// Shared logic for the single-child edge kinds.
    fn update_single(
        &mut self,
        slot: Option<NodeKey>,
        child: Option<AnyView>,
        position: usize,
        ctx: &Context,
    ) -> (Option<NodeKey>, usize) {
        match (slot, child) {
            (Some(existing), child) => {
                let count = self.compare_and_update(existing, child, position, ctx);
                (Some(existing), count)
            }
            (None, Some(v)) => {
                let created = self.create_node(v, position, ctx);
                (Some(created), self.nodes[created].target_count)
            }
            (None, None) => panic!("edge was never built and no output was provided"),
        }
    }

    fn check_kind(&self, key: NodeKey, output: &Output, expected: &str) {
        if output.kind_name() != expected {
            self.kind_mismatch::<()>(key, output, expected);
        }
    }

    fn kind_mismatch<T>(&self, key: NodeKey, output: &Output, expected: &str) -> T {
        panic!(
            "{} changed output kind from {expected} to {}; a node's shape is fixed",
            self.nodes[key].display_name,
            output.kind_name()
        )
    }

    // --- Keyed reconciliation -----------------------------------------------

    fn reconcile_keyed(
        &mut self,
        entries: Vec<(Key, NodeKey)>,
        pairs: Vec<(Key, AnyView)>,
        base: usize,
        ctx: &Context,
    ) -> (Edges, usize) {
        let mut wanted: FxHashSet<&Key> = FxHashSet::default();
        for (key, _) in &pairs {
            if !wanted.insert(key) {
                panic!("duplicate key {key} in keyed content");
            }
        }

        // Remove vanished entries back to front so earlier offsets hold.
        let mut offsets = Vec::with_capacity(entries.len());
        let mut offset = 0;
        for (_, node) in &entries {
            offsets.push(offset);
            offset += self.nodes[*node].target_count;
        }
        for (i, (key, node)) in entries.iter().enumerate().rev() {
            if !wanted.contains(key) {
                trace!("removing keyed entry {key}");
                self.remove_node(*node, base + offsets[i], ctx);
            }
        }
        let survivors: Vec<(Key, NodeKey)> = entries
            .into_iter()
            .filter(|(key, _)| wanted.contains(key))
            .collect();

        // Relocate out-of-order survivors with whole-subtree moves.
        let survivor_counts: Vec<(Key, usize)> = survivors
            .iter()
            .map(|(key, node)| (key.clone(), self.nodes[*node].target_count))
            .collect();
        let survivor_map: FxHashMap<Key, NodeKey> = survivors.into_iter().collect();
        let order: Vec<Key> = pairs
            .iter()
            .filter(|(key, _)| survivor_map.contains_key(key))
            .map(|(key, _)| key.clone())
            .collect();
        for op in keyed::plan_moves(&survivor_counts, &order) {
            if let Some(parent) = ctx.parent_target.as_ref() {
                let mut handles = Vec::with_capacity(op.count);
                self.collect_targets(survivor_map[&op.key], &mut handles);
                debug_assert_eq!(handles.len(), op.count);
                let mut parent = parent.borrow_mut();
                for _ in 0..op.count {
                    parent.remove_child(base + op.from);
                }
                for (i, handle) in handles.into_iter().enumerate() {
                    parent.insert_child(handle, base + op.to + i);
                }
                ctx.stats.record_move();
            }
        }

        // Walk the wanted order, updating survivors and creating the rest.
        let mut new_entries = Vec::with_capacity(pairs.len());
        let mut total = 0;
        for (key, view) in pairs {
            let position = base + total;
            match survivor_map.get(&key) {
                Some(&node) => {
                    total += self.compare_and_update(node, Some(view), position, ctx);
                    new_entries.push((key, node));
                }
                None => {
                    trace!("creating keyed entry {key}");
                    let node = self.create_node(view, position, ctx);
                    total += self.nodes[node].target_count;
                    new_entries.push((key, node));
                }
            }
        }
        (Edges::Keyed(new_entries), total)
    }

    // --- Removal ------------------------------------------------------------

    /// Detaches a subtree's targets from the nearest parent target and frees
    /// its nodes.
    fn remove_node(&mut self, key: NodeKey, position: usize, ctx: &Context) {
        trace!("removing {}", self.nodes[key].display_name);
        if let Some(parent) = ctx.parent_target.as_ref() {
            self.detach_targets(key, parent, position, ctx);
        }
        self.free_subtree(key);
    }

    /// Every top-level target of the subtree sits at the same index once its
    /// predecessors are gone, so each detaches at `position`.
    fn detach_targets(&self, key: NodeKey, parent: &TargetHandle, position: usize, ctx: &Context) {
        let node = &self.nodes[key];
        if node.target.is_some() {
            parent.borrow_mut().remove_child(position);
            ctx.stats.record_remove();
        } else {
            for child in node.edges.keys() {
                self.detach_targets(child, parent, position, ctx);
            }
        }
    }

    fn free_subtree(&mut self, key: NodeKey) {
        for child in self.nodes[key].edges.keys() {
            self.free_subtree(child);
        }
        self.nodes.remove(key);
    }

    /// Top-level target handles of a subtree, left to right.
    fn collect_targets(&self, key: NodeKey, out: &mut Vec<TargetHandle>) {
        let node = &self.nodes[key];
        match &node.target {
            Some(target) => out.push(target.clone()),
            None => {
                for child in node.edges.keys() {
                    self.collect_targets(child, out);
                }
            }
        }
    }
}

fn empty_edges_for(output: &Output) -> Edges {
    match output {
        Output::Body(_) => Edges::Body(None),
        Output::Static(children) => Edges::Static(smallvec![None; children.len()]),
        Output::Optional(_) => Edges::Optional(None),
        Output::Either(..) => Edges::Either(None),
        Output::Keyed(_) => Edges::Keyed(Vec::new()),
        Output::Environment(_) => Edges::Environment(None),
        Output::Leaf => Edges::Leaf,
    }
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::bindings::Bindings;
    use crate::driver::Root;
    use crate::testing::{Color, Column, MakeCounter, Rectangle, Runner, Text};
    use crate::view::{Output, ViewValue};

    #[test]
    fn node_counts_follow_the_structure() {
        // Option + Column + tuple + two texts.
        let mut runner = Runner::mount(Some(Column::new((Text::new("a"), Text::new("b")))));
        assert_eq!(runner.node_count(), 5);

        runner.update(None::<Column<(Text, Text)>>);
        assert_eq!(runner.node_count(), 1);
    }

    #[test]
    fn target_counts_collapse_at_substantial_nodes() {
        let flat = Root::new((Text::new("a"), Text::new("b")));
        assert_eq!(flat.target_count(), 2);

        let boxed = Root::new(Column::new((Text::new("a"), Text::new("b"))));
        assert_eq!(boxed.target_count(), 1);
    }

    /// Produces a different output kind on its second expansion.
    #[derive(Clone, PartialEq)]
    struct Shifty {
        calls: MakeCounter,
    }

    impl ViewValue for Shifty {
        fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
            self.calls.bump();
            if self.calls.count() == 1 {
                Output::Optional(Some(crate::view::AnyView::new(Rectangle::new(Color::Red))))
            } else {
                Output::Leaf
            }
        }

        fn value_eq(&self, _other: &Self) -> bool {
            false
        }
    }

    #[test]
    #[should_panic(expected = "changed output kind")]
    fn changing_output_kind_panics() {
        let shifty = Shifty {
            calls: MakeCounter::new(),
        };
        let mut runner = Runner::mount(shifty.clone());
        runner.update(shifty);
    }

    /// Produces a different static arity on its second expansion.
    #[derive(Clone, PartialEq)]
    struct Uneven {
        calls: MakeCounter,
    }

    impl ViewValue for Uneven {
        fn make(&self, _bindings: &mut Bindings<'_>) -> Output {
            self.calls.bump();
            let mut children = vec![crate::view::AnyView::new(Text::new("a"))];
            if self.calls.count() > 1 {
                children.push(crate::view::AnyView::new(Text::new("b")));
            }
            Output::Static(children)
        }

        fn value_eq(&self, _other: &Self) -> bool {
            false
        }
    }

    #[test]
    #[should_panic(expected = "static children")]
    fn changing_static_arity_panics() {
        let uneven = Uneven {
            calls: MakeCounter::new(),
        };
        let mut runner = Runner::mount(uneven.clone());
        runner.update(uneven);
    }
}
