//! # trellis-ui
//!
//! A declarative UI core: immutable view values reconciled into a long-lived
//! target tree.
//!
//! trellis-ui keeps the familiar declarative model (views are cheap value
//! descriptions rebuilt on every render) while the framework maintains a
//! persistent node graph behind them. Each update diffs the new description
//! against the graph, skips equal subtrees, and emits the minimal set of
//! insertions, removals, moves, and attribute writes against the platform
//! target tree.
//!
//! ## Core Systems
//!
//! - **[`view`]**: the view value model. [`view::ViewValue`], type-erased
//!   [`view::AnyView`], structural [`view::Output`], and combinators
//!   (tuples, `Option`, [`view::Either`], [`view::ForEach`]).
//! - **[`graph`]**: slotmap-backed node graph with the reconciliation
//!   algorithm and keyed move planning.
//! - **[`environment`]**: typed ambient values flowing root-to-leaf, with
//!   change tracking and per-view read metadata.
//! - **[`bindings`]**: durable per-node storage for state cells and
//!   environment reads, matched by declaration order.
//! - **[`attributes`]**: attribute collection, downward merging, and
//!   change-gated application to targets.
//! - **[`target`]**: the platform-facing [`target::TargetNode`] trait.
//! - **[`driver`]**: [`driver::Root`] owns a graph and drives updates.
//! - **[`testing`]**: headless target tree, fixture views, and a scripted
//!   runner for tests.

// Foundation
pub mod attributes;
pub mod environment;
pub mod target;

// View values and the node graph
pub mod bindings;
pub mod graph;
pub mod view;

// Driving updates
pub mod driver;

// Test support
pub mod testing;
