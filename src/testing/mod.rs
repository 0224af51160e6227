//! Headless test support.
//!
//! [`TestTarget`] is an in-memory target tree that records every mutation
//! in a thread-local op log, so tests can assert exactly what an update
//! pass did. [`Runner`] mounts a view into a fresh container and wraps the
//! driver with assertion-friendly accessors. The fixtures are small views
//! (text, rectangles, columns) covering each output shape.

mod fixtures;
mod runner;
mod target;

pub use fixtures::{keys, Color, Column, MakeCounter, Probe, Rectangle, Text};
pub use runner::Runner;
pub use target::{
    drain_ops, reset_instrumentation, targets_created, targets_dropped, TargetOp, TestTarget,
};
