//! Expression dependency graph.
//!
//! Parsed expressions arrive from an external parser as nodes in an
//! [`ExprGraph`]. Each node exposes its immediate dependents and can have one
//! swapped through [`ExprGraph::replace`]; evaluators and optimizers use only
//! those two operations to walk and rewire the graph.

pub mod graph;
pub mod node;
pub mod span;

pub use graph::ExprGraph;
pub use node::{Arity, BinaryOp, ExprId, ExprKind, ExprNode, Function, UnaryOp};
pub use span::Span;
