//! # muis
//!
//! The reactive core of a declarative UI toolkit: observable expressions,
//! a state-driven style cascade, and spring-based layout.
//!
//! Changes flow one way. A widget flips a state, the style cascade
//! re-resolves the attributes whose rules mention it, expressions reading
//! those values recompute incrementally, and the spring layout turns the
//! resolved sizes into bounds. Every change carries a [`reactive::Cause`]
//! linking it to the event that started it.
//!
//! ## Core Systems
//!
//! - **[`reactive`]**: Observables, causal chains, revocable subscriptions
//! - **[`expr`]**: Expression dependency graph with `dependents` / `replace`
//! - **[`eval`]**: Values, environments, evaluators, incremental observable evaluation
//! - **[`style`]**: States, state expressions, style sheets, the stateful cascade
//! - **[`layout`]**: Tension springs, series/parallel composition, solver, box layout
//! - **[`animation`]**: Animation queue with a background driver thread
//! - **[`dom`]**: Element tree, element registry, per-element state and style
//! - **[`geometry`]**: Axis, Size, Region primitives
//! - **[`config`]**: Layout and animation configuration
//! - **[`error`]**: Crate error type

// Foundation
pub mod config;
pub mod error;
pub mod geometry;

// Reactivity and evaluation
pub mod eval;
pub mod expr;
pub mod reactive;

// Style and layout
pub mod layout;
pub mod style;

// Document
pub mod animation;
pub mod dom;

pub use error::{Error, Result};
