//! Spring-based layout: tension springs, their series and parallel
//! composition, the edge solver, and the one-axis box layout.

pub mod boxes;
pub mod solver;
pub mod spring;

pub use boxes::{BoxChild, BoxLayout, BoxLayoutResult};
pub use solver::{EdgeId, LayoutDiagnostic, LayoutSolution, SpringId, SpringLayoutSolver, SpringResult};
pub use spring::{
    ParallelSpring, SeriesSpring, TensionSpring, TensionSpringBuilder, Tick, TickIterator, MAX_SIZE,
    MAX_TENSION, PREF_TENSION,
};
