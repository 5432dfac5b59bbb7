//! Spring layout over named edges.
//!
//! Edges are positions along one axis. Two of them belong to the container:
//! [`SpringLayoutSolver::origin`] is pinned at 0 and
//! [`SpringLayoutSolver::extent`] at the available size. Springs connect a
//! `from` edge to a `to` edge; the spring's size is the distance between them.
//!
//! Solving happens in two phases:
//!
//! 1. **Seeding**: edges are visited in topological order and placed at the
//!    longest preferred distance from the origin; the surplus (or deficit)
//!    between the preferred length and the available size is spread along
//!    each path in proportion to accumulated flexibility.
//! 2. **Relaxation**: Gauss-Seidel sweeps move each free edge to where the
//!    tensions of its springs balance, until no edge moves more than the
//!    configured epsilon or the sweep cap is hit. Hitting the cap is not an
//!    error: the best positions found are returned with a diagnostic.

use std::collections::VecDeque;

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use tracing::{debug, warn};

use super::spring::{TensionSpring, MAX_SIZE};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};

new_key_type! {
    /// A position along the layout axis.
    pub struct EdgeId;
    /// A spring between two edges.
    pub struct SpringId;
}

#[derive(Debug, Clone)]
struct Edge {
    name: String,
}

#[derive(Debug, Clone)]
struct Connection {
    from: EdgeId,
    to: EdgeId,
    spring: TensionSpring,
}

/// Size assigned to one spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringResult {
    /// Distance between the spring's edges, never below the spring minimum.
    pub size: f64,
    /// How far the edges fell short of the minimum. Zero when it fits.
    pub overflow: f64,
}

/// Why a solution is only approximate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutDiagnostic {
    /// The sweep cap was reached; `residual` is the largest edge movement in
    /// the final sweep.
    IterationCapReached { iterations: usize, residual: f64 },
}

/// Output of [`SpringLayoutSolver::layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSolution {
    positions: SecondaryMap<EdgeId, f64>,
    springs: SecondaryMap<SpringId, SpringResult>,
    pub iterations: usize,
    pub diagnostic: Option<LayoutDiagnostic>,
}

impl LayoutSolution {
    pub fn position(&self, edge: EdgeId) -> Option<f64> {
        self.positions.get(edge).copied()
    }

    pub fn spring(&self, spring: SpringId) -> Option<SpringResult> {
        self.springs.get(spring).copied()
    }

    /// Whether any spring was squeezed below its minimum.
    pub fn has_overflow(&self) -> bool {
        self.springs.values().any(|s| s.overflow > 0.0)
    }

    pub fn is_converged(&self) -> bool {
        self.diagnostic.is_none()
    }
}

/// Solves edge positions for a set of springs.
#[derive(Debug, Clone)]
pub struct SpringLayoutSolver {
    config: LayoutConfig,
    edges: SlotMap<EdgeId, Edge>,
    springs: SlotMap<SpringId, Connection>,
    origin: EdgeId,
    extent: EdgeId,
}

impl Default for SpringLayoutSolver {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl SpringLayoutSolver {
    pub fn new(config: LayoutConfig) -> Self {
        let mut edges = SlotMap::with_key();
        let origin = edges.insert(Edge {
            name: "origin".into(),
        });
        let extent = edges.insert(Edge {
            name: "extent".into(),
        });
        Self {
            config,
            edges,
            springs: SlotMap::with_key(),
            origin,
            extent,
        }
    }

    /// The container's leading edge, pinned at 0.
    pub fn origin(&self) -> EdgeId {
        self.origin
    }

    /// The container's trailing edge, pinned at the available size.
    pub fn extent(&self) -> EdgeId {
        self.extent
    }

    pub fn add_edge(&mut self, name: impl Into<String>) -> EdgeId {
        self.edges.insert(Edge { name: name.into() })
    }

    pub fn edge_name(&self, edge: EdgeId) -> Option<&str> {
        self.edges.get(edge).map(|e| e.name.as_str())
    }

    /// Connect `from` to `to` with `spring`.
    pub fn connect(&mut self, from: EdgeId, to: EdgeId, spring: TensionSpring) -> Result<SpringId> {
        for edge in [from, to] {
            if !self.edges.contains_key(edge) {
                return Err(Error::invalid_argument(format!("unknown edge {edge:?}")));
            }
        }
        if from == to {
            return Err(Error::invalid_argument("a spring cannot connect an edge to itself"));
        }
        Ok(self.springs.insert(Connection { from, to, spring }))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Solve for `available` units between origin and extent.
    ///
    /// Fails if `available` is not finite or the springs form a cycle.
    /// Repeated calls with the same input give identical solutions.
    pub fn layout(&self, available: f64) -> Result<LayoutSolution> {
        if !available.is_finite() {
            return Err(Error::invalid_argument(format!(
                "available space must be finite, got {available}"
            )));
        }
        let available = available.clamp(0.0, MAX_SIZE);
        let order = self.topological_order()?;
        let mut positions = self.seed(&order, available);

        let epsilon = f64::from(self.config.epsilon);
        let mut iterations = 0;
        let mut residual = 0.0;
        let free: Vec<EdgeId> = order
            .iter()
            .copied()
            .filter(|&e| e != self.origin && e != self.extent)
            .collect();

        while iterations < self.config.max_iterations {
            iterations += 1;
            residual = 0.0f64;
            for &edge in &free {
                let current = positions[edge];
                let Some(next) = self.balance(edge, &positions, available) else {
                    continue;
                };
                residual = residual.max((next - current).abs());
                positions[edge] = next;
            }
            if residual < epsilon {
                break;
            }
        }

        let diagnostic = if residual >= epsilon && !free.is_empty() {
            warn!(iterations, residual, "spring layout hit the iteration cap");
            Some(LayoutDiagnostic::IterationCapReached {
                iterations,
                residual,
            })
        } else {
            debug!(iterations, residual, edges = self.edges.len(), "spring layout converged");
            None
        };

        let springs = self
            .springs
            .iter()
            .map(|(id, c)| {
                let distance = positions[c.to] - positions[c.from];
                let min = c.spring.min();
                let result = SpringResult {
                    size: distance.max(min),
                    overflow: (min - distance).max(0.0),
                };
                (id, result)
            })
            .collect();

        Ok(LayoutSolution {
            positions,
            springs,
            iterations,
            diagnostic,
        })
    }

    /// Edges ordered so every spring's `from` precedes its `to`.
    fn topological_order(&self) -> Result<Vec<EdgeId>> {
        let mut incoming: SecondaryMap<EdgeId, usize> =
            self.edges.keys().map(|e| (e, 0)).collect();
        for c in self.springs.values() {
            incoming[c.to] += 1;
        }
        let mut ready: VecDeque<EdgeId> = self
            .edges
            .keys()
            .filter(|&e| incoming[e] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(edge) = ready.pop_front() {
            order.push(edge);
            for c in self.springs.values().filter(|c| c.from == edge) {
                incoming[c.to] -= 1;
                if incoming[c.to] == 0 {
                    ready.push_back(c.to);
                }
            }
        }
        if order.len() != self.edges.len() {
            return Err(Error::invalid_argument("springs form a cycle"));
        }
        Ok(order)
    }

    /// Initial positions: preferred lengths along the longest path, with the
    /// surplus spread by flexibility.
    fn seed(&self, order: &[EdgeId], available: f64) -> SecondaryMap<EdgeId, f64> {
        let mut pref: SecondaryMap<EdgeId, f64> = SecondaryMap::new();
        let mut flex: SecondaryMap<EdgeId, f64> = SecondaryMap::new();
        for &edge in order {
            let (p, f) = self
                .springs
                .values()
                .filter(|c| c.to == edge)
                .map(|c| {
                    (
                        pref[c.from] + c.spring.pref(),
                        flex[c.from] + c.spring.flexibility().min(available),
                    )
                })
                .fold((0.0f64, 0.0f64), |(bp, bf), (p, f)| {
                    if p > bp || (p == bp && f > bf) {
                        (p, f)
                    } else {
                        (bp, bf)
                    }
                });
            pref.insert(edge, p);
            flex.insert(edge, f);
        }

        let surplus = available - pref[self.extent];
        let total_flex = flex[self.extent];
        let mut positions = SecondaryMap::new();
        for &edge in order {
            let position = if edge == self.origin {
                0.0
            } else if edge == self.extent {
                available
            } else if total_flex > 0.0 {
                pref[edge] + surplus * (flex[edge] / total_flex).min(1.0)
            } else {
                pref[edge]
            };
            positions.insert(edge, position);
        }
        positions
    }

    /// Where `edge` should move so its springs' tensions cancel. `None` for
    /// edges without springs.
    fn balance(
        &self,
        edge: EdgeId,
        positions: &SecondaryMap<EdgeId, f64>,
        available: f64,
    ) -> Option<f64> {
        let attached: Vec<&Connection> = self
            .springs
            .values()
            .filter(|c| c.from == edge || c.to == edge)
            .collect();
        if attached.is_empty() {
            return None;
        }

        // Positive net force pushes the edge forward; it never increases as
        // the edge moves forward.
        let net = |x: f64| -> f64 {
            attached
                .iter()
                .map(|c| {
                    if c.to == edge {
                        c.spring.get_tension(x - positions[c.from])
                    } else {
                        -c.spring.get_tension(positions[c.to] - x)
                    }
                })
                .sum()
        };

        let neighbours = attached
            .iter()
            .map(|c| if c.to == edge { positions[c.from] } else { positions[c.to] });
        let start = (positions[edge].min(0.0), positions[edge].max(available));
        let (mut lo, mut hi) = neighbours.fold(start, |(lo, hi), p| (lo.min(p), hi.max(p)));
        lo -= available.max(1.0);
        hi += available.max(1.0);

        if net(lo) <= 0.0 {
            return Some(lo);
        }
        if net(hi) >= 0.0 {
            return Some(hi);
        }
        for _ in 0..100 {
            let mid = lo + (hi - lo) / 2.0;
            if mid == lo || mid == hi {
                break;
            }
            let force = net(mid);
            if force > 0.0 {
                lo = mid;
            } else if force < 0.0 {
                hi = mid;
            } else {
                return Some(mid);
            }
        }
        Some(lo + (hi - lo) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spring(min: f64, pref: f64, max: f64) -> TensionSpring {
        TensionSpring::build(min, max, pref).build().unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.05
    }

    #[test]
    fn single_spring_fills_available_space() {
        let mut solver = SpringLayoutSolver::default();
        let s = solver
            .connect(solver.origin(), solver.extent(), spring(0.0, 50.0, 200.0))
            .unwrap();
        let solution = solver.layout(120.0).unwrap();
        assert_eq!(solution.spring(s).unwrap().size, 120.0);
        assert!(solution.is_converged());
    }

    #[test]
    fn equal_springs_share_equally() {
        let mut solver = SpringLayoutSolver::default();
        let mid = solver.add_edge("mid");
        let a = solver.connect(solver.origin(), mid, spring(0.0, 20.0, 100.0)).unwrap();
        let b = solver.connect(mid, solver.extent(), spring(0.0, 20.0, 100.0)).unwrap();
        let solution = solver.layout(60.0).unwrap();
        assert!(close(solution.position(mid).unwrap(), 30.0));
        assert!(close(solution.spring(a).unwrap().size, 30.0));
        assert!(close(solution.spring(b).unwrap().size, 30.0));
    }

    #[test]
    fn preferred_sizes_when_they_fit_exactly() {
        let mut solver = SpringLayoutSolver::default();
        let mid = solver.add_edge("mid");
        solver.connect(solver.origin(), mid, spring(0.0, 30.0, 100.0)).unwrap();
        solver.connect(mid, solver.extent(), spring(0.0, 70.0, 100.0)).unwrap();
        let solution = solver.layout(100.0).unwrap();
        assert!(close(solution.position(mid).unwrap(), 30.0));
    }

    #[test]
    fn fixed_spring_keeps_its_size() {
        let mut solver = SpringLayoutSolver::default();
        let mid = solver.add_edge("mid");
        let fixed = solver
            .connect(solver.origin(), mid, TensionSpring::fixed(10.0).unwrap())
            .unwrap();
        solver.connect(mid, solver.extent(), spring(0.0, 10.0, 500.0)).unwrap();
        let solution = solver.layout(80.0).unwrap();
        assert!(close(solution.spring(fixed).unwrap().size, 10.0));
    }

    #[test]
    fn too_little_space_reports_overflow() {
        let mut solver = SpringLayoutSolver::default();
        let s = solver
            .connect(solver.origin(), solver.extent(), spring(50.0, 60.0, 80.0))
            .unwrap();
        let solution = solver.layout(20.0).unwrap();
        let result = solution.spring(s).unwrap();
        assert_eq!(result.size, 50.0);
        assert_eq!(result.overflow, 30.0);
        assert!(solution.has_overflow());
    }

    #[test]
    fn layout_is_idempotent() {
        let mut solver = SpringLayoutSolver::default();
        let a = solver.add_edge("a");
        let b = solver.add_edge("b");
        solver.connect(solver.origin(), a, spring(0.0, 7.0, 40.0)).unwrap();
        solver.connect(a, b, spring(5.0, 13.0, 90.0)).unwrap();
        solver.connect(b, solver.extent(), spring(0.0, 3.0, 11.0)).unwrap();
        let first = solver.layout(77.7).unwrap();
        let second = solver.layout(77.7).unwrap();
        assert_eq!(first, second);
        let bits = |s: &LayoutSolution| s.position(a).map(f64::to_bits);
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut solver = SpringLayoutSolver::default();
        let a = solver.add_edge("a");
        let b = solver.add_edge("b");
        solver.connect(a, b, spring(0.0, 1.0, 2.0)).unwrap();
        solver.connect(b, a, spring(0.0, 1.0, 2.0)).unwrap();
        assert!(matches!(solver.layout(10.0), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn non_finite_space_is_rejected() {
        let mut solver = SpringLayoutSolver::default();
        let mid = solver.add_edge("mid");
        solver.connect(solver.origin(), mid, spring(0.0, 10.0, 40.0)).unwrap();
        solver.connect(mid, solver.extent(), spring(0.0, 10.0, 40.0)).unwrap();
        for available in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                solver.layout(available),
                Err(Error::InvalidArgument { .. })
            ));
        }
        assert!(solver.layout(20.0).is_ok());
    }

    #[test]
    fn unknown_or_self_edges_are_rejected() {
        let mut solver = SpringLayoutSolver::default();
        let mut other = SpringLayoutSolver::default();
        let foreign = other.add_edge("foreign");
        let origin = solver.origin();
        assert!(solver.connect(origin, origin, spring(0.0, 1.0, 2.0)).is_err());
        assert!(solver.connect(origin, foreign, spring(0.0, 1.0, 2.0)).is_err());
    }

    #[test]
    fn iteration_cap_yields_a_diagnostic() {
        let config = LayoutConfig::new().with_max_iterations(1).with_epsilon(1e-9);
        let mut solver = SpringLayoutSolver::new(config);
        let a = solver.add_edge("a");
        let b = solver.add_edge("b");
        solver.connect(solver.origin(), a, spring(0.0, 10.0, 100.0)).unwrap();
        solver.connect(a, b, spring(0.0, 40.0, 100.0)).unwrap();
        solver.connect(b, solver.extent(), spring(0.0, 10.0, 100.0)).unwrap();
        let solution = solver.layout(90.0).unwrap();
        assert_eq!(solution.iterations, 1);
        assert!(matches!(
            solution.diagnostic,
            Some(LayoutDiagnostic::IterationCapReached { iterations: 1, .. })
        ));
    }

    #[test]
    fn empty_solver_pins_container_edges() {
        let solver = SpringLayoutSolver::default();
        let solution = solver.layout(42.0).unwrap();
        assert_eq!(solution.position(solver.origin()), Some(0.0));
        assert_eq!(solution.position(solver.extent()), Some(42.0));
        assert_eq!(solution.iterations, 1);
        assert!(solution.is_converged());
    }
}
