//! The dependency graph: an arena of expression nodes.
//!
//! Parents own their dependents. A node may be shared by several parents
//! (the graph is a DAG, not a tree), so each node records who owns it. A node
//! with no owner is a root; rewiring with [`ExprGraph::replace`] can detach a
//! sub-expression, which then becomes a root until it is removed or reused.

use std::collections::HashSet;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{BinaryOp, ExprId, ExprKind, ExprNode, Function, UnaryOp};
use super::span::Span;
use crate::error::{Error, Result};
use crate::eval::value::{Value, ValueType};

const NO_NODES: &[ExprId] = &[];

/// Arena holding every node of one or more expressions.
#[derive(Debug, Default)]
pub struct ExprGraph {
    nodes: SlotMap<ExprId, ExprNode>,
    owners: SecondaryMap<ExprId, Vec<ExprId>>,
}

impl ExprGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            owners: SecondaryMap::new(),
        }
    }

    /// Insert a node owning `dependents`.
    ///
    /// Fails with `InvalidArgument` if the dependent count does not fit the
    /// kind or a dependent does not exist.
    pub fn insert(&mut self, kind: ExprKind, dependents: Vec<ExprId>, span: Span) -> Result<ExprId> {
        let arity = kind.arity();
        if !arity.accepts(dependents.len()) {
            return Err(Error::invalid_argument(format!(
                "{kind:?} takes {arity} dependents, got {}",
                dependents.len()
            )));
        }
        if let Some(missing) = dependents.iter().find(|&&d| !self.nodes.contains_key(d)) {
            return Err(Error::invalid_argument(format!(
                "dependent {missing:?} is not in the graph"
            )));
        }

        let id = self.nodes.insert(ExprNode::new(kind, dependents.clone(), span));
        self.owners.insert(id, Vec::new());
        for dep in dependents {
            self.add_owner(dep, id);
        }
        Ok(id)
    }

    pub fn literal(&mut self, value: impl Into<Value>) -> ExprId {
        self.insert_leaf(ExprKind::Literal(value.into()))
    }

    pub fn variable(&mut self, name: impl Into<String>) -> ExprId {
        self.insert_leaf(ExprKind::Variable(name.into()))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> Result<ExprId> {
        self.insert(ExprKind::Unary(op), vec![operand], Span::default())
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> Result<ExprId> {
        self.insert(ExprKind::Binary(op), vec![left, right], Span::default())
    }

    pub fn conditional(&mut self, condition: ExprId, then: ExprId, otherwise: ExprId) -> Result<ExprId> {
        self.insert(
            ExprKind::Conditional,
            vec![condition, then, otherwise],
            Span::default(),
        )
    }

    pub fn cast(&mut self, target: ValueType, operand: ExprId) -> Result<ExprId> {
        self.insert(ExprKind::Cast(target), vec![operand], Span::default())
    }

    pub fn call(&mut self, function: Function, args: Vec<ExprId>) -> Result<ExprId> {
        self.insert(ExprKind::Call(function), args, Span::default())
    }

    fn insert_leaf(&mut self, kind: ExprKind) -> ExprId {
        let id = self.nodes.insert(ExprNode::new(kind, Vec::new(), Span::default()));
        self.owners.insert(id, Vec::new());
        id
    }

    /// Immutable access to a node.
    pub fn get(&self, id: ExprId) -> Option<&ExprNode> {
        self.nodes.get(id)
    }

    /// Like [`ExprGraph::get`], failing with `InvalidArgument` for unknown ids.
    pub fn node(&self, id: ExprId) -> Result<&ExprNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::invalid_argument(format!("{id:?} is not in the graph")))
    }

    /// The exact current list of immediate dependents of `id`, in
    /// evaluation order. Empty for leaves and unknown ids.
    pub fn dependents(&self, id: ExprId) -> &[ExprId] {
        self.nodes.get(id).map(ExprNode::dependents).unwrap_or(NO_NODES)
    }

    /// Nodes currently owning `id`.
    pub fn owners(&self, id: ExprId) -> &[ExprId] {
        self.owners.get(id).map(Vec::as_slice).unwrap_or(NO_NODES)
    }

    /// Swap `dependent` for `replacement` in `parent`'s dependent list.
    ///
    /// Every occurrence is replaced; `parent` takes ownership of
    /// `replacement` and gives up `dependent`, whose id is returned. Fails
    /// with `InvalidArgument` if `dependent` is not currently a dependent of
    /// `parent`, if either node is unknown, or if the swap would make
    /// `parent` depend on itself.
    pub fn replace(&mut self, parent: ExprId, dependent: ExprId, replacement: ExprId) -> Result<ExprId> {
        if !self.nodes.contains_key(replacement) {
            return Err(Error::invalid_argument(format!(
                "replacement {replacement:?} is not in the graph"
            )));
        }
        if !self.node(parent)?.dependents().contains(&dependent) {
            return Err(Error::invalid_argument(format!(
                "{dependent:?} is not a dependent of {parent:?}"
            )));
        }
        if self.reaches(replacement, parent) {
            return Err(Error::invalid_argument(format!(
                "replacing {dependent:?} with {replacement:?} would make {parent:?} depend on itself"
            )));
        }
        if dependent == replacement {
            return Ok(dependent);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            for slot in node.dependents_mut().iter_mut() {
                if *slot == dependent {
                    *slot = replacement;
                }
            }
        }
        if let Some(owners) = self.owners.get_mut(dependent) {
            owners.retain(|&o| o != parent);
        }
        self.add_owner(replacement, parent);
        Ok(dependent)
    }

    /// Remove an unowned node and every dependent left without an owner.
    pub fn remove(&mut self, id: ExprId) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(Error::invalid_argument(format!("{id:?} is not in the graph")));
        }
        if !self.owners(id).is_empty() {
            return Err(Error::invalid_argument(format!(
                "{id:?} is still owned by {:?}",
                self.owners(id)
            )));
        }

        let mut to_remove = vec![id];
        while let Some(current) = to_remove.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            self.owners.remove(current);
            let mut seen = HashSet::new();
            for dep in node.dependents().iter().copied().filter(|d| seen.insert(*d)) {
                if let Some(owners) = self.owners.get_mut(dep) {
                    owners.retain(|&o| o != current);
                    if owners.is_empty() {
                        to_remove.push(dep);
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether `to` is `from` or transitively one of its dependents.
    pub fn reaches(&self, from: ExprId, to: ExprId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend_from_slice(self.dependents(current));
            }
        }
        false
    }

    /// Pre-order depth-first traversal from `start`. Shared nodes are
    /// visited once.
    pub fn walk_depth_first(&self, start: ExprId) -> Vec<ExprId> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) || !seen.insert(current) {
                continue;
            }
            result.push(current);
            // Push in reverse so the first dependent is visited first.
            for &dep in self.dependents(current).iter().rev() {
                stack.push(dep);
            }
        }
        result
    }

    /// Nodes nobody owns.
    pub fn roots(&self) -> Vec<ExprId> {
        self.nodes
            .keys()
            .filter(|&id| self.owners(id).is_empty())
            .collect()
    }

    pub fn contains(&self, id: ExprId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add_owner(&mut self, node: ExprId, owner: ExprId) {
        if let Some(owners) = self.owners.get_mut(node) {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `(x + 1) * y`
    fn build() -> (ExprGraph, ExprId, ExprId, ExprId, ExprId, ExprId) {
        let mut g = ExprGraph::new();
        let x = g.variable("x");
        let one = g.literal(1);
        let sum = g.binary(BinaryOp::Add, x, one).unwrap();
        let y = g.variable("y");
        let product = g.binary(BinaryOp::Mul, sum, y).unwrap();
        (g, x, one, sum, y, product)
    }

    #[test]
    fn dependents_in_order() {
        let (g, x, one, sum, y, product) = build();
        assert_eq!(g.dependents(product), &[sum, y]);
        assert_eq!(g.dependents(sum), &[x, one]);
        assert!(g.dependents(x).is_empty());
        assert_eq!(g.owners(sum), &[product]);
        assert_eq!(g.roots(), vec![product]);
        assert_eq!(g.len(), 5);
    }

    #[test]
    fn insert_rejects_wrong_arity() {
        let mut g = ExprGraph::new();
        let a = g.literal(1);
        let err = g.insert(ExprKind::Binary(BinaryOp::Add), vec![a], Span::default());
        assert!(matches!(err, Err(Error::InvalidArgument { .. })));
        assert!(g.call(Function::Max, vec![]).is_err());
    }

    #[test]
    fn insert_rejects_unknown_dependent() {
        let mut g = ExprGraph::new();
        let a = g.literal(1);
        g.remove(a).unwrap();
        assert!(g.unary(UnaryOp::Neg, a).is_err());
    }

    #[test]
    fn replace_swaps_dependent() {
        let (mut g, _x, one, sum, _y, _product) = build();
        let two = g.literal(2);
        let detached = g.replace(sum, one, two).unwrap();
        assert_eq!(detached, one);
        assert_eq!(g.dependents(sum)[1], two);
        assert!(g.owners(one).is_empty());
        assert_eq!(g.owners(two), &[sum]);
        assert!(g.roots().contains(&one));
    }

    #[test]
    fn replace_rejects_non_dependent() {
        let (mut g, _x, _one, sum, y, _product) = build();
        let z = g.literal(0);
        let err = g.replace(sum, y, z).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        // Graph untouched.
        assert_eq!(g.owners(y).len(), 1);
    }

    #[test]
    fn replace_rejects_cycle() {
        let (mut g, x, _one, sum, _y, product) = build();
        assert!(g.replace(sum, x, product).is_err());
        assert!(g.replace(sum, x, sum).is_err());
    }

    #[test]
    fn replace_all_occurrences() {
        let mut g = ExprGraph::new();
        let x = g.variable("x");
        let double = g.binary(BinaryOp::Add, x, x).unwrap();
        let y = g.variable("y");
        g.replace(double, x, y).unwrap();
        assert_eq!(g.dependents(double), &[y, y]);
        assert!(g.owners(x).is_empty());
    }

    #[test]
    fn remove_prunes_orphans() {
        let (mut g, x, one, sum, y, product) = build();
        assert!(g.remove(sum).is_err(), "owned nodes cannot be removed");
        g.remove(product).unwrap();
        for id in [x, one, sum, y, product] {
            assert!(!g.contains(id));
        }
        assert!(g.is_empty());
    }

    #[test]
    fn remove_keeps_shared_nodes() {
        let mut g = ExprGraph::new();
        let x = g.variable("x");
        let a = g.unary(UnaryOp::Neg, x).unwrap();
        let b = g.unary(UnaryOp::Neg, x).unwrap();
        g.remove(a).unwrap();
        assert!(g.contains(x));
        assert_eq!(g.owners(x), &[b]);
    }

    #[test]
    fn walk_visits_shared_once() {
        let mut g = ExprGraph::new();
        let x = g.variable("x");
        let a = g.unary(UnaryOp::Neg, x).unwrap();
        let sum = g.binary(BinaryOp::Add, a, x).unwrap();
        assert_eq!(g.walk_depth_first(sum), vec![sum, a, x]);
        assert!(g.reaches(sum, x));
        assert!(!g.reaches(x, sum));
    }
}
