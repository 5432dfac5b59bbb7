//! Expression node types: ExprId, ExprKind, ExprNode.
//!
//! Node kinds are tagged variants rather than one type per expression form.
//! Operands are not stored in the kind; they are the node's ordered list of
//! dependents, which is the only structure higher layers walk.

use std::fmt;

use slotmap::new_key_type;

use super::span::Span;
use crate::eval::value::{Value, ValueType};

new_key_type! {
    /// Identity of an expression node. Stable for the life of its graph.
    pub struct ExprId;
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Built-in functions callable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Min,
    Max,
    Abs,
    /// `clamp(value, low, high)`
    Clamp,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Clamp => "clamp",
        }
    }
}

/// How many dependents a node kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// The tag of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A constant.
    Literal(Value),
    /// A name looked up in the evaluation environment.
    Variable(String),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `condition ? then : else`
    Conditional,
    /// Explicit conversion of the single dependent.
    Cast(ValueType),
    Call(Function),
}

impl ExprKind {
    pub fn arity(&self) -> Arity {
        match self {
            ExprKind::Literal(_) | ExprKind::Variable(_) => Arity::Exact(0),
            ExprKind::Unary(_) | ExprKind::Cast(_) => Arity::Exact(1),
            ExprKind::Binary(_) => Arity::Exact(2),
            ExprKind::Conditional => Arity::Exact(3),
            ExprKind::Call(Function::Abs) => Arity::Exact(1),
            ExprKind::Call(Function::Clamp) => Arity::Exact(3),
            ExprKind::Call(Function::Min | Function::Max) => Arity::AtLeast(1),
        }
    }

    /// Whether this kind never has dependents.
    pub fn is_leaf(&self) -> bool {
        matches!(self, ExprKind::Literal(_) | ExprKind::Variable(_))
    }
}

/// A parsed syntax node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    kind: ExprKind,
    dependents: Vec<ExprId>,
    span: Span,
}

impl ExprNode {
    pub(crate) fn new(kind: ExprKind, dependents: Vec<ExprId>, span: Span) -> Self {
        Self {
            kind,
            dependents,
            span,
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Immediate sub-expressions, in evaluation order.
    pub fn dependents(&self) -> &[ExprId] {
        &self.dependents
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub(crate) fn dependents_mut(&mut self) -> &mut Vec<ExprId> {
        &mut self.dependents
    }
}
