//! State-driven style cascade.
//!
//! - [`StateEngine`] / [`StateController`]: declared boolean states.
//! - [`StateExpression`]: boolean formulas over states, parsed from text by
//!   [`parse_state_expression`].
//! - [`StyleAttribute`]: typed attribute declarations and the built-ins.
//! - [`StyleSheet`]: shared rule containers.
//! - [`StatefulStyle`]: resolves attributes against the active states.

pub mod attribute;
pub mod expression;
pub mod parser;
pub mod sheet;
pub mod state;
pub mod stateful;

pub use attribute::{builtin, builtin_attributes, StyleAttribute};
pub use expression::{RuleSpecificity, StateExpression};
pub use parser::{parse_state_expression, ParseError};
pub use sheet::{MutableStyle, SheetEvent, Style, StyleRule, StyleSheet};
pub use state::{
    State, StateController, StateEngine, StateEvent, StateScope, StateSet, StateTransition,
};
pub use stateful::{StatefulStyle, StyleEvent};
