//! Boolean formulas over named states, and rule specificity.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::parser;
use super::state::StateSet;
use crate::error::Error;

/// A condition a style rule applies under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateExpression {
    /// Unconditional.
    Always,
    /// True while the named state is active.
    State(String),
    Not(Box<StateExpression>),
    And(Box<StateExpression>, Box<StateExpression>),
    Or(Box<StateExpression>, Box<StateExpression>),
}

impl StateExpression {
    pub fn state(name: impl Into<String>) -> Self {
        StateExpression::State(name.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        StateExpression::Not(Box::new(self))
    }

    pub fn and(self, other: StateExpression) -> Self {
        StateExpression::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: StateExpression) -> Self {
        StateExpression::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against a snapshot. Undeclared states read as inactive.
    pub fn evaluate(&self, states: &StateSet) -> bool {
        match self {
            StateExpression::Always => true,
            StateExpression::State(name) => states.is_active(name),
            StateExpression::Not(inner) => !inner.evaluate(states),
            StateExpression::And(a, b) => a.evaluate(states) && b.evaluate(states),
            StateExpression::Or(a, b) => a.evaluate(states) || b.evaluate(states),
        }
    }

    /// Every state name the expression mentions.
    pub fn state_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            StateExpression::Always => {}
            StateExpression::State(name) => {
                names.insert(name.as_str());
            }
            StateExpression::Not(inner) => inner.collect_names(names),
            StateExpression::And(a, b) | StateExpression::Or(a, b) => {
                a.collect_names(names);
                b.collect_names(names);
            }
        }
    }

    /// Whether every referenced state is declared in `states`. Rules whose
    /// expression is not live never match.
    pub fn is_live(&self, states: &StateSet) -> bool {
        self.state_names()
            .into_iter()
            .all(|name| states.is_declared(name))
    }

    /// Whether the expression is live and true.
    pub fn matches(&self, states: &StateSet) -> bool {
        self.is_live(states) && self.evaluate(states)
    }

    /// Specificity of a rule under this expression, given its source order.
    pub fn specificity(&self, states: &StateSet, source_order: u32) -> RuleSpecificity {
        let names = self.state_names();
        let priority = names
            .iter()
            .map(|name| i64::from(states.priority(name).unwrap_or(0)))
            .sum();
        RuleSpecificity {
            state_count: u16::try_from(names.len()).unwrap_or(u16::MAX),
            priority,
            source_order,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        let own = self.precedence();
        if own < parent {
            f.write_str("(")?;
        }
        match self {
            StateExpression::Always => f.write_str("true")?,
            StateExpression::State(name) => f.write_str(name)?,
            StateExpression::Not(inner) => {
                f.write_str("!")?;
                inner.fmt_prec(f, own)?;
            }
            StateExpression::And(a, b) => {
                a.fmt_prec(f, own)?;
                f.write_str(" & ")?;
                b.fmt_prec(f, own + 1)?;
            }
            StateExpression::Or(a, b) => {
                a.fmt_prec(f, own)?;
                f.write_str(" | ")?;
                b.fmt_prec(f, own + 1)?;
            }
        }
        if own < parent {
            f.write_str(")")?;
        }
        Ok(())
    }

    fn precedence(&self) -> u8 {
        match self {
            StateExpression::Or(..) => 1,
            StateExpression::And(..) => 2,
            StateExpression::Not(_) => 3,
            StateExpression::Always | StateExpression::State(_) => 4,
        }
    }
}

impl fmt::Display for StateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

impl FromStr for StateExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parser::parse_state_expression(s)?)
    }
}

// ---------------------------------------------------------------------------
// Specificity
// ---------------------------------------------------------------------------

/// Ordering among matching rules of one sheet.
///
/// Fields are ordered so that `Ord` (lexicographic) picks the winner: more
/// referenced states first, then higher total state priority, then the later
/// rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RuleSpecificity {
    pub state_count: u16,
    pub priority: i64,
    pub source_order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::state::State;

    fn states(entries: &[(&str, i32, bool)]) -> StateSet {
        entries
            .iter()
            .fold(StateSet::new(), |set, (name, priority, active)| {
                set.with(&State::new(*name, *priority), *active)
            })
    }

    #[test]
    fn evaluates_formulas() {
        let set = states(&[("pressed", 0, true), ("hover", 0, false)]);
        let expr = StateExpression::state("pressed").and(StateExpression::state("hover").not());
        assert!(expr.evaluate(&set));
        assert!(!StateExpression::state("hover").evaluate(&set));
        assert!(StateExpression::state("hover")
            .or(StateExpression::state("pressed"))
            .evaluate(&set));
        assert!(StateExpression::Always.evaluate(&set));
    }

    #[test]
    fn undeclared_states_make_rules_dormant() {
        let empty = StateSet::new();
        let not_click = StateExpression::state("click").not();
        assert!(not_click.evaluate(&empty));
        assert!(!not_click.is_live(&empty));
        assert!(!not_click.matches(&empty));
        assert!(StateExpression::Always.matches(&empty));
    }

    #[test]
    fn specificity_orders_by_states_then_priority_then_order() {
        let set = states(&[("a", 1, true), ("b", 5, true), ("c", 2, true)]);
        let one_high = StateExpression::state("b").specificity(&set, 0);
        let one_low = StateExpression::state("a").specificity(&set, 9);
        let two = StateExpression::state("a")
            .and(StateExpression::state("c"))
            .specificity(&set, 0);
        assert!(two > one_high);
        assert!(one_high > one_low);
        assert!(
            StateExpression::state("a").specificity(&set, 2)
                > StateExpression::state("a").specificity(&set, 1)
        );
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let expr = StateExpression::state("pressed").and(
            StateExpression::state("hover")
                .or(StateExpression::state("focus"))
                .not(),
        );
        assert_eq!(expr.to_string(), "pressed & !(hover | focus)");
        let or_of_and = StateExpression::state("a")
            .and(StateExpression::state("b"))
            .or(StateExpression::state("c"));
        assert_eq!(or_of_and.to_string(), "a & b | c");
    }

    #[test]
    fn parses_from_str() {
        let expr: StateExpression = "pressed & !(hover | focus)".parse().unwrap();
        assert_eq!(expr.to_string(), "pressed & !(hover | focus)");
        assert!("pressed &".parse::<StateExpression>().is_err());
    }
}
