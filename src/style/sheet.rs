//! Rule containers and the style capability traits.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::attribute::StyleAttribute;
use super::expression::StateExpression;
use super::state::StateSet;
use crate::error::Result;
use crate::eval::value::Value;
use crate::reactive::{Cause, Listeners, Subscription};

/// A value that applies to one attribute while its expression holds.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub expression: StateExpression,
    pub value: Value,
    /// Position among all rules ever set on the sheet; later wins ties.
    pub order: u32,
}

/// Emitted when the rules of one attribute change.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEvent {
    pub attribute: StyleAttribute,
    pub cause: Cause,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Read access to conditional rules.
pub trait Style {
    /// Attributes that have at least one rule.
    fn attributes(&self) -> Vec<StyleAttribute>;

    /// Rules for `attribute`, in source order.
    fn rules(&self, attribute: &str) -> Vec<StyleRule>;
}

/// Write access to conditional rules.
pub trait MutableStyle: Style {
    /// Set `attribute` to `value` while `expression` holds. A rule with an
    /// equal expression is replaced and moves to the end of the source order.
    fn set(&self, attribute: &StyleAttribute, expression: StateExpression, value: Value) -> Result<()>;

    /// Remove the rule for `attribute` under `expression`. Returns whether a
    /// rule was removed.
    fn clear(&self, attribute: &StyleAttribute, expression: &StateExpression) -> bool;
}

// ---------------------------------------------------------------------------
// StyleSheet
// ---------------------------------------------------------------------------

struct AttributeRules {
    attribute: StyleAttribute,
    rules: Vec<StyleRule>,
}

#[derive(Default)]
struct SheetInner {
    name: String,
    rules: RefCell<BTreeMap<String, AttributeRules>>,
    next_order: Cell<u32>,
    listeners: Listeners<SheetEvent>,
}

/// A shared set of conditional rules. Clones refer to the same sheet.
#[derive(Clone, Default)]
pub struct StyleSheet {
    inner: Rc<SheetInner>,
}

impl fmt::Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleSheet")
            .field("name", &self.inner.name)
            .field("attributes", &self.inner.rules.borrow().len())
            .finish()
    }
}

impl StyleSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(SheetInner {
                name: name.into(),
                ..SheetInner::default()
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Like [`MutableStyle::set`], attributing the change to `cause`.
    pub fn set_with_cause(
        &self,
        attribute: &StyleAttribute,
        expression: StateExpression,
        value: Value,
        cause: Cause,
    ) -> Result<()> {
        let value = attribute.validate(value)?;
        let order = self.inner.next_order.get();
        self.inner.next_order.set(order + 1);
        {
            let mut rules = self.inner.rules.borrow_mut();
            let entry = rules
                .entry(attribute.name().to_string())
                .or_insert_with(|| AttributeRules {
                    attribute: attribute.clone(),
                    rules: Vec::new(),
                });
            entry.rules.retain(|rule| rule.expression != expression);
            entry.rules.push(StyleRule {
                expression,
                value,
                order,
            });
        }
        self.notify(attribute, cause);
        Ok(())
    }

    /// The value of the most specific rule for `attribute` that matches
    /// `states`, if any.
    pub fn resolve(&self, attribute: &str, states: &StateSet) -> Option<Value> {
        let rules = self.inner.rules.borrow();
        rules
            .get(attribute)?
            .rules
            .iter()
            .filter(|rule| rule.expression.matches(states))
            .max_by_key(|rule| rule.expression.specificity(states, rule.order))
            .map(|rule| rule.value.clone())
    }

    /// The declaration of `attribute` if the sheet has rules for it.
    pub fn attribute(&self, name: &str) -> Option<StyleAttribute> {
        self.inner
            .rules
            .borrow()
            .get(name)
            .map(|entry| entry.attribute.clone())
    }

    /// Listen to rule changes.
    pub fn listen(&self, f: impl FnMut(&SheetEvent) + 'static) -> Subscription {
        self.inner.listeners.add(f)
    }

    pub fn ptr_eq(&self, other: &StyleSheet) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, attribute: &StyleAttribute, cause: Cause) {
        self.inner.listeners.fire(&SheetEvent {
            attribute: attribute.clone(),
            cause,
        });
    }
}

impl Style for StyleSheet {
    fn attributes(&self) -> Vec<StyleAttribute> {
        self.inner
            .rules
            .borrow()
            .values()
            .filter(|entry| !entry.rules.is_empty())
            .map(|entry| entry.attribute.clone())
            .collect()
    }

    fn rules(&self, attribute: &str) -> Vec<StyleRule> {
        self.inner
            .rules
            .borrow()
            .get(attribute)
            .map(|entry| entry.rules.clone())
            .unwrap_or_default()
    }
}

impl MutableStyle for StyleSheet {
    fn set(&self, attribute: &StyleAttribute, expression: StateExpression, value: Value) -> Result<()> {
        let cause = Cause::root(format!(
            "{}: `{attribute}` set under `{expression}`",
            self.inner.name
        ));
        self.set_with_cause(attribute, expression, value, cause)
    }

    fn clear(&self, attribute: &StyleAttribute, expression: &StateExpression) -> bool {
        let removed = {
            let mut rules = self.inner.rules.borrow_mut();
            match rules.get_mut(attribute.name()) {
                Some(entry) => {
                    let before = entry.rules.len();
                    entry.rules.retain(|rule| &rule.expression != expression);
                    entry.rules.len() != before
                }
                None => false,
            }
        };
        if removed {
            let cause = Cause::root(format!(
                "{}: `{attribute}` cleared under `{expression}`",
                self.inner.name
            ));
            self.notify(attribute, cause);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::attribute::{CORNER_RADIUS, GAP, OPACITY};
    use crate::style::state::State;

    fn click_set(active: bool) -> StateSet {
        StateSet::new().with(&State::new("click", 1), active)
    }

    #[test]
    fn most_specific_matching_rule_wins() {
        let sheet = StyleSheet::new("test");
        let click = StateExpression::state("click");
        sheet.set(&CORNER_RADIUS, StateExpression::Always, Value::Int(1)).unwrap();
        sheet.set(&CORNER_RADIUS, click.clone(), Value::Int(100)).unwrap();

        assert_eq!(sheet.resolve("corner-radius", &click_set(true)), Some(Value::Float(100.0)));
        assert_eq!(sheet.resolve("corner-radius", &click_set(false)), Some(Value::Float(1.0)));
        assert_eq!(sheet.resolve("gap", &click_set(true)), None);
    }

    #[test]
    fn later_rule_wins_ties() {
        let sheet = StyleSheet::new("test");
        sheet.set(&GAP, StateExpression::Always, Value::Int(1)).unwrap();
        sheet.set(&GAP, StateExpression::state("click").not(), Value::Int(2)).unwrap();
        assert_eq!(sheet.resolve("gap", &click_set(false)), Some(Value::Float(2.0)));
        sheet.set(&GAP, StateExpression::state("click"), Value::Int(3)).unwrap();
        sheet.set(&GAP, StateExpression::state("click").not(), Value::Int(4)).unwrap();
        assert_eq!(sheet.rules("gap").len(), 3);
        assert_eq!(sheet.resolve("gap", &click_set(false)), Some(Value::Float(4.0)));
    }

    #[test]
    fn set_validates_and_clear_removes() {
        let sheet = StyleSheet::new("test");
        assert!(sheet
            .set(&OPACITY, StateExpression::Always, Value::from("opaque"))
            .is_err());
        sheet.set(&OPACITY, StateExpression::Always, Value::Float(0.5)).unwrap();
        assert_eq!(sheet.attributes(), vec![OPACITY]);
        assert!(sheet.clear(&OPACITY, &StateExpression::Always));
        assert!(!sheet.clear(&OPACITY, &StateExpression::Always));
        assert!(sheet.attributes().is_empty());
    }

    #[test]
    fn edits_notify_listeners() {
        let sheet = StyleSheet::new("test");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = sheet.listen(move |event| sink.borrow_mut().push(event.attribute.name().to_string()));
        sheet.set(&GAP, StateExpression::Always, Value::Int(2)).unwrap();
        sheet.clear(&GAP, &StateExpression::Always);
        sheet.clear(&GAP, &StateExpression::Always);
        assert_eq!(*log.borrow(), vec!["gap".to_string(), "gap".to_string()]);
    }
}
