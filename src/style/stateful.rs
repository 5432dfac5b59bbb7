//! `StatefulStyle`: the state-driven attribute cascade.
//!
//! A stateful style reads one [`StateEngine`] and an ordered list of sheets:
//! its own local sheet first, then its dependencies (nearest first). The
//! resolved value of an attribute is the most specific matching rule of the
//! first sheet that has one.
//!
//! A reverse index from state name to the attributes whose rules mention it
//! limits the work done on a state transition to the attributes that can
//! actually change. Every attribute whose resolved value changes produces
//! exactly one [`StyleEvent`], caused by the transition or sheet edit.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::attribute::StyleAttribute;
use super::expression::StateExpression;
use super::sheet::{MutableStyle, Style, StyleRule, StyleSheet};
use super::state::{StateEngine, StateScope, StateTransition};
use crate::error::Result;
use crate::eval::value::Value;
use crate::reactive::{Cause, Listeners, Observable, Subscription};

/// A change in an attribute's resolved value. `None` means no rule applies.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleEvent {
    pub attribute: StyleAttribute,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub cause: Cause,
}

struct Tracked {
    attribute: StyleAttribute,
    resolved: Option<Value>,
    raw: Option<Observable<Option<Value>>>,
    defaulted: Option<Observable<Option<Value>>>,
}

struct StyleInner {
    engine: StateEngine,
    local: StyleSheet,
    dependencies: Vec<StyleSheet>,
    tracked: RefCell<BTreeMap<String, Tracked>>,
    /// state name -> attributes with a rule mentioning it
    index: RefCell<HashMap<String, BTreeSet<String>>>,
    listeners: Listeners<StyleEvent>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Drop for StyleInner {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.revoke();
        }
    }
}

/// A style whose attribute values follow the active states of an engine.
/// Clones share the same style.
#[derive(Clone)]
pub struct StatefulStyle {
    inner: Rc<StyleInner>,
}

impl fmt::Debug for StatefulStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulStyle")
            .field("local", &self.inner.local)
            .field("dependencies", &self.inner.dependencies)
            .field("tracked", &self.inner.tracked.borrow().len())
            .finish()
    }
}

impl StatefulStyle {
    /// A style with an empty local sheet and no dependencies.
    pub fn new(engine: StateEngine) -> Self {
        Self::with_dependencies(engine, StyleSheet::new("local"), Vec::new())
    }

    /// A style over `local`, falling back to `dependencies` in order.
    pub fn with_dependencies(
        engine: StateEngine,
        local: StyleSheet,
        dependencies: Vec<StyleSheet>,
    ) -> Self {
        let inner = Rc::new(StyleInner {
            engine,
            local,
            dependencies,
            tracked: RefCell::new(BTreeMap::new()),
            index: RefCell::new(HashMap::new()),
            listeners: Listeners::new(),
            subscriptions: RefCell::new(Vec::new()),
        });
        let style = Self { inner };

        let attributes: Vec<StyleAttribute> = style
            .sheets()
            .flat_map(|sheet| sheet.attributes())
            .collect();
        for attribute in &attributes {
            style.track(attribute);
        }
        style.subscribe();
        style
    }

    pub fn engine(&self) -> &StateEngine {
        &self.inner.engine
    }

    /// The sheet [`MutableStyle`] edits go to.
    pub fn local(&self) -> &StyleSheet {
        &self.inner.local
    }

    pub fn dependencies(&self) -> &[StyleSheet] {
        &self.inner.dependencies
    }

    /// An observable of the resolved value of `attribute`.
    ///
    /// With `with_default`, the attribute's declared default stands in when
    /// no rule applies, so the observable always holds `Some`.
    pub fn get(&self, attribute: &StyleAttribute, with_default: bool) -> Observable<Option<Value>> {
        self.track(attribute);
        let mut tracked = self.inner.tracked.borrow_mut();
        let entry = self.tracked_entry(&mut tracked, attribute);
        let current = if with_default {
            Some(
                entry
                    .resolved
                    .clone()
                    .unwrap_or_else(|| entry.attribute.default_value().clone()),
            )
        } else {
            entry.resolved.clone()
        };
        let slot = if with_default {
            &mut entry.defaulted
        } else {
            &mut entry.raw
        };
        slot.get_or_insert_with(|| Observable::new(current)).clone()
    }

    /// The current resolved value of `attribute`, without default.
    pub fn resolve(&self, attribute: &str) -> Option<Value> {
        let states = self.inner.engine.snapshot();
        self.sheets()
            .find_map(|sheet| sheet.resolve(attribute, &states))
    }

    /// The current value of `attribute`, falling back to its default.
    pub fn value(&self, attribute: &StyleAttribute) -> Value {
        self.resolve(attribute.name())
            .unwrap_or_else(|| attribute.default_value().clone())
    }

    /// Listen to resolved-value changes of every attribute.
    pub fn listen(&self, f: impl FnMut(&StyleEvent) + 'static) -> Subscription {
        self.inner.listeners.add(f)
    }

    /// Attributes whose rules mention `state`.
    pub fn affected_by(&self, state: &str) -> Vec<String> {
        self.inner
            .index
            .borrow()
            .get(state)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn sheets(&self) -> impl Iterator<Item = &StyleSheet> {
        std::iter::once(&self.inner.local).chain(self.inner.dependencies.iter())
    }

    fn subscribe(&self) {
        let mut subscriptions = Vec::new();

        let weak = Rc::downgrade(&self.inner);
        subscriptions.push(self.inner.engine.listen(StateScope::Any, move |event| {
            let Some(style) = upgrade(&weak) else {
                return;
            };
            let affected = style.affected_by(event.state.name());
            if affected.is_empty() {
                return;
            }
            let verb = match event.transition {
                StateTransition::Declared => "declared",
                StateTransition::Activated => "activated",
                StateTransition::Deactivated => "deactivated",
            };
            trace!(state = event.state.name(), count = affected.len(), "re-resolving attributes");
            for name in affected {
                let cause = event
                    .cause
                    .derive(format!("`{name}` re-resolved: `{}` {verb}", event.state));
                style.recompute(&name, cause);
            }
        }));

        for sheet in self.sheets() {
            let weak = Rc::downgrade(&self.inner);
            subscriptions.push(sheet.listen(move |event| {
                let Some(style) = upgrade(&weak) else {
                    return;
                };
                style.track(&event.attribute);
                let cause = event
                    .cause
                    .derive(format!("`{}` rules edited", event.attribute));
                style.recompute(event.attribute.name(), cause);
            }));
        }

        self.inner.subscriptions.borrow_mut().extend(subscriptions);
    }

    /// Start tracking `attribute` if it is not tracked yet, and index the
    /// states its rules mention.
    fn track(&self, attribute: &StyleAttribute) {
        let names: BTreeSet<String> = self
            .sheets()
            .flat_map(|sheet| sheet.rules(attribute.name()))
            .flat_map(|rule: StyleRule| {
                rule.expression
                    .state_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        {
            let mut index = self.inner.index.borrow_mut();
            for state in names {
                index
                    .entry(state)
                    .or_default()
                    .insert(attribute.name().to_string());
            }
        }

        let mut tracked = self.inner.tracked.borrow_mut();
        self.tracked_entry(&mut tracked, attribute);
    }

    fn tracked_entry<'a>(
        &self,
        tracked: &'a mut BTreeMap<String, Tracked>,
        attribute: &StyleAttribute,
    ) -> &'a mut Tracked {
        tracked
            .entry(attribute.name().to_string())
            .or_insert_with(|| Tracked {
                attribute: attribute.clone(),
                resolved: self.resolve(attribute.name()),
                raw: None,
                defaulted: None,
            })
    }

    /// Re-resolve one attribute and publish the change, if any.
    fn recompute(&self, name: &str, cause: Cause) {
        let new = self.resolve(name);
        let (attribute, old, raw, defaulted) = {
            let mut tracked = self.inner.tracked.borrow_mut();
            let Some(entry) = tracked.get_mut(name) else {
                return;
            };
            if entry.resolved == new {
                return;
            }
            let old = std::mem::replace(&mut entry.resolved, new.clone());
            (
                entry.attribute.clone(),
                old,
                entry.raw.clone(),
                entry.defaulted.clone(),
            )
        };
        debug!(attribute = name, ?old, ?new, "style attribute changed");

        if let Some(raw) = raw {
            raw.publish(old.clone(), new.clone(), cause.clone());
        }
        if let Some(defaulted) = defaulted {
            let default = attribute.default_value();
            let fill = |v: &Option<Value>| Some(v.clone().unwrap_or_else(|| default.clone()));
            defaulted.publish(fill(&old), fill(&new), cause.clone());
        }
        self.inner.listeners.fire(&StyleEvent {
            attribute,
            old,
            new,
            cause,
        });
    }
}

fn upgrade(weak: &Weak<StyleInner>) -> Option<StatefulStyle> {
    weak.upgrade().map(|inner| StatefulStyle { inner })
}

impl Style for StatefulStyle {
    /// Attributes with rules in any sheet of the cascade.
    fn attributes(&self) -> Vec<StyleAttribute> {
        let mut seen = BTreeSet::new();
        self.sheets()
            .flat_map(|sheet| sheet.attributes())
            .filter(|attribute| seen.insert(attribute.name().to_string()))
            .collect()
    }

    /// Rules of the local sheet.
    fn rules(&self, attribute: &str) -> Vec<StyleRule> {
        self.inner.local.rules(attribute)
    }
}

impl MutableStyle for StatefulStyle {
    fn set(&self, attribute: &StyleAttribute, expression: StateExpression, value: Value) -> Result<()> {
        self.inner.local.set(attribute, expression, value)
    }

    fn clear(&self, attribute: &StyleAttribute, expression: &StateExpression) -> bool {
        self.inner.local.clear(attribute, expression)
    }
}
