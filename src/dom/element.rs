//! Element: one node of a document with its states, style, attributes and
//! bounds.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use slotmap::new_key_type;
use tracing::debug;

use super::registry::ElementType;
use crate::error::Result;
use crate::eval::env::Environment;
use crate::eval::value::Value;
use crate::geometry::Region;
use crate::reactive::{Cause, Observable, ObservableEvent, Subscription};
use crate::style::sheet::StyleSheet;
use crate::style::state::{StateController, StateEngine};
use crate::style::stateful::StatefulStyle;

new_key_type! {
    /// Unique identifier for an element in a [`super::Document`].
    pub struct ElementId;
}

/// A document element.
///
/// Attribute values live in an [`Environment`], so expressions can refer to
/// them by name, and are validated against the element's declaration on
/// every write.
pub struct Element {
    kind: Rc<ElementType>,
    engine: StateEngine,
    controllers: BTreeMap<String, StateController>,
    style: StatefulStyle,
    attributes: Environment,
    bounds: Observable<Region>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.kind.tag())
            .field("states", &self.engine.snapshot())
            .field("bounds", &self.bounds.get())
            .finish()
    }
}

impl Element {
    /// An element of `kind` whose style falls back to `tag_sheet`, then
    /// `global`.
    pub(crate) fn new(kind: Rc<ElementType>, tag_sheet: StyleSheet, global: StyleSheet) -> Result<Self> {
        let engine = StateEngine::new();
        let mut controllers = BTreeMap::new();
        for state in kind.states() {
            let controller = engine.add_state(state.clone())?;
            controllers.insert(state.name().to_string(), controller);
        }
        let local = StyleSheet::new(format!("<{}>", kind.tag()));
        let style = StatefulStyle::with_dependencies(engine.clone(), local, vec![tag_sheet, global]);
        let attributes = Environment::new();
        for attribute in kind.attributes() {
            attributes.bind(attribute.name(), attribute.default_value().clone());
        }
        Ok(Self {
            kind,
            engine,
            controllers,
            style,
            attributes,
            bounds: Observable::new(Region::EMPTY),
        })
    }

    pub fn tag(&self) -> &str {
        self.kind.tag()
    }

    pub fn element_type(&self) -> &ElementType {
        &self.kind
    }

    pub fn engine(&self) -> &StateEngine {
        &self.engine
    }

    /// The controller of a declared state.
    pub fn state(&self, name: &str) -> Option<&StateController> {
        self.controllers.get(name)
    }

    pub fn style(&self) -> &StatefulStyle {
        &self.style
    }

    /// Attribute observables, keyed by attribute name.
    pub fn attributes(&self) -> &Environment {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name)
    }

    /// Set a declared attribute. Undeclared names and ill-typed values fail
    /// with [`crate::Error::InvalidArgument`].
    pub fn set_attribute(&self, name: &str, value: impl Into<Value>) -> Result<bool> {
        let cause = Cause::root(format!("<{}> {name} set", self.tag()));
        self.set_attribute_with_cause(name, value.into(), cause)
    }

    pub fn set_attribute_with_cause(&self, name: &str, value: Value, cause: Cause) -> Result<bool> {
        let value = self.kind.validate(name, value)?;
        Ok(self.attributes.bind_with_cause(name, value, cause))
    }

    /// Keep attribute `name` equal to `source`.
    ///
    /// The current value is copied immediately. Later changes follow with the
    /// source's event as cause; values the attribute rejects, and failures
    /// of the source, are reported on the attribute's error channel.
    pub fn bind_attribute(&self, name: &str, source: &Observable<Value>) -> Result<Subscription> {
        self.set_attribute(name, source.get())?;
        let kind = Rc::clone(&self.kind);
        let name = name.to_string();
        let attributes = self.attributes.clone();
        Ok(source.subscribe(move |event| {
            let Some(target) = attributes.lookup(&name) else {
                return;
            };
            match event {
                ObservableEvent::Changed(change) => {
                    let cause = change.cause.derive(format!("<{}> {name} bound", kind.tag()));
                    match kind.validate(&name, change.new.clone()) {
                        Ok(value) => {
                            target.set_with_cause(value, cause);
                        }
                        Err(err) => {
                            debug!(tag = kind.tag(), attribute = %name, error = %err, "bound value rejected");
                            target.fail(err, cause);
                        }
                    }
                }
                ObservableEvent::Failed(failure) => {
                    let cause = failure.cause.derive(format!("<{}> {name} source failed", kind.tag()));
                    target.fail(failure.error.clone(), cause);
                }
            }
        }))
    }

    /// The element's bounds, published by [`super::Document::layout`].
    pub fn bounds(&self) -> &Observable<Region> {
        &self.bounds
    }
}
