//! Static element declarations.
//!
//! Every element tag is declared once, up front, with the attributes it
//! accepts and the states it exposes. The table is assembled with
//! [`ElementRegistryBuilder`] and is read-only afterwards.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::eval::value::{Value, ValueType};
use crate::style::attribute::StyleAttribute;
use crate::style::state::State;

/// Declaration of one element tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementType {
    tag: String,
    attributes: BTreeMap<String, StyleAttribute>,
    states: Vec<State>,
}

impl ElementType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            states: Vec::new(),
        }
    }

    /// Accept `attribute` (builder). A later declaration with the same name
    /// replaces the earlier one.
    pub fn with_attribute(mut self, attribute: StyleAttribute) -> Self {
        self.attributes.insert(attribute.name().to_string(), attribute);
        self
    }

    /// Expose `state` on every element of this tag (builder).
    pub fn with_state(mut self, state: State) -> Self {
        self.states.retain(|s| s.name() != state.name());
        self.states.push(state);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> impl Iterator<Item = &StyleAttribute> {
        self.attributes.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&StyleAttribute> {
        self.attributes.get(name)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Check `value` for attribute `name` of this tag.
    pub fn validate(&self, name: &str, value: Value) -> Result<Value> {
        let attribute = self.attributes.get(name).ok_or_else(|| {
            Error::invalid_argument(format!("<{}> does not accept attribute `{name}`", self.tag))
        })?;
        attribute.validate(value)
    }
}

/// Builds an [`ElementRegistry`].
#[derive(Debug, Default)]
pub struct ElementRegistryBuilder {
    types: BTreeMap<String, ElementType>,
}

impl ElementRegistryBuilder {
    /// Declare an element type. Each tag may be declared once.
    pub fn register(mut self, element: ElementType) -> Result<Self> {
        if self.types.contains_key(element.tag()) {
            return Err(Error::invalid_argument(format!(
                "element <{}> is already declared",
                element.tag()
            )));
        }
        self.types.insert(element.tag.clone(), element);
        Ok(self)
    }

    pub fn build(self) -> ElementRegistry {
        ElementRegistry {
            types: self
                .types
                .into_iter()
                .map(|(tag, element)| (tag, Rc::new(element)))
                .collect(),
        }
    }
}

/// Read-only table from tag to [`ElementType`].
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    types: BTreeMap<String, Rc<ElementType>>,
}

impl ElementRegistry {
    pub fn builder() -> ElementRegistryBuilder {
        ElementRegistryBuilder::default()
    }

    /// The tags every document understands: `box` and `block` containers,
    /// `label` text, and a `button` with `hover`, `focus` and `click` states.
    pub fn standard() -> Self {
        let text = |name: &'static str| StyleAttribute::new(name, ValueType::Str, Value::Str(String::new()));
        let builtin = [
            ElementType::new("box").with_attribute(StyleAttribute::new(
                "layout",
                ValueType::Str,
                Value::Str(String::new()),
            )),
            ElementType::new("block"),
            ElementType::new("label").with_attribute(text("value")),
            ElementType::new("button")
                .with_attribute(text("value"))
                .with_attribute(StyleAttribute::new("enabled", ValueType::Bool, Value::Bool(true)))
                .with_state(State::new("hover", 1))
                .with_state(State::new("focus", 2))
                .with_state(State::new("click", 3)),
        ];
        let mut types = BTreeMap::new();
        for element in builtin {
            types.insert(element.tag.clone(), Rc::new(element));
        }
        Self { types }
    }

    /// The declaration of `tag`, or [`Error::InvalidArgument`] if unknown.
    pub fn element_type(&self, tag: &str) -> Result<Rc<ElementType>> {
        self.types
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::invalid_argument(format!("unknown element <{tag}>")))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Declared tags in name order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
