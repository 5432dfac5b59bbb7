//! Style attribute declarations and the built-in attribute table.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
use crate::eval::value::{Value, ValueType};

/// Largest size a sizing attribute defaults to.
pub const UNBOUNDED: f64 = 1_000_000.0;

/// A declared style attribute: a name, the type its values must have, and
/// the value used when no rule applies.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleAttribute {
    name: Cow<'static, str>,
    value_type: ValueType,
    default: Value,
}

impl StyleAttribute {
    /// Declare a built-in attribute.
    pub const fn new(name: &'static str, value_type: ValueType, default: Value) -> Self {
        Self {
            name: Cow::Borrowed(name),
            value_type,
            default,
        }
    }

    /// Declare an attribute with a runtime name.
    pub fn custom(name: impl Into<String>, value_type: ValueType, default: Value) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            value_type,
            default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Check `value` against the declared type. `Int` is widened to `Float`.
    pub fn validate(&self, value: Value) -> Result<Value> {
        match (value, self.value_type) {
            (v, t) if v.value_type() == t => Ok(v),
            (Value::Int(i), ValueType::Float) => Ok(Value::Float(i as f64)),
            (v, t) => Err(Error::invalid_argument(format!(
                "attribute `{}` expects {t}, got {} `{v}`",
                self.name,
                v.value_type()
            ))),
        }
    }
}

impl fmt::Display for StyleAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub const MIN_WIDTH: StyleAttribute = StyleAttribute::new("min-width", ValueType::Float, Value::Float(0.0));
pub const PREF_WIDTH: StyleAttribute = StyleAttribute::new("pref-width", ValueType::Float, Value::Float(0.0));
pub const MAX_WIDTH: StyleAttribute = StyleAttribute::new("max-width", ValueType::Float, Value::Float(UNBOUNDED));
pub const MIN_HEIGHT: StyleAttribute = StyleAttribute::new("min-height", ValueType::Float, Value::Float(0.0));
pub const PREF_HEIGHT: StyleAttribute = StyleAttribute::new("pref-height", ValueType::Float, Value::Float(0.0));
pub const MAX_HEIGHT: StyleAttribute = StyleAttribute::new("max-height", ValueType::Float, Value::Float(UNBOUNDED));
/// Space between adjacent children of a box.
pub const GAP: StyleAttribute = StyleAttribute::new("gap", ValueType::Float, Value::Float(0.0));
pub const CORNER_RADIUS: StyleAttribute = StyleAttribute::new("corner-radius", ValueType::Float, Value::Float(0.0));
pub const OPACITY: StyleAttribute = StyleAttribute::new("opacity", ValueType::Float, Value::Float(1.0));
/// Background color name or `#rrggbb`.
pub const BACKGROUND: StyleAttribute = StyleAttribute::new("background", ValueType::Str, Value::Str(String::new()));

/// Every built-in attribute.
pub fn builtin_attributes() -> Vec<StyleAttribute> {
    vec![
        MIN_WIDTH,
        PREF_WIDTH,
        MAX_WIDTH,
        MIN_HEIGHT,
        PREF_HEIGHT,
        MAX_HEIGHT,
        GAP,
        CORNER_RADIUS,
        OPACITY,
        BACKGROUND,
    ]
}

/// Look up a built-in attribute by name.
pub fn builtin(name: &str) -> Option<StyleAttribute> {
    builtin_attributes().into_iter().find(|a| a.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_widens_ints() {
        assert_eq!(CORNER_RADIUS.validate(Value::Int(4)).unwrap(), Value::Float(4.0));
        assert_eq!(BACKGROUND.validate(Value::from("red")).unwrap(), Value::from("red"));
    }

    #[test]
    fn validate_rejects_mismatches() {
        let err = OPACITY.validate(Value::from("high")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(BACKGROUND.validate(Value::Int(1)).is_err());
    }

    #[test]
    fn builtin_lookup() {
        assert_eq!(builtin("gap"), Some(GAP));
        assert_eq!(builtin("max-height").unwrap().default_value(), &Value::Float(UNBOUNDED));
        assert_eq!(builtin("nope"), None);
    }

    #[test]
    fn custom_attributes() {
        let attr = StyleAttribute::custom("label", ValueType::Str, Value::from("ok"));
        assert_eq!(attr.name(), "label");
        assert_eq!(attr.to_string(), "label");
    }
}
