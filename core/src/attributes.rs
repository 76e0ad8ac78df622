//! Bound attribute sets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::BindError;
use crate::value::{FromValue, Value};

/// Attribute name → coerced value, for one command level.
///
/// The parser produces one `Attributes` per traversed level; the binder hands
/// it to [`FromAttributes`](crate::FromAttributes) so the command type can
/// take its fields out of it.
///
/// # Examples
///
/// ```
/// use argcommand_core::{Attributes, Value};
///
/// let mut attrs = Attributes::new();
/// attrs.insert("times", Value::Int(3));
///
/// let times: i64 = attrs.take("times").unwrap();
/// assert_eq!(times, 3);
///
/// // Unbound attributes read as `None` for optional fields.
/// let label: Option<String> = attrs.take("label").unwrap();
/// assert!(label.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
}

impl Attributes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier value.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bound attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates `(name, value)` pairs sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Removes and returns the raw value bound to `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Removes `name` and converts it into a field type.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MissingAttribute`] when `name` is unbound and `T`
    /// has no fallback, or [`BindError::TypeMismatch`] when the value has the
    /// wrong shape for `T`.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, BindError> {
        match self.values.remove(name) {
            Some(value) => T::from_value(value).map_err(|found| BindError::TypeMismatch {
                name: name.to_string(),
                expected: T::EXPECTED,
                found: found.type_name(),
            }),
            None => T::from_missing().ok_or_else(|| BindError::MissingAttribute {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_removes_value() {
        let mut attrs = Attributes::new();
        attrs.insert("what", Value::from("hi"));

        let what: String = attrs.take("what").unwrap();
        assert_eq!(what, "hi");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_take_missing_attribute() {
        let mut attrs = Attributes::new();
        let err = attrs.take::<String>("what").unwrap_err();
        assert_eq!(
            err,
            BindError::MissingAttribute {
                name: "what".to_string()
            }
        );
    }

    #[test]
    fn test_take_type_mismatch() {
        let mut attrs = Attributes::new();
        attrs.insert("times", Value::from("three"));

        let err = attrs.take::<i64>("times").unwrap_err();
        assert_eq!(
            err,
            BindError::TypeMismatch {
                name: "times".to_string(),
                expected: "int",
                found: "string",
            }
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let mut attrs = Attributes::new();
        attrs.insert("b", Value::Int(1));
        attrs.insert("a", Value::Int(2));
        assert_eq!(attrs.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
