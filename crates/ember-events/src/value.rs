use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// A dynamically typed value crossing the script boundary
///
/// Used both for the arguments passed to handlers and for the optional value a
/// handler hands back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Entity(EntityId),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Name of the variant, for log messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Entity(_) => "entity",
        }
    }

    /// Decode into a concrete type, `None` if the value does not fit
    pub fn decode<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 => {
                Some(*n as i64)
            }
            _ => None,
        }
    }
}

/// Conversion out of a script [`Value`]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|i| u32::try_from(i).ok())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|i| u64::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|n| n as f32)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for EntityId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::Entity(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversions_are_range_checked() {
        assert_eq!(Value::Integer(-1).decode::<u32>(), None);
        assert_eq!(Value::Integer(i64::from(u32::MAX) + 1).decode::<u32>(), None);
        assert_eq!(Value::Integer(42).decode::<u32>(), Some(42));
        assert_eq!(Value::Integer(42).decode::<i32>(), Some(42));
    }

    #[test]
    fn test_integral_numbers_decode_as_integers() {
        assert_eq!(Value::Number(250.0).decode::<u32>(), Some(250));
        assert_eq!(Value::Number(2.5).decode::<u32>(), None);
        assert_eq!(Value::Number(f64::NAN).decode::<i64>(), None);
    }

    #[test]
    fn test_mismatched_types_do_not_decode() {
        assert_eq!(Value::String("10".into()).decode::<i64>(), None);
        assert_eq!(Value::Nil.decode::<bool>(), None);
        assert_eq!(Value::Bool(true).decode::<String>(), None);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from("hi"), Value::String("hi".into()));
        assert_eq!(Value::from(3u32), Value::Integer(3));
        assert_eq!(Value::from(EntityId::new(1)), Value::Entity(EntityId::new(1)));
        assert!(Value::default().is_nil());
    }
}
