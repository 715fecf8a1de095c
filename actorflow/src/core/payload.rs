//! Token payloads and payload types.
//!
//! Payloads are a closed sum type: actors pattern-match on the variant they
//! care about instead of inspecting runtime classes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single primitive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean.
    Boolean(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating-point number.
    Double(f64),
    /// A string.
    String(String),
}

impl Value {
    /// Returns the payload type of this value.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::Boolean(_) => PayloadType::Boolean,
            Self::Integer(_) => PayloadType::Integer,
            Self::Double(_) => PayloadType::Double,
            Self::String(_) => PayloadType::String,
        }
    }

    /// Returns the value as a float, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parses a string into the most specific value: integer, double,
    /// boolean, and finally string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if let Ok(i) = s.parse::<i64>() {
            Self::Integer(i)
        } else if let Ok(d) = s.parse::<f64>() {
            Self::Double(d)
        } else if let Ok(b) = s.parse::<bool>() {
            Self::Boolean(b)
        } else {
            Self::String(s.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// The data carried by a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// A single value.
    Scalar(Value),
    /// A homogeneous array of values.
    Array(Vec<Value>),
    /// An insertion-ordered map of values.
    Map(IndexMap<String, Value>),
}

impl Payload {
    /// Returns the payload type.
    ///
    /// Arrays report `Array` regardless of their element type.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::Scalar(v) => v.payload_type(),
            Self::Array(_) => PayloadType::Array,
            Self::Map(_) => PayloadType::Map,
        }
    }

    /// Returns the scalar value, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric scalar as a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Value::as_f64)
    }

    /// Returns the string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    /// Returns the array elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the map, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the values for per-element processing: the elements of an
    /// array, or the scalar on its own.
    #[must_use]
    pub fn elements(&self) -> Vec<&Value> {
        match self {
            Self::Scalar(v) => vec![v],
            Self::Array(values) => values.iter().collect(),
            Self::Map(map) => map.values().collect(),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! scalar_payload_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Payload {
                fn from(v: $t) -> Self {
                    Self::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_payload_from!(bool, i64, f64, &str, String, Value);

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

impl From<IndexMap<String, Value>> for Payload {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// The declared type of a payload, used for `accepts()`/`generates()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    /// Anything. Bypasses type checks on either side of a connection.
    Unknown,
    /// A boolean scalar.
    Boolean,
    /// An integer scalar.
    Integer,
    /// A double scalar.
    Double,
    /// Any numeric scalar.
    Number,
    /// A string scalar.
    String,
    /// An array of values.
    Array,
    /// A map of values.
    Map,
}

impl PayloadType {
    /// Returns true if a slot declared as `self` accepts a value of type `other`.
    #[must_use]
    pub fn accepts(self, other: Self) -> bool {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => true,
            (Self::Number, Self::Integer | Self::Double | Self::Number) => true,
            (a, b) => a == b,
        }
    }

    /// Returns true if every generated type is accepted by at least one of
    /// the accepted types. `Unknown` on either side is always compatible.
    #[must_use]
    pub fn compatible(generates: &[Self], accepts: &[Self]) -> bool {
        if generates.contains(&Self::Unknown) || accepts.contains(&Self::Unknown) {
            return true;
        }
        generates
            .iter()
            .all(|g| accepts.iter().any(|a| a.accepts(*g)))
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Double => write!(f, "double"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Array => write!(f, "array"),
            Self::Map => write!(f, "map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parse_prefers_integer() {
        assert_eq!(Value::parse("3"), Value::Integer(3));
        assert_eq!(Value::parse("2.5"), Value::Double(2.5));
        assert_eq!(Value::parse("true"), Value::Boolean(true));
        assert_eq!(Value::parse("abc"), Value::String("abc".to_string()));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Double(9.0).to_string(), "9.0");
        assert_eq!(Value::Integer(9).to_string(), "9");
    }

    #[test]
    fn test_payload_type() {
        assert_eq!(Payload::from(1.5).payload_type(), PayloadType::Double);
        assert_eq!(Payload::from("x").payload_type(), PayloadType::String);
        assert_eq!(
            Payload::from(vec![Value::Integer(1)]).payload_type(),
            PayloadType::Array
        );
        assert_eq!(Payload::Map(IndexMap::new()).payload_type(), PayloadType::Map);
    }

    #[test]
    fn test_payload_display_map_in_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Value::Integer(2));
        map.insert("a".to_string(), Value::Integer(1));
        assert_eq!(Payload::Map(map).to_string(), "{b=2, a=1}");
    }

    #[test]
    fn test_accepts_number_and_unknown() {
        assert!(PayloadType::Number.accepts(PayloadType::Integer));
        assert!(PayloadType::Number.accepts(PayloadType::Double));
        assert!(!PayloadType::Double.accepts(PayloadType::String));
        assert!(PayloadType::Unknown.accepts(PayloadType::Map));
        assert!(PayloadType::String.accepts(PayloadType::Unknown));
    }

    #[test]
    fn test_compatible() {
        use PayloadType::*;
        assert!(PayloadType::compatible(&[Double], &[Number]));
        assert!(PayloadType::compatible(&[Integer, Double], &[Number, String]));
        assert!(!PayloadType::compatible(&[Double, Map], &[Number]));
        assert!(PayloadType::compatible(&[Map], &[Unknown]));
    }

    #[test]
    fn test_elements() {
        let array = Payload::from(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(array.elements().len(), 2);
        assert_eq!(Payload::from(3_i64).elements().len(), 1);
    }
}
