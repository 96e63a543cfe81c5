//! Scalar values and the value slots items store them in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Integer identity of an attribute, unique within one [`crate::Manager`].
pub type AttributeId = u64;

/// The concrete type of a value item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Double,
    Int,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Double => write!(f, "double"),
            ValueType::Int => write!(f, "int"),
            ValueType::String => write!(f, "string"),
        }
    }
}

/// A literal value.
///
/// Serialized untagged: integers read back as `Int`, anything with a
/// fractional part or exponent as `Double`. Definitions normalize their
/// bounds and defaults to the item's own [`ValueType`] on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Double(f64),
    String(String),
}

impl Scalar {
    pub fn value_type(&self) -> ValueType {
        match self {
            Scalar::Double(_) => ValueType::Double,
            Scalar::Int(_) => ValueType::Int,
            Scalar::String(_) => ValueType::String,
        }
    }

    /// Numeric view of the value; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Double(d) => Some(*d),
            Scalar::Int(i) => Some(*i as f64),
            Scalar::String(_) => None,
        }
    }

    /// Parse `text` as a value of type `value_type`. Doubles must be finite,
    /// since JSON has no spelling for infinities or NaN.
    pub fn parse(value_type: ValueType, text: &str) -> Option<Scalar> {
        match value_type {
            ValueType::Double => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Scalar::Double),
            ValueType::Int => text.trim().parse::<i64>().ok().map(Scalar::Int),
            ValueType::String => Some(Scalar::String(text.to_string())),
        }
    }

    /// Convert to `value_type` when no information is lost.
    ///
    /// Int widens to Double, integral doubles narrow to Int, strings are
    /// parsed, and numbers render to strings.
    pub fn coerce(&self, value_type: ValueType) -> Option<Scalar> {
        match (self, value_type) {
            (Scalar::Double(_), ValueType::Double)
            | (Scalar::Int(_), ValueType::Int)
            | (Scalar::String(_), ValueType::String) => Some(self.clone()),
            (Scalar::Int(i), ValueType::Double) => Some(Scalar::Double(*i as f64)),
            (Scalar::Double(d), ValueType::Int) => {
                if d.is_finite()
                    && d.fract() == 0.0
                    && *d >= i64::MIN as f64
                    && *d <= i64::MAX as f64
                {
                    Some(Scalar::Int(*d as i64))
                } else {
                    None
                }
            }
            (Scalar::String(s), ty) => Scalar::parse(ty, s),
            (other, ValueType::String) => Some(Scalar::String(other.to_string())),
        }
    }

    /// Order two values. Strings compare lexically with strings, numbers
    /// numerically with numbers; mixed comparisons are unordered.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Double(d) => write!(f, "{}", d),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

/// One value position inside a value item.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    #[default]
    Unset,
    Literal(Scalar),
    /// Index into the item definition's discrete enumeration.
    Discrete(usize),
    /// Reference to an expression attribute in the same manager.
    Expression(AttributeId),
}

impl Slot {
    pub fn is_set(&self) -> bool {
        !matches!(self, Slot::Unset)
    }
}
