//! Keys used to address data inside a target.
//!
//! Records and sequences are addressed by [`PropKey`]: an integer index or a
//! name. Maps and sets hash their entries by [`Key`], which compares values
//! with SameValueZero semantics (NaN equals NaN, +0 equals -0, identity for
//! objects).

use std::fmt;
use std::rc::Rc;

use super::{number_to_string, ObjectId, Value};

/// Property key of a record or sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropKey {
    /// A canonical non-negative integer key.
    Index(usize),
    /// Any other key, including `length`.
    Name(Rc<str>),
}

impl PropKey {
    /// Name of the sequence length property.
    pub const LENGTH: &'static str = "length";

    /// Convert an arbitrary value into a property key.
    ///
    /// Non-negative integral numbers and canonical integer strings (`"3"`,
    /// not `"03"`) become [`PropKey::Index`]; everything else is stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match number_to_index(*n) {
                Some(index) => PropKey::Index(index),
                None => PropKey::Name(number_to_string(*n).into()),
            },
            Value::Str(s) => Self::from_name(s.clone()),
            Value::Bool(b) => PropKey::Name(if *b { "true" } else { "false" }.into()),
            Value::Null => PropKey::Name("null".into()),
            Value::Undefined => PropKey::Name("undefined".into()),
            Value::Object(_) | Value::Reactive(_) | Value::Ref(_) => {
                PropKey::Name("[object Object]".into())
            }
        }
    }

    fn from_name(name: Rc<str>) -> Self {
        match name.parse::<usize>() {
            Ok(index) if index.to_string() == *name => PropKey::Index(index),
            _ => PropKey::Name(name),
        }
    }

    /// The index, if this key addresses one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PropKey::Index(index) => Some(*index),
            PropKey::Name(_) => None,
        }
    }

    /// Whether this is the `length` key.
    pub fn is_length(&self) -> bool {
        matches!(self, PropKey::Name(name) if &**name == Self::LENGTH)
    }

    /// The string form of the key, as records store it.
    pub fn to_name(&self) -> Rc<str> {
        match self {
            PropKey::Index(index) => index.to_string().into(),
            PropKey::Name(name) => name.clone(),
        }
    }

    /// The key as a value (indices become numbers).
    pub fn to_value(&self) -> Value {
        match self {
            PropKey::Index(index) => Value::Number(*index as f64),
            PropKey::Name(name) => Value::Str(name.clone()),
        }
    }
}

fn number_to_index(n: f64) -> Option<usize> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Index(index) => write!(f, "{index}"),
            PropKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        Self::from_name(name.into())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        Self::from_name(name.into())
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl From<&Value> for PropKey {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

/// Hashable identity of a value inside a map or set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Undefined,
    Null,
    Bool(bool),
    /// Normalized bit pattern: every NaN shares one pattern, -0 becomes +0.
    Number(u64),
    Str(Rc<str>),
    /// Objects, wrappers and refs compare by identity.
    Identity(ObjectId),
}

impl Key {
    /// Compute the SameValueZero key of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => Key::Undefined,
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Number(n) => Key::Number(normalize_bits(*n)),
            Value::Str(s) => Key::Str(s.clone()),
            Value::Object(_) | Value::Reactive(_) | Value::Ref(_) => match value.identity() {
                Some(id) => Key::Identity(id),
                None => Key::Undefined,
            },
        }
    }

    /// The identity, if the key belongs to an object-like value.
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            Key::Identity(id) => Some(*id),
            _ => None,
        }
    }
}

fn normalize_bits(n: f64) -> u64 {
    if n.is_nan() {
        f64::NAN.to_bits()
    } else if n == 0.0 {
        0f64.to_bits()
    } else {
        n.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_integer_strings_are_indices() {
        assert_eq!(PropKey::from("3"), PropKey::Index(3));
        assert_eq!(PropKey::from("03"), PropKey::Name("03".into()));
        assert_eq!(PropKey::from("-1"), PropKey::Name("-1".into()));
        assert!(PropKey::from("length").is_length());
    }

    #[test]
    fn numbers_become_indices_when_integral() {
        assert_eq!(PropKey::from_value(&Value::from(2)), PropKey::Index(2));
        assert_eq!(
            PropKey::from_value(&Value::from(1.5)),
            PropKey::Name("1.5".into())
        );
        assert_eq!(PropKey::Index(7).to_name().as_ref(), "7");
    }

    #[test]
    fn key_uses_same_value_zero() {
        assert_eq!(Key::of(&Value::from(f64::NAN)), Key::of(&Value::from(f64::NAN)));
        assert_eq!(Key::of(&Value::from(0.0)), Key::of(&Value::from(-0.0)));
        assert_ne!(Key::of(&Value::from(1)), Key::of(&Value::from("1")));
    }
}
