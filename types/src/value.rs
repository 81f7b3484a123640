use std::{
    fmt,
    hash::{Hash, Hasher},
};

use time::{Date, PrimitiveDateTime, Time};

/// A constant value appearing in the IR (literals, column defaults, placeholders).
///
/// Floating point values compare and hash by their bit pattern, so `Value` can be used as a key
/// of [`crate::repository::Repository`].
#[derive(Debug, Clone)]
pub enum Value {
    /// The `NULL` value.
    Unknown,
    Boolean(bool),
    Int4(i32),
    Int8(i64),
    /// Canonical decimal text, e.g. `-12.50`.
    Decimal(String),
    Float4(f32),
    Float8(f64),
    Character(String),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
}

impl Value {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unknown, Value::Unknown) => true,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Int4(l), Value::Int4(r)) => l == r,
            (Value::Int8(l), Value::Int8(r)) => l == r,
            (Value::Decimal(l), Value::Decimal(r)) => l == r,
            (Value::Float4(l), Value::Float4(r)) => l.to_bits() == r.to_bits(),
            (Value::Float8(l), Value::Float8(r)) => l.to_bits() == r.to_bits(),
            (Value::Character(l), Value::Character(r)) => l == r,
            (Value::Date(l), Value::Date(r)) => l == r,
            (Value::Time(l), Value::Time(r)) => l == r,
            (Value::Timestamp(l), Value::Timestamp(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Unknown => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int4(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::Float4(v) => v.to_bits().hash(state),
            Value::Float8(v) => v.to_bits().hash(state),
            Value::Character(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Value::Int4(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Float4(v) => write!(f, "{v}"),
            Value::Float8(v) => write!(f, "{v}"),
            Value::Character(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Date(v) => write!(f, "DATE '{v}'"),
            Value::Time(v) => write!(f, "TIME '{v}'"),
            Value::Timestamp(v) => write!(f, "TIMESTAMP '{v}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn floats_compare_by_bits() {
        // given two NaN values with the same bit pattern
        let l = Value::Float8(f64::NAN);
        let r = Value::Float8(f64::NAN);

        // then they are equal and deduplicate in a set
        assert_eq!(l, r);
        let set: HashSet<_> = [l, r].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_variants_are_not_equal() {
        assert_ne!(Value::Int4(1), Value::Int8(1));
        assert_ne!(Value::Unknown, Value::Boolean(false));
    }

    #[test]
    fn display_escapes_quotes() {
        assert_eq!(Value::Character("it's".into()).to_string(), "'it''s'");
        assert_eq!(Value::Unknown.to_string(), "NULL");
    }
}
