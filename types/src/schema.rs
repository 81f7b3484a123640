use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of digits a `DECIMAL` can hold.
pub const DECIMAL_MAX_PRECISION: u32 = 38;

/// Maximum length of `CHAR`/`VARCHAR` columns.
pub const CHARACTER_MAX_LENGTH: u32 = 30_716;

/// Represents all possible types that a value in SQL can get.
///
/// [`Type::Unknown`] is the type of an untyped `NULL` and is convertible to every other type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Boolean,
    Int4,
    Int8,
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Float4,
    Float8,
    Character {
        varying: bool,
        length: Option<u32>,
    },
    Date,
    Time,
    Timestamp,
    Unknown,
}

impl Type {
    /// Shorthand for `VARCHAR` without a length limit.
    pub const fn varchar() -> Type {
        Type::Character {
            varying: true,
            length: None,
        }
    }

    /// Shorthand for `DECIMAL` without precision and scale.
    pub const fn decimal() -> Type {
        Type::Decimal {
            precision: None,
            scale: None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_exact_numeric(&self) -> bool {
        matches!(self, Type::Int4 | Type::Int8 | Type::Decimal { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_exact_numeric() || matches!(self, Type::Float4 | Type::Float8)
    }

    pub fn is_character(&self) -> bool {
        matches!(self, Type::Character { .. })
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self, Type::Date | Type::Time | Type::Timestamp)
    }

    /// Position of a numeric type in the widening chain, `None` for non numeric types.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Int4 => Some(0),
            Type::Int8 => Some(1),
            Type::Decimal { .. } => Some(2),
            Type::Float4 => Some(3),
            Type::Float8 => Some(4),
            _ => None,
        }
    }

    /// Returns `Some(type)` where `type` can hold both values of `lhs` and `rhs`.
    /// If such type does not exist `None` is returned.
    pub fn coercion(lhs: &Type, rhs: &Type) -> Option<Type> {
        if lhs == rhs {
            return Some(*lhs);
        }

        match (lhs, rhs) {
            (Type::Unknown, other) | (other, Type::Unknown) => Some(*other),
            (Type::Decimal { .. }, Type::Decimal { .. }) => Some(Type::decimal()),
            (Type::Float4, Type::Int8 | Type::Decimal { .. })
            | (Type::Int8 | Type::Decimal { .. }, Type::Float4) => Some(Type::Float8),
            (
                Type::Character { length: l, .. },
                Type::Character { length: r, .. },
            ) => Some(Type::Character {
                varying: true,
                length: match (l, r) {
                    (Some(l), Some(r)) => Some(*l.max(r)),
                    _ => None,
                },
            }),
            _ => {
                let l = lhs.numeric_rank()?;
                let r = rhs.numeric_rank()?;
                Some(if l >= r { *lhs } else { *rhs })
            }
        }
    }

    /// Returns `true` if a value of type `from` can be passed to a parameter declared as `to`
    /// without an explicit cast.
    ///
    /// Only widening conversions qualify, so the relation is a partial order which is used to
    /// rank function overloads.
    pub fn is_parameter_application_convertible(from: &Type, to: &Type) -> bool {
        if from == to || from.is_unknown() {
            return true;
        }
        match (from, to) {
            (Type::Int4, Type::Int8) => true,
            (Type::Int4 | Type::Int8, Type::Decimal { .. }) => true,
            (Type::Decimal { .. }, Type::Decimal { precision: None, .. }) => true,
            (Type::Int4 | Type::Int8 | Type::Decimal { .. } | Type::Float4, Type::Float8) => true,
            (
                Type::Character {
                    length: from_length,
                    ..
                },
                Type::Character {
                    varying: true,
                    length: to_length,
                },
            ) => match (from_length, to_length) {
                (_, None) => true,
                (Some(f), Some(t)) => f <= t,
                (None, Some(_)) => false,
            },
            _ => false,
        }
    }

    /// Returns `true` if a value of type `from` can be stored into a column of type `to`.
    pub fn is_assignment_convertible(from: &Type, to: &Type) -> bool {
        Type::is_parameter_application_convertible(from, to)
            || (from.is_numeric() && to.is_numeric())
            || (from.is_character() && to.is_character())
            || (from.is_datetime() && from == to)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "BOOLEAN"),
            Type::Int4 => write!(f, "INT"),
            Type::Int8 => write!(f, "BIGINT"),
            Type::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => write!(f, "DECIMAL({p}, {s})"),
            Type::Decimal {
                precision: Some(p),
                scale: None,
            } => write!(f, "DECIMAL({p})"),
            Type::Decimal { .. } => write!(f, "DECIMAL(*)"),
            Type::Float4 => write!(f, "REAL"),
            Type::Float8 => write!(f, "DOUBLE PRECISION"),
            Type::Character { varying, length } => {
                let name = if *varying { "VARCHAR" } else { "CHAR" };
                match length {
                    Some(length) => write!(f, "{name}({length})"),
                    None => write!(f, "{name}(*)"),
                }
            }
            Type::Date => write!(f, "DATE"),
            Type::Time => write!(f, "TIME"),
            Type::Timestamp => write!(f, "TIMESTAMP"),
            Type::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_coercion(t1: &Type, t2: &Type, expected: Type) {
        let output = Type::coercion(t1, t2).unwrap();
        assert_eq!(expected, output);
        let output = Type::coercion(t2, t1).unwrap();
        assert_eq!(expected, output);
    }

    fn assert_coercion_none(t1: &Type, t2: &Type) {
        assert!(Type::coercion(t1, t2).is_none());
        assert!(Type::coercion(t2, t1).is_none());
    }

    fn varchar(length: u32) -> Type {
        Type::Character {
            varying: true,
            length: Some(length),
        }
    }

    #[test]
    fn type_coercion_same_type() {
        for ty in [
            Type::Boolean,
            Type::Int4,
            Type::Int8,
            Type::Float4,
            Type::Float8,
            Type::Date,
            Type::Time,
            Type::Timestamp,
        ] {
            assert_coercion(&ty, &ty, ty);
        }
    }

    #[test]
    fn type_coercion_numeric() {
        assert_coercion(&Type::Int4, &Type::Int8, Type::Int8);
        assert_coercion(&Type::Int8, &Type::decimal(), Type::decimal());
        assert_coercion(&Type::Int4, &Type::Float4, Type::Float4);
        assert_coercion(&Type::Int8, &Type::Float4, Type::Float8);
        assert_coercion(&Type::Float4, &Type::Float8, Type::Float8);
    }

    #[test]
    fn type_coercion_unknown_takes_other_side() {
        assert_coercion(&Type::Unknown, &Type::Date, Type::Date);
        assert_coercion(&Type::Unknown, &Type::Int4, Type::Int4);
    }

    #[test]
    fn type_coercion_character_widens() {
        assert_coercion(&varchar(3), &varchar(10), varchar(10));
        assert_coercion(&varchar(3), &Type::varchar(), Type::varchar());
    }

    #[test]
    fn type_coercion_none() {
        assert_coercion_none(&Type::Float4, &Type::varchar());
        assert_coercion_none(&Type::Date, &Type::Timestamp);
        assert_coercion_none(&Type::Boolean, &Type::Int4);
    }

    #[test]
    fn parameter_application_is_widening_only() {
        assert!(Type::is_parameter_application_convertible(
            &Type::Int4,
            &Type::Int8
        ));
        assert!(!Type::is_parameter_application_convertible(
            &Type::Int8,
            &Type::Int4
        ));
        assert!(Type::is_parameter_application_convertible(
            &Type::decimal(),
            &Type::Float8
        ));
        assert!(!Type::is_parameter_application_convertible(
            &Type::Float8,
            &Type::decimal()
        ));
        assert!(Type::is_parameter_application_convertible(
            &Type::Unknown,
            &Type::Boolean
        ));
    }

    #[test]
    fn parameter_application_character_lengths() {
        assert!(Type::is_parameter_application_convertible(
            &varchar(5),
            &varchar(10)
        ));
        assert!(!Type::is_parameter_application_convertible(
            &varchar(10),
            &varchar(5)
        ));
        assert!(!Type::is_parameter_application_convertible(
            &Type::varchar(),
            &varchar(5)
        ));
    }

    #[test]
    fn assignment_allows_narrowing_numeric() {
        assert!(Type::is_assignment_convertible(&Type::Float8, &Type::Int4));
        assert!(!Type::is_assignment_convertible(
            &Type::Int4,
            &Type::Boolean
        ));
    }

    #[test]
    fn display_types() {
        assert_eq!(varchar(10).to_string(), "VARCHAR(10)");
        assert_eq!(
            Type::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
            .to_string(),
            "DECIMAL(10, 2)"
        );
        assert_eq!(Type::Int8.to_string(), "BIGINT");
    }
}
