//! Syntax tree consumed by the analyzer.
//!
//! Trees are produced by a SQL front end (not part of this crate) and are owned top-down:
//! every child is boxed or stored in a vector of its parent. Each node carries the [`Region`]
//! of source text it was parsed from, so diagnostics can point back at it.

use std::fmt;

mod query;
mod scalar;
mod statement;

pub use query::*;
pub use scalar::*;
pub use statement::*;

/// Half-open byte range `[begin, end)` of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub begin: usize,
    pub end: usize,
}

impl Region {
    pub fn new(begin: usize, end: usize) -> Self {
        Region { begin, end }
    }

    /// Returns the smallest region covering both `self` and `other`.
    pub fn merge(self, other: Region) -> Region {
        Region {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.begin, self.end)
    }
}

/// A single identifier token.
///
/// Delimited identifiers (`"Foo"`) keep their case, regular ones are normalized by the
/// analyzer options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub token: String,
    pub delimited: bool,
    pub region: Region,
}

impl Identifier {
    pub fn regular(token: impl Into<String>) -> Self {
        Identifier {
            token: token.into(),
            delimited: false,
            region: Region::default(),
        }
    }

    pub fn delimited(token: impl Into<String>) -> Self {
        Identifier {
            token: token.into(),
            delimited: true,
            region: Region::default(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delimited {
            write!(f, "\"{}\"", self.token.replace('"', "\"\""))
        } else {
            write!(f, "{}", self.token)
        }
    }
}

/// A possibly qualified name, e.g. `schema.table.column`.
///
/// A name always has at least one identifier: `last` is the name itself and `qualifier`
/// holds the leading identifiers, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    qualifier: Vec<Identifier>,
    last: Identifier,
}

impl Name {
    pub fn simple(identifier: Identifier) -> Self {
        Name {
            qualifier: vec![],
            last: identifier,
        }
    }

    /// Appends `identifier` to `self`, which becomes its qualifier.
    pub fn qualify(self, identifier: Identifier) -> Self {
        let mut qualifier = self.qualifier;
        qualifier.push(self.last);
        Name {
            qualifier,
            last: identifier,
        }
    }

    pub fn qualifier(&self) -> &[Identifier] {
        &self.qualifier
    }

    pub fn last(&self) -> &Identifier {
        &self.last
    }

    /// Returns the qualifier as a name of its own, e.g. `s.t` for `s.t.c`.
    pub fn qualifier_name(&self) -> Option<Name> {
        let (first, rest) = self.qualifier.split_first()?;
        Some(
            rest.iter()
                .cloned()
                .fold(Name::simple(first.clone()), Name::qualify),
        )
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.qualifier.iter().chain(std::iter::once(&self.last))
    }

    pub fn region(&self) -> Region {
        match self.qualifier.first() {
            Some(first) => first.region.merge(self.last.region),
            None => self.last.region,
        }
    }
}

/// Builds a name of regular identifiers from dotted text, e.g. `"public.t"`.
impl From<&str> for Name {
    fn from(value: &str) -> Self {
        let mut parts = value.split('.').map(Identifier::regular);
        // `split` always yields at least one item
        let first = parts.next().unwrap_or_else(|| Identifier::regular(""));
        parts.fold(Name::simple(first), Name::qualify)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for identifier in &self.qualifier {
            write!(f, "{identifier}.")?;
        }
        write!(f, "{}", self.last)
    }
}

/// Literal tokens. Numeric and datetime literals keep their source text, the analyzer
/// decides their type and checks their range.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    /// The `UNKNOWN` truth value.
    Unknown,
    Boolean(bool),
    ExactNumeric(String),
    ApproximateNumeric(String),
    CharacterString(String),
    Date(String),
    Time(String),
    Timestamp(String),
}

/// Type names as written in `CAST` and column definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Boolean,
    Int,
    BigInt,
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Real,
    DoublePrecision,
    Char(Option<u32>),
    Varchar(Option<u32>),
    Date,
    Time,
    Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_dotted_text() {
        let name = Name::from("public.t.c");
        assert_eq!(name.qualifier().len(), 2);
        assert_eq!(name.last().token, "c");
        assert_eq!(name.to_string(), "public.t.c");
    }

    #[test]
    fn name_region_covers_all_identifiers() {
        let name = Name::simple(Identifier::regular("t").with_region(Region::new(3, 4)))
            .qualify(Identifier::regular("c").with_region(Region::new(5, 6)));
        assert_eq!(name.region(), Region::new(3, 6));
    }

    #[test]
    fn delimited_identifier_display_escapes_quotes() {
        assert_eq!(Identifier::delimited("a\"b").to_string(), "\"a\"\"b\"");
    }
}
