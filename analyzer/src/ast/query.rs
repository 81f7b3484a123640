use super::{Identifier, Name, Region, ScalarExpression, SetQuantifier};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpression {
    pub kind: QueryKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Specification(QuerySpecification),
    /// `VALUES (...), (...)`
    Values(Vec<Vec<ScalarExpression>>),
    /// `TABLE t`
    Table(Name),
}

/// `SELECT ... FROM ... WHERE ...`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpecification {
    pub quantifier: Option<SetQuantifier>,
    pub select_list: Vec<SelectElement>,
    pub from: Vec<TableReference>,
    pub where_clause: Option<ScalarExpression>,
    pub group_by: Vec<ScalarExpression>,
    pub having: Option<ScalarExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectElement {
    Column {
        value: ScalarExpression,
        alias: Option<Identifier>,
    },
    /// `*` or `q.*`
    Asterisk {
        qualifier: Option<Name>,
        region: Region,
    },
}

/// `AS name (column, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Cross,
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Table {
        name: Name,
        correlation: Option<Correlation>,
    },
    Derived {
        query: Box<QueryExpression>,
        correlation: Correlation,
    },
    Join {
        kind: JoinKind,
        left: Box<TableReference>,
        right: Box<TableReference>,
        condition: Option<ScalarExpression>,
    },
}

impl QueryExpression {
    pub fn new(kind: QueryKind, region: Region) -> Self {
        QueryExpression { kind, region }
    }

    pub fn values(rows: Vec<Vec<ScalarExpression>>) -> Self {
        QueryExpression::new(QueryKind::Values(rows), Region::default())
    }

    pub fn specification(specification: QuerySpecification) -> Self {
        QueryExpression::new(QueryKind::Specification(specification), Region::default())
    }
}

impl TableReference {
    pub fn table(name: impl Into<Name>) -> Self {
        TableReference::Table {
            name: name.into(),
            correlation: None,
        }
    }
}

impl SelectElement {
    pub fn column(value: ScalarExpression) -> Self {
        SelectElement::Column { value, alias: None }
    }

    pub fn asterisk() -> Self {
        SelectElement::Asterisk {
            qualifier: None,
            region: Region::default(),
        }
    }
}
