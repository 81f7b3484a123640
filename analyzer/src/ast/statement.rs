use super::{Identifier, Name, QueryExpression, Region, ScalarExpression, TypeName};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Select(QueryExpression),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(TableDefinition),
    CreateIndex(IndexDefinition),
    DropTable(DropStatement),
    DropIndex(DropStatement),
    /// A statement without any effect, e.g. a lone `;`.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOption {
    /// `INSERT OR IGNORE`, skips rows whose primary key already exists.
    OrIgnore,
    /// `INSERT OR REPLACE`, overwrites rows whose primary key already exists.
    OrReplace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: Name,
    /// Target columns, empty means all columns in declaration order.
    pub columns: Vec<Identifier>,
    pub source: QueryExpression,
    pub options: Vec<InsertOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetElement {
    pub target: Identifier,
    pub value: ScalarExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: Name,
    pub set: Vec<SetElement>,
    pub where_clause: Option<ScalarExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: Name,
    pub where_clause: Option<ScalarExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: Name,
    pub elements: Vec<TableElement>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableElement {
    Column(ColumnDefinition),
    Constraint(TableConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Identifier,
    pub ty: TypeName,
    pub constraints: Vec<ColumnConstraint>,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConstraint {
    pub kind: ColumnConstraintKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraintKind {
    Null,
    NotNull,
    PrimaryKey,
    Default(ScalarExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    pub kind: TableConstraintKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintKind {
    PrimaryKey(Vec<SortElement>),
    Unique(Vec<SortElement>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingDirection {
    Ascendant,
    Descendant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    First,
    Last,
}

/// Key of an index or primary key: `key [ASC|DESC] [NULLS FIRST|LAST]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortElement {
    pub key: ScalarExpression,
    pub direction: Option<OrderingDirection>,
    pub null_order: Option<NullOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Anonymous indexes are allowed.
    pub name: Option<Name>,
    pub table: Name,
    pub keys: Vec<SortElement>,
    /// Columns stored in the index in addition to its keys.
    pub values: Vec<Identifier>,
    pub unique: bool,
    pub if_not_exists: bool,
}

/// `DROP TABLE` and `DROP INDEX`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropStatement {
    pub name: Name,
    pub if_exists: bool,
    pub cascade: bool,
    pub restrict: bool,
}

impl Statement {
    pub fn new(kind: StatementKind, region: Region) -> Self {
        Statement { kind, region }
    }
}

impl From<StatementKind> for Statement {
    fn from(kind: StatementKind) -> Self {
        Statement::new(kind, Region::default())
    }
}

impl SortElement {
    pub fn new(key: ScalarExpression) -> Self {
        SortElement {
            key,
            direction: None,
            null_order: None,
        }
    }
}
