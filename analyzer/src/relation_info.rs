//! Columns visible while lowering a query, grouped by the relation providing them.

use std::sync::Arc;

use metadata::table::{IndexDecl, TableDecl};
use thiserror::Error;

use crate::ir::Variable;

/// Error for [`RelationInfo`] related operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RelationInfoError {
    #[error("columns of a joined relation cannot be renamed")]
    RenameJoinColumns,
    #[error("relation has {expected} columns, but {actual} names were given")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("columns can only be added to a projection")]
    NotProjection,
}

/// Where a column of a relation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// A column read from a table.
    Table,
    /// A column computed by a query, e.g. an item of a derived table.
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationColumn {
    name: Option<String>,
    variable: Variable,
    origin: ColumnOrigin,
    /// Only exported columns are visible to unqualified lookups and to consumers.
    exported: bool,
}

impl RelationColumn {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn origin(&self) -> ColumnOrigin {
        self.origin
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }
}

/// Columns read from a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanInfo {
    table: Arc<TableDecl>,
    index: Arc<IndexDecl>,
    name: Option<String>,
    columns: Vec<RelationColumn>,
}

impl ScanInfo {
    pub fn table(&self) -> &Arc<TableDecl> {
        &self.table
    }

    pub fn index(&self) -> &Arc<IndexDecl> {
        &self.index
    }
}

/// Columns computed by a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectionInfo {
    name: Option<String>,
    columns: Vec<RelationColumn>,
}

/// Relations combined by a join. Nested joins are flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    name: Option<String>,
    elements: Vec<RelationInfo>,
}

impl JoinInfo {
    pub fn elements(&self) -> &[RelationInfo] {
        &self.elements
    }
}

/// Result of a name lookup which may match several entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
    Ambiguous,
}

impl<T> Lookup<T> {
    /// Combines results of looking up the same name in several places.
    fn merge(self, other: Lookup<T>) -> Lookup<T> {
        match (self, other) {
            (Lookup::Ambiguous, _) | (_, Lookup::Ambiguous) => Lookup::Ambiguous,
            (Lookup::Found(_), Lookup::Found(_)) => Lookup::Ambiguous,
            (Lookup::Found(found), Lookup::Missing) | (Lookup::Missing, Lookup::Found(found)) => {
                Lookup::Found(found)
            }
            (Lookup::Missing, Lookup::Missing) => Lookup::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationInfo {
    Scan(ScanInfo),
    Projection(ProjectionInfo),
    Join(JoinInfo),
}

impl RelationInfo {
    /// Describes a scan of `table`; `columns` pair each declared column with its variable.
    pub fn scan(
        table: Arc<TableDecl>,
        index: Arc<IndexDecl>,
        name: Option<String>,
        columns: Vec<(String, Variable)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, variable)| RelationColumn {
                name: Some(name),
                variable,
                origin: ColumnOrigin::Table,
                exported: true,
            })
            .collect();
        RelationInfo::Scan(ScanInfo {
            table,
            index,
            name,
            columns,
        })
    }

    pub fn projection(name: Option<String>) -> Self {
        RelationInfo::Projection(ProjectionInfo {
            name,
            columns: vec![],
        })
    }

    /// Joins two relations. Unnamed joins on either side are flattened into the result.
    pub fn join(left: RelationInfo, right: RelationInfo) -> Self {
        let mut elements = vec![];
        for side in [left, right] {
            match side {
                RelationInfo::Join(JoinInfo {
                    name: None,
                    elements: nested,
                }) => elements.extend(nested),
                other => elements.push(other),
            }
        }
        RelationInfo::Join(JoinInfo {
            name: None,
            elements,
        })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            RelationInfo::Scan(scan) => scan.name.as_deref(),
            RelationInfo::Projection(projection) => projection.name.as_deref(),
            RelationInfo::Join(join) => join.name.as_deref(),
        }
    }

    pub fn rename_relation(&mut self, name: Option<String>) {
        match self {
            RelationInfo::Scan(scan) => scan.name = name,
            RelationInfo::Projection(projection) => projection.name = name,
            RelationInfo::Join(join) => join.name = name,
        }
    }

    /// Renames all columns at once. Fails without changes if the number of names differs.
    pub fn rename_columns(&mut self, names: Vec<String>) -> Result<(), RelationInfoError> {
        let columns = match self {
            RelationInfo::Scan(scan) => &mut scan.columns,
            RelationInfo::Projection(projection) => &mut projection.columns,
            RelationInfo::Join(_) => return Err(RelationInfoError::RenameJoinColumns),
        };
        if columns.len() != names.len() {
            return Err(RelationInfoError::ColumnCountMismatch {
                expected: columns.len(),
                actual: names.len(),
            });
        }
        for (column, name) in columns.iter_mut().zip(names) {
            column.name = Some(name);
        }
        Ok(())
    }

    /// Appends an exported column to a projection.
    pub fn add_column(
        &mut self,
        variable: Variable,
        name: Option<String>,
    ) -> Result<(), RelationInfoError> {
        self.push_column(variable, name, true)
    }

    /// Appends a column to a projection which only qualified lookups can see.
    pub fn add_hidden_column(
        &mut self,
        variable: Variable,
        name: Option<String>,
    ) -> Result<(), RelationInfoError> {
        self.push_column(variable, name, false)
    }

    fn push_column(
        &mut self,
        variable: Variable,
        name: Option<String>,
        exported: bool,
    ) -> Result<(), RelationInfoError> {
        match self {
            RelationInfo::Projection(projection) => {
                projection.columns.push(RelationColumn {
                    name,
                    variable,
                    origin: ColumnOrigin::Derived,
                    exported,
                });
                Ok(())
            }
            _ => Err(RelationInfoError::NotProjection),
        }
    }

    /// Finds an exported column by name.
    pub fn find(&self, name: &str) -> Lookup<&RelationColumn> {
        self.find_column(name, true)
    }

    /// Finds a column by name through a relation qualifier, which also reaches hidden columns.
    pub fn find_qualified(&self, name: &str) -> Lookup<&RelationColumn> {
        self.find_column(name, false)
    }

    fn find_column(&self, name: &str, exported_only: bool) -> Lookup<&RelationColumn> {
        let columns = match self {
            RelationInfo::Scan(scan) => &scan.columns,
            RelationInfo::Projection(projection) => &projection.columns,
            RelationInfo::Join(join) => {
                return join
                    .elements
                    .iter()
                    .map(|element| element.find_column(name, exported_only))
                    .fold(Lookup::Missing, Lookup::merge);
            }
        };
        columns
            .iter()
            .filter(|column| !exported_only || column.exported)
            .filter(|column| column.name.as_deref() == Some(name))
            .map(Lookup::Found)
            .fold(Lookup::Missing, Lookup::merge)
    }

    /// Visits every column in order, joined relations left to right.
    pub fn enumerate<'r>(&'r self, consumer: &mut impl FnMut(&'r RelationColumn)) {
        match self {
            RelationInfo::Scan(scan) => scan.columns.iter().for_each(consumer),
            RelationInfo::Projection(projection) => projection.columns.iter().for_each(consumer),
            RelationInfo::Join(join) => {
                for element in &join.elements {
                    element.enumerate(consumer);
                }
            }
        }
    }

    /// Returns exported columns in order.
    pub fn exported_columns(&self) -> Vec<&RelationColumn> {
        let mut columns = vec![];
        self.enumerate(&mut |column| {
            if column.exported {
                columns.push(column);
            }
        });
        columns
    }

    /// Returns the number of columns, hidden ones included.
    pub fn count(&self) -> usize {
        let mut count = 0;
        self.enumerate(&mut |_| count += 1);
        count
    }

    /// Returns the relation named `name` among `self` and, for unnamed joins, its elements.
    fn find_relation(&self, name: &str) -> Lookup<&RelationInfo> {
        match self {
            RelationInfo::Join(JoinInfo {
                name: None,
                elements,
            }) => elements
                .iter()
                .map(|element| element.find_relation(name))
                .fold(Lookup::Missing, Lookup::merge),
            _ if self.name() == Some(name) => Lookup::Found(self),
            _ => Lookup::Missing,
        }
    }

    /// Returns unrenamed scans of `table` in `schema`.
    fn find_table_scan(&self, schema: &str, table: &str) -> Lookup<&RelationInfo> {
        match self {
            RelationInfo::Scan(scan)
                if scan.table.schema_name() == schema
                    && scan.table.name() == table
                    && scan.name.as_deref() == Some(table) =>
            {
                Lookup::Found(self)
            }
            RelationInfo::Join(JoinInfo {
                name: None,
                elements,
            }) => elements
                .iter()
                .map(|element| element.find_table_scan(schema, table))
                .fold(Lookup::Missing, Lookup::merge),
            _ => Lookup::Missing,
        }
    }
}

/// Relations visible to expressions of a query, in the order they were introduced.
#[derive(Debug, Clone, Default)]
pub struct QueryScope {
    relations: Vec<RelationInfo>,
}

impl QueryScope {
    pub fn new() -> Self {
        QueryScope::default()
    }

    pub fn add(&mut self, relation: RelationInfo) {
        self.relations.push(relation);
    }

    pub fn relations(&self) -> &[RelationInfo] {
        &self.relations
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn find_relation(&self, name: &str) -> Lookup<&RelationInfo> {
        self.relations
            .iter()
            .map(|relation| relation.find_relation(name))
            .fold(Lookup::Missing, Lookup::merge)
    }

    /// Finds a relation qualified by its schema, e.g. `public.t` in `public.t.c`.
    pub fn find_relation_in_schema(&self, schema: &str, name: &str) -> Lookup<&RelationInfo> {
        self.relations
            .iter()
            .map(|relation| relation.find_table_scan(schema, name))
            .fold(Lookup::Missing, Lookup::merge)
    }

    /// Finds an exported column of any relation.
    pub fn find_column(&self, name: &str) -> Lookup<&RelationColumn> {
        self.relations
            .iter()
            .map(|relation| relation.find(name))
            .fold(Lookup::Missing, Lookup::merge)
    }
}

impl From<RelationInfo> for QueryScope {
    fn from(relation: RelationInfo) -> Self {
        QueryScope {
            relations: vec![relation],
        }
    }
}
