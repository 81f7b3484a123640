use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::{schema::Type, value::Value};

/// Default value of a column, used by writes which do not mention the column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// Column has no default - writes must always provide a value.
    Nothing,
    Value(Value),
}

/// [`ColumnDecl`] stores the declaration of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDecl {
    name: String,
    ty: Type,
    nullable: bool,
    default: ColumnDefault,
}

impl ColumnDecl {
    pub fn new(name: impl Into<String>, ty: Type, nullable: bool, default: ColumnDefault) -> Self {
        ColumnDecl {
            name: name.into(),
            ty,
            nullable,
            default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> &ColumnDefault {
        &self.default
    }
}

/// Error for [`TableDecl`] related operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableDeclError {
    /// While creating [`TableDecl`] there were more than one column with the same name
    #[error("column '{0}' was defined more than once")]
    DuplicatedColumn(String),
    /// A column referred by an index does not exist in the table
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
}

/// [`TableDecl`] stores the declaration of a single table.
#[derive(Debug, PartialEq)]
pub struct TableDecl {
    /// Name of the schema which owns the table.
    schema: String,
    name: String,
    /// Columns in declaration order.
    columns: Vec<ColumnDecl>,
    /// Maps each column name to its position in `columns`.
    columns_by_name: HashMap<String, usize>,
}

impl TableDecl {
    /// Creates new [`TableDecl`].
    /// Can fail if the columns contain more than one column with the same name.
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnDecl>,
    ) -> Result<Self, TableDeclError> {
        let mut columns_by_name = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if columns_by_name.insert(column.name.clone(), idx).is_some() {
                return Err(TableDeclError::DuplicatedColumn(column.name.clone()));
            }
        }
        Ok(TableDecl {
            schema: schema.into(),
            name: name.into(),
            columns,
            columns_by_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnDecl] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDecl> {
        self.column_position(name).map(|idx| &self.columns[idx])
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns_by_name.get(name).copied()
    }
}

/// [`ViewDecl`] describes a named query - only its output columns are visible to the analyzer.
#[derive(Debug, PartialEq)]
pub struct ViewDecl {
    schema: String,
    name: String,
    columns: Vec<ColumnDecl>,
}

impl ViewDecl {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDecl>) -> Self {
        ViewDecl {
            schema: schema.into(),
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnDecl] {
        &self.columns
    }
}

/// Any relation stored in a schema.
#[derive(Debug, Clone)]
pub enum RelationDecl {
    Table(Arc<TableDecl>),
    View(Arc<ViewDecl>),
}

impl RelationDecl {
    pub fn name(&self) -> &str {
        match self {
            RelationDecl::Table(table) => table.name(),
            RelationDecl::View(view) => view.name(),
        }
    }

    pub fn columns(&self) -> &[ColumnDecl] {
        match self {
            RelationDecl::Table(table) => table.columns(),
            RelationDecl::View(view) => view.columns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascendant,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexFeatures {
    pub primary: bool,
    pub unique: bool,
}

impl IndexFeatures {
    pub fn primary() -> Self {
        IndexFeatures {
            primary: true,
            unique: true,
        }
    }
}

/// [`IndexDecl`] describes an index over a table.
///
/// Every table has exactly one primary index (possibly without keys), which by convention
/// has the same name as the table.
#[derive(Debug, PartialEq)]
pub struct IndexDecl {
    name: Option<String>,
    table: Arc<TableDecl>,
    keys: Vec<IndexKey>,
    values: Vec<String>,
    features: IndexFeatures,
}

impl IndexDecl {
    /// Creates new [`IndexDecl`].
    /// Can fail if any key or value refers to a column which is not declared in `table`.
    pub fn new(
        name: Option<String>,
        table: Arc<TableDecl>,
        keys: Vec<IndexKey>,
        values: Vec<String>,
        features: IndexFeatures,
    ) -> Result<Self, TableDeclError> {
        let referred = keys.iter().map(|k| &k.column).chain(values.iter());
        for column in referred {
            if table.column(column).is_none() {
                return Err(TableDeclError::ColumnNotFound(column.clone()));
            }
        }
        Ok(IndexDecl {
            name,
            table,
            keys,
            values,
            features,
        })
    }

    /// Creates the primary index of `table` keyed by `keys`.
    pub fn primary(table: Arc<TableDecl>, keys: Vec<IndexKey>) -> Result<Self, TableDeclError> {
        let name = Some(table.name().to_string());
        IndexDecl::new(name, table, keys, vec![], IndexFeatures::primary())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn table(&self) -> &Arc<TableDecl> {
        &self.table
    }

    pub fn keys(&self) -> &[IndexKey] {
        &self.keys
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn features(&self) -> IndexFeatures {
        self.features
    }

    pub fn is_primary(&self) -> bool {
        self.features.primary
    }

    /// Returns `true` if `column` is one of the index keys.
    pub fn contains_key(&self, column: &str) -> bool {
        self.keys.iter().any(|k| k.column == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnDecl {
        ColumnDecl::new(name, Type::Int4, true, ColumnDefault::Value(Value::Unknown))
    }

    fn key(name: &str) -> IndexKey {
        IndexKey {
            column: name.into(),
            direction: SortDirection::Ascendant,
        }
    }

    #[test]
    fn table_rejects_duplicated_columns() {
        // given two columns with the same name
        let columns = vec![column("a"), column("a")];

        // when creating the table
        let result = TableDecl::new("public", "t", columns);

        // then the duplicate is reported
        assert_eq!(
            result.unwrap_err(),
            TableDeclError::DuplicatedColumn("a".into())
        );
    }

    #[test]
    fn table_finds_columns_by_name() {
        let table = TableDecl::new("public", "t", vec![column("a"), column("b")]).unwrap();
        assert_eq!(table.column_position("b"), Some(1));
        assert_eq!(table.column("a").unwrap().name(), "a");
        assert!(table.column("c").is_none());
        assert_eq!(table.schema_name(), "public");
    }

    #[test]
    fn index_rejects_unknown_key_column() {
        let table = Arc::new(TableDecl::new("public", "t", vec![column("a")]).unwrap());
        let result = IndexDecl::primary(table, vec![key("x")]);
        assert_eq!(
            result.unwrap_err(),
            TableDeclError::ColumnNotFound("x".into())
        );
    }

    #[test]
    fn primary_index_is_named_after_table() {
        let table = Arc::new(TableDecl::new("public", "t", vec![column("a"), column("b")]).unwrap());
        let index = IndexDecl::primary(table, vec![key("a")]).unwrap();
        assert_eq!(index.name(), Some("t"));
        assert!(index.is_primary());
        assert!(index.contains_key("a"));
        assert!(!index.contains_key("b"));
    }
}
