use std::sync::Arc;

use metadata::{
    schema::SchemaDecl,
    table::{IndexDecl, TableDecl},
};

use super::{Expression, WriteKind};

/// Statements which are executed without an operator graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Write(WriteStatement),
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    DropTable(DropTable),
    DropIndex(DropIndex),
    /// Nothing to execute, e.g. `CREATE TABLE IF NOT EXISTS` on an existing table.
    Empty,
}

/// Writes constant rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteStatement {
    pub kind: WriteKind,
    pub table: Arc<TableDecl>,
    pub index: Arc<IndexDecl>,
    /// Written columns; each tuple holds one value per column.
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub schema: Arc<SchemaDecl>,
    pub table: Arc<TableDecl>,
    pub primary_index: Arc<IndexDecl>,
}

#[derive(Debug, Clone)]
pub struct CreateIndex {
    pub schema: Arc<SchemaDecl>,
    pub index: Arc<IndexDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub table: Arc<TableDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropIndex {
    pub index: Arc<IndexDecl>,
}

/// Compares schemas by name, their providers are not comparable.
impl PartialEq for CreateTable {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self.table == other.table
            && self.primary_index == other.primary_index
    }
}

impl PartialEq for CreateIndex {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.index == other.index
    }
}
