//! Fixtures shared by the unit tests.

use std::sync::Arc;

use metadata::{
    catalog::{Catalog, SearchPath, SharedCatalog},
    function::VariableDecl,
    schema::{MemoryVariableProvider, VariableProvider},
    table::TableDecl,
};
use types::schema::Type;

use crate::{
    ast::{Literal, Name, ScalarExpression, Statement, StatementKind},
    context::{AnalyzerContext, PlaceholderMap, SchemaEnvironment},
    diagnostic::DiagnosticCode,
    options::AnalyzerOptions,
    relation_info::RelationInfo,
};

const CATALOG_JSON: &str = include_str!("../testdata/catalog.json");

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Catalog `db` with schemas `public` and `other`, see `testdata/catalog.json`.
pub(crate) fn catalog() -> SharedCatalog {
    Catalog::from_json_str(CATALOG_JSON)
        .expect("fixture catalog is valid")
        .into_shared()
}

pub(crate) fn environment() -> SchemaEnvironment {
    let catalog = catalog();
    let public = catalog
        .read()
        .find_schema("public")
        .expect("fixture has public schema");
    SchemaEnvironment {
        catalog,
        search_path: SearchPath::new(vec![Arc::clone(&public)]),
        default_schema: public,
    }
}

/// Host parameters: `:p` of type INT.
pub(crate) fn host_parameters() -> Arc<dyn VariableProvider> {
    let mut provider = MemoryVariableProvider::default();
    provider
        .add(VariableDecl::new("p", Type::Int4))
        .expect("fixture parameter is unique");
    Arc::new(provider)
}

pub(crate) fn context_with(options: AnalyzerOptions) -> AnalyzerContext {
    init_logging();
    let mut placeholders = PlaceholderMap::new();
    placeholders.insert("ph", types::value::Value::Int8(42), Type::Int8);
    let mut context = AnalyzerContext::new();
    context.initialize(options, environment(), placeholders, Some(host_parameters()));
    context
}

pub(crate) fn context() -> AnalyzerContext {
    context_with(AnalyzerOptions::default())
}

/// Returns table `name` of the public schema.
pub(crate) fn table(context: &AnalyzerContext, name: &str) -> Arc<TableDecl> {
    context
        .default_schema()
        .storage_provider()
        .find_table(name)
        .expect("fixture table exists")
}

/// A scan of table `name` exposed under its own name.
pub(crate) fn scan(context: &mut AnalyzerContext, name: &str) -> RelationInfo {
    scan_as(context, name, name)
}

pub(crate) fn scan_as(context: &mut AnalyzerContext, table_name: &str, alias: &str) -> RelationInfo {
    let table = table(context, table_name);
    let index = context
        .primary_index_of(&table)
        .expect("fixture table has primary index");
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let variable = context.create_stream_variable(column.ty());
            (column.name().to_string(), variable)
        })
        .collect();
    RelationInfo::scan(table, index, Some(alias.to_string()), columns)
}

pub(crate) fn int(value: i64) -> ScalarExpression {
    ScalarExpression::literal(Literal::ExactNumeric(value.to_string()))
}

pub(crate) fn string(value: &str) -> ScalarExpression {
    ScalarExpression::literal(Literal::CharacterString(value.to_string()))
}

pub(crate) fn null() -> ScalarExpression {
    ScalarExpression::literal(Literal::Null)
}

pub(crate) fn var(name: &str) -> ScalarExpression {
    ScalarExpression::variable(Name::from(name))
}

pub(crate) fn statement(kind: StatementKind) -> Statement {
    Statement::from(kind)
}

/// Returns codes of all diagnostics recorded in `context`.
pub(crate) fn codes(context: &AnalyzerContext) -> Vec<DiagnosticCode> {
    context.diagnostics().iter().map(|d| d.code).collect()
}
