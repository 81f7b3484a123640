//! Lowering of statements into operator graphs or standalone statements.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::debug;
use metadata::{
    schema::SchemaDecl,
    table::{
        ColumnDecl, ColumnDefault, IndexDecl, IndexFeatures, IndexKey, SortDirection, TableDecl,
    },
};
use types::{schema::Type, value::Value};

use crate::{
    ast::{
        ColumnConstraintKind, ColumnDefinition, DeleteStatement, DropStatement, IndexDefinition,
        InsertOption, InsertStatement, Name, OrderingDirection, QueryExpression, Region,
        ScalarExpression, SortElement, StatementKind, TableConstraintKind, TableDefinition,
        TableElement, UpdateStatement,
    },
    context::AnalyzerContext,
    diagnostic::{AnalyzeResult, DiagnosticCode, Reported},
    ir::{
        self, CreateIndex, CreateTable, DropIndex, DropTable, EmitColumn, Expression, Operator,
        OperatorGraph, ProjectColumn, Variable, Write, WriteColumn, WriteKind, WriteStatement,
    },
    query::{LoweredScan, QueryLowerer, lower_scan},
    relation_info::{Lookup, QueryScope, RelationInfo},
    resolver::{FindResult, Symbol, SymbolKind, SymbolResolver},
    scalar::{lower_scalar, lower_type},
    typing,
};

/// Result of lowering a single statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LoweredStatement {
    Execution(OperatorGraph),
    Statement(ir::Statement),
}

pub(crate) fn lower_statement(
    context: &mut AnalyzerContext,
    statement: &crate::ast::Statement,
    lowerer: &dyn QueryLowerer,
) -> AnalyzeResult<LoweredStatement> {
    let mut statement_lowerer = StatementLowerer { context, lowerer };
    statement_lowerer.lower(statement)
}

/// A column definition of `CREATE TABLE` after checking its constraints.
struct ColumnSpec {
    name: String,
    ty: Type,
    nullable: bool,
    primary_key: bool,
    default: Option<Value>,
    region: Region,
}

/// Columns of a table visible to key expressions of an index.
struct KeyColumns {
    scope: QueryScope,
    names: HashMap<Variable, String>,
}

struct StatementLowerer<'a> {
    context: &'a mut AnalyzerContext,
    lowerer: &'a dyn QueryLowerer,
}

impl StatementLowerer<'_> {
    fn lower(&mut self, statement: &crate::ast::Statement) -> AnalyzeResult<LoweredStatement> {
        let region = statement.region;
        match &statement.kind {
            StatementKind::Select(query) => self.select(query),
            StatementKind::Insert(insert) => self.insert(insert, region),
            StatementKind::Update(update) => self.update(update, region),
            StatementKind::Delete(delete) => self.delete(delete),
            StatementKind::CreateTable(definition) => self.create_table(definition, region),
            StatementKind::CreateIndex(definition) => self.create_index(definition, region),
            StatementKind::DropTable(drop) => self.drop_table(drop, region),
            StatementKind::DropIndex(drop) => self.drop_index(drop, region),
            StatementKind::Empty => Ok(LoweredStatement::Statement(ir::Statement::Empty)),
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, region: Region) -> Reported {
        self.context.report(code, message, region)
    }

    /// Resolves `name` as a symbol of `kind` outside of any query.
    ///
    /// Returns `None` if nothing is found; mandatory lookups report that instead.
    fn find<T>(
        &mut self,
        name: &Name,
        kind: SymbolKind,
        mandatory: bool,
        extract: impl FnOnce(Symbol<'_>) -> Option<T>,
    ) -> AnalyzeResult<Option<T>> {
        let scope = QueryScope::new();
        let result = SymbolResolver::new(self.context, &scope).resolve(name, kind.into(), mandatory);
        match result {
            FindResult::Found(symbol) => match extract(symbol) {
                Some(found) => Ok(Some(found)),
                None => Err(self.report(
                    DiagnosticCode::UnexpectedSymbol,
                    format!("'{name}' is not a {}", kind.description()),
                    name.region(),
                )),
            },
            FindResult::NotFound => Ok(None),
            FindResult::Error(reported) => Err(reported),
        }
    }

    fn find_table(&mut self, name: &Name, mandatory: bool) -> AnalyzeResult<Option<Arc<TableDecl>>> {
        self.find(name, SymbolKind::TableDecl, mandatory, |symbol| match symbol {
            Symbol::TableDecl(table) => Some(table),
            _ => None,
        })
    }

    fn require_table(&mut self, name: &Name) -> AnalyzeResult<Arc<TableDecl>> {
        match self.find_table(name, true)? {
            Some(table) => Ok(table),
            None => Err(self.report(
                DiagnosticCode::TableNotFound,
                format!("table '{name}' is not found"),
                name.region(),
            )),
        }
    }

    fn find_index(&mut self, name: &Name, mandatory: bool) -> AnalyzeResult<Option<Arc<IndexDecl>>> {
        self.find(name, SymbolKind::IndexDecl, mandatory, |symbol| match symbol {
            Symbol::IndexDecl(index) => Some(index),
            _ => None,
        })
    }

    fn require_schema(&mut self, name: &Name) -> AnalyzeResult<Arc<SchemaDecl>> {
        let schema = self.find(name, SymbolKind::SchemaDecl, true, |symbol| match symbol {
            Symbol::SchemaDecl(schema) => Some(schema),
            _ => None,
        })?;
        match schema {
            Some(schema) => Ok(schema),
            None => Err(self.report(
                DiagnosticCode::SchemaNotFound,
                format!("schema '{name}' is not found"),
                name.region(),
            )),
        }
    }

    fn primary_index(&mut self, table: &TableDecl, region: Region) -> AnalyzeResult<Arc<IndexDecl>> {
        match self.context.primary_index_of(table) {
            Some(index) => Ok(index),
            None => Err(self.report(
                DiagnosticCode::InconsistentTable,
                format!("table '{}' has no primary index", table.name()),
                region,
            )),
        }
    }

    /// Returns `true` if eager type checks are enabled.
    fn validating(&self) -> bool {
        self.context.options().validate_scalar_expressions
    }

    fn check_assignment(&mut self, from: Type, column: &ColumnDecl, region: Region) -> AnalyzeResult<()> {
        if self.validating() && !Type::is_assignment_convertible(&from, &column.ty()) {
            return Err(self.report(
                DiagnosticCode::InconsistentType,
                format!(
                    "value of type {from} cannot be assigned to column '{}' of type {}",
                    column.name(),
                    column.ty()
                ),
                region,
            ));
        }
        Ok(())
    }

    /// Lowers a `WHERE` condition of `UPDATE` or `DELETE`.
    fn condition(&mut self, scope: &QueryScope, condition: &ScalarExpression) -> AnalyzeResult<Expression> {
        let lowered = lower_scalar(self.context, scope, condition, Some(Type::Boolean))?;
        if lowered.saw_aggregate {
            return Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                "aggregate functions are not allowed in WHERE",
                condition.region,
            ));
        }
        Ok(lowered.expression)
    }

    fn select(&mut self, query: &QueryExpression) -> AnalyzeResult<LoweredStatement> {
        let mut graph = OperatorGraph::new();
        let lowered = self
            .lowerer
            .lower_query(self.context, &mut graph, query, &[])?;
        let columns = lowered
            .relation
            .exported_columns()
            .into_iter()
            .map(|column| EmitColumn {
                source: column.variable().clone(),
                name: column.name().map(str::to_string),
            })
            .collect();
        graph.add_operator(Operator::emit(lowered.output, columns));
        Ok(LoweredStatement::Execution(graph))
    }

    fn insert(&mut self, insert: &InsertStatement, region: Region) -> AnalyzeResult<LoweredStatement> {
        let ignore = insert.options.contains(&InsertOption::OrIgnore);
        let replace = insert.options.contains(&InsertOption::OrReplace);
        let kind = match (ignore, replace) {
            (true, true) => {
                return Err(self.report(
                    DiagnosticCode::MalformedSyntax,
                    "INSERT cannot be both OR IGNORE and OR REPLACE",
                    region,
                ));
            }
            (true, false) => WriteKind::InsertSkip,
            (false, true) => WriteKind::InsertOverwrite,
            (false, false) => WriteKind::Insert,
        };
        let table = self.require_table(&insert.table)?;
        let index = self.primary_index(&table, insert.table.region())?;

        let mut targets = Vec::with_capacity(table.columns().len());
        if insert.columns.is_empty() {
            targets.extend(table.columns());
        } else {
            let mut seen = HashSet::new();
            for identifier in &insert.columns {
                let name = self.context.normalize(identifier);
                let Some(column) = table.column(&name) else {
                    return Err(self.report(
                        DiagnosticCode::ColumnNotFound,
                        format!("column '{name}' is not found in table '{}'", table.name()),
                        identifier.region,
                    ));
                };
                if !seen.insert(name) {
                    return Err(self.report(
                        DiagnosticCode::ColumnAlreadyExists,
                        format!("column '{}' is inserted more than once", column.name()),
                        identifier.region,
                    ));
                }
                targets.push(column);
            }
        }

        let hints: Vec<_> = targets.iter().map(|column| Some(column.ty())).collect();
        let mut graph = OperatorGraph::new();
        let source = self
            .lowerer
            .lower_query(self.context, &mut graph, &insert.source, &hints)?;
        let source_columns = source.relation.exported_columns();
        if source_columns.len() != targets.len() {
            return Err(self.report(
                DiagnosticCode::InconsistentColumns,
                format!(
                    "INSERT has {} target columns, but its source produces {}",
                    targets.len(),
                    source_columns.len()
                ),
                insert.source.region,
            ));
        }
        for (column, source_column) in targets.iter().zip(&source_columns) {
            self.check_assignment(**source_column.variable().ty(), column, insert.source.region)?;
        }

        if self.context.options().prefer_write_statement {
            if let [Operator::Values(values)] = graph.operators.as_slice() {
                let columns = targets.iter().map(|column| column.name().to_string()).collect();
                let tuples = values.rows.clone();
                return Ok(LoweredStatement::Statement(ir::Statement::Write(WriteStatement {
                    kind,
                    table: Arc::clone(&table),
                    index,
                    columns,
                    tuples,
                })));
            }
        }

        let mut keys = vec![];
        let mut columns = vec![];
        for (column, source_column) in targets.iter().zip(&source_columns) {
            let write = WriteColumn {
                source: source_column.variable().clone(),
                destination: column.name().to_string(),
            };
            if index.contains_key(column.name()) {
                keys.push(write);
            } else {
                columns.push(write);
            }
        }
        graph.add_operator(Operator::Write(Write {
            input: source.output,
            kind,
            table: Arc::clone(&table),
            index,
            keys,
            columns,
        }));
        Ok(LoweredStatement::Execution(graph))
    }

    /// Maps each primary key column of the scanned table to the variable reading it.
    fn primary_keys(&mut self, scan: &LoweredScan, region: Region) -> AnalyzeResult<Vec<WriteColumn>> {
        let mut keys = Vec::with_capacity(scan.index.keys().len());
        for key in scan.index.keys() {
            let Lookup::Found(column) = scan.relation.find_qualified(&key.column) else {
                return Err(self.report(
                    DiagnosticCode::InconsistentTable,
                    format!(
                        "primary key column '{}' of table '{}' is not readable",
                        key.column,
                        scan.table.name()
                    ),
                    region,
                ));
            };
            keys.push(WriteColumn {
                source: column.variable().clone(),
                destination: key.column.clone(),
            });
        }
        Ok(keys)
    }

    fn update(&mut self, update: &UpdateStatement, region: Region) -> AnalyzeResult<LoweredStatement> {
        if update.set.is_empty() {
            return Err(self.report(
                DiagnosticCode::MalformedSyntax,
                "UPDATE requires at least one SET clause",
                region,
            ));
        }
        let mut graph = OperatorGraph::new();
        let scan = lower_scan(self.context, &mut graph, &update.table)?;
        let keys = self.primary_keys(&scan, update.table.region())?;
        let LoweredScan {
            mut output,
            table,
            index,
            relation,
        } = scan;
        let scope = QueryScope::from(relation);

        if let Some(condition) = &update.where_clause {
            let condition = self.condition(&scope, condition)?;
            output = graph.add_operator(Operator::filter(output, condition));
        }

        let mut seen = HashSet::new();
        let mut projected = Vec::with_capacity(update.set.len());
        let mut columns = Vec::with_capacity(update.set.len());
        for element in &update.set {
            let name = self.context.normalize(&element.target);
            let Some(column) = table.column(&name) else {
                return Err(self.report(
                    DiagnosticCode::ColumnNotFound,
                    format!("column '{name}' is not found in table '{}'", table.name()),
                    element.target.region,
                ));
            };
            if !seen.insert(name.clone()) {
                return Err(self.report(
                    DiagnosticCode::ColumnAlreadyExists,
                    format!("column '{name}' is updated more than once"),
                    element.target.region,
                ));
            }
            let lowered = lower_scalar(self.context, &scope, &element.value, Some(column.ty()))?;
            if lowered.saw_aggregate {
                return Err(self.report(
                    DiagnosticCode::UnsupportedFeature,
                    "aggregate functions are not allowed in SET",
                    element.value.region,
                ));
            }
            if let Ok(ty) = typing::infer(&lowered.expression) {
                self.check_assignment(ty, column, element.value.region)?;
            }
            let variable = self.context.create_stream_variable(column.ty());
            projected.push(ProjectColumn {
                variable: variable.clone(),
                value: lowered.expression,
            });
            columns.push(WriteColumn {
                source: variable,
                destination: name,
            });
        }
        let output = graph.add_operator(Operator::project(output, projected));
        graph.add_operator(Operator::Write(Write {
            input: output,
            kind: WriteKind::Update,
            table,
            index,
            keys,
            columns,
        }));
        Ok(LoweredStatement::Execution(graph))
    }

    fn delete(&mut self, delete: &DeleteStatement) -> AnalyzeResult<LoweredStatement> {
        let mut graph = OperatorGraph::new();
        let scan = lower_scan(self.context, &mut graph, &delete.table)?;
        let keys = self.primary_keys(&scan, delete.table.region())?;
        let LoweredScan {
            mut output,
            table,
            index,
            relation,
        } = scan;

        if let Some(condition) = &delete.where_clause {
            let scope = QueryScope::from(relation);
            let condition = self.condition(&scope, condition)?;
            output = graph.add_operator(Operator::filter(output, condition));
        }
        graph.add_operator(Operator::Write(Write {
            input: output,
            kind: WriteKind::Delete,
            table,
            index,
            keys,
            columns: vec![],
        }));
        Ok(LoweredStatement::Execution(graph))
    }

    /// Returns the schema a new table or index named `name` is created in.
    fn target_schema(&mut self, name: &Name) -> AnalyzeResult<Arc<SchemaDecl>> {
        match name.qualifier_name() {
            Some(qualifier) => self.require_schema(&qualifier),
            None => Ok(Arc::clone(self.context.default_schema())),
        }
    }

    fn create_table(&mut self, definition: &TableDefinition, region: Region) -> AnalyzeResult<LoweredStatement> {
        let schema = self.target_schema(&definition.name)?;
        let name = self.context.normalize(definition.name.last());
        if schema.storage_provider().find_relation(&name).is_some() {
            if definition.if_not_exists {
                debug!("table '{name}' already exists, skipping creation");
                return Ok(LoweredStatement::Statement(ir::Statement::Empty));
            }
            return Err(self.report(
                DiagnosticCode::TableAlreadyExists,
                format!("table '{}.{name}' already exists", schema.name()),
                definition.name.region(),
            ));
        }

        let mut specs: Vec<ColumnSpec> = vec![];
        let mut primary_keys: Vec<(Vec<SortElement>, Region)> = vec![];
        for element in &definition.elements {
            match element {
                TableElement::Column(column) => {
                    let spec = self.column_spec(column)?;
                    if specs.iter().any(|other| other.name == spec.name) {
                        return Err(self.report(
                            DiagnosticCode::ColumnAlreadyExists,
                            format!("column '{}' is defined more than once", spec.name),
                            column.region,
                        ));
                    }
                    if spec.primary_key {
                        let key = SortElement::new(ScalarExpression::variable(Name::simple(
                            column.name.clone(),
                        )));
                        primary_keys.push((vec![key], column.region));
                    }
                    specs.push(spec);
                }
                TableElement::Constraint(constraint) => match &constraint.kind {
                    TableConstraintKind::PrimaryKey(keys) => {
                        primary_keys.push((keys.clone(), constraint.region));
                    }
                    TableConstraintKind::Unique(_) => {
                        return Err(self.report(
                            DiagnosticCode::UnsupportedFeature,
                            "UNIQUE constraints are not supported",
                            constraint.region,
                        ));
                    }
                },
            }
        }
        if let Some((_, second)) = primary_keys.get(1) {
            return Err(self.report(
                DiagnosticCode::PrimaryIndexAlreadyExists,
                format!("table '{name}' declares more than one primary key"),
                *second,
            ));
        }

        let key_columns =
            self.key_columns(specs.iter().map(|spec| (spec.name.as_str(), spec.ty)), region)?;
        let keys = match primary_keys.first() {
            Some((elements, _)) => self.build_keys(elements, &key_columns)?,
            None => vec![],
        };

        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let nullable = spec.nullable && !keys.iter().any(|key| key.column == spec.name);
            let default = match spec.default {
                Some(Value::Unknown) if !nullable => {
                    return Err(self.report(
                        DiagnosticCode::InvalidDefaultValue,
                        format!("column '{}' is NOT NULL, but defaults to NULL", spec.name),
                        spec.region,
                    ));
                }
                Some(value) => ColumnDefault::Value(value),
                None if nullable => ColumnDefault::Value(Value::Unknown),
                None => ColumnDefault::Nothing,
            };
            columns.push(ColumnDecl::new(spec.name, spec.ty, nullable, default));
        }
        let table = match TableDecl::new(schema.name(), name, columns) {
            Ok(table) => Arc::new(table),
            Err(error) => {
                return Err(self.report(DiagnosticCode::ColumnAlreadyExists, error.to_string(), region));
            }
        };
        let primary_index = match IndexDecl::primary(Arc::clone(&table), keys) {
            Ok(index) => Arc::new(index),
            Err(error) => {
                return Err(self.report(DiagnosticCode::InconsistentElements, error.to_string(), region));
            }
        };
        Ok(LoweredStatement::Statement(ir::Statement::CreateTable(CreateTable {
            schema,
            table,
            primary_index,
        })))
    }

    /// Checks the constraints of a column definition.
    ///
    /// Each of nullability, `PRIMARY KEY` and `DEFAULT` may appear at most once.
    fn column_spec(&mut self, column: &ColumnDefinition) -> AnalyzeResult<ColumnSpec> {
        let name = self.context.normalize(&column.name);
        let ty = lower_type(self.context, &column.ty, column.region)?;
        let mut nullable: Option<bool> = None;
        let mut primary_key = false;
        let mut default: Option<&ScalarExpression> = None;
        for constraint in &column.constraints {
            let duplicated = match &constraint.kind {
                ColumnConstraintKind::Null | ColumnConstraintKind::NotNull => {
                    let is_null = constraint.kind == ColumnConstraintKind::Null;
                    nullable.replace(is_null).is_some()
                }
                ColumnConstraintKind::PrimaryKey => std::mem::replace(&mut primary_key, true),
                ColumnConstraintKind::Default(value) => default.replace(value).is_some(),
            };
            if duplicated {
                return Err(self.report(
                    DiagnosticCode::MalformedSyntax,
                    format!("conflicting or duplicated constraints on column '{name}'"),
                    constraint.region,
                ));
            }
        }
        if primary_key && nullable == Some(true) {
            return Err(self.report(
                DiagnosticCode::MalformedSyntax,
                format!("primary key column '{name}' cannot be NULL"),
                column.region,
            ));
        }
        let default = match default {
            Some(value) => Some(self.default_value(&name, ty, value)?),
            None => None,
        };
        Ok(ColumnSpec {
            name,
            ty,
            nullable: nullable.unwrap_or(true) && !primary_key,
            primary_key,
            default,
            region: column.region,
        })
    }

    /// Evaluates a `DEFAULT` clause, which must lower to a constant.
    fn default_value(&mut self, column: &str, ty: Type, value: &ScalarExpression) -> AnalyzeResult<Value> {
        let lowered = lower_scalar(self.context, &QueryScope::new(), value, Some(ty))?;
        if lowered.saw_aggregate {
            return Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                "aggregate functions are not allowed in DEFAULT",
                value.region,
            ));
        }
        match lowered.expression.as_immediate() {
            Some((value, value_type)) if Type::is_assignment_convertible(value_type, &ty) => {
                Ok(value.clone())
            }
            _ => Err(self.report(
                DiagnosticCode::InvalidDefaultValue,
                format!("default value of column '{column}' must be a constant of type {ty}"),
                value.region,
            )),
        }
    }

    /// Exposes `columns` as an unnamed relation, one stream variable per column.
    fn key_columns<'n>(
        &mut self,
        columns: impl IntoIterator<Item = (&'n str, Type)>,
        region: Region,
    ) -> AnalyzeResult<KeyColumns> {
        let mut relation = RelationInfo::projection(None);
        let mut names = HashMap::new();
        for (name, ty) in columns {
            let variable = self.context.create_stream_variable(ty);
            names.insert(variable.clone(), name.to_string());
            if let Err(error) = relation.add_column(variable, Some(name.to_string())) {
                return Err(self.report(DiagnosticCode::InconsistentElements, error.to_string(), region));
            }
        }
        Ok(KeyColumns {
            scope: QueryScope::from(relation),
            names,
        })
    }

    /// Lowers index keys, each of which must be a plain column reference.
    fn build_keys(&mut self, elements: &[SortElement], columns: &KeyColumns) -> AnalyzeResult<Vec<IndexKey>> {
        let mut keys = Vec::with_capacity(elements.len());
        for element in elements {
            if element.null_order.is_some() {
                return Err(self.report(
                    DiagnosticCode::UnsupportedFeature,
                    "NULLS FIRST and NULLS LAST are not supported in index keys",
                    element.key.region,
                ));
            }
            let lowered = lower_scalar(self.context, &columns.scope, &element.key, None)?;
            if lowered.saw_aggregate {
                return Err(self.report(
                    DiagnosticCode::UnsupportedFeature,
                    "aggregate functions are not allowed in index keys",
                    element.key.region,
                ));
            }
            let Some(column) = lowered
                .expression
                .as_variable()
                .and_then(|variable| columns.names.get(variable))
            else {
                return Err(self.report(
                    DiagnosticCode::UnsupportedFeature,
                    "index keys must be column references",
                    element.key.region,
                ));
            };
            if keys.iter().any(|key: &IndexKey| &key.column == column) {
                return Err(self.report(
                    DiagnosticCode::ColumnAlreadyExists,
                    format!("column '{column}' appears more than once in the key"),
                    element.key.region,
                ));
            }
            let direction = match element.direction {
                Some(OrderingDirection::Descendant) => SortDirection::Descendant,
                Some(OrderingDirection::Ascendant) | None => SortDirection::Ascendant,
            };
            keys.push(IndexKey {
                column: column.clone(),
                direction,
            });
        }
        Ok(keys)
    }

    fn create_index(&mut self, definition: &IndexDefinition, region: Region) -> AnalyzeResult<LoweredStatement> {
        let table = self.require_table(&definition.table)?;
        let Some(schema) = self.context.schema_of(&table) else {
            return Err(self.report(
                DiagnosticCode::InconsistentTable,
                format!("schema of table '{}' is not found", table.name()),
                definition.table.region(),
            ));
        };

        let name = match &definition.name {
            Some(name) => {
                if let Some(qualifier) = name.qualifier_name() {
                    let index_schema = self.require_schema(&qualifier)?;
                    if index_schema.name() != schema.name() {
                        return Err(self.report(
                            DiagnosticCode::MalformedSyntax,
                            format!("index '{name}' must be created in schema '{}'", schema.name()),
                            name.region(),
                        ));
                    }
                }
                let key = self.context.normalize(name.last());
                if schema.storage_provider().find_index(&key).is_some() {
                    if definition.if_not_exists {
                        debug!("index '{key}' already exists, skipping creation");
                        return Ok(LoweredStatement::Statement(ir::Statement::Empty));
                    }
                    return Err(self.report(
                        DiagnosticCode::IndexAlreadyExists,
                        format!("index '{}.{key}' already exists", schema.name()),
                        name.region(),
                    ));
                }
                Some(key)
            }
            None => None,
        };

        if definition.keys.is_empty() {
            return Err(self.report(
                DiagnosticCode::MalformedSyntax,
                "index requires at least one key",
                region,
            ));
        }
        let key_columns = self.key_columns(
            table
                .columns()
                .iter()
                .map(|column| (column.name(), column.ty())),
            region,
        )?;
        let keys = self.build_keys(&definition.keys, &key_columns)?;

        let mut values: Vec<String> = Vec::with_capacity(definition.values.len());
        for identifier in &definition.values {
            let value = self.context.normalize(identifier);
            if table.column(&value).is_none() {
                return Err(self.report(
                    DiagnosticCode::ColumnNotFound,
                    format!("column '{value}' is not found in table '{}'", table.name()),
                    identifier.region,
                ));
            }
            if keys.iter().any(|key| key.column == value) || values.contains(&value) {
                return Err(self.report(
                    DiagnosticCode::ColumnAlreadyExists,
                    format!("column '{value}' appears more than once in the index"),
                    identifier.region,
                ));
            }
            values.push(value);
        }

        let features = IndexFeatures {
            primary: false,
            unique: definition.unique,
        };
        let index = match IndexDecl::new(name, table, keys, values, features) {
            Ok(index) => Arc::new(index),
            Err(error) => {
                return Err(self.report(DiagnosticCode::InconsistentElements, error.to_string(), region));
            }
        };
        Ok(LoweredStatement::Statement(ir::Statement::CreateIndex(CreateIndex {
            schema,
            index,
        })))
    }

    fn check_drop_behavior(&mut self, drop: &DropStatement, region: Region) -> AnalyzeResult<()> {
        match (drop.cascade, drop.restrict) {
            (true, true) => Err(self.report(
                DiagnosticCode::MalformedSyntax,
                "CASCADE and RESTRICT cannot be combined",
                region,
            )),
            (true, false) => Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                "DROP ... CASCADE is not supported",
                region,
            )),
            (false, _) => Ok(()),
        }
    }

    fn drop_table(&mut self, drop: &DropStatement, region: Region) -> AnalyzeResult<LoweredStatement> {
        self.check_drop_behavior(drop, region)?;
        let statement = match self.find_table(&drop.name, !drop.if_exists)? {
            Some(table) => ir::Statement::DropTable(DropTable { table }),
            None => {
                debug!("table '{}' does not exist, skipping drop", drop.name);
                ir::Statement::Empty
            }
        };
        Ok(LoweredStatement::Statement(statement))
    }

    fn drop_index(&mut self, drop: &DropStatement, region: Region) -> AnalyzeResult<LoweredStatement> {
        self.check_drop_behavior(drop, region)?;
        let Some(index) = self.find_index(&drop.name, !drop.if_exists)? else {
            debug!("index '{}' does not exist, skipping drop", drop.name);
            return Ok(LoweredStatement::Statement(ir::Statement::Empty));
        };
        if index.is_primary() {
            return Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                format!("primary index of table '{}' cannot be dropped", index.table().name()),
                drop.name.region(),
            ));
        }
        Ok(LoweredStatement::Statement(ir::Statement::DropIndex(DropIndex { index })))
    }
}
