//! Lowering of query expressions into operator graphs.

use std::sync::Arc;

use log::trace;
use metadata::table::{IndexDecl, TableDecl};
use types::schema::Type;

use crate::{
    ast::{
        self, Correlation, Name, QueryExpression, QueryKind, QuerySpecification, Region,
        ScalarExpression, ScalarKind, SelectElement, TableReference,
    },
    context::AnalyzerContext,
    diagnostic::{AnalyzeResult, DiagnosticCode, Reported},
    ir::{
        Aggregate, AggregateColumn, ColumnMapping, Distinct, Expression, ExpressionKind, Join,
        JoinKind, Operator, OperatorGraph, OperatorId, ProjectColumn, Scan, Values, Variable,
        VariableKind,
    },
    relation_info::{QueryScope, RelationColumn, RelationInfo, RelationInfoError},
    resolver::{FindResult, Symbol, SymbolKind, SymbolResolver},
    scalar::lower_scalar,
    typing,
};

/// Operators computing a query and the relation they produce.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredQuery {
    pub output: OperatorId,
    pub relation: RelationInfo,
}

/// Lowers query expressions, the statement lowerer delegates query bodies to it.
pub trait QueryLowerer {
    /// Appends operators computing `query` to `graph`.
    ///
    /// `hints` holds the expected type of each output column by position, it may be shorter
    /// than the output.
    fn lower_query(
        &self,
        context: &mut AnalyzerContext,
        graph: &mut OperatorGraph,
        query: &QueryExpression,
        hints: &[Option<Type>],
    ) -> AnalyzeResult<LoweredQuery>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryLowerer;

impl QueryLowerer for DefaultQueryLowerer {
    fn lower_query(
        &self,
        context: &mut AnalyzerContext,
        graph: &mut OperatorGraph,
        query: &QueryExpression,
        hints: &[Option<Type>],
    ) -> AnalyzeResult<LoweredQuery> {
        let mut builder = QueryBuilder {
            context,
            graph,
            lowerer: self,
        };
        builder.query(query, hints)
    }
}

/// A table scan together with the declarations it reads.
#[derive(Debug, Clone)]
pub(crate) struct LoweredScan {
    pub output: OperatorId,
    pub table: Arc<TableDecl>,
    pub index: Arc<IndexDecl>,
    pub relation: RelationInfo,
}

/// Appends a scan of the table `name` through its primary index.
pub(crate) fn lower_scan(
    context: &mut AnalyzerContext,
    graph: &mut OperatorGraph,
    name: &Name,
) -> AnalyzeResult<LoweredScan> {
    let scope = QueryScope::new();
    let result = SymbolResolver::new(context, &scope).resolve(name, SymbolKind::TableDecl.into(), true);
    let table = match result {
        FindResult::Found(Symbol::TableDecl(table)) => table,
        FindResult::Found(_) | FindResult::NotFound => {
            return Err(context.report(
                DiagnosticCode::TableNotFound,
                format!("table '{name}' is not found"),
                name.region(),
            ));
        }
        FindResult::Error(reported) => return Err(reported),
    };
    let Some(index) = context.primary_index_of(&table) else {
        return Err(context.report(
            DiagnosticCode::InconsistentTable,
            format!("table '{}' has no primary index", table.name()),
            name.region(),
        ));
    };

    let mut mappings = Vec::with_capacity(table.columns().len());
    let mut columns = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        let variable = context.create_stream_variable(column.ty());
        mappings.push(ColumnMapping {
            column: column.name().to_string(),
            variable: variable.clone(),
        });
        columns.push((column.name().to_string(), variable));
    }
    let output = graph.add_operator(Operator::Scan(Scan {
        table: Arc::clone(&table),
        index: Arc::clone(&index),
        columns: mappings,
    }));
    let relation = RelationInfo::scan(
        Arc::clone(&table),
        Arc::clone(&index),
        Some(table.name().to_string()),
        columns,
    );
    Ok(LoweredScan {
        output,
        table,
        index,
        relation,
    })
}

/// An item of a select list after `*` expansion.
struct SelectItem {
    value: Expression,
    name: Option<String>,
}

struct QueryBuilder<'a> {
    context: &'a mut AnalyzerContext,
    graph: &'a mut OperatorGraph,
    lowerer: &'a dyn QueryLowerer,
}

impl QueryBuilder<'_> {
    fn query(&mut self, query: &QueryExpression, hints: &[Option<Type>]) -> AnalyzeResult<LoweredQuery> {
        match &query.kind {
            QueryKind::Values(rows) => self.values(rows, hints, query.region),
            QueryKind::Table(name) => {
                let scan = lower_scan(self.context, self.graph, name)?;
                Ok(LoweredQuery {
                    output: scan.output,
                    relation: scan.relation,
                })
            }
            QueryKind::Specification(specification) => {
                self.specification(specification, hints, query.region)
            }
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, region: Region) -> Reported {
        self.context.report(code, message, region)
    }

    fn values(
        &mut self,
        rows: &[Vec<ScalarExpression>],
        hints: &[Option<Type>],
        region: Region,
    ) -> AnalyzeResult<LoweredQuery> {
        let Some(first) = rows.first() else {
            return Err(self.report(
                DiagnosticCode::MalformedSyntax,
                "VALUES requires at least one row",
                region,
            ));
        };
        let width = first.len();
        let scope = QueryScope::new();
        let mut column_types = vec![Type::Unknown; width];
        let mut lowered_rows = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != width {
                return Err(self.report(
                    DiagnosticCode::InconsistentColumns,
                    format!("VALUES rows must have {width} columns, found {}", row.len()),
                    region,
                ));
            }
            let mut lowered_row = Vec::with_capacity(width);
            for (position, value) in row.iter().enumerate() {
                let hint = hints.get(position).copied().flatten();
                let lowered = lower_scalar(self.context, &scope, value, hint)?;
                if lowered.saw_aggregate {
                    return Err(self.report(
                        DiagnosticCode::UnsupportedFeature,
                        "aggregate functions are not allowed in VALUES",
                        value.region,
                    ));
                }
                let ty = typing::infer(&lowered.expression).unwrap_or(Type::Unknown);
                column_types[position] = match Type::coercion(&column_types[position], &ty) {
                    Some(ty) => ty,
                    None => {
                        return Err(self.report(
                            DiagnosticCode::InconsistentType,
                            format!(
                                "VALUES column {} mixes {} and {ty}",
                                position + 1,
                                column_types[position]
                            ),
                            value.region,
                        ));
                    }
                };
                lowered_row.push(lowered.expression);
            }
            lowered_rows.push(lowered_row);
        }

        let columns: Vec<_> = column_types
            .into_iter()
            .map(|ty| self.context.create_stream_variable(ty))
            .collect();
        let relation = self.projection(columns.iter().cloned().map(|v| (v, None)), region)?;
        let output = self.graph.add_operator(Operator::Values(Values {
            columns,
            rows: lowered_rows,
        }));
        Ok(LoweredQuery { output, relation })
    }

    /// Builds an unnamed projection exporting `columns`.
    fn projection(
        &mut self,
        columns: impl IntoIterator<Item = (Variable, Option<String>)>,
        region: Region,
    ) -> AnalyzeResult<RelationInfo> {
        let mut relation = RelationInfo::projection(None);
        for (variable, name) in columns {
            relation
                .add_column(variable, name)
                .map_err(|error| self.relation_error(error, region))?;
        }
        Ok(relation)
    }

    fn relation_error(&mut self, error: RelationInfoError, region: Region) -> Reported {
        let code = match error {
            RelationInfoError::ColumnCountMismatch { .. } | RelationInfoError::RenameJoinColumns => {
                DiagnosticCode::InconsistentColumns
            }
            RelationInfoError::NotProjection => DiagnosticCode::InconsistentElements,
        };
        self.report(code, error.to_string(), region)
    }

    fn specification(
        &mut self,
        specification: &QuerySpecification,
        hints: &[Option<Type>],
        region: Region,
    ) -> AnalyzeResult<LoweredQuery> {
        if !specification.group_by.is_empty() || specification.having.is_some() {
            return Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                "GROUP BY and HAVING are not supported",
                region,
            ));
        }
        let (mut output, scope) = self.from_clause(&specification.from)?;
        if let Some(condition) = &specification.where_clause {
            let condition = self.condition(&scope, condition, "WHERE")?;
            output = self.graph.add_operator(Operator::filter(output, condition));
        }

        let items = self.select_items(&specification.select_list, &scope, hints)?;
        let (mut output, relation) = if items.iter().any(|item| item.value.contains_aggregate_call()) {
            self.aggregate(output, items, region)?
        } else {
            self.project(output, items, region)?
        };

        if specification.quantifier == Some(ast::SetQuantifier::Distinct) {
            let keys = relation
                .exported_columns()
                .into_iter()
                .map(|column| column.variable().clone())
                .collect();
            output = self
                .graph
                .add_operator(Operator::Distinct(Distinct { input: output, keys }));
        }
        Ok(LoweredQuery { output, relation })
    }

    /// Lowers `FROM`; several table references are cross joined, none yield a single empty row.
    fn from_clause(&mut self, from: &[TableReference]) -> AnalyzeResult<(OperatorId, QueryScope)> {
        let Some((first, rest)) = from.split_first() else {
            let output = self.graph.add_operator(Operator::Values(Values {
                columns: vec![],
                rows: vec![vec![]],
            }));
            return Ok((output, QueryScope::new()));
        };
        let mut current = self.table_reference(first)?;
        for reference in rest {
            let next = self.table_reference(reference)?;
            let output = self.graph.add_operator(Operator::Join(Join {
                kind: JoinKind::Cross,
                left: current.output,
                right: next.output,
                condition: None,
            }));
            current = LoweredQuery {
                output,
                relation: RelationInfo::join(current.relation, next.relation),
            };
        }
        Ok((current.output, QueryScope::from(current.relation)))
    }

    fn table_reference(&mut self, reference: &TableReference) -> AnalyzeResult<LoweredQuery> {
        match reference {
            TableReference::Table { name, correlation } => {
                let scan = lower_scan(self.context, self.graph, name)?;
                let mut relation = scan.relation;
                if let Some(correlation) = correlation {
                    self.correlate(&mut relation, correlation)?;
                }
                Ok(LoweredQuery {
                    output: scan.output,
                    relation,
                })
            }
            TableReference::Derived { query, correlation } => {
                trace!("lowering derived table '{}'", correlation.name);
                let mut lowered = self
                    .lowerer
                    .lower_query(self.context, self.graph, query, &[])?;
                self.correlate(&mut lowered.relation, correlation)?;
                Ok(lowered)
            }
            TableReference::Join {
                kind,
                left,
                right,
                condition,
            } => {
                let kind = match kind {
                    ast::JoinKind::Cross => JoinKind::Cross,
                    ast::JoinKind::Inner => JoinKind::Inner,
                    ast::JoinKind::LeftOuter => JoinKind::LeftOuter,
                    ast::JoinKind::RightOuter => JoinKind::RightOuter,
                    ast::JoinKind::FullOuter => JoinKind::FullOuter,
                };
                let left = self.table_reference(left)?;
                let right = self.table_reference(right)?;
                let relation = RelationInfo::join(left.relation, right.relation);
                let condition = match (kind, condition) {
                    (JoinKind::Cross, None) => None,
                    (JoinKind::Cross, Some(condition)) => {
                        return Err(self.report(
                            DiagnosticCode::MalformedSyntax,
                            "CROSS JOIN cannot have a join condition",
                            condition.region,
                        ));
                    }
                    (_, Some(condition)) => {
                        let scope = QueryScope::from(relation.clone());
                        Some(self.condition(&scope, condition, "a join condition")?)
                    }
                    (_, None) => {
                        return Err(self.report(
                            DiagnosticCode::MalformedSyntax,
                            "join requires an ON clause",
                            Region::default(),
                        ));
                    }
                };
                let output = self.graph.add_operator(Operator::Join(Join {
                    kind,
                    left: left.output,
                    right: right.output,
                    condition,
                }));
                Ok(LoweredQuery { output, relation })
            }
        }
    }

    /// Applies `AS name (columns...)` to `relation`.
    fn correlate(&mut self, relation: &mut RelationInfo, correlation: &Correlation) -> AnalyzeResult<()> {
        relation.rename_relation(Some(self.context.normalize(&correlation.name)));
        if correlation.columns.is_empty() {
            return Ok(());
        }
        let names = correlation
            .columns
            .iter()
            .map(|column| self.context.normalize(column))
            .collect();
        relation
            .rename_columns(names)
            .map_err(|error| self.relation_error(error, correlation.name.region))
    }

    fn condition(
        &mut self,
        scope: &QueryScope,
        condition: &ScalarExpression,
        clause: &str,
    ) -> AnalyzeResult<Expression> {
        let lowered = lower_scalar(self.context, scope, condition, Some(Type::Boolean))?;
        if lowered.saw_aggregate {
            return Err(self.report(
                DiagnosticCode::UnsupportedFeature,
                format!("aggregate functions are not allowed in {clause}"),
                condition.region,
            ));
        }
        Ok(lowered.expression)
    }

    fn select_items(
        &mut self,
        select_list: &[SelectElement],
        scope: &QueryScope,
        hints: &[Option<Type>],
    ) -> AnalyzeResult<Vec<SelectItem>> {
        let mut items = vec![];
        for element in select_list {
            match element {
                SelectElement::Asterisk { qualifier, region } => {
                    for column in self.expand_asterisk(scope, qualifier.as_ref(), *region)? {
                        items.push(SelectItem {
                            value: Expression::variable(column.variable().clone(), *region),
                            name: column.name().map(str::to_string),
                        });
                    }
                }
                SelectElement::Column { value, alias } => {
                    let hint = hints.get(items.len()).copied().flatten();
                    let lowered = lower_scalar(self.context, scope, value, hint)?;
                    let name = match (alias, &value.kind) {
                        (Some(alias), _) => Some(self.context.normalize(alias)),
                        (None, ScalarKind::Variable(name)) => Some(self.context.normalize(name.last())),
                        (None, _) => None,
                    };
                    items.push(SelectItem {
                        value: lowered.expression,
                        name,
                    });
                }
            }
        }
        Ok(items)
    }

    fn expand_asterisk<'s>(
        &mut self,
        scope: &'s QueryScope,
        qualifier: Option<&Name>,
        region: Region,
    ) -> AnalyzeResult<Vec<&'s RelationColumn>> {
        let Some(qualifier) = qualifier else {
            if scope.is_empty() {
                return Err(self.report(
                    DiagnosticCode::MalformedSyntax,
                    "'*' requires a FROM clause",
                    region,
                ));
            }
            return Ok(scope
                .relations()
                .iter()
                .flat_map(RelationInfo::exported_columns)
                .collect());
        };
        let result = SymbolResolver::new(self.context, scope).resolve(
            qualifier,
            SymbolKind::RelationInfo.into(),
            true,
        );
        match result {
            FindResult::Found(Symbol::RelationInfo(relation)) => Ok(relation.exported_columns()),
            FindResult::Found(_) | FindResult::NotFound => Err(self.report(
                DiagnosticCode::RelationNotFound,
                format!("relation '{qualifier}' is not found"),
                qualifier.region(),
            )),
            FindResult::Error(reported) => Err(reported),
        }
    }

    /// Computes non-aggregate select items; stream variables are passed through as they are.
    fn project(
        &mut self,
        input: OperatorId,
        items: Vec<SelectItem>,
        region: Region,
    ) -> AnalyzeResult<(OperatorId, RelationInfo)> {
        let mut computed = vec![];
        let mut outputs = Vec::with_capacity(items.len());
        for item in items {
            let variable = match stream_variable(&item.value) {
                Some(variable) => variable,
                None => {
                    let ty = typing::infer(&item.value).unwrap_or(Type::Unknown);
                    let variable = self.context.create_stream_variable(ty);
                    computed.push(ProjectColumn {
                        variable: variable.clone(),
                        value: item.value,
                    });
                    variable
                }
            };
            outputs.push((variable, item.name));
        }
        let output = if computed.is_empty() {
            input
        } else {
            self.graph.add_operator(Operator::project(input, computed))
        };
        Ok((output, self.projection(outputs, region)?))
    }

    /// Lowers a select list made only of aggregate calls into a single group.
    fn aggregate(
        &mut self,
        input: OperatorId,
        items: Vec<SelectItem>,
        region: Region,
    ) -> AnalyzeResult<(OperatorId, RelationInfo)> {
        let mut computed = vec![];
        let mut columns = Vec::with_capacity(items.len());
        let mut outputs = Vec::with_capacity(items.len());
        for item in items {
            let item_region = item.value.region;
            let ExpressionKind::AggregateCall {
                function,
                quantifier,
                arguments,
            } = item.value.kind
            else {
                return Err(self.report(
                    DiagnosticCode::UnsupportedFeature,
                    "mixing aggregate functions with other select items requires GROUP BY, which is not supported",
                    item_region,
                ));
            };
            let mut argument_variables = Vec::with_capacity(arguments.len());
            for argument in arguments {
                if argument.contains_aggregate_call() {
                    return Err(self.report(
                        DiagnosticCode::InvalidAggregation,
                        "aggregate function calls cannot be nested",
                        argument.region,
                    ));
                }
                let variable = match stream_variable(&argument) {
                    Some(variable) => variable,
                    None => {
                        let ty = typing::infer(&argument).unwrap_or(Type::Unknown);
                        let variable = self.context.create_stream_variable(ty);
                        computed.push(ProjectColumn {
                            variable: variable.clone(),
                            value: argument,
                        });
                        variable
                    }
                };
                argument_variables.push(variable);
            }
            let destination = self.context.create_stream_variable(function.return_type());
            outputs.push((destination.clone(), item.name));
            columns.push(AggregateColumn {
                function,
                quantifier,
                arguments: argument_variables,
                destination,
            });
        }
        let input = if computed.is_empty() {
            input
        } else {
            self.graph.add_operator(Operator::project(input, computed))
        };
        let output = self.graph.add_operator(Operator::Aggregate(Aggregate {
            input,
            group_keys: vec![],
            columns,
        }));
        Ok((output, self.projection(outputs, region)?))
    }
}

/// Returns the variable if `expression` is a bare reference to a stream variable.
fn stream_variable(expression: &Expression) -> Option<Variable> {
    expression
        .as_variable()
        .filter(|variable| matches!(variable.kind(), VariableKind::Stream))
        .cloned()
}
