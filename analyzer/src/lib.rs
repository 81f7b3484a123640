//! Semantic analysis of SQL statements.
//!
//! The analyzer takes a syntax tree ([`ast::Statement`]), resolves its names against a
//! catalog and lowers it into either an operator graph ([`ir::OperatorGraph`]) or a
//! standalone statement ([`ir::Statement`]). Problems are reported as [`Diagnostic`]s.

use std::sync::Arc;

use log::debug;
use metadata::schema::VariableProvider;

use crate::{
    context::{AnalyzerContext, PlaceholderMap, SchemaEnvironment},
    diagnostic::Diagnostic,
    ir::OperatorGraph,
    options::AnalyzerOptions,
    query::{DefaultQueryLowerer, QueryLowerer},
    statement::{LoweredStatement, lower_statement},
};

pub mod ast;
pub mod context;
pub mod diagnostic;
pub mod ir;
pub mod options;
pub mod query;
pub mod relation_info;
pub mod resolver;
pub mod scalar;
mod statement;
#[cfg(test)]
mod testing;
pub mod typing;

/// Outcome of analyzing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerResult {
    /// Statements executed through an operator graph (queries and DML).
    Execution(OperatorGraph),
    /// Statements executed on their own (DDL and literal writes).
    Statement(ir::Statement),
    /// The statement is invalid, holds at least one diagnostic.
    Diagnostics(Vec<Diagnostic>),
}

impl AnalyzerResult {
    pub fn is_valid(&self) -> bool {
        !matches!(self, AnalyzerResult::Diagnostics(_))
    }

    pub fn execution(&self) -> Option<&OperatorGraph> {
        match self {
            AnalyzerResult::Execution(graph) => Some(graph),
            _ => None,
        }
    }

    pub fn statement(&self) -> Option<&ir::Statement> {
        match self {
            AnalyzerResult::Statement(statement) => Some(statement),
            _ => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AnalyzerResult::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

/// Analyzes `statement` in an initialized `context`, lowering queries with [`DefaultQueryLowerer`].
pub fn analyze_statement(context: &mut AnalyzerContext, statement: &ast::Statement) -> AnalyzerResult {
    analyze_statement_with(context, statement, &DefaultQueryLowerer)
}

pub fn analyze_statement_with(
    context: &mut AnalyzerContext,
    statement: &ast::Statement,
    lowerer: &dyn QueryLowerer,
) -> AnalyzerResult {
    debug!("analyzing statement at {}", statement.region);
    let lowered = lower_statement(context, statement, lowerer);
    let result = match lowered {
        Ok(LoweredStatement::Execution(graph)) => AnalyzerResult::Execution(graph),
        Ok(LoweredStatement::Statement(statement)) => AnalyzerResult::Statement(statement),
        // `Reported` proves at least one diagnostic was recorded
        Err(_) => AnalyzerResult::Diagnostics(context.take_diagnostics()),
    };
    match &result {
        AnalyzerResult::Execution(graph) => {
            debug!("statement lowered to {} operators", graph.len());
        }
        AnalyzerResult::Statement(statement) => debug!("statement lowered to {statement:?}"),
        AnalyzerResult::Diagnostics(diagnostics) => {
            debug!("statement rejected with {} diagnostics", diagnostics.len());
        }
    }
    result
}

/// Analyzes statements against a fixed environment.
///
/// Every call to [`Analyzer::analyze`] starts from a fresh context, so variables and
/// diagnostics never leak from one statement to the next.
pub struct Analyzer {
    options: AnalyzerOptions,
    environment: SchemaEnvironment,
    placeholders: PlaceholderMap,
    host_parameters: Option<Arc<dyn VariableProvider>>,
    context: AnalyzerContext,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions, environment: SchemaEnvironment) -> Self {
        Analyzer {
            options,
            environment,
            placeholders: PlaceholderMap::new(),
            host_parameters: None,
            context: AnalyzerContext::new(),
        }
    }

    pub fn with_placeholders(mut self, placeholders: PlaceholderMap) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_host_parameters(mut self, host_parameters: Arc<dyn VariableProvider>) -> Self {
        self.host_parameters = Some(host_parameters);
        self
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn analyze(&mut self, statement: &ast::Statement) -> AnalyzerResult {
        self.analyze_with(statement, &DefaultQueryLowerer)
    }

    pub fn analyze_with(&mut self, statement: &ast::Statement, lowerer: &dyn QueryLowerer) -> AnalyzerResult {
        self.context.initialize(
            self.options.clone(),
            self.environment.clone(),
            self.placeholders.clone(),
            self.host_parameters.clone(),
        );
        let result = analyze_statement_with(&mut self.context, statement, lowerer);
        self.context.finalize();
        result
    }
}
