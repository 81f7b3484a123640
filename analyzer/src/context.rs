use std::{collections::HashMap, sync::Arc};

use log::debug;
use metadata::{
    catalog::{SearchPath, SharedCatalog},
    function::VariableDecl,
    schema::{SchemaDecl, VariableProvider},
    table::{IndexDecl, TableDecl},
};
use types::{
    repository::{TypeRepository, ValueRepository},
    schema::Type,
    value::Value,
};

use crate::{
    ast::{Identifier, Region},
    diagnostic::{Diagnostic, DiagnosticCode, Reported},
    ir::{Variable, VariableKind},
    options::AnalyzerOptions,
};

/// Catalog objects visible to a statement.
#[derive(Debug, Clone)]
pub struct SchemaEnvironment {
    pub catalog: SharedCatalog,
    /// Schemas probed, in order, for unqualified names.
    pub search_path: SearchPath,
    /// Schema which receives objects created without a schema name.
    pub default_schema: Arc<SchemaDecl>,
}

/// A value bound to a placeholder before analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub value: Value,
    pub ty: Type,
}

#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: HashMap<String, Placeholder>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        PlaceholderMap::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value, ty: Type) -> &mut Self {
        self.entries.insert(name.into(), Placeholder { value, ty });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Placeholder> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State shared by all lowering steps of one statement.
///
/// The context is reusable: [`AnalyzerContext::initialize`] prepares it for a statement and
/// [`AnalyzerContext::finalize`] drops everything collected while analyzing it.
#[derive(Debug, Default)]
pub struct AnalyzerContext {
    options: AnalyzerOptions,
    environment: Option<SchemaEnvironment>,
    placeholders: PlaceholderMap,
    host_parameters: Option<Arc<dyn VariableProvider>>,
    diagnostics: Vec<Diagnostic>,
    types: TypeRepository,
    values: ValueRepository,
    next_variable_id: u64,
    /// External variables created so far, keyed by the address of their declaration.
    /// The mapped variable keeps the declaration alive, so addresses are not reused.
    external_variables: HashMap<usize, Variable>,
}

impl AnalyzerContext {
    pub fn new() -> Self {
        AnalyzerContext::default()
    }

    pub fn initialize(
        &mut self,
        options: AnalyzerOptions,
        environment: SchemaEnvironment,
        placeholders: PlaceholderMap,
        host_parameters: Option<Arc<dyn VariableProvider>>,
    ) {
        self.finalize();
        self.options = options;
        self.environment = Some(environment);
        self.placeholders = placeholders;
        self.host_parameters = host_parameters;
    }

    /// Clears all state of the last statement.
    pub fn finalize(&mut self) {
        self.environment = None;
        self.placeholders = PlaceholderMap::default();
        self.host_parameters = None;
        self.diagnostics.clear();
        self.types.clear();
        self.values.clear();
        self.next_variable_id = 0;
        self.external_variables.clear();
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    fn environment(&self) -> &SchemaEnvironment {
        self.environment
            .as_ref()
            .expect("analyzer context must be initialized before use")
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.environment().catalog
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.environment().search_path
    }

    pub fn default_schema(&self) -> &Arc<SchemaDecl> {
        &self.environment().default_schema
    }

    pub fn placeholders(&self) -> &PlaceholderMap {
        &self.placeholders
    }

    /// Records a diagnostic and returns the proof it was recorded.
    pub fn report(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        region: Region,
    ) -> Reported {
        let diagnostic = Diagnostic {
            code,
            message: message.into(),
            region,
        };
        debug!("{diagnostic}");
        self.diagnostics.push(diagnostic);
        Reported::new()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn intern_type(&mut self, ty: Type) -> Arc<Type> {
        self.types.get(ty)
    }

    pub fn intern_value(&mut self, value: Value) -> Arc<Value> {
        self.values.get(value)
    }

    fn create_variable(&mut self, kind: VariableKind, ty: Type) -> Variable {
        self.next_variable_id += 1;
        let ty = self.intern_type(ty);
        Variable::new(self.next_variable_id, kind, ty)
    }

    /// Creates a fresh variable for a column of an operator output.
    pub fn create_stream_variable(&mut self, ty: Type) -> Variable {
        self.create_variable(VariableKind::Stream, ty)
    }

    /// Creates a fresh variable bound by a `let` expression.
    pub fn create_local_variable(&mut self, ty: Type) -> Variable {
        self.create_variable(VariableKind::Local, ty)
    }

    /// Returns the variable of `decl`, the same one every time it is asked for.
    pub fn external_variable(&mut self, decl: &Arc<VariableDecl>) -> Variable {
        let key = Arc::as_ptr(decl) as usize;
        if let Some(variable) = self.external_variables.get(&key) {
            return variable.clone();
        }
        let variable = self.create_variable(VariableKind::External(Arc::clone(decl)), decl.ty());
        self.external_variables.insert(key, variable.clone());
        variable
    }

    /// Looks up the host parameter `:name`.
    pub fn host_parameter(&mut self, name: &str) -> Option<Variable> {
        let decl = self.host_parameters.as_ref()?.find(name)?;
        Some(self.external_variable(&decl))
    }

    /// Returns the lookup key of `identifier`.
    pub fn normalize(&self, identifier: &Identifier) -> String {
        if identifier.delimited {
            identifier.token.clone()
        } else {
            self.options.identifier_case.apply(&identifier.token)
        }
    }

    /// Returns the schema which stores `table`.
    pub fn schema_of(&self, table: &TableDecl) -> Option<Arc<SchemaDecl>> {
        self.catalog().read().find_schema(table.schema_name())
    }

    /// Returns the primary index of `table` from the schema which stores it.
    pub fn primary_index_of(&self, table: &TableDecl) -> Option<Arc<IndexDecl>> {
        self.schema_of(table)?
            .storage_provider()
            .find_primary_index(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn report_records_diagnostic() {
        // given initialized context
        let mut context = testing::context();

        // when reporting a problem
        context.report(DiagnosticCode::TableNotFound, "table 'x' is not found", Region::new(1, 2));

        // then it is kept until finalize
        assert_eq!(context.diagnostics().len(), 1);
        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::TableNotFound);
        context.finalize();
        assert!(!context.has_diagnostics());
    }

    #[test]
    fn variables_are_unique() {
        let mut context = testing::context();
        let a = context.create_stream_variable(Type::Int4);
        let b = context.create_stream_variable(Type::Int4);
        assert_ne!(a, b);
        assert!(Arc::ptr_eq(a.ty(), b.ty()));
    }

    #[test]
    fn external_variable_is_shared() {
        let mut context = testing::context();
        let decl = Arc::new(VariableDecl::new("x", Type::Int8));
        let a = context.external_variable(&decl);
        let b = context.external_variable(&decl);
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_respects_delimited_identifiers() {
        let context = testing::context();
        assert_eq!(context.normalize(&Identifier::regular("ABC")), "abc");
        assert_eq!(context.normalize(&Identifier::delimited("ABC")), "ABC");
    }

    #[test]
    fn host_parameters_are_external_variables() {
        let mut context = testing::context();
        let variable = context.host_parameter("p").unwrap();
        assert!(matches!(variable.kind(), VariableKind::External(_)));
        assert!(context.host_parameter("missing").is_none());
    }
}
