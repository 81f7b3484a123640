//! Schema declarations and the name-indexed providers they expose.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    catalog::CatalogError,
    function::{AggregateFunctionDecl, FunctionDecl, VariableDecl},
    table::{IndexDecl, RelationDecl, TableDecl, ViewDecl},
};

/// Provides variables declared in a schema (or host parameters of a statement).
pub trait VariableProvider: fmt::Debug + Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<VariableDecl>>;
}

/// Provides relations, tables and indexes stored in a schema.
pub trait StorageProvider: fmt::Debug + Send + Sync {
    fn find_relation(&self, name: &str) -> Option<RelationDecl>;
    fn find_table(&self, name: &str) -> Option<Arc<TableDecl>>;
    fn find_index(&self, name: &str) -> Option<Arc<IndexDecl>>;
    /// Returns the primary index of `table`, if the storage knows one.
    fn find_primary_index(&self, table: &TableDecl) -> Option<Arc<IndexDecl>>;
}

/// Provides scalar function overloads, looked up by name and number of parameters.
pub trait FunctionProvider: fmt::Debug + Send + Sync {
    fn find(&self, name: &str, arity: usize) -> Vec<Arc<FunctionDecl>>;
}

/// Provides aggregate function overloads, looked up by name and number of parameters.
pub trait AggregateFunctionProvider: fmt::Debug + Send + Sync {
    fn find(&self, name: &str, arity: usize) -> Vec<Arc<AggregateFunctionDecl>>;
}

/// Provides schemas of a catalog.
pub trait SchemaProvider: fmt::Debug + Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<SchemaDecl>>;
}

/// [`SchemaDecl`] is a named namespace of variables, relations and functions.
#[derive(Debug)]
pub struct SchemaDecl {
    name: String,
    variables: Arc<dyn VariableProvider>,
    storage: Arc<dyn StorageProvider>,
    functions: Arc<dyn FunctionProvider>,
    aggregate_functions: Arc<dyn AggregateFunctionProvider>,
}

impl SchemaDecl {
    pub fn new(
        name: impl Into<String>,
        variables: Arc<dyn VariableProvider>,
        storage: Arc<dyn StorageProvider>,
        functions: Arc<dyn FunctionProvider>,
        aggregate_functions: Arc<dyn AggregateFunctionProvider>,
    ) -> Self {
        SchemaDecl {
            name: name.into(),
            variables,
            storage,
            functions,
            aggregate_functions,
        }
    }

    /// Starts building a schema backed by in-memory providers.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            variables: MemoryVariableProvider::default(),
            storage: MemoryStorageProvider::default(),
            functions: MemoryFunctionProvider::default(),
            aggregate_functions: MemoryAggregateFunctionProvider::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_provider(&self) -> &dyn VariableProvider {
        self.variables.as_ref()
    }

    pub fn storage_provider(&self) -> &dyn StorageProvider {
        self.storage.as_ref()
    }

    pub fn function_provider(&self) -> &dyn FunctionProvider {
        self.functions.as_ref()
    }

    pub fn aggregate_function_provider(&self) -> &dyn AggregateFunctionProvider {
        self.aggregate_functions.as_ref()
    }
}

/// Collects declarations of a schema before freezing them into a [`SchemaDecl`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    variables: MemoryVariableProvider,
    storage: MemoryStorageProvider,
    functions: MemoryFunctionProvider,
    aggregate_functions: MemoryAggregateFunctionProvider,
}

impl SchemaBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_table(&self, name: &str) -> Option<Arc<TableDecl>> {
        self.storage.find_table(name)
    }

    pub fn add_variable(&mut self, variable: VariableDecl) -> Result<&mut Self, CatalogError> {
        self.variables.add(variable)?;
        Ok(self)
    }

    pub fn add_table(&mut self, table: Arc<TableDecl>) -> Result<&mut Self, CatalogError> {
        self.storage.add_table(table)?;
        Ok(self)
    }

    pub fn add_view(&mut self, view: Arc<ViewDecl>) -> Result<&mut Self, CatalogError> {
        self.storage.add_view(view)?;
        Ok(self)
    }

    pub fn add_index(&mut self, index: Arc<IndexDecl>) -> Result<&mut Self, CatalogError> {
        self.storage.add_index(index)?;
        Ok(self)
    }

    pub fn add_function(&mut self, function: FunctionDecl) -> &mut Self {
        self.functions.add(function);
        self
    }

    pub fn add_aggregate_function(&mut self, function: AggregateFunctionDecl) -> &mut Self {
        self.aggregate_functions.add(function);
        self
    }

    pub fn build(self) -> Arc<SchemaDecl> {
        Arc::new(SchemaDecl::new(
            self.name,
            Arc::new(self.variables),
            Arc::new(self.storage),
            Arc::new(self.functions),
            Arc::new(self.aggregate_functions),
        ))
    }
}

#[derive(Debug, Default)]
pub struct MemoryVariableProvider {
    variables: HashMap<String, Arc<VariableDecl>>,
}

impl MemoryVariableProvider {
    pub fn add(&mut self, variable: VariableDecl) -> Result<(), CatalogError> {
        if self.variables.contains_key(variable.name()) {
            return Err(CatalogError::VariableAlreadyExists(variable.name().into()));
        }
        self.variables
            .insert(variable.name().into(), Arc::new(variable));
        Ok(())
    }
}

impl VariableProvider for MemoryVariableProvider {
    fn find(&self, name: &str) -> Option<Arc<VariableDecl>> {
        self.variables.get(name).cloned()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    /// Tables and views share one namespace.
    relations: HashMap<String, RelationDecl>,
    indexes: HashMap<String, Arc<IndexDecl>>,
    /// Maps each table name to its primary index.
    primary_indexes: HashMap<String, Arc<IndexDecl>>,
}

impl MemoryStorageProvider {
    pub fn add_table(&mut self, table: Arc<TableDecl>) -> Result<(), CatalogError> {
        if self.relations.contains_key(table.name()) {
            return Err(CatalogError::TableAlreadyExists(table.name().into()));
        }
        self.relations
            .insert(table.name().into(), RelationDecl::Table(table));
        Ok(())
    }

    pub fn add_view(&mut self, view: Arc<ViewDecl>) -> Result<(), CatalogError> {
        if self.relations.contains_key(view.name()) {
            return Err(CatalogError::TableAlreadyExists(view.name().into()));
        }
        self.relations
            .insert(view.name().into(), RelationDecl::View(view));
        Ok(())
    }

    /// Adds `index` to the storage. The indexed table must already be present.
    pub fn add_index(&mut self, index: Arc<IndexDecl>) -> Result<(), CatalogError> {
        let table_name = index.table().name();
        if self.find_table(table_name).is_none() {
            return Err(CatalogError::TableNotFound(table_name.into()));
        }
        if index.is_primary() {
            if self.primary_indexes.contains_key(table_name) {
                return Err(CatalogError::IndexAlreadyExists(table_name.into()));
            }
            self.primary_indexes
                .insert(table_name.into(), Arc::clone(&index));
        }
        if let Some(name) = index.name() {
            if self.indexes.contains_key(name) {
                return Err(CatalogError::IndexAlreadyExists(name.into()));
            }
            self.indexes.insert(name.into(), index);
        }
        Ok(())
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn find_relation(&self, name: &str) -> Option<RelationDecl> {
        self.relations.get(name).cloned()
    }

    fn find_table(&self, name: &str) -> Option<Arc<TableDecl>> {
        match self.relations.get(name)? {
            RelationDecl::Table(table) => Some(Arc::clone(table)),
            RelationDecl::View(_) => None,
        }
    }

    fn find_index(&self, name: &str) -> Option<Arc<IndexDecl>> {
        self.indexes.get(name).cloned()
    }

    fn find_primary_index(&self, table: &TableDecl) -> Option<Arc<IndexDecl>> {
        self.primary_indexes
            .get(table.name())
            .filter(|index| index.table().as_ref() == table)
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct MemoryFunctionProvider {
    /// Overloads in registration order, grouped by name.
    functions: HashMap<String, Vec<Arc<FunctionDecl>>>,
}

impl MemoryFunctionProvider {
    pub fn add(&mut self, function: FunctionDecl) {
        self.functions
            .entry(function.name().into())
            .or_default()
            .push(Arc::new(function));
    }
}

impl FunctionProvider for MemoryFunctionProvider {
    fn find(&self, name: &str, arity: usize) -> Vec<Arc<FunctionDecl>> {
        self.functions
            .get(name)
            .map(|overloads| {
                overloads
                    .iter()
                    .filter(|f| f.parameters().len() == arity)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct MemoryAggregateFunctionProvider {
    functions: HashMap<String, Vec<Arc<AggregateFunctionDecl>>>,
}

impl MemoryAggregateFunctionProvider {
    pub fn add(&mut self, function: AggregateFunctionDecl) {
        self.functions
            .entry(function.name().into())
            .or_default()
            .push(Arc::new(function));
    }
}

impl AggregateFunctionProvider for MemoryAggregateFunctionProvider {
    fn find(&self, name: &str, arity: usize) -> Vec<Arc<AggregateFunctionDecl>> {
        self.functions
            .get(name)
            .map(|overloads| {
                overloads
                    .iter()
                    .filter(|f| f.parameters().len() == arity)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct MemorySchemaProvider {
    schemas: HashMap<String, Arc<SchemaDecl>>,
}

impl MemorySchemaProvider {
    pub fn add(&mut self, schema: Arc<SchemaDecl>) -> Result<(), CatalogError> {
        if self.schemas.contains_key(schema.name()) {
            return Err(CatalogError::SchemaAlreadyExists(schema.name().into()));
        }
        self.schemas.insert(schema.name().into(), schema);
        Ok(())
    }
}

impl SchemaProvider for MemorySchemaProvider {
    fn find(&self, name: &str) -> Option<Arc<SchemaDecl>> {
        self.schemas.get(name).cloned()
    }
}
