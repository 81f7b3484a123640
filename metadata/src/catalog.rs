//! Catalog module - the root of every name the analyzer can resolve.

use std::{fs, io, path::Path, sync::Arc};

use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use types::{schema::Type, value::Value};

use crate::{
    function::{AggregateFunctionDecl, FunctionDecl, VariableDecl},
    schema::{MemorySchemaProvider, SchemaBuilder, SchemaDecl, SchemaProvider},
    table::{
        ColumnDecl, ColumnDefault, IndexDecl, IndexFeatures, IndexKey, SortDirection, TableDecl,
        TableDeclError,
    },
};

/// Catalog shared between concurrent analyses. Analyses only take the read lock.
pub type SharedCatalog = Arc<RwLock<Catalog>>;

/// [`Catalog`] is the top-level namespace: a name and the schemas it contains.
///
/// It is created once at startup and is only read while statements are analyzed.
#[derive(Debug)]
pub struct Catalog {
    name: String,
    schemas: Arc<dyn SchemaProvider>,
}

/// Error for [`Catalog`] related operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("schema '{0}' already exists")]
    SchemaAlreadyExists(String),
    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("index '{0}' already exists")]
    IndexAlreadyExists(String),
    #[error("variable '{0}' already exists")]
    VariableAlreadyExists(String),
    /// Underlying IO module returned error
    #[error("io error occurred: {0}")]
    IoError(#[from] io::Error),
    /// File contains invalid json
    #[error("json error occurred: {0}")]
    JsonError(#[from] serde_json::Error),
    /// While creating table or index declaration an error was returned
    #[error("table returned error: {0}")]
    TableError(#[from] TableDeclError),
}

impl Catalog {
    pub fn new(name: impl Into<String>, schemas: Arc<dyn SchemaProvider>) -> Self {
        Catalog {
            name: name.into(),
            schemas,
        }
    }

    /// Creates [`Catalog`] backed by an in-memory schema provider holding `schemas`.
    pub fn with_schemas(
        name: impl Into<String>,
        schemas: impl IntoIterator<Item = Arc<SchemaDecl>>,
    ) -> Result<Self, CatalogError> {
        let mut provider = MemorySchemaProvider::default();
        for schema in schemas {
            provider.add(schema)?;
        }
        Ok(Catalog::new(name, Arc::new(provider)))
    }

    /// Loads [`Catalog`] from JSON file at `path`.
    /// Can fail if io error occurs or the file does not describe a valid catalog.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Catalog::from_json_str(&content)
    }

    /// Parses [`Catalog`] from its JSON representation.
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let catalog_json: CatalogJson = serde_json::from_str(content)?;
        catalog_json.try_into()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_provider(&self) -> &dyn SchemaProvider {
        self.schemas.as_ref()
    }

    pub fn find_schema(&self, name: &str) -> Option<Arc<SchemaDecl>> {
        self.schemas.find(name)
    }

    /// Wraps the catalog so it can be shared between analyses.
    pub fn into_shared(self) -> SharedCatalog {
        Arc::new(RwLock::new(self))
    }
}

/// Ordered list of schemas searched when a name is not qualified.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    schemas: Vec<Arc<SchemaDecl>>,
}

impl SearchPath {
    pub fn new(schemas: Vec<Arc<SchemaDecl>>) -> Self {
        SearchPath { schemas }
    }

    pub fn schemas(&self) -> &[Arc<SchemaDecl>] {
        &self.schemas
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// [`CatalogJson`] is a representation of [`Catalog`] on disk. Used only for deserializing from JSON file.
#[derive(Deserialize)]
struct CatalogJson {
    name: String,
    #[serde(default)]
    schemas: Vec<SchemaJson>,
}

#[derive(Deserialize)]
struct SchemaJson {
    name: String,
    #[serde(default)]
    tables: Vec<TableJson>,
    #[serde(default)]
    indexes: Vec<IndexJson>,
    #[serde(default)]
    variables: Vec<TypedNameJson>,
    #[serde(default)]
    functions: Vec<FunctionJson>,
    #[serde(default)]
    aggregate_functions: Vec<FunctionJson>,
}

#[derive(Deserialize)]
struct TableJson {
    name: String,
    columns: Vec<ColumnJson>,
    /// Names of primary key columns - empty for a keyless table.
    #[serde(default)]
    primary_key: Vec<String>,
}

#[derive(Deserialize)]
struct ColumnJson {
    name: String,
    ty: Type,
    #[serde(default = "nullable_by_default")]
    nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

#[derive(Deserialize)]
struct IndexJson {
    name: String,
    table: String,
    keys: Vec<IndexKeyJson>,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    unique: bool,
}

#[derive(Deserialize)]
struct IndexKeyJson {
    column: String,
    #[serde(default)]
    direction: SortDirection,
}

#[derive(Deserialize)]
struct TypedNameJson {
    name: String,
    ty: Type,
}

#[derive(Deserialize)]
struct FunctionJson {
    name: String,
    parameters: Vec<Type>,
    return_type: Type,
}

impl TryFrom<CatalogJson> for Catalog {
    type Error = CatalogError;

    fn try_from(value: CatalogJson) -> Result<Self, Self::Error> {
        let mut next_definition_id = 1;
        let schemas = value
            .schemas
            .into_iter()
            .map(|schema| schema.into_decl(&mut next_definition_id))
            .collect::<Result<Vec<_>, _>>()?;
        Catalog::with_schemas(value.name, schemas)
    }
}

impl SchemaJson {
    fn into_decl(self, next_definition_id: &mut u64) -> Result<Arc<SchemaDecl>, CatalogError> {
        let mut builder = SchemaDecl::builder(self.name);
        for table in self.tables {
            let columns = table
                .columns
                .into_iter()
                .map(|c| {
                    let forced_not_null = table.primary_key.contains(&c.name);
                    let nullable = c.nullable && !forced_not_null;
                    let default = match nullable {
                        true => ColumnDefault::Value(Value::Unknown),
                        false => ColumnDefault::Nothing,
                    };
                    ColumnDecl::new(c.name, c.ty, nullable, default)
                })
                .collect();
            let decl = Arc::new(TableDecl::new(builder.name(), table.name, columns)?);
            let keys = table
                .primary_key
                .into_iter()
                .map(|column| IndexKey {
                    column,
                    direction: SortDirection::Ascendant,
                })
                .collect();
            let primary = IndexDecl::primary(Arc::clone(&decl), keys)?;
            builder.add_table(decl)?;
            builder.add_index(Arc::new(primary))?;
        }
        for index in self.indexes {
            let table = builder_table(&builder, &index.table)?;
            let keys = index
                .keys
                .into_iter()
                .map(|k| IndexKey {
                    column: k.column,
                    direction: k.direction,
                })
                .collect();
            let features = IndexFeatures {
                primary: false,
                unique: index.unique,
            };
            let decl = IndexDecl::new(Some(index.name), table, keys, index.values, features)?;
            builder.add_index(Arc::new(decl))?;
        }
        for variable in self.variables {
            builder.add_variable(VariableDecl::new(variable.name, variable.ty))?;
        }
        for function in self.functions {
            let id = take_id(next_definition_id);
            builder.add_function(FunctionDecl::new(
                id,
                function.name,
                function.parameters,
                function.return_type,
            ));
        }
        for function in self.aggregate_functions {
            let id = take_id(next_definition_id);
            builder.add_aggregate_function(AggregateFunctionDecl::new(
                id,
                function.name,
                function.parameters,
                function.return_type,
            ));
        }
        Ok(builder.build())
    }
}

fn take_id(next: &mut u64) -> u64 {
    let id = *next;
    *next += 1;
    id
}

/// Looks up a table registered earlier in the same schema file.
fn builder_table(
    builder: &SchemaBuilder,
    table: &str,
) -> Result<Arc<TableDecl>, CatalogError> {
    builder
        .find_table(table)
        .ok_or_else(|| CatalogError::TableNotFound(table.into()))
}
