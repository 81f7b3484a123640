//! Resolves names to symbols through the query scope and the catalog.
//!
//! Unqualified names are probed in a fixed order: relations of the query scope, their
//! columns, then schema variables, relations, tables and indexes of the search path, schemas
//! of the catalog and finally the catalog itself. The first probe that matches wins.
//! Qualified names resolve their qualifier first, restricted to the kinds which may own
//! the requested symbol.

use std::{fmt, sync::Arc};

use log::trace;
use metadata::{
    catalog::SharedCatalog,
    schema::SchemaDecl,
    table::{IndexDecl, RelationDecl, TableDecl},
};

use crate::{
    ast::{Identifier, Name, Region},
    context::AnalyzerContext,
    diagnostic::{DiagnosticCode, Reported},
    ir::Variable,
    relation_info::{ColumnOrigin, Lookup, QueryScope, RelationColumn, RelationInfo},
};

/// Schema members in probe order. Each kind is searched along the whole search path before
/// the next one.
const SCHEMA_MEMBER_KINDS: [SymbolKind; 4] = [
    SymbolKind::SchemaVariable,
    SymbolKind::RelationDecl,
    SymbolKind::TableDecl,
    SymbolKind::IndexDecl,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    ColumnVariable,
    FieldVariable,
    SchemaVariable,
    RelationInfo,
    RelationDecl,
    SchemaDecl,
    CatalogDecl,
    TableDecl,
    IndexDecl,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 9] = [
        SymbolKind::ColumnVariable,
        SymbolKind::FieldVariable,
        SymbolKind::SchemaVariable,
        SymbolKind::RelationInfo,
        SymbolKind::RelationDecl,
        SymbolKind::SchemaDecl,
        SymbolKind::CatalogDecl,
        SymbolKind::TableDecl,
        SymbolKind::IndexDecl,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn is_variable(self) -> bool {
        matches!(
            self,
            SymbolKind::ColumnVariable | SymbolKind::FieldVariable | SymbolKind::SchemaVariable
        )
    }

    /// Kinds of symbols which can qualify a symbol of this kind.
    pub fn qualifiers(self) -> SymbolKindSet {
        match self {
            SymbolKind::ColumnVariable | SymbolKind::FieldVariable => {
                SymbolKindSet::from(SymbolKind::RelationInfo)
            }
            SymbolKind::SchemaVariable
            | SymbolKind::RelationInfo
            | SymbolKind::RelationDecl
            | SymbolKind::TableDecl
            | SymbolKind::IndexDecl => SymbolKindSet::from(SymbolKind::SchemaDecl),
            SymbolKind::SchemaDecl => SymbolKindSet::from(SymbolKind::CatalogDecl),
            SymbolKind::CatalogDecl => SymbolKindSet::EMPTY,
        }
    }

    pub(crate) fn not_found_code(self) -> DiagnosticCode {
        match self {
            SymbolKind::ColumnVariable | SymbolKind::FieldVariable => DiagnosticCode::ColumnNotFound,
            SymbolKind::SchemaVariable => DiagnosticCode::VariableNotFound,
            SymbolKind::RelationInfo | SymbolKind::RelationDecl => DiagnosticCode::RelationNotFound,
            SymbolKind::SchemaDecl => DiagnosticCode::SchemaNotFound,
            SymbolKind::CatalogDecl => DiagnosticCode::CatalogNotFound,
            SymbolKind::TableDecl => DiagnosticCode::TableNotFound,
            SymbolKind::IndexDecl => DiagnosticCode::IndexNotFound,
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            SymbolKind::ColumnVariable | SymbolKind::FieldVariable => "column",
            SymbolKind::SchemaVariable => "variable",
            SymbolKind::RelationInfo | SymbolKind::RelationDecl => "relation",
            SymbolKind::SchemaDecl => "schema",
            SymbolKind::CatalogDecl => "catalog",
            SymbolKind::TableDecl => "table",
            SymbolKind::IndexDecl => "index",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::ColumnVariable => "column_variable",
            SymbolKind::FieldVariable => "field_variable",
            SymbolKind::SchemaVariable => "schema_variable",
            SymbolKind::RelationInfo => "relation_info",
            SymbolKind::RelationDecl => "relation_decl",
            SymbolKind::SchemaDecl => "schema_decl",
            SymbolKind::CatalogDecl => "catalog_decl",
            SymbolKind::TableDecl => "table_decl",
            SymbolKind::IndexDecl => "index_decl",
        };
        f.write_str(name)
    }
}

/// A set of [`SymbolKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolKindSet(u16);

impl SymbolKindSet {
    pub const EMPTY: SymbolKindSet = SymbolKindSet(0);

    pub fn of(kinds: &[SymbolKind]) -> Self {
        kinds.iter().copied().collect()
    }

    pub fn contains(&self, kind: SymbolKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: SymbolKind) {
        self.0 |= kind.bit();
    }

    pub fn union(self, other: SymbolKindSet) -> SymbolKindSet {
        SymbolKindSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = SymbolKind> {
        SymbolKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }

    /// Returns the only member of the set.
    pub fn single(&self) -> Option<SymbolKind> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Kinds which may qualify any member of the set.
    pub fn qualifiers(&self) -> SymbolKindSet {
        self.iter()
            .map(SymbolKind::qualifiers)
            .fold(SymbolKindSet::EMPTY, SymbolKindSet::union)
    }
}

impl From<SymbolKind> for SymbolKindSet {
    fn from(kind: SymbolKind) -> Self {
        SymbolKindSet(kind.bit())
    }
}

impl FromIterator<SymbolKind> for SymbolKindSet {
    fn from_iter<I: IntoIterator<Item = SymbolKind>>(iter: I) -> Self {
        let mut set = SymbolKindSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Display for SymbolKindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(|kind| kind.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// A resolved name. Relations of the query scope are borrowed from it.
#[derive(Debug, Clone)]
pub enum Symbol<'s> {
    ColumnVariable(Variable),
    FieldVariable(Variable),
    SchemaVariable(Variable),
    RelationInfo(&'s RelationInfo),
    RelationDecl(RelationDecl),
    SchemaDecl(Arc<SchemaDecl>),
    CatalogDecl(SharedCatalog),
    TableDecl(Arc<TableDecl>),
    IndexDecl(Arc<IndexDecl>),
}

impl Symbol<'_> {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::ColumnVariable(_) => SymbolKind::ColumnVariable,
            Symbol::FieldVariable(_) => SymbolKind::FieldVariable,
            Symbol::SchemaVariable(_) => SymbolKind::SchemaVariable,
            Symbol::RelationInfo(_) => SymbolKind::RelationInfo,
            Symbol::RelationDecl(_) => SymbolKind::RelationDecl,
            Symbol::SchemaDecl(_) => SymbolKind::SchemaDecl,
            Symbol::CatalogDecl(_) => SymbolKind::CatalogDecl,
            Symbol::TableDecl(_) => SymbolKind::TableDecl,
            Symbol::IndexDecl(_) => SymbolKind::IndexDecl,
        }
    }

    /// Returns the variable of column, field and schema variable symbols.
    pub fn variable(&self) -> Option<&Variable> {
        match self {
            Symbol::ColumnVariable(variable)
            | Symbol::FieldVariable(variable)
            | Symbol::SchemaVariable(variable) => Some(variable),
            _ => None,
        }
    }
}

/// Result of resolving a name.
///
/// `Error` means a diagnostic was already recorded, e.g. because the name was ambiguous.
#[derive(Debug)]
pub enum FindResult<T> {
    Found(T),
    NotFound,
    Error(Reported),
}

impl<T> FindResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, FindResult::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FindResult::NotFound)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FindResult::Error(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FindResult<U> {
        match self {
            FindResult::Found(found) => FindResult::Found(f(found)),
            FindResult::NotFound => FindResult::NotFound,
            FindResult::Error(reported) => FindResult::Error(reported),
        }
    }
}

/// Resolves names against a query scope and the catalog of the context.
pub struct SymbolResolver<'c, 's> {
    context: &'c mut AnalyzerContext,
    scope: &'s QueryScope,
}

impl<'c, 's> SymbolResolver<'c, 's> {
    pub fn new(context: &'c mut AnalyzerContext, scope: &'s QueryScope) -> Self {
        SymbolResolver { context, scope }
    }

    /// Resolves `name` to a symbol of one of `kinds`.
    ///
    /// If `mandatory` is set, a name that does not resolve is reported and `Error` is returned
    /// instead of `NotFound`.
    pub fn resolve(
        &mut self,
        name: &Name,
        kinds: SymbolKindSet,
        mandatory: bool,
    ) -> FindResult<Symbol<'s>> {
        trace!("resolving '{name}' as one of {kinds}");
        self.resolve_parts(name.qualifier(), name.last(), kinds, mandatory)
    }

    fn resolve_parts(
        &mut self,
        qualifier: &[Identifier],
        last: &Identifier,
        kinds: SymbolKindSet,
        mandatory: bool,
    ) -> FindResult<Symbol<'s>> {
        let result = match qualifier.split_last() {
            Some((qualifier_last, qualifier_rest)) => {
                self.resolve_qualified(qualifier_rest, qualifier_last, last, kinds, mandatory)
            }
            None => self.resolve_unqualified(last, kinds),
        };
        match result {
            FindResult::NotFound if mandatory => {
                FindResult::Error(self.report_not_found(qualifier, last, kinds))
            }
            other => other,
        }
    }

    fn resolve_qualified(
        &mut self,
        qualifier_rest: &[Identifier],
        qualifier_last: &Identifier,
        last: &Identifier,
        kinds: SymbolKindSet,
        mandatory: bool,
    ) -> FindResult<Symbol<'s>> {
        let qualifier_kinds = kinds.qualifiers();
        if qualifier_kinds.is_empty() {
            return FindResult::NotFound;
        }
        let qualifier =
            match self.resolve_parts(qualifier_rest, qualifier_last, qualifier_kinds, mandatory) {
                FindResult::Found(symbol) => symbol,
                FindResult::NotFound => return FindResult::NotFound,
                FindResult::Error(reported) => return FindResult::Error(reported),
            };
        let key = self.context.normalize(last);
        match qualifier {
            Symbol::RelationInfo(relation) => {
                self.find_column(relation.find_qualified(&key), &key, kinds, last.region)
            }
            Symbol::SchemaDecl(schema) => self.find_in_schema(&schema, &key, kinds, last.region),
            Symbol::CatalogDecl(catalog) if kinds.contains(SymbolKind::SchemaDecl) => {
                match catalog.read().find_schema(&key) {
                    Some(schema) => FindResult::Found(Symbol::SchemaDecl(schema)),
                    None => FindResult::NotFound,
                }
            }
            _ => FindResult::NotFound,
        }
    }

    fn resolve_unqualified(
        &mut self,
        last: &Identifier,
        kinds: SymbolKindSet,
    ) -> FindResult<Symbol<'s>> {
        let key = self.context.normalize(last);
        let region = last.region;
        let scope = self.scope;

        if kinds.contains(SymbolKind::RelationInfo) {
            match scope.find_relation(&key) {
                Lookup::Found(relation) => {
                    return FindResult::Found(Symbol::RelationInfo(relation));
                }
                Lookup::Ambiguous => {
                    return self.ambiguous(DiagnosticCode::RelationAmbiguous, "relation", &key, region);
                }
                Lookup::Missing => {}
            }
        }
        if kinds.contains(SymbolKind::ColumnVariable) || kinds.contains(SymbolKind::FieldVariable) {
            match self.find_column(scope.find_column(&key), &key, kinds, region) {
                FindResult::NotFound => {}
                other => return other,
            }
        }
        let search_path = self.context.search_path().schemas().to_vec();
        for kind in SCHEMA_MEMBER_KINDS {
            if !kinds.contains(kind) {
                continue;
            }
            for schema in &search_path {
                if let Some(symbol) = self.find_member(schema, &key, kind) {
                    return FindResult::Found(symbol);
                }
            }
        }
        let catalog = Arc::clone(self.context.catalog());
        if kinds.contains(SymbolKind::SchemaDecl) {
            if let Some(schema) = catalog.read().find_schema(&key) {
                return FindResult::Found(Symbol::SchemaDecl(schema));
            }
        }
        if kinds.contains(SymbolKind::CatalogDecl) && catalog.read().name() == key {
            return FindResult::Found(Symbol::CatalogDecl(catalog));
        }
        FindResult::NotFound
    }

    /// Turns a column lookup into a variable symbol of one of `kinds`.
    fn find_column(
        &mut self,
        lookup: Lookup<&RelationColumn>,
        key: &str,
        kinds: SymbolKindSet,
        region: Region,
    ) -> FindResult<Symbol<'s>> {
        match lookup {
            Lookup::Found(column) => {
                let variable = column.variable().clone();
                if kinds.contains(SymbolKind::ColumnVariable) {
                    FindResult::Found(Symbol::ColumnVariable(variable))
                } else if kinds.contains(SymbolKind::FieldVariable)
                    && column.origin() == ColumnOrigin::Derived
                {
                    FindResult::Found(Symbol::FieldVariable(variable))
                } else {
                    FindResult::NotFound
                }
            }
            Lookup::Ambiguous => {
                self.ambiguous(DiagnosticCode::ColumnAmbiguous, "column", key, region)
            }
            Lookup::Missing => FindResult::NotFound,
        }
    }

    /// Probes the members of `schema`, in the same order as unqualified lookups do.
    fn find_in_schema(
        &mut self,
        schema: &SchemaDecl,
        key: &str,
        kinds: SymbolKindSet,
        region: Region,
    ) -> FindResult<Symbol<'s>> {
        let scope = self.scope;
        if kinds.contains(SymbolKind::RelationInfo) {
            match scope.find_relation_in_schema(schema.name(), key) {
                Lookup::Found(relation) => {
                    return FindResult::Found(Symbol::RelationInfo(relation));
                }
                Lookup::Ambiguous => {
                    return self.ambiguous(DiagnosticCode::RelationAmbiguous, "relation", key, region);
                }
                Lookup::Missing => {}
            }
        }
        for kind in SCHEMA_MEMBER_KINDS {
            if kinds.contains(kind) {
                if let Some(symbol) = self.find_member(schema, key, kind) {
                    return FindResult::Found(symbol);
                }
            }
        }
        FindResult::NotFound
    }

    /// Looks up a single kind of member of `schema`.
    fn find_member(&mut self, schema: &SchemaDecl, key: &str, kind: SymbolKind) -> Option<Symbol<'s>> {
        let storage = schema.storage_provider();
        match kind {
            SymbolKind::SchemaVariable => {
                let decl = schema.variable_provider().find(key)?;
                Some(Symbol::SchemaVariable(self.context.external_variable(&decl)))
            }
            SymbolKind::RelationDecl => storage.find_relation(key).map(Symbol::RelationDecl),
            SymbolKind::TableDecl => storage.find_table(key).map(Symbol::TableDecl),
            SymbolKind::IndexDecl => storage.find_index(key).map(Symbol::IndexDecl),
            _ => None,
        }
    }

    fn ambiguous(
        &mut self,
        code: DiagnosticCode,
        what: &str,
        key: &str,
        region: Region,
    ) -> FindResult<Symbol<'s>> {
        FindResult::Error(self.context.report(code, format!("{what} '{key}' is ambiguous"), region))
    }

    fn report_not_found(
        &mut self,
        qualifier: &[Identifier],
        last: &Identifier,
        kinds: SymbolKindSet,
    ) -> Reported {
        let text = qualifier
            .iter()
            .chain(std::iter::once(last))
            .map(|identifier| identifier.to_string())
            .collect::<Vec<_>>()
            .join(".");
        let region = match qualifier.first() {
            Some(first) => first.region.merge(last.region),
            None => last.region,
        };
        let (code, message) = match kinds.single() {
            Some(kind) => (
                kind.not_found_code(),
                format!("{} '{text}' is not found", kind.description()),
            ),
            None if kinds.iter().all(SymbolKind::is_variable) => (
                DiagnosticCode::VariableNotFound,
                format!("variable '{text}' is not found"),
            ),
            None => (
                DiagnosticCode::SymbolNotFound,
                format!("symbol '{text}' is not found (expected one of {kinds})"),
            ),
        };
        self.context.report(code, message, region)
    }
}

#[cfg(test)]
mod tests {
    use metadata::catalog::{Catalog, SearchPath};

    use super::*;
    use crate::{
        context::{PlaceholderMap, SchemaEnvironment},
        options::AnalyzerOptions,
        testing,
    };

    /// Schema `a` holds table `ta`, index `x` over it and table `y`; schema `b` holds table
    /// `x` and variable `y`.
    const TWO_SCHEMAS_JSON: &str = r#"{
        "name": "db",
        "schemas": [
            {
                "name": "a",
                "tables": [
                    { "name": "ta", "columns": [ { "name": "k", "ty": { "kind": "int4" } } ], "primary_key": ["k"] },
                    { "name": "y", "columns": [ { "name": "k", "ty": { "kind": "int4" } } ], "primary_key": ["k"] }
                ],
                "indexes": [ { "name": "x", "table": "ta", "keys": [ { "column": "k" } ] } ]
            },
            {
                "name": "b",
                "tables": [
                    { "name": "x", "columns": [ { "name": "k", "ty": { "kind": "int4" } } ], "primary_key": ["k"] }
                ],
                "variables": [ { "name": "y", "ty": { "kind": "int8" } } ]
            }
        ]
    }"#;

    /// Context whose search path is `a, b`.
    fn two_schema_context() -> AnalyzerContext {
        testing::init_logging();
        let catalog = Catalog::from_json_str(TWO_SCHEMAS_JSON).unwrap().into_shared();
        let a = catalog.read().find_schema("a").unwrap();
        let b = catalog.read().find_schema("b").unwrap();
        let environment = SchemaEnvironment {
            catalog,
            search_path: SearchPath::new(vec![Arc::clone(&a), b]),
            default_schema: a,
        };
        let mut context = AnalyzerContext::new();
        context.initialize(AnalyzerOptions::default(), environment, PlaceholderMap::new(), None);
        context
    }

    fn column_kinds() -> SymbolKindSet {
        SymbolKindSet::of(&[SymbolKind::ColumnVariable])
    }

    #[test]
    fn table_on_search_path_precedes_index_of_earlier_schema() {
        // given index x in schema a and table x in schema b, searched in order a, b
        let mut context = two_schema_context();
        let scope = QueryScope::new();
        let kinds = SymbolKindSet::of(&[SymbolKind::TableDecl, SymbolKind::IndexDecl]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        // when resolving x as a table or an index
        let result = resolver.resolve(&Name::from("x"), kinds, true);

        // then every schema is searched for tables before any schema is searched for indexes
        let FindResult::Found(Symbol::TableDecl(table)) = &result else {
            panic!("expected table, got {result:?}");
        };
        assert_eq!(table.schema_name(), "b");
    }

    #[test]
    fn variable_on_search_path_precedes_table_of_earlier_schema() {
        let mut context = two_schema_context();
        let scope = QueryScope::new();
        let kinds = SymbolKindSet::of(&[SymbolKind::SchemaVariable, SymbolKind::TableDecl]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("y"), kinds, true);

        assert!(matches!(result, FindResult::Found(Symbol::SchemaVariable(_))));
    }

    #[test]
    fn index_is_found_when_no_table_matches() {
        let mut context = two_schema_context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("x"), SymbolKind::IndexDecl.into(), true);

        let FindResult::Found(Symbol::IndexDecl(index)) = &result else {
            panic!("expected index, got {result:?}");
        };
        assert_eq!(index.table().name(), "ta");
    }

    #[test]
    fn table_qualified_by_catalog_and_schema() {
        // given the fixture catalog db with schema public
        let mut context = testing::context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        // when resolving db.public.t0 at once and db.public on its own
        let qualified = resolver.resolve(&Name::from("db.public.t0"), SymbolKind::TableDecl.into(), true);
        let qualifier = resolver.resolve(&Name::from("db.public"), SymbolKind::SchemaDecl.into(), true);

        // then both paths reach the same table declaration
        let FindResult::Found(Symbol::TableDecl(table)) = &qualified else {
            panic!("expected table, got {qualified:?}");
        };
        let FindResult::Found(Symbol::SchemaDecl(schema)) = &qualifier else {
            panic!("expected schema, got {qualifier:?}");
        };
        let expected = schema.storage_provider().find_table("t0").unwrap();
        assert!(Arc::ptr_eq(table, &expected));
        assert!(!context.has_diagnostics());
    }

    #[test]
    fn qualifier_table_is_fixed() {
        assert_eq!(
            SymbolKind::ColumnVariable.qualifiers(),
            SymbolKindSet::from(SymbolKind::RelationInfo)
        );
        assert_eq!(
            SymbolKind::TableDecl.qualifiers(),
            SymbolKindSet::from(SymbolKind::SchemaDecl)
        );
        assert_eq!(
            SymbolKind::SchemaDecl.qualifiers(),
            SymbolKindSet::from(SymbolKind::CatalogDecl)
        );
        assert!(SymbolKind::CatalogDecl.qualifiers().is_empty());
    }

    #[test]
    fn kind_set_operations() {
        let set = SymbolKindSet::of(&[SymbolKind::TableDecl, SymbolKind::IndexDecl]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(SymbolKind::IndexDecl));
        assert!(!set.contains(SymbolKind::SchemaDecl));
        assert_eq!(set.single(), None);
        assert_eq!(
            SymbolKindSet::from(SymbolKind::TableDecl).single(),
            Some(SymbolKind::TableDecl)
        );
        assert_eq!(set.to_string(), "{table_decl, index_decl}");
    }

    #[test]
    fn unqualified_column_found_in_scope() {
        // given a scope with a scan of t0
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));

        // when resolving an unqualified column
        let mut resolver = SymbolResolver::new(&mut context, &scope);
        let result = resolver.resolve(&Name::from("c1"), column_kinds(), true);

        // then the column variable is returned
        assert!(matches!(result, FindResult::Found(Symbol::ColumnVariable(_))));
    }

    #[test]
    fn qualified_column_through_relation() {
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("t0.c1"), column_kinds(), true);

        assert!(result.is_found());
    }

    #[test]
    fn column_qualified_by_schema_and_table() {
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("public.t0.c1"), column_kinds(), true);

        assert!(result.is_found());
    }

    #[test]
    fn missing_mandatory_column_reports_column_not_found() {
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("missing"), column_kinds(), true);

        assert!(result.is_error());
        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::ColumnNotFound);
    }

    #[test]
    fn soft_lookup_does_not_report() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("missing"), column_kinds(), false);

        assert!(result.is_not_found());
        assert!(!context.has_diagnostics());
    }

    #[test]
    fn mixed_variable_kinds_report_variable_not_found() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let kinds = SymbolKindSet::of(&[SymbolKind::ColumnVariable, SymbolKind::SchemaVariable]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        resolver.resolve(&Name::from("missing"), kinds, true);

        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::VariableNotFound);
    }

    #[test]
    fn mixed_kinds_report_symbol_not_found() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let kinds = SymbolKindSet::of(&[SymbolKind::TableDecl, SymbolKind::ColumnVariable]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        resolver.resolve(&Name::from("missing"), kinds, true);

        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::SymbolNotFound);
    }

    #[test]
    fn relation_in_scope_shadows_table() {
        // given t0 is both a relation of the scope and a table of the schema
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));
        let kinds = SymbolKindSet::of(&[SymbolKind::RelationInfo, SymbolKind::TableDecl]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        // when resolving it as either
        let result = resolver.resolve(&Name::from("t0"), kinds, true);

        // then the relation wins
        assert!(matches!(result, FindResult::Found(Symbol::RelationInfo(_))));
    }

    #[test]
    fn schema_variable_follows_columns() {
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t0"));
        let kinds = SymbolKindSet::of(&[SymbolKind::ColumnVariable, SymbolKind::SchemaVariable]);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let column = resolver.resolve(&Name::from("c0"), kinds, true);
        let variable = resolver.resolve(&Name::from("v"), kinds, true);

        assert!(matches!(column, FindResult::Found(Symbol::ColumnVariable(_))));
        assert!(matches!(variable, FindResult::Found(Symbol::SchemaVariable(_))));
    }

    #[test]
    fn table_and_index_and_schema_and_catalog() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let table = resolver.resolve(&Name::from("public.t1"), SymbolKind::TableDecl.into(), true);
        let index = resolver.resolve(&Name::from("i0"), SymbolKind::IndexDecl.into(), true);
        let schema = resolver.resolve(&Name::from("db.public"), SymbolKind::SchemaDecl.into(), true);
        let catalog = resolver.resolve(&Name::from("db"), SymbolKind::CatalogDecl.into(), true);

        assert!(matches!(table, FindResult::Found(Symbol::TableDecl(_))));
        assert!(matches!(index, FindResult::Found(Symbol::IndexDecl(_))));
        assert!(matches!(schema, FindResult::Found(Symbol::SchemaDecl(_))));
        assert!(matches!(catalog, FindResult::Found(Symbol::CatalogDecl(_))));
    }

    #[test]
    fn qualified_catalog_is_not_found() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("x.db"), SymbolKind::CatalogDecl.into(), false);

        assert!(result.is_not_found());
    }

    #[test]
    fn missing_qualifier_is_reported_once() {
        // given a qualifier which does not exist
        let mut context = testing::context();
        let scope = QueryScope::new();
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        // when resolving a table through it
        let result = resolver.resolve(&Name::from("nowhere.t0"), SymbolKind::TableDecl.into(), true);

        // then only the schema is reported
        assert!(result.is_error());
        assert_eq!(context.diagnostics().len(), 1);
        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::SchemaNotFound);
    }

    #[test]
    fn ambiguous_column_is_reported() {
        let mut context = testing::context();
        let mut scope = QueryScope::new();
        scope.add(testing::scan_as(&mut context, "t0", "a"));
        scope.add(testing::scan_as(&mut context, "t0", "b"));
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let result = resolver.resolve(&Name::from("c0"), column_kinds(), false);

        assert!(result.is_error());
        assert_eq!(context.diagnostics()[0].code, DiagnosticCode::ColumnAmbiguous);
    }

    #[test]
    fn field_variable_only_matches_derived_columns() {
        let mut context = testing::context();
        let variable = context.create_stream_variable(types::schema::Type::Int4);
        let mut derived = RelationInfo::projection(Some("q".into()));
        derived.add_column(variable, Some("x".into())).unwrap();
        let mut scope = QueryScope::new();
        scope.add(derived);
        scope.add(testing::scan(&mut context, "t0"));
        let kinds = SymbolKindSet::from(SymbolKind::FieldVariable);
        let mut resolver = SymbolResolver::new(&mut context, &scope);

        let field = resolver.resolve(&Name::from("x"), kinds, false);
        let column = resolver.resolve(&Name::from("c0"), kinds, false);

        assert!(matches!(field, FindResult::Found(Symbol::FieldVariable(_))));
        assert!(column.is_not_found());
    }
}
