use std::fmt;

use thiserror::Error;

use crate::ast::Region;

/// Classifies problems found while analyzing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // general
    Unknown,
    UnsupportedFeature,
    MalformedSyntax,
    UnsupportedStatement,

    // literals and types
    UnsupportedType,
    ExactNumberOutOfRange,
    ApproximateNumberOutOfRange,
    MalformedDatetimeLiteral,
    CharacterStringTooLong,
    InvalidCharacterLength,
    InvalidDecimalPrecision,
    InvalidDecimalScale,
    InconsistentType,

    // lookup failures
    SymbolNotFound,
    VariableNotFound,
    ColumnNotFound,
    RelationNotFound,
    TableNotFound,
    IndexNotFound,
    SchemaNotFound,
    CatalogNotFound,
    FunctionNotFound,

    // definition conflicts
    VariableAlreadyExists,
    ColumnAlreadyExists,
    RelationAlreadyExists,
    TableAlreadyExists,
    IndexAlreadyExists,
    PrimaryIndexAlreadyExists,
    SchemaAlreadyExists,
    CatalogAlreadyExists,
    FunctionAlreadyExists,

    // ambiguity
    SymbolAmbiguous,
    RelationAmbiguous,
    ColumnAmbiguous,
    FunctionAmbiguous,

    // inconsistencies
    InconsistentColumns,
    InconsistentTable,
    InconsistentElements,
    UnexpectedSymbol,
    InvalidAggregation,
    InvalidDefaultValue,
}

impl DiagnosticCode {
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticCode::Unknown => "unknown",
            DiagnosticCode::UnsupportedFeature => "unsupported_feature",
            DiagnosticCode::MalformedSyntax => "malformed_syntax",
            DiagnosticCode::UnsupportedStatement => "unsupported_statement",
            DiagnosticCode::UnsupportedType => "unsupported_type",
            DiagnosticCode::ExactNumberOutOfRange => "exact_number_out_of_range",
            DiagnosticCode::ApproximateNumberOutOfRange => "approximate_number_out_of_range",
            DiagnosticCode::MalformedDatetimeLiteral => "malformed_datetime_literal",
            DiagnosticCode::CharacterStringTooLong => "character_string_too_long",
            DiagnosticCode::InvalidCharacterLength => "invalid_character_length",
            DiagnosticCode::InvalidDecimalPrecision => "invalid_decimal_precision",
            DiagnosticCode::InvalidDecimalScale => "invalid_decimal_scale",
            DiagnosticCode::InconsistentType => "inconsistent_type",
            DiagnosticCode::SymbolNotFound => "symbol_not_found",
            DiagnosticCode::VariableNotFound => "variable_not_found",
            DiagnosticCode::ColumnNotFound => "column_not_found",
            DiagnosticCode::RelationNotFound => "relation_not_found",
            DiagnosticCode::TableNotFound => "table_not_found",
            DiagnosticCode::IndexNotFound => "index_not_found",
            DiagnosticCode::SchemaNotFound => "schema_not_found",
            DiagnosticCode::CatalogNotFound => "catalog_not_found",
            DiagnosticCode::FunctionNotFound => "function_not_found",
            DiagnosticCode::VariableAlreadyExists => "variable_already_exists",
            DiagnosticCode::ColumnAlreadyExists => "column_already_exists",
            DiagnosticCode::RelationAlreadyExists => "relation_already_exists",
            DiagnosticCode::TableAlreadyExists => "table_already_exists",
            DiagnosticCode::IndexAlreadyExists => "index_already_exists",
            DiagnosticCode::PrimaryIndexAlreadyExists => "primary_index_already_exists",
            DiagnosticCode::SchemaAlreadyExists => "schema_already_exists",
            DiagnosticCode::CatalogAlreadyExists => "catalog_already_exists",
            DiagnosticCode::FunctionAlreadyExists => "function_already_exists",
            DiagnosticCode::SymbolAmbiguous => "symbol_ambiguous",
            DiagnosticCode::RelationAmbiguous => "relation_ambiguous",
            DiagnosticCode::ColumnAmbiguous => "column_ambiguous",
            DiagnosticCode::FunctionAmbiguous => "function_ambiguous",
            DiagnosticCode::InconsistentColumns => "inconsistent_columns",
            DiagnosticCode::InconsistentTable => "inconsistent_table",
            DiagnosticCode::InconsistentElements => "inconsistent_elements",
            DiagnosticCode::UnexpectedSymbol => "unexpected_symbol",
            DiagnosticCode::InvalidAggregation => "invalid_aggregation",
            DiagnosticCode::InvalidDefaultValue => "invalid_default_value",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A problem found in the analyzed statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message} ({region})")]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub region: Region,
}

/// Proof that a [`Diagnostic`] was recorded in the analyzer context.
///
/// It can only be created by [`AnalyzerContext::report`](crate::context::AnalyzerContext::report),
/// so a failed analysis always leaves at least one diagnostic behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported(());

impl Reported {
    pub(crate) fn new() -> Self {
        Reported(())
    }
}

/// Result of an analysis step, the error side means diagnostics were already recorded.
pub type AnalyzeResult<T> = Result<T, Reported>;
