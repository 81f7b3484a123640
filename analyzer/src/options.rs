use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// How regular (non-delimited) identifiers are normalized before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierCase {
    #[default]
    Lower,
    Upper,
    Preserve,
}

impl IdentifierCase {
    pub fn apply(&self, token: &str) -> String {
        match self {
            IdentifierCase::Lower => token.to_lowercase(),
            IdentifierCase::Upper => token.to_uppercase(),
            IdentifierCase::Preserve => token.to_string(),
        }
    }
}

/// Error for [`AnalyzerOptions`] related operations.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("io error occurred: {0}")]
    IoError(#[from] std::io::Error),
    #[error("json error occurred: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Settings of the analyzer, fixed for the lifetime of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub identifier_case: IdentifierCase,
    /// Type-check every scalar expression right after it is lowered.
    pub validate_scalar_expressions: bool,
    /// Lower `INSERT ... VALUES` with only constant rows into a literal write statement
    /// instead of an execution plan.
    pub prefer_write_statement: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            identifier_case: IdentifierCase::Lower,
            validate_scalar_expressions: false,
            prefer_write_statement: true,
        }
    }
}

impl AnalyzerOptions {
    /// Reads options from JSON, missing fields keep their defaults.
    pub fn from_json_str(content: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let content = fs::read_to_string(path)?;
        AnalyzerOptions::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        // given options which only set one field
        let json = r#"{ "validate_scalar_expressions": true }"#;

        // when parsing them
        let options = AnalyzerOptions::from_json_str(json).unwrap();

        // then other fields have default values
        assert!(options.validate_scalar_expressions);
        assert!(options.prefer_write_statement);
        assert_eq!(options.identifier_case, IdentifierCase::Lower);
    }

    #[test]
    fn identifier_case_is_parsed() {
        let options = AnalyzerOptions::from_json_str(r#"{ "identifier_case": "upper" }"#).unwrap();
        assert_eq!(options.identifier_case.apply("Abc"), "ABC");
    }

    #[test]
    fn invalid_json_is_error() {
        let result = AnalyzerOptions::from_json_str(r#"{ "identifier_case": 1 }"#);
        assert!(matches!(result, Err(OptionsError::JsonError(_))));
    }

    #[test]
    fn options_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "prefer_write_statement": false }}"#).unwrap();

        let options = AnalyzerOptions::from_file(file.path()).unwrap();

        assert!(!options.prefer_write_statement);
    }

    #[test]
    fn preserve_keeps_token() {
        assert_eq!(IdentifierCase::Preserve.apply("MixedCase"), "MixedCase");
        assert_eq!(IdentifierCase::Lower.apply("MixedCase"), "mixedcase");
    }
}
