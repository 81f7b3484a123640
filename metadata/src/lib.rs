//! Declarations the analyzer resolves names against, and the provider contracts exposing them.

pub mod catalog;
pub mod function;
pub mod schema;
pub mod table;
