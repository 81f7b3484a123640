//! Intermediate representation produced by the analyzer.
//!
//! Scalar expressions form owned trees, relational operators live in an [`OperatorGraph`]
//! arena and refer to their inputs by [`OperatorId`].

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use metadata::function::VariableDecl;
use types::schema::Type;

mod relation;
mod scalar;
mod statement;

pub use relation::*;
pub use scalar::*;
pub use statement::*;

/// Where the value of a [`Variable`] comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    /// A column of an operator output.
    Stream,
    /// A name bound by a `let` expression.
    Local,
    /// A schema variable or host parameter.
    External(Arc<VariableDecl>),
}

/// A value holder referred by expressions and operators.
///
/// Variables are identified by their id alone, which is unique within one analysis.
#[derive(Debug, Clone)]
pub struct Variable {
    id: u64,
    kind: VariableKind,
    ty: Arc<Type>,
}

impl Variable {
    pub(crate) fn new(id: u64, kind: VariableKind, ty: Arc<Type>) -> Self {
        Variable { id, kind, ty }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn ty(&self) -> &Arc<Type> {
        &self.ty
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            VariableKind::Stream => "s",
            VariableKind::Local => "l",
            VariableKind::External(_) => "x",
        };
        write!(f, "{prefix}{}", self.id)
    }
}
