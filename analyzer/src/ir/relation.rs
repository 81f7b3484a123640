use std::sync::Arc;

use metadata::{
    function::AggregateFunctionDecl,
    table::{IndexDecl, TableDecl},
};

use super::{Expression, SetQuantifier, Variable};

/// Relational operators of an execution plan.
///
/// Operators are appended in dependency order, so inputs always come before the operators
/// consuming them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorGraph {
    pub operators: Vec<Operator>,
}

impl OperatorGraph {
    pub fn new() -> Self {
        OperatorGraph { operators: vec![] }
    }

    pub(crate) fn add_operator(&mut self, operator: Operator) -> OperatorId {
        self.operators.push(operator);
        OperatorId::new(self.operators.len() - 1)
    }

    pub fn operator(&self, id: OperatorId) -> &Operator {
        &self.operators[id.0]
    }

    /// Returns the most recently added operator, which is the sink of a lowered statement.
    pub fn root(&self) -> Option<OperatorId> {
        self.operators.len().checked_sub(1).map(OperatorId::new)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Returns the chain of operators starting at `id` and following the first input of each,
    /// e.g. `[emit, filter, scan]`.
    pub fn upstream(&self, id: OperatorId) -> Vec<&Operator> {
        let mut chain = vec![];
        let mut current = Some(id);
        while let Some(id) = current {
            let operator = self.operator(id);
            chain.push(operator);
            current = operator.inputs().first().copied();
        }
        chain
    }
}

/// [`OperatorId`] is used for indexing operators inside [`OperatorGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorId(usize);

impl OperatorId {
    fn new(id: usize) -> Self {
        OperatorId(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Scan(Scan),
    Values(Values),
    Filter(Filter),
    Project(Project),
    Join(Join),
    Distinct(Distinct),
    Aggregate(Aggregate),
    Emit(Emit),
    Write(Write),
}

impl Operator {
    pub fn inputs(&self) -> Vec<OperatorId> {
        match self {
            Operator::Scan(_) | Operator::Values(_) => vec![],
            Operator::Filter(filter) => vec![filter.input],
            Operator::Project(project) => vec![project.input],
            Operator::Join(join) => vec![join.left, join.right],
            Operator::Distinct(distinct) => vec![distinct.input],
            Operator::Aggregate(aggregate) => vec![aggregate.input],
            Operator::Emit(emit) => vec![emit.input],
            Operator::Write(write) => vec![write.input],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Scan(_) => "scan",
            Operator::Values(_) => "values",
            Operator::Filter(_) => "filter",
            Operator::Project(_) => "project",
            Operator::Join(_) => "join",
            Operator::Distinct(_) => "distinct",
            Operator::Aggregate(_) => "aggregate",
            Operator::Emit(_) => "emit",
            Operator::Write(_) => "write",
        }
    }
}

/// Binds a table column to the stream variable holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub column: String,
    pub variable: Variable,
}

/// Reads every row of a table through its primary index.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub table: Arc<TableDecl>,
    pub index: Arc<IndexDecl>,
    pub columns: Vec<ColumnMapping>,
}

/// Produces constant rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    pub columns: Vec<Variable>,
    pub rows: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub input: OperatorId,
    pub condition: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectColumn {
    pub variable: Variable,
    pub value: Expression,
}

/// Appends computed columns to its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub input: OperatorId,
    pub columns: Vec<ProjectColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Cross,
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub left: OperatorId,
    pub right: OperatorId,
    pub condition: Option<Expression>,
}

/// Removes duplicated rows, comparing only `keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct Distinct {
    pub input: OperatorId,
    pub keys: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub function: Arc<AggregateFunctionDecl>,
    pub quantifier: SetQuantifier,
    pub arguments: Vec<Variable>,
    pub destination: Variable,
}

/// Groups rows by `group_keys` (a single group when empty) and computes aggregates per group.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub input: OperatorId,
    pub group_keys: Vec<Variable>,
    pub columns: Vec<AggregateColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitColumn {
    pub source: Variable,
    pub name: Option<String>,
}

/// Returns rows to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Emit {
    pub input: OperatorId,
    pub columns: Vec<EmitColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    /// Insert, skipping rows whose key already exists.
    InsertSkip,
    /// Insert, overwriting rows whose key already exists.
    InsertOverwrite,
    Update,
    Delete,
}

/// Binds a stream variable to the table column it is written to.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteColumn {
    pub source: Variable,
    pub destination: String,
}

/// Writes rows of its input into a table.
///
/// `keys` identify rows through the primary index, `columns` hold the other written columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub input: OperatorId,
    pub kind: WriteKind,
    pub table: Arc<TableDecl>,
    pub index: Arc<IndexDecl>,
    pub keys: Vec<WriteColumn>,
    pub columns: Vec<WriteColumn>,
}

impl Operator {
    pub(crate) fn filter(input: OperatorId, condition: Expression) -> Self {
        Operator::Filter(Filter { input, condition })
    }

    pub(crate) fn project(input: OperatorId, columns: Vec<ProjectColumn>) -> Self {
        Operator::Project(Project { input, columns })
    }

    pub(crate) fn emit(input: OperatorId, columns: Vec<EmitColumn>) -> Self {
        Operator::Emit(Emit { input, columns })
    }
}
