use super::{Literal, Name, QueryExpression, Region, TypeName};

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarExpression {
    pub kind: ScalarKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    Literal(Literal),
    /// Reference to a column, field or schema variable.
    Variable(Name),
    /// `:name`
    HostParameter(String),
    /// A placeholder bound to a value before analysis.
    Placeholder(String),
    Case(CaseExpression),
    Cast {
        operand: Box<ScalarExpression>,
        target: TypeName,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<ScalarExpression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<ScalarExpression>,
        right: Box<ScalarExpression>,
    },
    Comparison {
        operator: ComparisonOperator,
        left: Box<ScalarExpression>,
        right: Box<ScalarExpression>,
    },
    Between(BetweenPredicate),
    In(InPredicate),
    /// `operand IS [NOT] right` where `right` is one of `NULL`, `TRUE`, `FALSE` or `UNKNOWN`.
    Is {
        operand: Box<ScalarExpression>,
        right: Box<ScalarExpression>,
        negated: bool,
    },
    PatternMatch(PatternMatchPredicate),
    FunctionCall(FunctionCall),
    Builtin {
        function: BuiltinFunction,
        arguments: Vec<ScalarExpression>,
    },
    Subquery(Box<QueryExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Concat,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpression {
    /// Present for the simple form `CASE operand WHEN value THEN ...`.
    pub operand: Option<Box<ScalarExpression>>,
    pub whens: Vec<WhenClause>,
    pub default: Option<Box<ScalarExpression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: ScalarExpression,
    pub result: ScalarExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetweenPredicate {
    pub target: Box<ScalarExpression>,
    pub low: Box<ScalarExpression>,
    pub high: Box<ScalarExpression>,
    pub symmetric: bool,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InPredicate {
    pub target: Box<ScalarExpression>,
    pub values: InValues,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    List(Vec<ScalarExpression>),
    Subquery(Box<QueryExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatchOperator {
    Like,
    SimilarTo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatchPredicate {
    pub operator: PatternMatchOperator,
    pub input: Box<ScalarExpression>,
    pub pattern: Box<ScalarExpression>,
    pub escape: Option<Box<ScalarExpression>>,
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetQuantifier {
    All,
    Distinct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Name,
    pub arguments: Vec<ScalarExpression>,
    pub quantifier: Option<SetQuantifier>,
    /// `f(*)`, only valid for aggregate functions without arguments.
    pub asterisk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    Coalesce,
    Nullif,
}

impl ScalarExpression {
    pub fn new(kind: ScalarKind, region: Region) -> Self {
        ScalarExpression { kind, region }
    }

    pub fn literal(literal: Literal) -> Self {
        ScalarExpression::new(ScalarKind::Literal(literal), Region::default())
    }

    pub fn variable(name: impl Into<Name>) -> Self {
        ScalarExpression::new(ScalarKind::Variable(name.into()), Region::default())
    }

    pub fn unary(operator: UnaryOperator, operand: ScalarExpression) -> Self {
        let kind = ScalarKind::Unary {
            operator,
            operand: Box::new(operand),
        };
        ScalarExpression::new(kind, Region::default())
    }

    pub fn binary(operator: BinaryOperator, left: ScalarExpression, right: ScalarExpression) -> Self {
        let kind = ScalarKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        ScalarExpression::new(kind, Region::default())
    }

    pub fn comparison(
        operator: ComparisonOperator,
        left: ScalarExpression,
        right: ScalarExpression,
    ) -> Self {
        let kind = ScalarKind::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        ScalarExpression::new(kind, Region::default())
    }

    pub fn function_call(name: impl Into<Name>, arguments: Vec<ScalarExpression>) -> Self {
        let kind = ScalarKind::FunctionCall(FunctionCall {
            name: name.into(),
            arguments,
            quantifier: None,
            asterisk: false,
        });
        ScalarExpression::new(kind, Region::default())
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}
