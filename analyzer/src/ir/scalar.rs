use std::sync::Arc;

use metadata::function::{AggregateFunctionDecl, FunctionDecl};
use types::{schema::Type, value::Value};

use super::Variable;
use crate::ast::Region;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Immediate {
        value: Arc<Value>,
        ty: Arc<Type>,
    },
    VariableReference(Variable),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Compare {
        operator: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Cast {
        ty: Arc<Type>,
        operand: Box<Expression>,
    },
    Match {
        operator: MatchOperator,
        input: Box<Expression>,
        pattern: Box<Expression>,
        escape: Box<Expression>,
    },
    /// Searched conditional, the first alternative whose condition holds is evaluated.
    Conditional {
        alternatives: Vec<Alternative>,
        default: Option<Box<Expression>>,
    },
    /// First non-null operand.
    Coalesce(Vec<Expression>),
    /// Binds each declarator in order, then evaluates `body`.
    Let {
        declarators: Vec<Declarator>,
        body: Box<Expression>,
    },
    FunctionCall {
        function: Arc<FunctionDecl>,
        arguments: Vec<Expression>,
    },
    AggregateCall {
        function: Arc<AggregateFunctionDecl>,
        quantifier: SetQuantifier,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub condition: Expression,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub variable: Variable,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    SignInversion,
    ConditionalNot,
    IsNull,
    IsTrue,
    IsFalse,
    IsUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Concat,
    ConditionalAnd,
    ConditionalOr,
}

impl BinaryOperator {
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            BinaryOperator::ConditionalAnd | BinaryOperator::ConditionalOr
        )
    }
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    Like,
    Similar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetQuantifier {
    #[default]
    All,
    Distinct,
}

impl Expression {
    pub fn new(kind: ExpressionKind, region: Region) -> Self {
        Expression { kind, region }
    }

    pub fn immediate(value: Arc<Value>, ty: Arc<Type>, region: Region) -> Self {
        Expression::new(ExpressionKind::Immediate { value, ty }, region)
    }

    pub fn variable(variable: Variable, region: Region) -> Self {
        Expression::new(ExpressionKind::VariableReference(variable), region)
    }

    pub fn unary(operator: UnaryOperator, operand: Expression, region: Region) -> Self {
        let kind = ExpressionKind::Unary {
            operator,
            operand: Box::new(operand),
        };
        Expression::new(kind, region)
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression, region: Region) -> Self {
        let kind = ExpressionKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        Expression::new(kind, region)
    }

    pub fn compare(
        operator: ComparisonOperator,
        left: Expression,
        right: Expression,
        region: Region,
    ) -> Self {
        let kind = ExpressionKind::Compare {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        Expression::new(kind, region)
    }

    pub fn let_in(declarators: Vec<Declarator>, body: Expression, region: Region) -> Self {
        let kind = ExpressionKind::Let {
            declarators,
            body: Box::new(body),
        };
        Expression::new(kind, region)
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            ExpressionKind::VariableReference(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<(&Value, &Type)> {
        match &self.kind {
            ExpressionKind::Immediate { value, ty } => Some((value, ty)),
            _ => None,
        }
    }

    pub fn is_aggregate_call(&self) -> bool {
        matches!(self.kind, ExpressionKind::AggregateCall { .. })
    }

    /// Returns `true` if `self` or any of its sub-expressions is an aggregate call.
    pub fn contains_aggregate_call(&self) -> bool {
        match &self.kind {
            ExpressionKind::Immediate { .. } | ExpressionKind::VariableReference(_) => false,
            ExpressionKind::Unary { operand, .. } | ExpressionKind::Cast { operand, .. } => {
                operand.contains_aggregate_call()
            }
            ExpressionKind::Binary { left, right, .. }
            | ExpressionKind::Compare { left, right, .. } => {
                left.contains_aggregate_call() || right.contains_aggregate_call()
            }
            ExpressionKind::Match {
                input,
                pattern,
                escape,
                ..
            } => [input, pattern, escape]
                .iter()
                .any(|operand| operand.contains_aggregate_call()),
            ExpressionKind::Conditional {
                alternatives,
                default,
            } => {
                alternatives.iter().any(|alternative| {
                    alternative.condition.contains_aggregate_call()
                        || alternative.body.contains_aggregate_call()
                }) || default.as_ref().is_some_and(|d| d.contains_aggregate_call())
            }
            ExpressionKind::Coalesce(operands) | ExpressionKind::FunctionCall { arguments: operands, .. } => {
                operands.iter().any(Expression::contains_aggregate_call)
            }
            ExpressionKind::Let { declarators, body } => {
                declarators
                    .iter()
                    .any(|declarator| declarator.value.contains_aggregate_call())
                    || body.contains_aggregate_call()
            }
            ExpressionKind::AggregateCall { .. } => true,
        }
    }
}
