//! Type inference over lowered scalar expressions.

use thiserror::Error;
use types::schema::Type;

use crate::{
    ast::Region,
    ir::{BinaryOperator, Expression, ExpressionKind, UnaryOperator},
};

/// An expression whose operands cannot be combined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypeError {
    pub message: String,
    pub region: Region,
}

impl TypeError {
    fn new(message: impl Into<String>, region: Region) -> Self {
        TypeError {
            message: message.into(),
            region,
        }
    }
}

/// Returns the type of `expression`, checking every operand on the way.
pub fn infer(expression: &Expression) -> Result<Type, TypeError> {
    let region = expression.region;
    match &expression.kind {
        ExpressionKind::Immediate { ty, .. } => Ok(**ty),
        ExpressionKind::VariableReference(variable) => Ok(**variable.ty()),
        ExpressionKind::Unary { operator, operand } => {
            let ty = infer(operand)?;
            match operator {
                UnaryOperator::Plus | UnaryOperator::SignInversion => {
                    if ty.is_numeric() || ty.is_unknown() {
                        Ok(ty)
                    } else {
                        Err(TypeError::new(
                            format!("operand of sign operator must be numeric, got {ty}"),
                            region,
                        ))
                    }
                }
                UnaryOperator::ConditionalNot => {
                    expect_boolean(&ty, region)?;
                    Ok(Type::Boolean)
                }
                UnaryOperator::IsNull => Ok(Type::Boolean),
                UnaryOperator::IsTrue | UnaryOperator::IsFalse | UnaryOperator::IsUnknown => {
                    expect_boolean(&ty, region)?;
                    Ok(Type::Boolean)
                }
            }
        }
        ExpressionKind::Binary {
            operator,
            left,
            right,
        } => {
            let l = infer(left)?;
            let r = infer(right)?;
            match operator {
                BinaryOperator::ConditionalAnd | BinaryOperator::ConditionalOr => {
                    expect_boolean(&l, left.region)?;
                    expect_boolean(&r, right.region)?;
                    Ok(Type::Boolean)
                }
                BinaryOperator::Concat => {
                    if (l.is_character() || l.is_unknown()) && (r.is_character() || r.is_unknown()) {
                        Ok(Type::varchar())
                    } else {
                        Err(TypeError::new(
                            format!("cannot concatenate {l} and {r}"),
                            region,
                        ))
                    }
                }
                _ => {
                    let ty = common_type(&l, &r, region)?;
                    if ty.is_numeric() || ty.is_unknown() {
                        Ok(ty)
                    } else {
                        Err(TypeError::new(
                            format!("arithmetic is not defined for {ty}"),
                            region,
                        ))
                    }
                }
            }
        }
        ExpressionKind::Compare { left, right, .. } => {
            let l = infer(left)?;
            let r = infer(right)?;
            common_type(&l, &r, region)?;
            Ok(Type::Boolean)
        }
        ExpressionKind::Cast { ty, operand } => {
            infer(operand)?;
            Ok(**ty)
        }
        ExpressionKind::Match {
            input,
            pattern,
            escape,
            ..
        } => {
            for operand in [input, pattern, escape] {
                let ty = infer(operand)?;
                if !ty.is_character() && !ty.is_unknown() {
                    return Err(TypeError::new(
                        format!("pattern matching operand must be a character string, got {ty}"),
                        operand.region,
                    ));
                }
            }
            Ok(Type::Boolean)
        }
        ExpressionKind::Conditional {
            alternatives,
            default,
        } => {
            let mut result = Type::Unknown;
            for alternative in alternatives {
                expect_boolean(&infer(&alternative.condition)?, alternative.condition.region)?;
                let ty = infer(&alternative.body)?;
                result = common_type(&result, &ty, alternative.body.region)?;
            }
            if let Some(default) = default {
                let ty = infer(default)?;
                result = common_type(&result, &ty, default.region)?;
            }
            Ok(result)
        }
        ExpressionKind::Coalesce(operands) => {
            let mut result = Type::Unknown;
            for operand in operands {
                let ty = infer(operand)?;
                result = common_type(&result, &ty, operand.region)?;
            }
            Ok(result)
        }
        ExpressionKind::Let { declarators, body } => {
            for declarator in declarators {
                infer(&declarator.value)?;
            }
            infer(body)
        }
        ExpressionKind::FunctionCall {
            function,
            arguments,
        } => {
            check_arguments(function.parameters(), arguments)?;
            Ok(function.return_type())
        }
        ExpressionKind::AggregateCall {
            function,
            arguments,
            ..
        } => {
            check_arguments(function.parameters(), arguments)?;
            Ok(function.return_type())
        }
    }
}

fn expect_boolean(ty: &Type, region: Region) -> Result<(), TypeError> {
    if ty.is_boolean() || ty.is_unknown() {
        Ok(())
    } else {
        Err(TypeError::new(
            format!("expected BOOLEAN, got {ty}"),
            region,
        ))
    }
}

fn common_type(l: &Type, r: &Type, region: Region) -> Result<Type, TypeError> {
    Type::coercion(l, r)
        .ok_or_else(|| TypeError::new(format!("no common type for {l} and {r}"), region))
}

fn check_arguments(parameters: &[Type], arguments: &[Expression]) -> Result<(), TypeError> {
    for (parameter, argument) in parameters.iter().zip(arguments) {
        let ty = infer(argument)?;
        if !Type::is_parameter_application_convertible(&ty, parameter) {
            return Err(TypeError::new(
                format!("argument of type {ty} cannot be passed as {parameter}"),
                argument.region,
            ));
        }
    }
    Ok(())
}
