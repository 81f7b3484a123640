//! Lowering of scalar expressions.
//!
//! Predicates which evaluate an operand more than once (`BETWEEN`, `IN`, simple `CASE` and
//! `NULLIF`) bind it to a local variable first, so it is evaluated exactly once.

use std::sync::Arc;

use log::trace;
use metadata::{
    function::{AggregateFunctionDecl, FunctionDecl},
    schema::SchemaDecl,
};
use time::{Date, PrimitiveDateTime, Time, macros::format_description};
use types::{
    schema::{CHARACTER_MAX_LENGTH, DECIMAL_MAX_PRECISION, Type},
    value::Value,
};

use crate::{
    ast::{
        self, BetweenPredicate, BuiltinFunction, CaseExpression, FunctionCall, InPredicate,
        InValues, Literal, Name, PatternMatchOperator, PatternMatchPredicate, Region,
        ScalarExpression, ScalarKind, TypeName,
    },
    context::AnalyzerContext,
    diagnostic::{AnalyzeResult, DiagnosticCode, Reported},
    ir::{
        Alternative, BinaryOperator, ComparisonOperator, Declarator, Expression, ExpressionKind,
        MatchOperator, SetQuantifier, UnaryOperator, Variable,
    },
    relation_info::QueryScope,
    resolver::{FindResult, Symbol, SymbolKind, SymbolKindSet, SymbolResolver},
    typing,
};

/// A lowered expression and whether it contains an aggregate function call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredScalar {
    pub expression: Expression,
    pub saw_aggregate: bool,
}

/// Lowers `expression`, resolving names in `scope`.
///
/// `hint` is the type the consumer expects, it types `NULL` and narrows numeric literals.
pub fn lower_scalar(
    context: &mut AnalyzerContext,
    scope: &QueryScope,
    expression: &ScalarExpression,
    hint: Option<Type>,
) -> AnalyzeResult<LoweredScalar> {
    let mut lowerer = ScalarLowerer {
        context,
        scope,
        saw_aggregate: false,
    };
    let expression = lowerer.process(expression, hint)?;
    Ok(LoweredScalar {
        expression,
        saw_aggregate: lowerer.saw_aggregate,
    })
}

/// Converts a type name into a type, checking its length, precision and scale.
pub fn lower_type(
    context: &mut AnalyzerContext,
    type_name: &TypeName,
    region: Region,
) -> AnalyzeResult<Type> {
    let ty = match *type_name {
        TypeName::Boolean => Type::Boolean,
        TypeName::Int => Type::Int4,
        TypeName::BigInt => Type::Int8,
        TypeName::Real => Type::Float4,
        TypeName::DoublePrecision => Type::Float8,
        TypeName::Date => Type::Date,
        TypeName::Time => Type::Time,
        TypeName::Timestamp => Type::Timestamp,
        TypeName::Decimal { precision, scale } => {
            if let Some(p) = precision {
                if p == 0 || p > DECIMAL_MAX_PRECISION {
                    return Err(context.report(
                        DiagnosticCode::InvalidDecimalPrecision,
                        format!("decimal precision must be between 1 and {DECIMAL_MAX_PRECISION}, got {p}"),
                        region,
                    ));
                }
            }
            match (precision, scale) {
                (None, None) => Type::decimal(),
                (precision, scale) => {
                    let precision = precision.unwrap_or(DECIMAL_MAX_PRECISION);
                    let scale = scale.unwrap_or(0);
                    if scale > precision {
                        return Err(context.report(
                            DiagnosticCode::InvalidDecimalScale,
                            format!("decimal scale {scale} exceeds precision {precision}"),
                            region,
                        ));
                    }
                    Type::Decimal {
                        precision: Some(precision),
                        scale: Some(scale),
                    }
                }
            }
        }
        TypeName::Char(length) => Type::Character {
            varying: false,
            length: Some(character_length(context, length.unwrap_or(1), region)?),
        },
        TypeName::Varchar(length) => Type::Character {
            varying: true,
            length: match length {
                Some(length) => Some(character_length(context, length, region)?),
                None => None,
            },
        },
    };
    Ok(ty)
}

fn character_length(context: &mut AnalyzerContext, length: u32, region: Region) -> AnalyzeResult<u32> {
    if length == 0 || length > CHARACTER_MAX_LENGTH {
        return Err(context.report(
            DiagnosticCode::InvalidCharacterLength,
            format!("character length must be between 1 and {CHARACTER_MAX_LENGTH}, got {length}"),
            region,
        ));
    }
    Ok(length)
}

struct ScalarLowerer<'c, 's> {
    context: &'c mut AnalyzerContext,
    scope: &'s QueryScope,
    saw_aggregate: bool,
}

impl ScalarLowerer<'_, '_> {
    fn process(&mut self, expression: &ScalarExpression, hint: Option<Type>) -> AnalyzeResult<Expression> {
        let region = expression.region;
        let result = match &expression.kind {
            ScalarKind::Literal(literal) => self.process_literal(literal, region, hint)?,
            ScalarKind::Variable(name) => self.process_variable(name, region)?,
            ScalarKind::HostParameter(name) => match self.context.host_parameter(name) {
                Some(variable) => Expression::variable(variable, region),
                None => {
                    return Err(self.context.report(
                        DiagnosticCode::VariableNotFound,
                        format!("host parameter ':{name}' is not found"),
                        region,
                    ));
                }
            },
            ScalarKind::Placeholder(name) => {
                let Some(placeholder) = self.context.placeholders().get(name).cloned() else {
                    return Err(self.context.report(
                        DiagnosticCode::VariableNotFound,
                        format!("placeholder '{name}' is not bound"),
                        region,
                    ));
                };
                self.immediate(placeholder.value, placeholder.ty, region)
            }
            ScalarKind::Case(case) => self.process_case(case, region, hint)?,
            ScalarKind::Cast { operand, target } => {
                let operand = self.process(operand, None)?;
                let ty = lower_type(self.context, target, region)?;
                let ty = self.context.intern_type(ty);
                Expression::new(
                    ExpressionKind::Cast {
                        ty,
                        operand: Box::new(operand),
                    },
                    region,
                )
            }
            ScalarKind::Unary { operator, operand } => {
                self.process_unary(*operator, operand, region, hint)?
            }
            ScalarKind::Binary {
                operator,
                left,
                right,
            } => {
                let operator = match operator {
                    ast::BinaryOperator::Add => BinaryOperator::Add,
                    ast::BinaryOperator::Subtract => BinaryOperator::Subtract,
                    ast::BinaryOperator::Multiply => BinaryOperator::Multiply,
                    ast::BinaryOperator::Divide => BinaryOperator::Divide,
                    ast::BinaryOperator::Remainder => BinaryOperator::Remainder,
                    ast::BinaryOperator::Concat => BinaryOperator::Concat,
                    ast::BinaryOperator::And => BinaryOperator::ConditionalAnd,
                    ast::BinaryOperator::Or => BinaryOperator::ConditionalOr,
                };
                let left = self.process(left, None)?;
                let right = self.process(right, None)?;
                Expression::binary(operator, left, right, region)
            }
            ScalarKind::Comparison {
                operator,
                left,
                right,
            } => {
                let operator = match operator {
                    ast::ComparisonOperator::Equal => ComparisonOperator::Equal,
                    ast::ComparisonOperator::NotEqual => ComparisonOperator::NotEqual,
                    ast::ComparisonOperator::Less => ComparisonOperator::Less,
                    ast::ComparisonOperator::LessEqual => ComparisonOperator::LessEqual,
                    ast::ComparisonOperator::Greater => ComparisonOperator::Greater,
                    ast::ComparisonOperator::GreaterEqual => ComparisonOperator::GreaterEqual,
                };
                let left = self.process(left, None)?;
                let right = self.process(right, None)?;
                Expression::compare(operator, left, right, region)
            }
            ScalarKind::Between(predicate) => self.process_between(predicate, region)?,
            ScalarKind::In(predicate) => self.process_in(predicate, region)?,
            ScalarKind::Is {
                operand,
                right,
                negated,
            } => self.process_is(operand, right, *negated, region)?,
            ScalarKind::PatternMatch(predicate) => self.process_pattern_match(predicate, region)?,
            ScalarKind::FunctionCall(call) => self.process_function_call(call, region)?,
            ScalarKind::Builtin {
                function,
                arguments,
            } => self.process_builtin(*function, arguments, region, hint)?,
            ScalarKind::Subquery(_) => {
                return Err(self.unsupported("scalar subqueries are not supported", region));
            }
        };
        self.validate(result)
    }

    /// Type-checks `expression` if eager validation is enabled.
    fn validate(&mut self, expression: Expression) -> AnalyzeResult<Expression> {
        if self.context.options().validate_scalar_expressions {
            if let Err(error) = typing::infer(&expression) {
                return Err(self.context.report(
                    DiagnosticCode::InconsistentType,
                    error.message,
                    error.region,
                ));
            }
        }
        Ok(expression)
    }

    fn type_of(&mut self, expression: &Expression) -> AnalyzeResult<Type> {
        typing::infer(expression).map_err(|error| {
            self.context
                .report(DiagnosticCode::InconsistentType, error.message, error.region)
        })
    }

    /// Creates a local variable able to hold the value of `value`.
    fn local_for(&mut self, value: &Expression) -> Variable {
        let ty = typing::infer(value).unwrap_or(Type::Unknown);
        self.context.create_local_variable(ty)
    }

    fn immediate(&mut self, value: Value, ty: Type, region: Region) -> Expression {
        let value = self.context.intern_value(value);
        let ty = self.context.intern_type(ty);
        Expression::immediate(value, ty, region)
    }

    fn malformed(&mut self, message: impl Into<String>, region: Region) -> Reported {
        self.context
            .report(DiagnosticCode::MalformedSyntax, message, region)
    }

    fn unsupported(&mut self, message: impl Into<String>, region: Region) -> Reported {
        self.context
            .report(DiagnosticCode::UnsupportedFeature, message, region)
    }

    fn process_literal(
        &mut self,
        literal: &Literal,
        region: Region,
        hint: Option<Type>,
    ) -> AnalyzeResult<Expression> {
        let (value, ty) = match literal {
            Literal::Null => (Value::Unknown, hint.unwrap_or(Type::Unknown)),
            Literal::Unknown => (Value::Unknown, Type::Boolean),
            Literal::Boolean(value) => (Value::Boolean(*value), Type::Boolean),
            Literal::ExactNumeric(text) => self.exact_numeric(text, region, hint)?,
            Literal::ApproximateNumeric(text) => match text.parse::<f64>() {
                Ok(value) if value.is_finite() => (Value::Float8(value), Type::Float8),
                Ok(_) => {
                    return Err(self.context.report(
                        DiagnosticCode::ApproximateNumberOutOfRange,
                        format!("approximate numeric literal '{text}' is out of range"),
                        region,
                    ));
                }
                Err(_) => {
                    return Err(self.malformed(format!("malformed numeric literal '{text}'"), region));
                }
            },
            Literal::CharacterString(text) => {
                let length = text.chars().count();
                if length > CHARACTER_MAX_LENGTH as usize {
                    return Err(self.context.report(
                        DiagnosticCode::CharacterStringTooLong,
                        format!("character string literal is longer than {CHARACTER_MAX_LENGTH}"),
                        region,
                    ));
                }
                let ty = Type::Character {
                    varying: false,
                    length: Some(length as u32),
                };
                (Value::Character(text.clone()), ty)
            }
            Literal::Date(text) => match parse_date(text) {
                Some(date) => (Value::Date(date), Type::Date),
                None => return Err(self.malformed_datetime("DATE", text, region)),
            },
            Literal::Time(text) => match parse_time(text) {
                Some(time) => (Value::Time(time), Type::Time),
                None => return Err(self.malformed_datetime("TIME", text, region)),
            },
            Literal::Timestamp(text) => match parse_timestamp(text) {
                Some(timestamp) => (Value::Timestamp(timestamp), Type::Timestamp),
                None => return Err(self.malformed_datetime("TIMESTAMP", text, region)),
            },
        };
        Ok(self.immediate(value, ty, region))
    }

    fn malformed_datetime(&mut self, kind: &str, text: &str, region: Region) -> Reported {
        self.context.report(
            DiagnosticCode::MalformedDatetimeLiteral,
            format!("malformed {kind} literal '{text}'"),
            region,
        )
    }

    /// Types an exact numeric literal: `INT` if it fits, then `BIGINT`, then `DECIMAL`.
    fn exact_numeric(
        &mut self,
        text: &str,
        region: Region,
        hint: Option<Type>,
    ) -> AnalyzeResult<(Value, Type)> {
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (integral, fraction) = match unsigned.split_once('.') {
            Some((integral, fraction)) => (integral, Some(fraction)),
            None => (unsigned, None),
        };
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        let has_digits = !integral.is_empty() || fraction.is_some_and(|f| !f.is_empty());
        if !has_digits || !all_digits(integral) || !fraction.is_none_or(all_digits) {
            return Err(self.malformed(format!("malformed numeric literal '{text}'"), region));
        }

        if fraction.is_none() {
            if let Ok(value) = text.parse::<i64>() {
                return Ok(integer_literal(value, hint));
            }
        }

        let scale = fraction.map_or(0, str::len);
        let digits = integral.trim_start_matches('0').len() + scale;
        if digits > DECIMAL_MAX_PRECISION as usize {
            return Err(self.context.report(
                DiagnosticCode::ExactNumberOutOfRange,
                format!("exact numeric literal '{text}' is out of range"),
                region,
            ));
        }
        let sign = if negative { "-" } else { "" };
        let ty = Type::Decimal {
            precision: Some(digits.max(scale).max(1) as u32),
            scale: Some(scale as u32),
        };
        Ok((Value::Decimal(format!("{sign}{unsigned}")), ty))
    }

    fn process_variable(&mut self, name: &Name, region: Region) -> AnalyzeResult<Expression> {
        let kinds = SymbolKindSet::of(&[
            SymbolKind::ColumnVariable,
            SymbolKind::FieldVariable,
            SymbolKind::SchemaVariable,
        ]);
        let result = SymbolResolver::new(self.context, self.scope).resolve(name, kinds, true);
        let symbol = match result {
            FindResult::Found(symbol) => symbol,
            FindResult::NotFound => {
                return Err(self.context.report(
                    DiagnosticCode::VariableNotFound,
                    format!("variable '{name}' is not found"),
                    region,
                ));
            }
            FindResult::Error(reported) => return Err(reported),
        };
        match symbol.variable() {
            Some(variable) => Ok(Expression::variable(variable.clone(), region)),
            None => Err(self.context.report(
                DiagnosticCode::UnexpectedSymbol,
                format!("'{name}' is not a variable"),
                region,
            )),
        }
    }

    fn process_case(
        &mut self,
        case: &CaseExpression,
        region: Region,
        hint: Option<Type>,
    ) -> AnalyzeResult<Expression> {
        if case.whens.is_empty() {
            return Err(self.malformed("CASE requires at least one WHEN clause", region));
        }
        let operand = match &case.operand {
            Some(operand) => {
                let value = self.process(operand, None)?;
                let variable = self.local_for(&value);
                Some(Declarator { variable, value })
            }
            None => None,
        };
        let mut alternatives = Vec::with_capacity(case.whens.len());
        for when in &case.whens {
            let mut condition = self.process(&when.condition, None)?;
            if let Some(declarator) = &operand {
                let operand = Expression::variable(declarator.variable.clone(), declarator.value.region);
                condition = Expression::compare(
                    ComparisonOperator::Equal,
                    operand,
                    condition,
                    when.condition.region,
                );
            }
            let body = self.process(&when.result, hint)?;
            alternatives.push(Alternative { condition, body });
        }
        let default = match &case.default {
            Some(default) => Some(Box::new(self.process(default, hint)?)),
            None => None,
        };
        let conditional = Expression::new(
            ExpressionKind::Conditional {
                alternatives,
                default,
            },
            region,
        );
        Ok(match operand {
            Some(declarator) => Expression::let_in(vec![declarator], conditional, region),
            None => conditional,
        })
    }

    fn process_unary(
        &mut self,
        operator: ast::UnaryOperator,
        operand: &ScalarExpression,
        region: Region,
        hint: Option<Type>,
    ) -> AnalyzeResult<Expression> {
        // fold the sign into the literal, so the smallest integers keep their type
        if operator == ast::UnaryOperator::Minus {
            if let ScalarKind::Literal(Literal::ExactNumeric(text)) = &operand.kind {
                let negated = match text.strip_prefix('-') {
                    Some(rest) => rest.to_string(),
                    None => format!("-{text}"),
                };
                return self.process_literal(&Literal::ExactNumeric(negated), region, hint);
            }
        }
        let (operator, hint) = match operator {
            ast::UnaryOperator::Plus => (UnaryOperator::Plus, hint),
            ast::UnaryOperator::Minus => (UnaryOperator::SignInversion, hint),
            ast::UnaryOperator::Not => (UnaryOperator::ConditionalNot, None),
        };
        let operand = self.process(operand, hint)?;
        Ok(Expression::unary(operator, operand, region))
    }

    fn process_between(&mut self, predicate: &BetweenPredicate, region: Region) -> AnalyzeResult<Expression> {
        let target = self.process(&predicate.target, None)?;
        let low = self.process(&predicate.low, None)?;
        let high = self.process(&predicate.high, None)?;

        let target_variable = self.local_for(&target);
        let reference = move |variable: &Variable| Expression::variable(variable.clone(), region);
        let (declarators, body) = if predicate.symmetric {
            let low_variable = self.local_for(&low);
            let high_variable = self.local_for(&high);
            let forward = conjunction(
                less_equal(reference(&low_variable), reference(&target_variable), region),
                less_equal(reference(&target_variable), reference(&high_variable), region),
                region,
            );
            let backward = conjunction(
                less_equal(reference(&high_variable), reference(&target_variable), region),
                less_equal(reference(&target_variable), reference(&low_variable), region),
                region,
            );
            let body = Expression::binary(BinaryOperator::ConditionalOr, forward, backward, region);
            let declarators = vec![
                Declarator {
                    variable: target_variable,
                    value: target,
                },
                Declarator {
                    variable: low_variable,
                    value: low,
                },
                Declarator {
                    variable: high_variable,
                    value: high,
                },
            ];
            (declarators, body)
        } else {
            let body = conjunction(
                less_equal(low, reference(&target_variable), region),
                less_equal(reference(&target_variable), high, region),
                region,
            );
            let declarators = vec![Declarator {
                variable: target_variable,
                value: target,
            }];
            (declarators, body)
        };
        let result = Expression::let_in(declarators, body, region);
        Ok(negate_if(predicate.negated, result, region))
    }

    fn process_in(&mut self, predicate: &InPredicate, region: Region) -> AnalyzeResult<Expression> {
        let values = match &predicate.values {
            InValues::List(values) => values,
            InValues::Subquery(_) => {
                return Err(self.unsupported("IN predicate with a subquery is not supported", region));
            }
        };
        let Some((first, rest)) = values.split_first() else {
            return Err(self.malformed("IN predicate requires at least one value", region));
        };
        let target = self.process(&predicate.target, None)?;
        let variable = self.local_for(&target);

        let mut disjunction = self.in_element(&variable, first)?;
        for element in rest {
            let comparison = self.in_element(&variable, element)?;
            disjunction = Expression::binary(BinaryOperator::ConditionalOr, disjunction, comparison, region);
        }
        let declarators = vec![Declarator {
            variable,
            value: target,
        }];
        let result = Expression::let_in(declarators, disjunction, region);
        Ok(negate_if(predicate.negated, result, region))
    }

    fn in_element(&mut self, variable: &Variable, element: &ScalarExpression) -> AnalyzeResult<Expression> {
        let value = self.process(element, None)?;
        Ok(Expression::compare(
            ComparisonOperator::Equal,
            Expression::variable(variable.clone(), element.region),
            value,
            element.region,
        ))
    }

    fn process_is(
        &mut self,
        operand: &ScalarExpression,
        right: &ScalarExpression,
        negated: bool,
        region: Region,
    ) -> AnalyzeResult<Expression> {
        let operator = match &right.kind {
            ScalarKind::Literal(Literal::Null) => UnaryOperator::IsNull,
            ScalarKind::Literal(Literal::Boolean(true)) => UnaryOperator::IsTrue,
            ScalarKind::Literal(Literal::Boolean(false)) => UnaryOperator::IsFalse,
            ScalarKind::Literal(Literal::Unknown) => UnaryOperator::IsUnknown,
            _ => {
                return Err(self.malformed(
                    "IS predicate requires NULL, TRUE, FALSE or UNKNOWN",
                    right.region,
                ));
            }
        };
        let operand = self.process(operand, None)?;
        let result = Expression::unary(operator, operand, region);
        Ok(negate_if(negated, result, region))
    }

    fn process_pattern_match(
        &mut self,
        predicate: &PatternMatchPredicate,
        region: Region,
    ) -> AnalyzeResult<Expression> {
        let operator = match predicate.operator {
            PatternMatchOperator::Like => MatchOperator::Like,
            PatternMatchOperator::SimilarTo => MatchOperator::Similar,
        };
        let input = self.process(&predicate.input, None)?;
        let pattern = self.process(&predicate.pattern, None)?;
        let escape = match &predicate.escape {
            Some(escape) => self.process(escape, None)?,
            None => {
                let ty = Type::Character {
                    varying: true,
                    length: Some(0),
                };
                self.immediate(Value::Character(String::new()), ty, region)
            }
        };
        let result = Expression::new(
            ExpressionKind::Match {
                operator,
                input: Box::new(input),
                pattern: Box::new(pattern),
                escape: Box::new(escape),
            },
            region,
        );
        Ok(negate_if(predicate.negated, result, region))
    }

    fn process_function_call(&mut self, call: &FunctionCall, region: Region) -> AnalyzeResult<Expression> {
        if call.asterisk && !call.arguments.is_empty() {
            return Err(self.malformed("'*' cannot be combined with function arguments", region));
        }
        let mut arguments = Vec::with_capacity(call.arguments.len());
        let mut argument_types = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            let argument = self.process(argument, None)?;
            argument_types.push(self.type_of(&argument)?);
            arguments.push(argument);
        }

        let schemas = self.function_schemas(&call.name)?;
        let key = self.context.normalize(call.name.last());
        let arity = arguments.len();
        let mut scalars = vec![];
        let mut aggregates = vec![];
        for schema in &schemas {
            if !call.asterisk {
                scalars.extend(schema.function_provider().find(&key, arity));
            }
            aggregates.extend(schema.aggregate_function_provider().find(&key, arity));
        }
        trace!(
            "function '{}' has {} scalar and {} aggregate candidates",
            call.name,
            scalars.len(),
            aggregates.len()
        );

        match (scalars.is_empty(), aggregates.is_empty()) {
            (true, true) => Err(self.context.report(
                DiagnosticCode::FunctionNotFound,
                format!("function '{}' with {arity} arguments is not found", call.name),
                region,
            )),
            (false, false) => Err(self.context.report(
                DiagnosticCode::FunctionAmbiguous,
                format!("'{}' is both a scalar and an aggregate function", call.name),
                region,
            )),
            (false, true) => {
                if call.quantifier.is_some() {
                    return Err(self.malformed(
                        format!("'{}' is not an aggregate function", call.name),
                        region,
                    ));
                }
                let function = self.select_overload(
                    &call.name,
                    scalars,
                    &argument_types,
                    FunctionDecl::parameters,
                    region,
                )?;
                let arguments = self.apply_parameters(arguments, &argument_types, function.parameters());
                Ok(Expression::new(
                    ExpressionKind::FunctionCall {
                        function,
                        arguments,
                    },
                    region,
                ))
            }
            (true, false) => {
                let function = self.select_overload(
                    &call.name,
                    aggregates,
                    &argument_types,
                    AggregateFunctionDecl::parameters,
                    region,
                )?;
                let arguments = self.apply_parameters(arguments, &argument_types, function.parameters());
                let quantifier = match call.quantifier {
                    Some(ast::SetQuantifier::Distinct) => SetQuantifier::Distinct,
                    Some(ast::SetQuantifier::All) | None => SetQuantifier::All,
                };
                self.saw_aggregate = true;
                Ok(Expression::new(
                    ExpressionKind::AggregateCall {
                        function,
                        quantifier,
                        arguments,
                    },
                    region,
                ))
            }
        }
    }

    /// Returns the schemas whose functions may be called by `name`.
    fn function_schemas(&mut self, name: &Name) -> AnalyzeResult<Vec<Arc<SchemaDecl>>> {
        let Some(qualifier) = name.qualifier_name() else {
            return Ok(self.context.search_path().schemas().to_vec());
        };
        let result = SymbolResolver::new(self.context, self.scope).resolve(
            &qualifier,
            SymbolKind::SchemaDecl.into(),
            true,
        );
        match result {
            FindResult::Found(Symbol::SchemaDecl(schema)) => Ok(vec![schema]),
            FindResult::Found(_) | FindResult::NotFound => Err(self.context.report(
                DiagnosticCode::SchemaNotFound,
                format!("schema '{qualifier}' is not found"),
                qualifier.region(),
            )),
            FindResult::Error(reported) => Err(reported),
        }
    }

    /// Picks the most specific overload applicable to `argument_types`.
    fn select_overload<T>(
        &mut self,
        name: &Name,
        candidates: Vec<Arc<T>>,
        argument_types: &[Type],
        parameters: fn(&T) -> &[Type],
        region: Region,
    ) -> AnalyzeResult<Arc<T>> {
        let applicable: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| converts(argument_types, parameters(candidate)))
            .collect();
        match most_specific(&applicable, parameters) {
            Overload::Unique(position) => Ok(Arc::clone(&applicable[position])),
            Overload::Missing => {
                let types: Vec<_> = argument_types.iter().map(Type::to_string).collect();
                Err(self.context.report(
                    DiagnosticCode::FunctionNotFound,
                    format!("no overload of '{name}' accepts ({})", types.join(", ")),
                    region,
                ))
            }
            Overload::Ambiguous => Err(self.context.report(
                DiagnosticCode::FunctionAmbiguous,
                format!("call of '{name}' matches more than one overload"),
                region,
            )),
        }
    }

    /// Casts each argument whose type differs from its parameter.
    fn apply_parameters(
        &mut self,
        arguments: Vec<Expression>,
        argument_types: &[Type],
        parameters: &[Type],
    ) -> Vec<Expression> {
        arguments
            .into_iter()
            .zip(argument_types.iter().zip(parameters))
            .map(|(argument, (ty, parameter))| {
                if ty == parameter {
                    return argument;
                }
                let region = argument.region;
                let kind = ExpressionKind::Cast {
                    ty: self.context.intern_type(*parameter),
                    operand: Box::new(argument),
                };
                Expression::new(kind, region)
            })
            .collect()
    }

    fn process_builtin(
        &mut self,
        function: BuiltinFunction,
        arguments: &[ScalarExpression],
        region: Region,
        hint: Option<Type>,
    ) -> AnalyzeResult<Expression> {
        match function {
            BuiltinFunction::Coalesce => {
                if arguments.is_empty() {
                    return Err(self.malformed("COALESCE requires at least one argument", region));
                }
                let operands = arguments
                    .iter()
                    .map(|argument| self.process(argument, hint))
                    .collect::<AnalyzeResult<Vec<_>>>()?;
                Ok(Expression::new(ExpressionKind::Coalesce(operands), region))
            }
            BuiltinFunction::Nullif => {
                let [first, second] = arguments else {
                    return Err(self.malformed("NULLIF requires exactly two arguments", region));
                };
                let first = self.process(first, hint)?;
                let second = self.process(second, None)?;
                let ty = typing::infer(&first).unwrap_or(Type::Unknown);
                let variable = self.context.create_local_variable(ty);
                let condition = Expression::compare(
                    ComparisonOperator::Equal,
                    Expression::variable(variable.clone(), region),
                    second,
                    region,
                );
                let null = self.immediate(Value::Unknown, ty, region);
                let conditional = Expression::new(
                    ExpressionKind::Conditional {
                        alternatives: vec![Alternative {
                            condition,
                            body: null,
                        }],
                        default: Some(Box::new(Expression::variable(variable.clone(), region))),
                    },
                    region,
                );
                let declarators = vec![Declarator {
                    variable,
                    value: first,
                }];
                Ok(Expression::let_in(declarators, conditional, region))
            }
        }
    }
}

fn integer_literal(value: i64, hint: Option<Type>) -> (Value, Type) {
    match hint {
        Some(Type::Int8) => return (Value::Int8(value), Type::Int8),
        Some(ty @ Type::Decimal { precision, scale }) => {
            let digits = value.unsigned_abs().to_string().len() as u32;
            let room = precision.map(|p| p.saturating_sub(scale.unwrap_or(0)));
            if room.is_none_or(|room| digits <= room) {
                return (Value::Decimal(value.to_string()), ty);
            }
        }
        _ => {}
    }
    match i32::try_from(value) {
        Ok(value) => (Value::Int4(value), Type::Int4),
        Err(_) => (Value::Int8(value), Type::Int8),
    }
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_time(text: &str) -> Option<Time> {
    Time::parse(
        text,
        format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .ok()
}

fn parse_timestamp(text: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        text,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .ok()
}

fn less_equal(left: Expression, right: Expression, region: Region) -> Expression {
    Expression::compare(ComparisonOperator::LessEqual, left, right, region)
}

fn conjunction(left: Expression, right: Expression, region: Region) -> Expression {
    Expression::binary(BinaryOperator::ConditionalAnd, left, right, region)
}

fn negate_if(negated: bool, expression: Expression, region: Region) -> Expression {
    if negated {
        Expression::unary(UnaryOperator::ConditionalNot, expression, region)
    } else {
        expression
    }
}

/// Returns `true` if every type of `from` converts to the corresponding type of `to`.
fn converts(from: &[Type], to: &[Type]) -> bool {
    from.len() == to.len()
        && from
            .iter()
            .zip(to)
            .all(|(from, to)| Type::is_parameter_application_convertible(from, to))
}

enum Overload {
    Missing,
    Unique(usize),
    Ambiguous,
}

/// Picks the overload whose parameters convert to those of every other candidate while no
/// other candidate converts back. Without such an overload the call is ambiguous.
fn most_specific<T>(candidates: &[Arc<T>], parameters: fn(&T) -> &[Type]) -> Overload {
    if candidates.is_empty() {
        return Overload::Missing;
    }
    let dominates = |winner: usize, other: usize| {
        let winner = parameters(&candidates[winner]);
        let other = parameters(&candidates[other]);
        converts(winner, other) && !converts(other, winner)
    };
    (0..candidates.len())
        .find(|&position| {
            (0..candidates.len()).all(|other| other == position || dominates(position, other))
        })
        .map_or(Overload::Ambiguous, Overload::Unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            CaseExpression, InPredicate, PatternMatchPredicate, SetQuantifier as AstQuantifier,
            WhenClause,
        },
        ir::Variable as IrVariable,
        options::AnalyzerOptions,
        testing::{self, codes, int, null, string, var},
    };

    fn lower(context: &mut AnalyzerContext, expression: ScalarExpression) -> AnalyzeResult<LoweredScalar> {
        let scope = QueryScope::from(testing::scan(context, "t0"));
        lower_scalar(context, &scope, &expression, None)
    }

    fn literal_type(text: &str, hint: Option<Type>) -> Type {
        let mut context = testing::context();
        let expression = ScalarExpression::literal(Literal::ExactNumeric(text.into()));
        let lowered = lower_scalar(&mut context, &QueryScope::new(), &expression, hint).unwrap();
        *lowered.expression.as_immediate().unwrap().1
    }

    fn boxed(expression: ScalarExpression) -> Box<ScalarExpression> {
        Box::new(expression)
    }

    fn kind(kind: ScalarKind) -> ScalarExpression {
        ScalarExpression::new(kind, Region::default())
    }

    fn declarators(expression: &Expression) -> &[Declarator] {
        match &expression.kind {
            ExpressionKind::Let { declarators, .. } => declarators,
            other => panic!("expected let, got {other:?}"),
        }
    }

    fn let_body(expression: &Expression) -> &Expression {
        match &expression.kind {
            ExpressionKind::Let { body, .. } => body,
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn between_binds_target_once() {
        // given c0 BETWEEN 1 AND 10
        let mut context = testing::context();
        let expression = kind(ScalarKind::Between(BetweenPredicate {
            target: boxed(var("c0")),
            low: boxed(int(1)),
            high: boxed(int(10)),
            symmetric: false,
            negated: false,
        }));

        // when lowering
        let lowered = lower(&mut context, expression).unwrap().expression;

        // then target is bound to one local and compared twice
        assert_eq!(declarators(&lowered).len(), 1);
        let local: &IrVariable = &declarators(&lowered)[0].variable;
        let ExpressionKind::Binary {
            operator: BinaryOperator::ConditionalAnd,
            left,
            right,
        } = &let_body(&lowered).kind
        else {
            panic!("expected conjunction");
        };
        let ExpressionKind::Compare { right: upper, .. } = &left.kind else {
            panic!("expected comparison");
        };
        assert_eq!(upper.as_variable(), Some(local));
        let ExpressionKind::Compare { left: lower, .. } = &right.kind else {
            panic!("expected comparison");
        };
        assert_eq!(lower.as_variable(), Some(local));
    }

    #[test]
    fn symmetric_between_binds_all_operands() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Between(BetweenPredicate {
            target: boxed(var("c0")),
            low: boxed(int(10)),
            high: boxed(int(1)),
            symmetric: true,
            negated: true,
        }));

        let lowered = lower(&mut context, expression).unwrap().expression;

        let ExpressionKind::Unary {
            operator: UnaryOperator::ConditionalNot,
            operand,
        } = &lowered.kind
        else {
            panic!("expected negation");
        };
        assert_eq!(declarators(operand).len(), 3);
        assert!(matches!(
            let_body(operand).kind,
            ExpressionKind::Binary {
                operator: BinaryOperator::ConditionalOr,
                ..
            }
        ));
    }

    fn between(low: i64, high: i64, symmetric: bool) -> ScalarExpression {
        kind(ScalarKind::Between(BetweenPredicate {
            target: boxed(var("c0")),
            low: boxed(int(low)),
            high: boxed(int(high)),
            symmetric,
            negated: false,
        }))
    }

    /// Renders a lowered BETWEEN as its sorted disjuncts, with the bound target shown as
    /// `x` and other bound variables replaced by the value they are bound to.
    fn between_disjuncts(lowered: &Expression) -> Vec<String> {
        fn render(expression: &Expression, declarators: &[Declarator]) -> String {
            match &expression.kind {
                ExpressionKind::VariableReference(variable) => {
                    match declarators.iter().position(|d| &d.variable == variable) {
                        Some(0) => "x".to_string(),
                        Some(position) => render(&declarators[position].value, declarators),
                        None => format!("{variable:?}"),
                    }
                }
                ExpressionKind::Immediate { value, .. } => format!("{value:?}"),
                ExpressionKind::Cast { operand, .. } => render(operand, declarators),
                ExpressionKind::Compare { operator, left, right } => format!(
                    "{} {operator:?} {}",
                    render(left, declarators),
                    render(right, declarators)
                ),
                ExpressionKind::Binary { operator, left, right } => format!(
                    "({} {operator:?} {})",
                    render(left, declarators),
                    render(right, declarators)
                ),
                other => format!("{other:?}"),
            }
        }

        let declarators = declarators(lowered);
        let mut disjuncts = match &let_body(lowered).kind {
            ExpressionKind::Binary {
                operator: BinaryOperator::ConditionalOr,
                left,
                right,
            } => vec![render(left, declarators), render(right, declarators)],
            _ => vec![render(let_body(lowered), declarators)],
        };
        disjuncts.sort();
        disjuncts
    }

    #[test]
    fn symmetric_between_ignores_bound_order() {
        // given BETWEEN SYMMETRIC with its bounds in both orders
        let mut context = testing::context();

        // when lowering both
        let forward = lower(&mut context, between(1, 10, true)).unwrap().expression;
        let backward = lower(&mut context, between(10, 1, true)).unwrap().expression;

        // then both test the same ranges
        assert_eq!(between_disjuncts(&forward), between_disjuncts(&backward));
        assert_eq!(between_disjuncts(&forward).len(), 2);
    }

    #[test]
    fn plain_between_depends_on_bound_order() {
        let mut context = testing::context();

        let forward = lower(&mut context, between(1, 10, false)).unwrap().expression;
        let backward = lower(&mut context, between(10, 1, false)).unwrap().expression;

        assert_ne!(between_disjuncts(&forward), between_disjuncts(&backward));
    }

    #[test]
    fn in_list_is_disjunction_of_equalities() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::In(InPredicate {
            target: boxed(var("c0")),
            values: InValues::List(vec![int(1), int(2), int(3)]),
            negated: false,
        }));

        let lowered = lower(&mut context, expression).unwrap().expression;

        assert_eq!(declarators(&lowered).len(), 1);
        let ExpressionKind::Binary {
            operator: BinaryOperator::ConditionalOr,
            left,
            right,
        } = &let_body(&lowered).kind
        else {
            panic!("expected disjunction");
        };
        assert!(matches!(left.kind, ExpressionKind::Binary { .. }));
        assert!(matches!(
            right.kind,
            ExpressionKind::Compare {
                operator: ComparisonOperator::Equal,
                ..
            }
        ));
    }

    #[test]
    fn in_predicate_rejects_empty_list_and_subquery() {
        let mut context = testing::context();
        let empty = kind(ScalarKind::In(InPredicate {
            target: boxed(var("c0")),
            values: InValues::List(vec![]),
            negated: false,
        }));
        assert!(lower(&mut context, empty).is_err());

        let subquery = kind(ScalarKind::In(InPredicate {
            target: boxed(var("c0")),
            values: InValues::Subquery(Box::new(crate::ast::QueryExpression::values(vec![vec![int(1)]]))),
            negated: false,
        }));
        assert!(lower(&mut context, subquery).is_err());

        assert_eq!(
            codes(&context),
            vec![DiagnosticCode::MalformedSyntax, DiagnosticCode::UnsupportedFeature]
        );
    }

    #[test]
    fn simple_case_compares_bound_operand() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Case(CaseExpression {
            operand: Some(boxed(var("c1"))),
            whens: vec![
                WhenClause {
                    condition: int(1),
                    result: string("one"),
                },
                WhenClause {
                    condition: int(2),
                    result: string("two"),
                },
            ],
            default: None,
        }));

        let lowered = lower(&mut context, expression).unwrap().expression;

        let local = declarators(&lowered)[0].variable.clone();
        let ExpressionKind::Conditional { alternatives, default } = &let_body(&lowered).kind else {
            panic!("expected conditional");
        };
        assert_eq!(alternatives.len(), 2);
        assert!(default.is_none());
        let ExpressionKind::Compare { left, .. } = &alternatives[1].condition.kind else {
            panic!("expected comparison");
        };
        assert_eq!(left.as_variable(), Some(&local));
    }

    #[test]
    fn case_without_when_is_malformed() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Case(CaseExpression {
            operand: None,
            whens: vec![],
            default: Some(boxed(int(1))),
        }));
        assert!(lower(&mut context, expression).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::MalformedSyntax]);
    }

    #[test]
    fn nullif_returns_null_when_equal() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Builtin {
            function: BuiltinFunction::Nullif,
            arguments: vec![var("c1"), int(0)],
        });

        let lowered = lower(&mut context, expression).unwrap().expression;

        let local = declarators(&lowered)[0].variable.clone();
        assert_eq!(**local.ty(), Type::Int8);
        let ExpressionKind::Conditional { alternatives, default } = &let_body(&lowered).kind else {
            panic!("expected conditional");
        };
        assert_eq!(alternatives[0].body.as_immediate().unwrap().0, &Value::Unknown);
        assert_eq!(default.as_ref().unwrap().as_variable(), Some(&local));
    }

    #[test]
    fn nullif_requires_two_arguments() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Builtin {
            function: BuiltinFunction::Nullif,
            arguments: vec![int(0)],
        });
        assert!(lower(&mut context, expression).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::MalformedSyntax]);
    }

    #[test]
    fn is_predicate_maps_to_unary_operators() {
        let mut context = testing::context();
        let is_not_true = kind(ScalarKind::Is {
            operand: boxed(var("c1")),
            right: boxed(ScalarExpression::literal(Literal::Boolean(true))),
            negated: true,
        });
        let lowered = lower(&mut context, is_not_true).unwrap().expression;
        let ExpressionKind::Unary {
            operator: UnaryOperator::ConditionalNot,
            operand,
        } = &lowered.kind
        else {
            panic!("expected negation");
        };
        assert!(matches!(
            operand.kind,
            ExpressionKind::Unary {
                operator: UnaryOperator::IsTrue,
                ..
            }
        ));

        let is_null = kind(ScalarKind::Is {
            operand: boxed(var("c1")),
            right: boxed(null()),
            negated: false,
        });
        let lowered = lower(&mut context, is_null).unwrap().expression;
        assert!(matches!(
            lowered.kind,
            ExpressionKind::Unary {
                operator: UnaryOperator::IsNull,
                ..
            }
        ));
    }

    #[test]
    fn is_predicate_rejects_other_operands() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::Is {
            operand: boxed(var("c1")),
            right: boxed(int(1)),
            negated: false,
        });
        assert!(lower(&mut context, expression).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::MalformedSyntax]);
    }

    #[test]
    fn like_defaults_to_empty_escape() {
        let mut context = testing::context();
        let expression = kind(ScalarKind::PatternMatch(PatternMatchPredicate {
            operator: PatternMatchOperator::Like,
            input: boxed(var("c2")),
            pattern: boxed(string("a%")),
            escape: None,
            negated: false,
        }));

        let lowered = lower(&mut context, expression).unwrap().expression;

        let ExpressionKind::Match { escape, .. } = &lowered.kind else {
            panic!("expected match");
        };
        assert_eq!(
            escape.as_immediate().unwrap().0,
            &Value::Character(String::new())
        );
    }

    #[test]
    fn exact_numeric_literal_types() {
        assert_eq!(literal_type("1", None), Type::Int4);
        assert_eq!(literal_type("3000000000", None), Type::Int8);
        assert_eq!(literal_type("1", Some(Type::Int8)), Type::Int8);
        assert_eq!(
            literal_type("12.50", None),
            Type::Decimal {
                precision: Some(4),
                scale: Some(2)
            }
        );
        assert_eq!(
            literal_type("99999999999999999999", None),
            Type::Decimal {
                precision: Some(20),
                scale: Some(0)
            }
        );
    }

    #[test]
    fn exact_numeric_literal_out_of_range() {
        let mut context = testing::context();
        let text = "1".repeat(39);
        let expression = ScalarExpression::literal(Literal::ExactNumeric(text));
        assert!(lower_scalar(&mut context, &QueryScope::new(), &expression, None).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::ExactNumberOutOfRange]);
    }

    #[test]
    fn negative_literal_keeps_smallest_int() {
        let mut context = testing::context();
        let expression = ScalarExpression::unary(ast::UnaryOperator::Minus, int(2147483648));
        let lowered = lower_scalar(&mut context, &QueryScope::new(), &expression, None).unwrap();
        assert_eq!(
            lowered.expression.as_immediate().unwrap(),
            (&Value::Int4(i32::MIN), &Type::Int4)
        );
    }

    #[test]
    fn approximate_literal_out_of_range() {
        let mut context = testing::context();
        let expression = ScalarExpression::literal(Literal::ApproximateNumeric("1e400".into()));
        assert!(lower_scalar(&mut context, &QueryScope::new(), &expression, None).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::ApproximateNumberOutOfRange]);
    }

    #[test]
    fn datetime_literals() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        let valid = ScalarExpression::literal(Literal::Timestamp("2024-02-29 12:30:00".into()));
        assert!(lower_scalar(&mut context, &scope, &valid, None).is_ok());
        let time = ScalarExpression::literal(Literal::Time("12:30:00.25".into()));
        assert!(lower_scalar(&mut context, &scope, &time, None).is_ok());

        let invalid = ScalarExpression::literal(Literal::Date("2023-02-29".into()));
        assert!(lower_scalar(&mut context, &scope, &invalid, None).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::MalformedDatetimeLiteral]);
    }

    #[test]
    fn null_takes_hint_type() {
        let mut context = testing::context();
        let lowered = lower_scalar(&mut context, &QueryScope::new(), &null(), Some(Type::Date)).unwrap();
        assert_eq!(
            lowered.expression.as_immediate().unwrap(),
            (&Value::Unknown, &Type::Date)
        );
    }

    #[test]
    fn overload_prefers_most_specific() {
        // given f(INT) and f(BIGINT)
        let mut context = testing::context();

        // when calling f with an INT and a BIGINT argument
        let narrow = lower(&mut context, ScalarExpression::function_call("f", vec![int(1)])).unwrap();
        let wide = lower(&mut context, ScalarExpression::function_call("f", vec![var("c0")])).unwrap();

        // then each call picks the narrowest applicable overload
        let ExpressionKind::FunctionCall { function, .. } = &narrow.expression.kind else {
            panic!("expected function call");
        };
        assert_eq!(function.parameters(), &[Type::Int4]);
        let ExpressionKind::FunctionCall { function, .. } = &wide.expression.kind else {
            panic!("expected function call");
        };
        assert_eq!(function.parameters(), &[Type::Int8]);
        assert!(!narrow.saw_aggregate);
    }

    #[test]
    fn incomparable_overloads_are_ambiguous() {
        let mut context = testing::context();
        let call = ScalarExpression::function_call("g", vec![int(1), int(1)]);
        assert!(lower(&mut context, call).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::FunctionAmbiguous]);
    }

    #[test]
    fn overload_dominating_all_others_wins_over_incomparable_pair() {
        // given h(INT, BIGINT) and h(BIGINT, INT) registered before h(INT, INT)
        let mut context = testing::context();

        // when calling h(1, 1)
        let call = ScalarExpression::function_call("h", vec![int(1), int(1)]);
        let lowered = lower(&mut context, call).unwrap();

        // then h(INT, INT) is chosen
        let ExpressionKind::FunctionCall { function, .. } = &lowered.expression.kind else {
            panic!("expected function call");
        };
        assert_eq!(function.parameters(), &[Type::Int4, Type::Int4]);
    }

    #[test]
    fn overload_choice_ignores_registration_order() {
        let overload = |id, parameters: [Type; 2]| {
            Arc::new(FunctionDecl::new(id, "h", parameters.to_vec(), Type::Int4))
        };
        let a = overload(1, [Type::Int4, Type::Int8]);
        let b = overload(2, [Type::Int8, Type::Int4]);
        let c = overload(3, [Type::Int4, Type::Int4]);

        let orders = [
            [&a, &b, &c],
            [&a, &c, &b],
            [&b, &a, &c],
            [&b, &c, &a],
            [&c, &a, &b],
            [&c, &b, &a],
        ];
        for order in orders {
            let candidates: Vec<_> = order.into_iter().cloned().collect();
            let Overload::Unique(position) = most_specific(&candidates, FunctionDecl::parameters)
            else {
                panic!("expected a unique overload");
            };
            assert_eq!(candidates[position].parameters(), &[Type::Int4, Type::Int4]);
        }

        for pair in [[&a, &b], [&b, &a]] {
            let candidates: Vec<_> = pair.into_iter().cloned().collect();
            assert!(matches!(
                most_specific(&candidates, FunctionDecl::parameters),
                Overload::Ambiguous
            ));
        }
    }

    #[test]
    fn scalar_and_aggregate_with_same_name_are_ambiguous() {
        let mut context = testing::context();
        let call = ScalarExpression::function_call("both", vec![int(1)]);
        assert!(lower(&mut context, call).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::FunctionAmbiguous]);
    }

    #[test]
    fn function_not_found() {
        let mut context = testing::context();
        assert!(lower(&mut context, ScalarExpression::function_call("nope", vec![])).is_err());
        assert!(lower(&mut context, ScalarExpression::function_call("f", vec![string("x")])).is_err());
        assert_eq!(
            codes(&context),
            vec![DiagnosticCode::FunctionNotFound, DiagnosticCode::FunctionNotFound]
        );
    }

    #[test]
    fn arguments_are_cast_to_parameters() {
        let mut context = testing::context();
        let call = ScalarExpression::function_call("upper", vec![string("abc")]);

        let lowered = lower(&mut context, call).unwrap();

        let ExpressionKind::FunctionCall { arguments, .. } = &lowered.expression.kind else {
            panic!("expected function call");
        };
        let ExpressionKind::Cast { ty, .. } = &arguments[0].kind else {
            panic!("expected cast");
        };
        assert_eq!(**ty, Type::varchar());
    }

    #[test]
    fn aggregate_call_sets_flag() {
        let mut context = testing::context();
        let count_all = kind(ScalarKind::FunctionCall(FunctionCall {
            name: Name::from("count"),
            arguments: vec![],
            quantifier: None,
            asterisk: true,
        }));
        let lowered = lower(&mut context, count_all).unwrap();
        assert!(lowered.saw_aggregate);
        assert!(lowered.expression.is_aggregate_call());

        let distinct_sum = kind(ScalarKind::FunctionCall(FunctionCall {
            name: Name::from("sum"),
            arguments: vec![var("c1")],
            quantifier: Some(AstQuantifier::Distinct),
            asterisk: false,
        }));
        let lowered = lower(&mut context, distinct_sum).unwrap();
        let ExpressionKind::AggregateCall { quantifier, function, .. } = &lowered.expression.kind else {
            panic!("expected aggregate call");
        };
        assert_eq!(*quantifier, SetQuantifier::Distinct);
        assert_eq!(function.parameters(), &[Type::Int8]);
    }

    #[test]
    fn qualified_function_name() {
        let mut context = testing::context();
        let call = ScalarExpression::function_call("public.f", vec![int(1)]);
        assert!(lower(&mut context, call).is_ok());

        let call = ScalarExpression::function_call("nowhere.f", vec![int(1)]);
        assert!(lower(&mut context, call).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::SchemaNotFound]);
    }

    #[test]
    fn eager_validation_reports_inconsistent_type() {
        // given 1 + TRUE
        let expression = ScalarExpression::binary(
            ast::BinaryOperator::Add,
            int(1),
            ScalarExpression::literal(Literal::Boolean(true)),
        );

        // when validation is disabled, then lowering succeeds
        let mut lazy = testing::context();
        assert!(lower_scalar(&mut lazy, &QueryScope::new(), &expression, None).is_ok());

        // when validation is enabled, then the type error is reported
        let options = AnalyzerOptions {
            validate_scalar_expressions: true,
            ..AnalyzerOptions::default()
        };
        let mut eager = testing::context_with(options);
        assert!(lower_scalar(&mut eager, &QueryScope::new(), &expression, None).is_err());
        assert_eq!(codes(&eager), vec![DiagnosticCode::InconsistentType]);
    }

    #[test]
    fn variables_parameters_and_placeholders() {
        let mut context = testing::context();
        let scope = QueryScope::new();

        let schema_variable = lower_scalar(&mut context, &scope, &var("v"), None).unwrap();
        assert!(schema_variable.expression.as_variable().is_some());

        let host = kind(ScalarKind::HostParameter("p".into()));
        assert!(lower_scalar(&mut context, &scope, &host, None).is_ok());

        let placeholder = kind(ScalarKind::Placeholder("ph".into()));
        let lowered = lower_scalar(&mut context, &scope, &placeholder, None).unwrap();
        assert_eq!(
            lowered.expression.as_immediate().unwrap(),
            (&Value::Int8(42), &Type::Int8)
        );

        let missing_host = kind(ScalarKind::HostParameter("q".into()));
        assert!(lower_scalar(&mut context, &scope, &missing_host, None).is_err());
        let missing_placeholder = kind(ScalarKind::Placeholder("q".into()));
        assert!(lower_scalar(&mut context, &scope, &missing_placeholder, None).is_err());
        assert!(lower_scalar(&mut context, &scope, &var("nothing"), None).is_err());
        assert_eq!(
            codes(&context),
            vec![DiagnosticCode::VariableNotFound; 3]
        );
    }

    #[test]
    fn column_shadows_schema_variable() {
        // given column v of table t and schema variable v
        let mut context = testing::context();
        let scope = QueryScope::from(testing::scan(&mut context, "t"));

        // when referring to v
        let lowered = lower_scalar(&mut context, &scope, &var("v"), None).unwrap();

        // then the column wins
        let variable = lowered.expression.as_variable().unwrap();
        assert_eq!(**variable.ty(), Type::Int4);
        assert_eq!(*variable.kind(), crate::ir::VariableKind::Stream);
    }

    #[test]
    fn cast_validates_type_names() {
        let mut context = testing::context();
        let scope = QueryScope::new();
        for target in [
            TypeName::Varchar(Some(0)),
            TypeName::Decimal {
                precision: Some(10),
                scale: Some(12),
            },
            TypeName::Decimal {
                precision: Some(40),
                scale: None,
            },
        ] {
            let cast = kind(ScalarKind::Cast {
                operand: boxed(int(1)),
                target,
            });
            assert!(lower_scalar(&mut context, &scope, &cast, None).is_err());
        }
        assert_eq!(
            codes(&context),
            vec![
                DiagnosticCode::InvalidCharacterLength,
                DiagnosticCode::InvalidDecimalScale,
                DiagnosticCode::InvalidDecimalPrecision
            ]
        );
    }

    #[test]
    fn scalar_subquery_is_unsupported() {
        let mut context = testing::context();
        let subquery = kind(ScalarKind::Subquery(Box::new(
            crate::ast::QueryExpression::values(vec![vec![int(1)]]),
        )));
        assert!(lower_scalar(&mut context, &QueryScope::new(), &subquery, None).is_err());
        assert_eq!(codes(&context), vec![DiagnosticCode::UnsupportedFeature]);
    }
}
