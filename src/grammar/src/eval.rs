//! Tree-walking evaluation of expressions to [`Value`]s.
//!
//! Evaluation is pure and synchronous. Operands are evaluated left to right
//! and always fully; the first error aborts the whole evaluation.

use metadata::Filter;

use crate::ast::{BinaryOp, Expression, Literal, TagOp, UnaryOp};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::functions::{self, Argument};
use crate::scope::Scope;
use crate::value::{self, Value};
use crate::visitor::Visitor;

/// Evaluate `expr` against `scope`
pub fn eval(expr: &Expression, scope: &Scope<'_>) -> Result<Value> {
    expr.visit(&mut Evaluator::new(scope))
}

pub struct Evaluator<'a, 'p> {
    scope: &'a Scope<'p>,
}

impl<'a, 'p> Evaluator<'a, 'p> {
    pub fn new(scope: &'a Scope<'p>) -> Self {
        Self { scope }
    }

    fn selector(&mut self, expr: &Expression) -> Result<Filter> {
        let value = expr.visit(self)?;
        value.into_selector().ok_or_else(|| {
            Error::type_error(expr.context, "selector elements must be filters")
        })
    }

    fn tag_value(&mut self, op: TagOp, value: &Expression) -> Result<String> {
        match value.visit(self)? {
            Value::String(s) => Ok(s),
            other => Err(Error::type_error(
                value.context,
                format!("`{op}` expects a string value, found {}", other.type_name()),
            )),
        }
    }
}

impl Visitor for Evaluator<'_, '_> {
    type Output = Result<Value>;

    fn visit_literal(&mut self, _expr: &Expression, literal: &Literal) -> Result<Value> {
        Ok(match literal {
            Literal::Integer(v) => Value::Integer(*v),
            Literal::Double(v) => Value::Double(*v),
            Literal::Duration(d) => Value::Duration(*d),
            Literal::String(s) | Literal::Regex(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        })
    }

    fn visit_reference(&mut self, expr: &Expression, name: &str) -> Result<Value> {
        self.scope.lookup(name, expr.context)
    }

    fn visit_list(&mut self, _expr: &Expression, items: &[Expression]) -> Result<Value> {
        items
            .iter()
            .map(|item| item.visit(self))
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }

    fn visit_binary(
        &mut self,
        _expr: &Expression,
        op: BinaryOp,
        operator_context: Context,
        left: &Expression,
        right: &Expression,
    ) -> Result<Value> {
        let left = left.visit(self)?;
        let right = right.visit(self)?;
        value::binary(op, left, right, operator_context)
    }

    fn visit_unary(
        &mut self,
        _expr: &Expression,
        op: UnaryOp,
        operator_context: Context,
        operand: &Expression,
    ) -> Result<Value> {
        let operand = operand.visit(self)?;
        value::unary(op, operand, operator_context)
    }

    fn visit_group(&mut self, _expr: &Expression, inner: &Expression) -> Result<Value> {
        inner.visit(self)
    }

    fn visit_call(&mut self, expr: &Expression, name: &str, args: &[Expression]) -> Result<Value> {
        let function = functions::lookup(name).ok_or_else(|| Error::UnknownFunction {
            context: expr.context,
            name: name.to_string(),
        })?;

        if function.arity != args.len() {
            return Err(Error::Arity {
                context: expr.context,
                name: name.to_string(),
                expected: function.arity,
                actual: args.len(),
            });
        }

        let arguments = args
            .iter()
            .map(|arg| {
                Ok(Argument {
                    value: arg.visit(self)?,
                    context: arg.context,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        (function.call)(&arguments, expr.context)
    }

    fn visit_let(
        &mut self,
        _expr: &Expression,
        name: &str,
        value: &Expression,
        body: &Expression,
    ) -> Result<Value> {
        let value = value.visit(self)?;
        let scope = self.scope.child().with_value(name, value);
        body.eval(&scope)
    }

    fn visit_tag_filter(
        &mut self,
        _expr: &Expression,
        tag: &str,
        op: TagOp,
        value: &Expression,
    ) -> Result<Value> {
        let text = self.tag_value(op, value)?;

        let filter = match op {
            TagOp::Equal => Filter::match_tag(tag, text),
            TagOp::Prefix => Filter::starts_with(tag, text),
            TagOp::Match => Filter::regex(tag, text).map_err(|e| {
                Error::type_error(value.context, format!("invalid regular expression: {e}"))
            })?,
        };

        Ok(Value::SeriesSelector(filter))
    }

    fn visit_has_tag(&mut self, _expr: &Expression, tag: &str) -> Result<Value> {
        Ok(Value::SeriesSelector(Filter::has_tag(tag)))
    }

    fn visit_selector(
        &mut self,
        _expr: &Expression,
        key: Option<&str>,
        filters: &[Expression],
    ) -> Result<Value> {
        let mut parts = Vec::with_capacity(filters.len() + 1);
        if let Some(key) = key {
            parts.push(Filter::match_key(key));
        }
        for filter in filters {
            parts.push(self.selector(filter)?);
        }
        Ok(Value::SeriesSelector(Filter::and(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::Duration;
    use crate::error::ErrorKind;
    use crate::parser::parse;

    fn run(text: &str) -> Result<Value> {
        parse(text)?.eval(&Scope::new())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("2 + 3").unwrap(), Value::Integer(5));
        assert_eq!(run("2 + 3 * 4").unwrap(), Value::Integer(14));
        assert_eq!(run("(2 + 3) * 4").unwrap(), Value::Integer(20));
        assert_eq!(run("-2 - -3").unwrap(), Value::Integer(1));
        assert_eq!(run("10s - 4s").unwrap(), Value::Duration(Duration::seconds(6)));
        assert_eq!(run("\"a\" + 'b'").unwrap(), Value::from("ab"));
    }

    #[test]
    fn test_errors_point_at_operator() {
        let err = run("10s - 4").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.context(), Context::new(4, 5));

        let err = run("1 / 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
        assert_eq!(err.context(), Context::new(2, 3));

        let err = run("!5").unwrap_err();
        assert_eq!(err.context(), Context::new(0, 1));
    }

    #[test]
    fn test_references() {
        let scope = Scope::new().with_value("x", 2);
        assert_eq!(parse("x + 1").unwrap().eval(&scope).unwrap(), Value::Integer(3));

        let err = run("x + 1").unwrap_err();
        assert_eq!(
            err,
            Error::UnboundReference {
                context: Context::new(0, 1),
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_let() {
        assert_eq!(run("let y = 2 + 3; y * 2").unwrap(), Value::Integer(10));
        assert_eq!(run("let x = 1; let x = x + 1; x").unwrap(), Value::Integer(2));

        let err = run("(let y = 1; y) + y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundReference);
        assert_eq!(err.context(), Context::new(17, 18));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(run("1 < 2 and 2 <= 2").unwrap(), Value::Boolean(true));
        assert_eq!(run("not (1 == 1.0) or false").unwrap(), Value::Boolean(false));
        assert_eq!(run("1m == 60s").unwrap(), Value::Boolean(true));
        assert_eq!(run("1 == \"1\"").unwrap_err().kind(), ErrorKind::Type);
    }

    #[test]
    fn test_logic_evaluates_both_sides() {
        let err = run("false and missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundReference);
    }

    #[test]
    fn test_calls() {
        assert_eq!(run("max(abs(-4), 3)").unwrap(), Value::Integer(4));
        assert_eq!(run("seconds(2m)").unwrap(), Value::Integer(120));
        assert_eq!(run("len([1, 2, 3])").unwrap(), Value::Integer(3));

        let err = run("nope(1)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunction);
        assert_eq!(err.context(), Context::new(0, 7));

        // Arity is checked before arguments are evaluated
        let err = run("abs(missing, 2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arity);
        assert_eq!(err.to_string(), "function `abs` expects 1 argument(s), got 2");
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            run("cpu{host = \"a\", +dc}").unwrap(),
            Value::SeriesSelector(Filter::and(vec![
                Filter::match_key("cpu"),
                Filter::match_tag("host", "a"),
                Filter::has_tag("dc"),
            ]))
        );
        assert_eq!(
            run("host =~ r\"web-\\d+\" or !(region ^ 'eu')").unwrap(),
            Value::SeriesSelector(Filter::or(vec![
                Filter::regex("host", r"web-\d+").unwrap(),
                Filter::not(Filter::starts_with("region", "eu")),
            ]))
        );
    }

    #[test]
    fn test_tag_filter_errors() {
        let err = run("host = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.context(), Context::new(7, 8));

        let err = run("host =~ \"(\"").unwrap_err();
        assert!(err.to_string().contains("invalid regular expression"));

        let err = run("cpu{1}").unwrap_err();
        assert_eq!(err.context(), Context::new(4, 5));
    }

    #[test]
    fn test_has_selector_prints_back_as_query() {
        let Value::SeriesSelector(filter) = run("has(\"dc\") and key(\"a-b\")").unwrap() else {
            panic!("expected a selector");
        };
        assert_eq!(run(&filter.to_dsl()).unwrap(), Value::SeriesSelector(filter));

        for query in ["has(\"and\")", "has(\"a-b\")"] {
            let err = run(query).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Type, "{query}");
            assert_eq!(err.context(), Context::new(4, query.len() - 1));
        }
    }
}
