//! Expressions back to query text.
//!
//! Parentheses come from [`ExpressionKind::Group`](crate::ast::ExpressionKind)
//! nodes. The renderer only adds its own when a child binds more loosely
//! than its slot requires, which never happens for parsed trees, so
//! `parse(render(parse(s)))` has the same shape as `parse(s)`.

use metadata::filter::quote_string;

use crate::ast::{BinaryOp, Expression, Literal, TagOp, UnaryOp, precedence};
use crate::context::Context;
use crate::visitor::Visitor;

pub struct Renderer;

impl Renderer {
    /// Render `expr`, parenthesized unless its precedence is at least `min`
    fn operand(&mut self, expr: &Expression, min: u8) -> String {
        let text = expr.visit(self);
        if expr.precedence() < min {
            format!("({text})")
        } else {
            text
        }
    }

    fn join(&mut self, exprs: &[Expression]) -> String {
        exprs
            .iter()
            .map(|expr| expr.visit(self))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn literal(literal: &Literal) -> String {
    match literal {
        Literal::Integer(v) => v.to_string(),
        Literal::Double(v) => format!("{v:?}"),
        Literal::Duration(d) => d.to_string(),
        Literal::String(s) => quote_string(s),
        Literal::Regex(pattern) => format!("r\"{}\"", pattern.replace('"', "\\\"")),
        Literal::Boolean(b) => b.to_string(),
    }
}

impl Visitor for Renderer {
    type Output = String;

    fn visit_literal(&mut self, _expr: &Expression, value: &Literal) -> String {
        literal(value)
    }

    fn visit_reference(&mut self, _expr: &Expression, name: &str) -> String {
        name.to_string()
    }

    fn visit_list(&mut self, _expr: &Expression, items: &[Expression]) -> String {
        format!("[{}]", self.join(items))
    }

    fn visit_binary(
        &mut self,
        _expr: &Expression,
        op: BinaryOp,
        _operator_context: Context,
        left: &Expression,
        right: &Expression,
    ) -> String {
        let level = op.precedence();
        let left = self.operand(left, level);
        let right = self.operand(right, level + 1);
        format!("{left} {op} {right}")
    }

    fn visit_unary(
        &mut self,
        _expr: &Expression,
        op: UnaryOp,
        _operator_context: Context,
        operand: &Expression,
    ) -> String {
        let operand = self.operand(operand, precedence::PREFIX);
        format!("{op}{operand}")
    }

    fn visit_group(&mut self, _expr: &Expression, inner: &Expression) -> String {
        format!("({})", inner.visit(self))
    }

    fn visit_call(&mut self, _expr: &Expression, name: &str, args: &[Expression]) -> String {
        format!("{name}({})", self.join(args))
    }

    fn visit_let(&mut self, _expr: &Expression, name: &str, value: &Expression, body: &Expression) -> String {
        format!("let {name} = {}; {}", value.visit(self), body.visit(self))
    }

    fn visit_tag_filter(&mut self, _expr: &Expression, tag: &str, op: TagOp, value: &Expression) -> String {
        let value = self.operand(value, precedence::COMPARISON + 1);
        format!("{tag} {op} {value}")
    }

    fn visit_has_tag(&mut self, _expr: &Expression, tag: &str) -> String {
        format!("+{tag}")
    }

    fn visit_selector(&mut self, _expr: &Expression, key: Option<&str>, filters: &[Expression]) -> String {
        format!("{}{{{}}}", key.unwrap_or(""), self.join(filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(text: &str) -> String {
        let expr = parse(text).unwrap();
        let rendered = expr.to_repr();
        let reparsed = parse(&rendered).unwrap();
        assert!(expr.same_shape(&reparsed), "{text} rendered as {rendered}");
        rendered
    }

    #[test]
    fn test_render() {
        assert_eq!(roundtrip("1+2*3"), "1 + 2 * 3");
        assert_eq!(roundtrip("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(roundtrip("1 - (2 - 3)"), "1 - (2 - 3)");
        assert_eq!(roundtrip("not  a"), "!a");
        assert_eq!(roundtrip("- -x"), "--x");
        assert_eq!(roundtrip("let  x=1;x*2"), "let x = 1; x * 2");
        assert_eq!(roundtrip("f( 1,[2 ,3] )"), "f(1, [2, 3])");
        assert_eq!(roundtrip("cpu{host='a',+dc}"), "cpu{host = \"a\", +dc}");
        assert_eq!(roundtrip("{}"), "{}");
        assert_eq!(roundtrip("x =~ r\"a\\\"b\""), "x =~ r\"a\\\"b\"");
        assert_eq!(roundtrip("1.0 + 1e3 + 5m"), "1.0 + 1000.0 + 5m");
        assert_eq!(roundtrip("a and b or c and d"), "a and b or c and d");
    }

    #[test]
    fn test_extreme_doubles_roundtrip() {
        roundtrip("1e308 * 1.7976931348623157e308");
        roundtrip("5e-324 + 2.5e-300");
        assert!(parse("1e999").is_err());
    }

    #[test]
    fn test_adds_parentheses_for_built_trees() {
        let one = || Expression::literal(Context::default(), Literal::Integer(1));
        let sum = Expression::binary(BinaryOp::Add, Context::default(), one(), one());
        let product = Expression::binary(BinaryOp::Mul, Context::default(), sum.clone(), one());
        assert_eq!(product.to_repr(), "(1 + 1) * 1");

        let right = Expression::binary(BinaryOp::Sub, Context::default(), one(), sum);
        assert_eq!(right.to_repr(), "1 - (1 + 1)");

        let negated = Expression::unary(UnaryOp::Negate, Context::default(), right);
        assert_eq!(negated.to_repr(), "-(1 - (1 + 1))");
    }
}
