use crate::ast::{BinaryOp, Expression, Literal, TagOp, UnaryOp};
use crate::context::Context;

/// A consumer of the syntax tree.
///
/// [`Expression::visit`] calls exactly one of these methods per node. Each
/// method also receives the node itself, so implementations can use its
/// context or recurse with `child.visit(self)`.
pub trait Visitor {
    type Output;

    fn visit_literal(&mut self, expr: &Expression, literal: &Literal) -> Self::Output;

    fn visit_reference(&mut self, expr: &Expression, name: &str) -> Self::Output;

    fn visit_list(&mut self, expr: &Expression, items: &[Expression]) -> Self::Output;

    fn visit_binary(
        &mut self,
        expr: &Expression,
        op: BinaryOp,
        operator_context: Context,
        left: &Expression,
        right: &Expression,
    ) -> Self::Output;

    fn visit_unary(
        &mut self,
        expr: &Expression,
        op: UnaryOp,
        operator_context: Context,
        operand: &Expression,
    ) -> Self::Output;

    fn visit_group(&mut self, expr: &Expression, inner: &Expression) -> Self::Output;

    fn visit_call(&mut self, expr: &Expression, name: &str, args: &[Expression]) -> Self::Output;

    fn visit_let(
        &mut self,
        expr: &Expression,
        name: &str,
        value: &Expression,
        body: &Expression,
    ) -> Self::Output;

    fn visit_tag_filter(
        &mut self,
        expr: &Expression,
        tag: &str,
        op: TagOp,
        value: &Expression,
    ) -> Self::Output;

    fn visit_has_tag(&mut self, expr: &Expression, tag: &str) -> Self::Output;

    fn visit_selector(
        &mut self,
        expr: &Expression,
        key: Option<&str>,
        filters: &[Expression],
    ) -> Self::Output;
}

/// Collects references that are not bound by an enclosing `let`, in source
/// order. Names shadowed by a `let` inside the expression are skipped.
#[derive(Debug, Default)]
pub struct FreeReferences {
    bound: Vec<String>,
    found: Vec<(String, Context)>,
}

impl FreeReferences {
    pub fn collect(expr: &Expression) -> Vec<(String, Context)> {
        let mut collector = Self::default();
        expr.visit(&mut collector);
        collector.found
    }

    fn visit_all(&mut self, exprs: &[Expression]) {
        for expr in exprs {
            expr.visit(self);
        }
    }
}

impl Visitor for FreeReferences {
    type Output = ();

    fn visit_literal(&mut self, _expr: &Expression, _literal: &Literal) {}

    fn visit_reference(&mut self, expr: &Expression, name: &str) {
        if !self.bound.iter().any(|bound| bound == name) {
            self.found.push((name.to_string(), expr.context));
        }
    }

    fn visit_list(&mut self, _expr: &Expression, items: &[Expression]) {
        self.visit_all(items);
    }

    fn visit_binary(
        &mut self,
        _expr: &Expression,
        _op: BinaryOp,
        _operator_context: Context,
        left: &Expression,
        right: &Expression,
    ) {
        left.visit(self);
        right.visit(self);
    }

    fn visit_unary(
        &mut self,
        _expr: &Expression,
        _op: UnaryOp,
        _operator_context: Context,
        operand: &Expression,
    ) {
        operand.visit(self);
    }

    fn visit_group(&mut self, _expr: &Expression, inner: &Expression) {
        inner.visit(self);
    }

    fn visit_call(&mut self, _expr: &Expression, _name: &str, args: &[Expression]) {
        self.visit_all(args);
    }

    fn visit_let(&mut self, _expr: &Expression, name: &str, value: &Expression, body: &Expression) {
        value.visit(self);
        self.bound.push(name.to_string());
        body.visit(self);
        self.bound.pop();
    }

    fn visit_tag_filter(&mut self, _expr: &Expression, _tag: &str, _op: TagOp, value: &Expression) {
        value.visit(self);
    }

    fn visit_has_tag(&mut self, _expr: &Expression, _tag: &str) {}

    fn visit_selector(&mut self, _expr: &Expression, _key: Option<&str>, filters: &[Expression]) {
        self.visit_all(filters);
    }
}
