//! Compile filter expressions into metadata backend requests.
//!
//! Only the filter-shaped part of the grammar compiles: boolean literals,
//! tag filters, `+tag`, selectors, `and`/`or`/`not`, groups and `let`.
//! References and calls compile when they evaluate, against the compile
//! scope, to a selector. Tag filter values are evaluated the same way, so
//! `host = prefix + "-1"` compiles if `prefix` is bound.

use std::collections::BTreeMap;

use metadata::{
    CountSeriesRequest, DateRange, DeleteSeriesRequest, Filter, FindKeysRequest,
    FindSeriesIdsRequest, FindSeriesRequest, FindTagsRequest, MetadataRequest, RequestKind, Series,
    WriteMetadataRequest,
};

use crate::ast::{BinaryOp, Expression, Literal, TagOp, UnaryOp};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::eval::eval;
use crate::scope::Scope;
use crate::value::Value;
use crate::visitor::Visitor;

/// Range and limit attached to every compiled request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub range: DateRange,
    pub limit: Option<usize>,
}

impl CompileOptions {
    pub fn new(range: DateRange) -> Self {
        Self { range, limit: None }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

pub struct Compiler<'a, 'p> {
    scope: &'a Scope<'p>,
    options: CompileOptions,
}

impl<'a, 'p> Compiler<'a, 'p> {
    pub fn new(scope: &'a Scope<'p>, options: CompileOptions) -> Self {
        Self { scope, options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// The optimized filter described by `expr`
    pub fn filter(&self, expr: &Expression) -> Result<Filter> {
        let filter = expr.visit(&mut FilterCompiler::new(self.scope))?.optimize();
        log::debug!("Compiled filter {filter}");
        Ok(filter)
    }

    /// A write for the single series described by `expr`, which must be a
    /// key plus tag equalities
    pub fn write(&self, expr: &Expression) -> Result<WriteMetadataRequest> {
        let series = series(expr.context, &self.filter(expr)?)?;
        Ok(WriteMetadataRequest {
            series,
            range: self.options.range,
        })
    }

    pub fn find_tags(&self, expr: &Expression) -> Result<FindTagsRequest> {
        Ok(FindTagsRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn find_series(&self, expr: &Expression) -> Result<FindSeriesRequest> {
        Ok(FindSeriesRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn find_series_ids(&self, expr: &Expression) -> Result<FindSeriesIdsRequest> {
        Ok(FindSeriesIdsRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn count_series(&self, expr: &Expression) -> Result<CountSeriesRequest> {
        Ok(CountSeriesRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn delete_series(&self, expr: &Expression) -> Result<DeleteSeriesRequest> {
        Ok(DeleteSeriesRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn find_keys(&self, expr: &Expression) -> Result<FindKeysRequest> {
        Ok(FindKeysRequest::new(self.filter(expr)?, self.options.range, self.options.limit))
    }

    pub fn compile(&self, expr: &Expression, kind: RequestKind) -> Result<MetadataRequest> {
        let request = match kind {
            RequestKind::Write => MetadataRequest::Write(self.write(expr)?),
            RequestKind::FindTags => MetadataRequest::FindTags(self.find_tags(expr)?),
            RequestKind::FindSeries => MetadataRequest::FindSeries(self.find_series(expr)?),
            RequestKind::FindSeriesIds => {
                MetadataRequest::FindSeriesIds(self.find_series_ids(expr)?)
            }
            RequestKind::CountSeries => MetadataRequest::CountSeries(self.count_series(expr)?),
            RequestKind::DeleteSeries => MetadataRequest::DeleteSeries(self.delete_series(expr)?),
            RequestKind::FindKeys => MetadataRequest::FindKeys(self.find_keys(expr)?),
        };
        log::debug!("Compiled {kind} request");
        Ok(request)
    }
}

fn series(context: Context, filter: &Filter) -> Result<Series> {
    let invalid = || {
        Error::not_compilable(
            context,
            "a write needs exactly one series key and only tag equalities",
        )
    };

    let parts = match filter {
        Filter::And { filters } => filters.as_slice(),
        single => std::slice::from_ref(single),
    };

    let mut key = None;
    let mut tags = BTreeMap::new();
    for part in parts {
        match part {
            Filter::MatchKey { key: k } if key.is_none() => key = Some(k.clone()),
            Filter::MatchTag { tag, value } => {
                if tags.insert(tag.clone(), value.clone()).is_some() {
                    return Err(Error::not_compilable(
                        context,
                        format!("conflicting values for tag `{tag}`"),
                    ));
                }
            }
            _ => return Err(invalid()),
        }
    }

    let series = Series {
        key: key.ok_or_else(invalid)?,
        tags,
    };
    series
        .validate()
        .map_err(|e| Error::not_compilable(context, e.to_string()))?;
    Ok(series)
}

/// Turns the filter-shaped part of an expression into a [`Filter`]
pub struct FilterCompiler<'a, 'p> {
    scope: &'a Scope<'p>,
}

impl<'a, 'p> FilterCompiler<'a, 'p> {
    pub fn new(scope: &'a Scope<'p>) -> Self {
        Self { scope }
    }

    /// Evaluate against the compile scope; unbound references become
    /// not-compilable errors at the reference
    fn evaluate(&self, expr: &Expression) -> Result<Value> {
        eval(expr, self.scope).map_err(|e| match e {
            Error::UnboundReference { context, name } => Error::not_compilable(
                context,
                format!("`{name}` is not bound at compile time"),
            ),
            other => other,
        })
    }

    fn selector(&self, expr: &Expression) -> Result<Filter> {
        match self.evaluate(expr)? {
            Value::SeriesSelector(filter) => Ok(filter),
            other => Err(Error::not_compilable(
                expr.context,
                format!("expected a selector, found {}", other.type_name()),
            )),
        }
    }

    fn unsupported(expr: &Expression, what: &str) -> Error {
        Error::not_compilable(expr.context, format!("{what} cannot be used as a filter"))
    }
}

impl Visitor for FilterCompiler<'_, '_> {
    type Output = Result<Filter>;

    fn visit_literal(&mut self, expr: &Expression, literal: &Literal) -> Result<Filter> {
        match literal {
            Literal::Boolean(true) => Ok(Filter::True),
            Literal::Boolean(false) => Ok(Filter::False),
            _ => Err(Self::unsupported(expr, "a literal")),
        }
    }

    fn visit_reference(&mut self, expr: &Expression, _name: &str) -> Result<Filter> {
        self.selector(expr)
    }

    fn visit_list(&mut self, expr: &Expression, _items: &[Expression]) -> Result<Filter> {
        Err(Self::unsupported(expr, "a list"))
    }

    fn visit_binary(
        &mut self,
        _expr: &Expression,
        op: BinaryOp,
        operator_context: Context,
        left: &Expression,
        right: &Expression,
    ) -> Result<Filter> {
        let build = match op {
            BinaryOp::And => Filter::and,
            BinaryOp::Or => Filter::or,
            _ => {
                return Err(Error::not_compilable(
                    operator_context,
                    format!("`{op}` cannot be used in a filter"),
                ));
            }
        };
        let left = left.visit(self)?;
        let right = right.visit(self)?;
        Ok(build(vec![left, right]))
    }

    fn visit_unary(
        &mut self,
        _expr: &Expression,
        op: UnaryOp,
        operator_context: Context,
        operand: &Expression,
    ) -> Result<Filter> {
        match op {
            UnaryOp::Not => Ok(Filter::not(operand.visit(self)?)),
            UnaryOp::Negate => Err(Error::not_compilable(
                operator_context,
                "`-` cannot be used in a filter",
            )),
        }
    }

    fn visit_group(&mut self, _expr: &Expression, inner: &Expression) -> Result<Filter> {
        inner.visit(self)
    }

    fn visit_call(&mut self, expr: &Expression, _name: &str, _args: &[Expression]) -> Result<Filter> {
        self.selector(expr)
    }

    fn visit_let(
        &mut self,
        _expr: &Expression,
        name: &str,
        value: &Expression,
        body: &Expression,
    ) -> Result<Filter> {
        let value = self.evaluate(value)?;
        let scope = self.scope.child().with_value(name, value);
        body.visit(&mut FilterCompiler::new(&scope))
    }

    fn visit_tag_filter(
        &mut self,
        expr: &Expression,
        _tag: &str,
        _op: TagOp,
        _value: &Expression,
    ) -> Result<Filter> {
        self.selector(expr)
    }

    fn visit_has_tag(&mut self, _expr: &Expression, tag: &str) -> Result<Filter> {
        Ok(Filter::has_tag(tag))
    }

    fn visit_selector(
        &mut self,
        _expr: &Expression,
        key: Option<&str>,
        filters: &[Expression],
    ) -> Result<Filter> {
        let mut parts = Vec::with_capacity(filters.len() + 1);
        if let Some(key) = key {
            parts.push(Filter::match_key(key));
        }
        for filter in filters {
            parts.push(filter.visit(self)?);
        }
        Ok(Filter::and(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::parse;

    fn options() -> CompileOptions {
        CompileOptions::new(DateRange::new(0, 1_000).unwrap()).with_limit(Some(10))
    }

    fn compile_filter(text: &str) -> Result<Filter> {
        let scope = Scope::new();
        Compiler::new(&scope, options()).filter(&parse(text)?)
    }

    #[test]
    fn test_find_series_from_literals() {
        let scope = Scope::new();
        let expr = parse("cpu{host = \"a\", dc = \"eu\"}").unwrap();
        let request = Compiler::new(&scope, options()).find_series(&expr).unwrap();

        assert_eq!(
            request.filter,
            Filter::and(vec![
                Filter::match_key("cpu"),
                Filter::match_tag("dc", "eu"),
                Filter::match_tag("host", "a"),
            ])
        );
        assert_eq!(request.range, DateRange::new(0, 1_000).unwrap());
        assert_eq!(request.limit, Some(10));
    }

    #[test]
    fn test_filters() {
        assert_eq!(compile_filter("+dc").unwrap(), Filter::has_tag("dc"));
        assert_eq!(compile_filter("true and +dc").unwrap(), Filter::has_tag("dc"));
        assert_eq!(compile_filter("!!(+dc)").unwrap(), Filter::has_tag("dc"));
        assert_eq!(compile_filter("false or false").unwrap(), Filter::False);
        assert_eq!(
            compile_filter("key(\"cpu\") and host ^ \"web\"").unwrap(),
            Filter::and(vec![Filter::match_key("cpu"), Filter::starts_with("host", "web")])
        );
        assert_eq!(
            compile_filter("let h = \"a\"; host = h or host = h + \"b\"").unwrap(),
            Filter::or(vec![Filter::match_tag("host", "a"), Filter::match_tag("host", "ab")])
        );
    }

    #[test]
    fn test_bound_selectors() {
        let scope = Scope::new()
            .with_value("web", Filter::regex("host", "web-.*").unwrap())
            .with_value("region", "eu");
        let compiler = Compiler::new(&scope, options());

        let filter = compiler.filter(&parse("web and dc = region").unwrap()).unwrap();
        assert_eq!(
            filter,
            Filter::and(vec![
                Filter::match_tag("dc", "eu"),
                Filter::regex("host", "web-.*").unwrap(),
            ])
        );
    }

    #[test]
    fn test_unbound_reference_is_not_compilable() {
        let err = compile_filter("cpu{host = name}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotCompilable);
        assert_eq!(err.context(), Context::new(11, 15));

        let err = compile_filter("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotCompilable);
        assert_eq!(err.context(), Context::new(0, 7));
    }

    #[test]
    fn test_not_compilable_shapes() {
        for (text, context) in [
            ("1 + 2", Context::new(2, 3)),
            ("+a == +b", Context::new(3, 5)),
            ("5", Context::new(0, 1)),
            ("[+a]", Context::new(0, 4)),
            ("-x", Context::new(0, 1)),
            ("abs(1)", Context::new(0, 6)),
        ] {
            let err = compile_filter(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotCompilable, "{text}: {err}");
            assert_eq!(err.context(), context, "{text}");
        }
    }

    #[test]
    fn test_evaluation_errors_pass_through() {
        assert_eq!(compile_filter("host = 1").unwrap_err().kind(), ErrorKind::Type);
        assert_eq!(compile_filter("nope(1)").unwrap_err().kind(), ErrorKind::UnknownFunction);
    }

    #[test]
    fn test_write() {
        let scope = Scope::new();
        let compiler = Compiler::new(&scope, options());

        let request = compiler
            .write(&parse("cpu{host = \"a\", dc = \"eu\"}").unwrap())
            .unwrap();
        assert_eq!(request.series, Series::new("cpu").with_tag("host", "a").with_tag("dc", "eu"));

        let request = compiler.write(&parse("key(\"mem\")").unwrap()).unwrap();
        assert_eq!(request.series, Series::new("mem"));

        for text in ["{host = \"a\"}", "cpu{+dc}", "cpu{host ^ \"a\"}", "cpu{} or mem{}"] {
            let err = compiler.write(&parse(text).unwrap()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotCompilable, "{text}");
        }

        let err = compiler
            .write(&parse("cpu{host = \"a\", host = \"b\"}").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("conflicting values for tag `host`"));
    }

    #[test]
    fn test_compile_dispatches_on_kind() {
        let scope = Scope::new();
        let compiler = Compiler::new(&scope, options());
        let expr = parse("cpu{host = \"a\"}").unwrap();

        for kind in RequestKind::ALL {
            let request = compiler.compile(&expr, kind).unwrap();
            assert_eq!(request.kind(), kind);
        }
    }
}
