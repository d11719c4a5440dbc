// End-to-end checks of the grammar: text to tree, tree to value, tree to
// backend request, and tree back to text.

use grammar::{
    CompileOptions, Compiler, Context, Duration, ErrorKind, Scope, Value, parse, tokenize,
};
use metadata::{DateRange, Filter, MetadataRequest, RequestKind};

fn range() -> DateRange {
    DateRange::new(1_000, 2_000).unwrap()
}

fn evaluate(text: &str) -> grammar::Result<Value> {
    parse(text)?.eval(&Scope::new())
}

#[test]
fn test_render_reparses_to_same_shape() {
    let queries = [
        "2 + 3",
        "1 - 2 - 3",
        "1 - (2 - 3)",
        "2 * (3 + 4) / 5",
        "a < b == (c >= d)",
        "not a and !b or c",
        "-(-1) * -x",
        "let x = 1; let y = x + 1; [x, y, (let z = 3; z)]",
        "max(1, min(2.5, 3e2))",
        "cpu{host = \"a\\n\", +dc, region ^ 'eu', host =~ r\"web-\\d+\"}",
        "{} or key(\"mem\") and !(+dc)",
        "5ms + 2H - 1w",
        "host = prefix + \"-1\" and dc = 'x'",
    ];

    for query in queries {
        let first = parse(query).unwrap();
        let rendered = first.to_repr();
        let second = parse(&rendered).unwrap();
        assert!(first.same_shape(&second), "{query} -> {rendered}");
        assert_eq!(second.to_repr(), rendered, "rendering is stable for {query}");
    }
}

#[test]
fn test_evaluation_examples() {
    assert_eq!(evaluate("2 + 3").unwrap(), Value::Integer(5));
    assert_eq!(evaluate("10s - 4s").unwrap(), Value::Duration(Duration::seconds(6)));

    let err = evaluate("10s - 4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.context(), Context::new(4, 5));

    let err = evaluate("1 / 0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arithmetic);
    assert_eq!(err.context(), Context::new(2, 3));

    let expr = parse("x + 1").unwrap();
    assert_eq!(expr.eval(&Scope::new().with_value("x", 2)).unwrap(), Value::Integer(3));
    let err = expr.eval(&Scope::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundReference);
    assert!(err.to_string().contains("`x`"));

    assert_eq!(evaluate("let y = 2 + 3; y * 2").unwrap(), Value::Integer(10));
    assert_eq!(
        evaluate("[let y = 1; y, y]").unwrap_err().kind(),
        ErrorKind::UnboundReference
    );
}

#[test]
fn test_unterminated_string_context_starts_at_quote() {
    let err = parse("host = \"web").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert_eq!(err.context().start, 7);

    let errors: Vec<_> = tokenize("host = \"web").filter_map(Result::err).collect();
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_diagnostic_rendering() {
    let source = "let a = 1;\na + 10s";
    let err = parse(source).unwrap().eval(&Scope::new()).unwrap_err();
    assert_eq!(
        err.display_with_source(source),
        "2:3: type error: cannot apply `+` to integer and duration\n  a + 10s\n    ^"
    );
}

#[test]
fn test_compile_selector_with_literals() {
    let scope = Scope::new();
    let compiler = Compiler::new(&scope, CompileOptions::new(range()));
    let expr = parse("cpu{host = \"a\", region = \"eu\"}").unwrap();

    let request = compiler.compile(&expr, RequestKind::FindSeries).unwrap();
    let MetadataRequest::FindSeries(request) = request else {
        panic!("expected find-series, got {request:?}");
    };

    let filter = &request.filter;
    assert!(filter.apply(&metadata::Series::new("cpu").with_tag("host", "a").with_tag("region", "eu")));
    assert!(!filter.apply(&metadata::Series::new("cpu").with_tag("host", "b").with_tag("region", "eu")));
    assert_eq!(request.range, range());
    assert_eq!(request.limit, None);

    let err = compiler
        .compile(&parse("cpu{host = target}").unwrap(), RequestKind::FindSeries)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotCompilable);
    assert_eq!(err.context(), Context::new(11, 17));
}

#[test]
fn test_filter_dsl_compiles_back() {
    let filters = [
        Filter::True,
        Filter::False,
        Filter::match_key("cpu"),
        Filter::match_tag("host", "a \"quoted\" value"),
        Filter::has_tag("dc"),
        Filter::starts_with("region", "eu-"),
        Filter::regex("host", r"web-\d+").unwrap(),
        Filter::not(Filter::not(Filter::has_tag("dc"))),
        Filter::not(Filter::True),
        Filter::and(vec![]),
        Filter::or(vec![]),
        Filter::and(vec![
            Filter::match_key("cpu"),
            Filter::or(vec![Filter::match_tag("host", "a"), Filter::match_tag("host", "b")]),
            Filter::not(Filter::has_tag("dc")),
        ]),
        Filter::or(vec![
            Filter::and(vec![Filter::has_tag("a"), Filter::has_tag("b")]),
            Filter::or(vec![Filter::has_tag("c"), Filter::has_tag("a")]),
        ]),
    ];

    let scope = Scope::new();
    let compiler = Compiler::new(&scope, CompileOptions::new(range()));

    for filter in filters {
        let dsl = filter.to_dsl();
        let compiled = compiler.filter(&parse(&dsl).unwrap()).unwrap();
        assert_eq!(compiled, filter.optimize(), "{dsl}");
    }
}

#[test]
fn test_deferred_bindings_compile() {
    let root = Scope::new().with_value("dc", "eu");
    let scope = root
        .child()
        .with_deferred("frontends", parse("host ^ \"web\" and dc = dc").unwrap());
    let compiler = Compiler::new(&scope, CompileOptions::new(range()).with_limit(Some(5)));

    let request = compiler
        .count_series(&parse("cpu{frontends}").unwrap())
        .unwrap();
    assert_eq!(
        request.filter,
        Filter::and(vec![
            Filter::match_key("cpu"),
            Filter::match_tag("dc", "eu"),
            Filter::starts_with("host", "web"),
        ])
    );
    assert_eq!(request.limit, Some(5));
}
