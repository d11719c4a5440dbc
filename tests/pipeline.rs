use grammar::{CompileOptions, Compiler, ErrorKind, Scope, parse};
use metadata::backend::memory::MemoryBackend;
use metadata::{DateRange, MetadataDispatcher, MetadataRequest, MetadataResponse, RequestKind};

const SERIES: [&str; 5] = [
    "cpu{host = \"web-1\", dc = \"eu\"}",
    "cpu{host = \"web-2\", dc = \"us\"}",
    "cpu{host = \"db-1\", dc = \"eu\"}",
    "mem{host = \"web-1\", dc = \"eu\"}",
    "disk{host = \"db-1\"}",
];

async fn seeded(range: DateRange) -> MetadataDispatcher<MemoryBackend> {
    let dispatcher = MetadataDispatcher::new(MemoryBackend::new());
    let scope = Scope::new();
    let compiler = Compiler::new(&scope, CompileOptions::new(range));

    for text in SERIES {
        let write = compiler.write(&parse(text).unwrap()).unwrap();
        dispatcher
            .dispatch(MetadataRequest::Write(write))
            .await
            .unwrap();
    }
    dispatcher
}

async fn query(
    dispatcher: &MetadataDispatcher<MemoryBackend>,
    options: CompileOptions,
    text: &str,
    kind: RequestKind,
) -> MetadataResponse {
    let scope = Scope::new().with_value("region", "eu");
    let request = Compiler::new(&scope, options)
        .compile(&parse(text).unwrap(), kind)
        .unwrap();
    dispatcher.dispatch(request).await.unwrap()
}

fn count(response: MetadataResponse) -> u64 {
    match response {
        MetadataResponse::CountSeries(r) => r.count,
        other => panic!("expected count-series, got {other:?}"),
    }
}

#[tokio::test]
async fn test_filters_select_written_series() {
    let range = DateRange::new(1_000, 2_000).unwrap();
    let dispatcher = seeded(range).await;
    let options = CompileOptions::new(range);

    let cases = [
        ("cpu{}", 3),
        ("{dc = region}", 3),
        ("cpu{host ^ \"web\"}", 2),
        ("{host =~ r\"db-\\d\"} and !(+dc)", 1),
        ("key(\"mem\") or key(\"disk\")", 2),
        ("true", 5),
        ("false", 0),
    ];
    for (text, expected) in cases {
        let response = query(&dispatcher, options, text, RequestKind::CountSeries).await;
        assert_eq!(count(response), expected, "{text}");
    }

    match query(&dispatcher, options, "{dc = \"eu\"}", RequestKind::FindKeys).await {
        MetadataResponse::FindKeys(r) => {
            let keys: Vec<_> = r.keys.into_iter().collect();
            assert_eq!(keys, ["cpu", "mem"]);
        }
        other => panic!("expected find-keys, got {other:?}"),
    }

    match query(&dispatcher, options, "cpu{}", RequestKind::FindTags).await {
        MetadataResponse::FindTags(r) => {
            assert_eq!(r.size, 3);
            assert_eq!(r.tags["dc"].len(), 2);
            assert_eq!(r.tags["host"].len(), 3);
        }
        other => panic!("expected find-tags, got {other:?}"),
    }
}

#[tokio::test]
async fn test_range_and_limit() {
    let dispatcher = seeded(DateRange::new(1_000, 2_000).unwrap()).await;

    let outside = CompileOptions::new(DateRange::new(3_000, 4_000).unwrap());
    let response = query(&dispatcher, outside, "true", RequestKind::CountSeries).await;
    assert_eq!(count(response), 0);

    let limited = CompileOptions::new(DateRange::new(0, 1_000).unwrap()).with_limit(Some(2));
    match query(&dispatcher, limited, "cpu{}", RequestKind::FindSeries).await {
        MetadataResponse::FindSeries(r) => {
            assert_eq!(r.series.len(), 2);
            assert!(r.limited);
        }
        other => panic!("expected find-series, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_then_count() {
    let range = DateRange::new(1_000, 2_000).unwrap();
    let dispatcher = seeded(range).await;
    let options = CompileOptions::new(range);

    match query(&dispatcher, options, "{host ^ \"db\"}", RequestKind::DeleteSeries).await {
        MetadataResponse::DeleteSeries(r) => assert_eq!(r.deleted, 2),
        other => panic!("expected delete-series, got {other:?}"),
    }

    let response = query(&dispatcher, options, "true", RequestKind::CountSeries).await;
    assert_eq!(count(response), 3);
}

#[test]
fn test_unbound_reference_is_not_compilable() {
    let scope = Scope::new();
    let compiler = Compiler::new(&scope, CompileOptions::new(DateRange::new(0, 1).unwrap()));

    let err = compiler
        .compile(&parse("cpu{dc = region}").unwrap(), RequestKind::FindSeries)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotCompilable);
    assert!(err.to_string().contains("`region`"));
}
