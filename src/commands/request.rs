use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Args;
use common::Configuration;
use grammar::{CompileOptions, Compiler};
use metadata::backend::memory::MemoryBackend;
use metadata::{DateRange, MetadataDispatcher, MetadataRequest, RequestKind};

use super::{bindings_scope, diagnostic, parse_query};

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    pub query: String,

    #[arg(long, value_name = "KIND", help = "Request to compile into, e.g. find-series")]
    pub request: RequestKind,

    #[arg(long, value_name = "MS", requires = "end", help = "Range start in ms since epoch")]
    pub start: Option<i64>,

    #[arg(long, value_name = "MS", requires = "start", help = "Range end in ms since epoch")]
    pub end: Option<i64>,

    #[arg(long, help = "Result limit, defaults to the configured limit")]
    pub limit: Option<usize>,

    #[arg(long = "bind", value_name = "NAME=EXPR", help = "Bind a name before compiling")]
    pub bindings: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub compile: CompileArgs,

    #[arg(long, value_name = "SELECTOR", help = "Series to write first, e.g. 'cpu{host = \"a\"}'")]
    pub series: Vec<String>,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Range and limit from the arguments, falling back to the configuration
pub fn compile_options(config: &Configuration, args: &CompileArgs) -> Result<CompileOptions> {
    let range = match (args.start, args.end) {
        (Some(start), Some(end)) => DateRange::new(start, end)?,
        _ => {
            let lookback = i64::try_from(config.compile.lookback.as_millis()).unwrap_or(i64::MAX);
            DateRange::ending_at(now_millis(), lookback)
        }
    };

    Ok(CompileOptions::new(range).with_limit(args.limit.or(config.compile.default_limit)))
}

fn compile_request(
    compiler: &Compiler<'_, '_>,
    config: &Configuration,
    args: &CompileArgs,
) -> Result<MetadataRequest> {
    let expr = parse_query(config, &args.query)?;
    compiler
        .compile(&expr, args.request)
        .map_err(|e| diagnostic(&args.query, e))
}

pub fn compile(config: &Configuration, args: &CompileArgs) -> Result<String> {
    let scope = bindings_scope(config, &args.bindings)?;
    let compiler = Compiler::new(&scope, compile_options(config, args)?);
    let request = compile_request(&compiler, config, args)?;
    serde_json::to_string_pretty(&request).context("Failed to serialize request")
}

#[tracing::instrument(skip_all, fields(request = %args.compile.request))]
pub async fn run(config: &Configuration, args: &RunArgs) -> Result<String> {
    let scope = bindings_scope(config, &args.compile.bindings)?;
    let compiler = Compiler::new(&scope, compile_options(config, &args.compile)?);
    let dispatcher = MetadataDispatcher::new(MemoryBackend::new());

    for series in &args.series {
        let expr = parse_query(config, series)?;
        let write = compiler.write(&expr).map_err(|e| diagnostic(series, e))?;
        dispatcher
            .dispatch(MetadataRequest::Write(write))
            .await
            .with_context(|| format!("Failed to write series {series}"))?;
    }
    tracing::info!(series = args.series.len(), "Seeded in-memory backend");

    let request = compile_request(&compiler, config, &args.compile)?;
    let response = dispatcher
        .dispatch(request)
        .await
        .context("Metadata request failed")?;

    serde_json::to_string_pretty(&response).context("Failed to serialize response")
}
