use anyhow::{Context, Result};
use clap::Args;
use common::Configuration;
use grammar::{FreeReferences, tokenize};

use super::{bindings_scope, diagnostic, parse_query};

#[derive(Args, Debug)]
pub struct RenderArgs {
    pub query: String,

    #[arg(long, help = "Print the syntax tree as JSON instead")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    pub query: String,

    #[arg(long = "bind", value_name = "NAME=EXPR", help = "Bind a name before evaluating")]
    pub bindings: Vec<String>,

    #[arg(long, help = "Print the value as JSON")]
    pub json: bool,
}

/// One token per line: byte range, then the token
pub fn tokens(query: &str) -> Result<String> {
    let mut lines = Vec::new();
    for token in tokenize(query) {
        let token = token.map_err(|e| diagnostic(query, e))?;
        lines.push(format!("{}\t{}", token.context, token.kind));
    }
    Ok(lines.join("\n"))
}

pub fn render(config: &Configuration, args: &RenderArgs) -> Result<String> {
    let expr = parse_query(config, &args.query)?;
    if args.json {
        return serde_json::to_string_pretty(&expr).context("Failed to serialize syntax tree");
    }
    Ok(expr.to_repr())
}

pub fn eval(config: &Configuration, args: &EvalArgs) -> Result<String> {
    let scope = bindings_scope(config, &args.bindings)?;
    let expr = parse_query(config, &args.query)?;

    let unbound: Vec<_> = FreeReferences::collect(&expr)
        .into_iter()
        .filter(|(name, _)| !scope.contains(name))
        .map(|(name, context)| format!("{name}@{context}"))
        .collect();
    if !unbound.is_empty() {
        log::debug!("Unbound references: {}", unbound.join(", "));
    }

    let value = expr.eval(&scope).map_err(|e| diagnostic(&args.query, e))?;
    if args.json {
        return serde_json::to_string_pretty(&value).context("Failed to serialize value");
    }
    Ok(value.to_string())
}
