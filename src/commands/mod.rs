pub mod query;
pub mod request;

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::Configuration;
use common::cli::{CommonArgs, CommonCommands, utils};
use grammar::parser::is_identifier;
use grammar::{Expression, Limits, Scope, parse_with_limits};

/// SeriesQL: parse, evaluate and compile series metadata queries
#[derive(Parser, Debug)]
#[command(name = "seriesql", version, about)]
pub struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tokens of a query
    Tokens { query: String },
    /// Parse a query and print it back in canonical form
    Render(query::RenderArgs),
    /// Evaluate a query
    Eval(query::EvalArgs),
    /// Compile a query into a metadata request
    Compile(request::CompileArgs),
    /// Compile a query and run it against an in-memory backend
    Run(request::RunArgs),
    #[command(flatten)]
    Common(CommonCommands),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        utils::init_logging(&self.common);
        let config = utils::load_config(self.common.config.as_ref())?;

        let output = match self.command {
            Commands::Tokens { query } => query::tokens(&query)?,
            Commands::Render(args) => query::render(&config, &args)?,
            Commands::Eval(args) => query::eval(&config, &args)?,
            Commands::Compile(args) => request::compile(&config, &args)?,
            Commands::Run(args) => request::run(&config, &args).await?,
            Commands::Common(command) => {
                return utils::handle_common_command(&command, &config);
            }
        };

        println!("{output}");
        Ok(())
    }
}

/// Parse limits taken from the configuration
pub fn limits(config: &Configuration) -> Limits {
    Limits {
        max_query_length: config.grammar.max_query_length,
        max_nesting_depth: config.grammar.max_nesting_depth,
    }
}

/// Turn a grammar error into a diagnostic pointing into `source`
pub fn diagnostic(source: &str, error: grammar::Error) -> anyhow::Error {
    anyhow::anyhow!(error.display_with_source(source))
}

pub fn parse_query(config: &Configuration, query: &str) -> Result<Expression> {
    parse_with_limits(query, &limits(config)).map_err(|e| diagnostic(query, e))
}

/// Build a scope from `NAME=EXPR` bindings. Each expression is evaluated
/// eagerly and may refer to bindings given before it.
pub fn bindings_scope(config: &Configuration, bindings: &[String]) -> Result<Scope<'static>> {
    let mut scope = Scope::new();

    for binding in bindings {
        let Some((name, text)) = binding.split_once('=') else {
            anyhow::bail!("Invalid binding '{binding}', expected NAME=EXPR");
        };
        let name = name.trim();
        if !is_identifier(name) {
            anyhow::bail!("Invalid binding name '{name}'");
        }

        let expr = parse_query(config, text)?;
        let value = expr.eval(&scope).map_err(|e| diagnostic(text, e))?;
        log::debug!("Bound {name} = {value}");
        scope = scope.with_value(name, value);
    }

    Ok(scope)
}
