use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments shared by every command
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Commands that only inspect the configuration
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level implied by `-v` / `-q`
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging to stderr. `RUST_LOG` wins over `-v` / `-q` when set.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        // A subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Human-readable configuration summary
    pub fn format_config(config: &Configuration) -> String {
        let limit = config
            .compile
            .default_limit
            .map(|limit| limit.to_string())
            .unwrap_or_else(|| "unlimited".to_string());

        [
            "SeriesQL Configuration:".to_string(),
            "=======================".to_string(),
            format!("Max query length: {} bytes", config.grammar.max_query_length),
            format!("Max nesting depth: {}", config.grammar.max_nesting_depth),
            format!("Default limit: {limit}"),
            format!("Default lookback: {:?}", config.compile.lookback),
        ]
        .join("\n")
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("{}", format_config(config));
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        if config.grammar.max_query_length == 0 {
            anyhow::bail!("Max query length must be greater than zero");
        }

        if config.grammar.max_nesting_depth == 0 {
            anyhow::bail!("Max nesting depth must be greater than zero");
        }

        if config.compile.default_limit == Some(0) {
            anyhow::bail!("Default limit must be greater than zero when set");
        }

        if config.compile.lookback.is_zero() {
            anyhow::bail!("Lookback must be greater than zero");
        }

        log::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Run a configuration-only command
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}
