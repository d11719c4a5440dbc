use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file, read from the working directory when present
pub const CONFIG_FILE: &str = "seriesql.toml";

/// Prefix of environment overrides, e.g. `SERIESQL__GRAMMAR__MAX_NESTING_DEPTH`
pub const ENV_PREFIX: &str = "SERIESQL__";

/// Bounds applied while parsing queries
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Longest accepted query text, in bytes
    pub max_query_length: usize,
    /// Deepest accepted expression nesting
    pub max_nesting_depth: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            max_query_length: 16 * 1024,
            max_nesting_depth: 128,
        }
    }
}

/// Defaults for requests produced by the compiler
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileConfig {
    /// Result limit used when a command does not give one
    pub default_limit: Option<usize>,
    /// Width of the default date range, which ends now
    #[serde(with = "humantime_serde")]
    pub lookback: Duration,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            default_limit: Some(1_000),
            lookback: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Configuration {
    #[serde(default)]
    pub grammar: GrammarConfig,
    #[serde(default)]
    pub compile: CompileConfig,
}

impl Configuration {
    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Defaults, then `seriesql.toml`, then `SERIESQL__` environment variables
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(Path::new(CONFIG_FILE))
    }

    /// Like [`Configuration::load`] with an explicit configuration file
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment(path).extract().map_err(Box::new)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.grammar.max_query_length, 16 * 1024);
        assert_eq!(config.grammar.max_nesting_depth, 128);
        assert_eq!(config.compile.default_limit, Some(1_000));
        assert_eq!(config.compile.lookback, Duration::from_secs(3600));
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config, Configuration::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [grammar]
                max_nesting_depth = 16

                [compile]
                lookback = "15m"
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.grammar.max_nesting_depth, 16);
            assert_eq!(config.grammar.max_query_length, 16 * 1024);
            assert_eq!(config.compile.lookback, Duration::from_secs(15 * 60));
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[grammar]\nmax_query_length = 100\n")?;
            jail.set_env("SERIESQL__GRAMMAR__MAX_QUERY_LENGTH", "200");
            jail.set_env("SERIESQL__COMPILE__DEFAULT_LIMIT", "5");

            let config =
                Configuration::load_from_path(Path::new("custom.toml")).map_err(|e| *e)?;
            assert_eq!(config.grammar.max_query_length, 200);
            assert_eq!(config.compile.default_limit, Some(5));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value() {
        Jail::expect_with(|jail| {
            jail.set_env("SERIESQL__COMPILE__LOOKBACK", "soon");
            assert!(Configuration::load().is_err());
            Ok(())
        });
    }
}
