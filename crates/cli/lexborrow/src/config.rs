//! `lexborrow.toml` configuration

use anyhow::{Context, Result};
use clap::ValueEnum;
use lb_borrow_check::CheckerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File looked up in the working directory when no `--config` is given
pub const CONFIG_FILE: &str = "lexborrow.toml";

/// How `check` prints its results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[check]` table
    pub check: CheckerConfig,
    /// `[output]` table
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Loads `explicit` if given, else `lexborrow.toml` in `dir` if present,
    /// else the defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config file");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lb_borrow_check::BorrowMode;

    #[test]
    fn parses_both_tables() {
        let config: Config = toml::from_str(
            r#"
            [check]
            mode = "non-lexical"

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.check.mode, BorrowMode::NonLexical);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn missing_tables_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn discover_prefers_explicit_then_directory_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "[output]\nformat = \"json\"\n").unwrap();
        let found = Config::discover(None, dir.path()).unwrap();
        assert_eq!(found.output.format, OutputFormat::Json);

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[check]\nmode = \"lexical\"\n").unwrap();
        let loaded = Config::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(loaded.output.format, OutputFormat::Text);

        assert!(Config::discover(Some(&dir.path().join("absent.toml")), dir.path()).is_err());
    }
}
