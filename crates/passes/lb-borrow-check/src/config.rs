//! Checker configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How reference lifetimes are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowMode {
    /// A reference is live until the end of its declaring scope
    #[default]
    Lexical,
    /// A reference is live until its last use. Not implemented.
    NonLexical,
}

impl fmt::Display for BorrowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::NonLexical => write!(f, "non-lexical"),
        }
    }
}

impl FromStr for BorrowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "lexical" => Ok(Self::Lexical),
            "non-lexical" | "nll" => Ok(Self::NonLexical),
            other => Err(format!(
                "unknown borrow mode `{other}` (expected `lexical` or `non-lexical`)"
            )),
        }
    }
}

/// Options for a single analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub mode: BorrowMode,
}

impl CheckerConfig {
    pub fn with_mode(mode: BorrowMode) -> Self {
        Self { mode }
    }
}
