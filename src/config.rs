//! Runtime configuration.
//!
//! Settings come from an optional TOML file; command-line flags override them.
//!
//! ```toml
//! tier = "hard"
//! opponent = "computer"
//! coefficients = "data/coefficients.json"
//! model = "data/model.json"
//! learning = true
//! seed = 7
//! log_filter = "overflow_rust=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::ai::Tier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Who plays the negative side in `play` mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Opponent {
    #[default]
    Computer,
    Human,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI difficulty.
    pub tier: Tier,
    pub opponent: Opponent,
    /// Coefficient table file; the table stays in memory when unset.
    pub coefficients: Option<PathBuf>,
    /// Heuristic model file; a fresh model is seeded when unset.
    pub model: Option<PathBuf>,
    /// Whether finished games train the coefficient table and the model.
    pub learning: bool,
    /// Seed for reproducible AI choices.
    pub seed: Option<u64>,
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: Tier::default(),
            opponent: Opponent::default(),
            coefficients: None,
            model: None,
            learning: false,
            seed: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        debug!(?config, "config loaded");
        Ok(config)
    }

    /// Load `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.tier, Tier::Easy);
        assert_eq!(config.opponent, Opponent::Computer);
        assert!(!config.learning);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("tier = \"hard\"\nseed = 5\n").unwrap();
        assert_eq!(config.tier, Tier::Hard);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.opponent, Opponent::Computer);
        assert_eq!(config.coefficients, None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overflow.toml");
        std::fs::write(
            &path,
            "opponent = \"human\"\nmodel = \"model.json\"\nlearning = true\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.opponent, Opponent::Human);
        assert_eq!(config.model, Some(PathBuf::from("model.json")));
        assert!(config.learning);
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_tier() {
        assert!(toml::from_str::<Config>("tier = \"expert\"").is_err());
    }
}
