//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use snippy_domain::{Query, TierThreshold, YearRange};
use snippy_engine::EngineConfig;
use snippy_providers::ProvidersConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// SQLite database file; defaults to `~/.snippy/snippy.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Defaults applied to searches that omit a parameter
    #[serde(default)]
    pub defaults: SearchDefaults,

    /// Aggregation engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Crossref and JUFO endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// REPL history size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Search parameter defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDefaults {
    /// Records to collect per search
    #[serde(default = "default_max_results")]
    pub max_results: i64,

    /// Qualification threshold (`1_2_3`, `2_3`, `3`, `custom:N`)
    #[serde(default = "default_threshold")]
    pub threshold: String,

    /// Publication years (`all`, `A-B`, `A-`)
    #[serde(default = "default_years")]
    pub years: String,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the config, database and REPL history.
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".snippy"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the default location.
    ///
    /// A missing file is created with default contents.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::path()?,
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            tracing::info!(path = %path.display(), "Created default configuration");
            Ok(config)
        }
    }

    /// Load configuration from an existing file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check settings that cannot be expressed in the TOML schema.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.default_threshold()?;
        self.default_years()?;
        Ok(())
    }

    /// Database file to open.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("snippy.db")),
        }
    }

    /// Parsed default threshold.
    pub fn default_threshold(&self) -> Result<TierThreshold> {
        TierThreshold::parse(&self.defaults.threshold).map_err(CliError::Config)
    }

    /// Parsed default year range.
    pub fn default_years(&self) -> Result<Option<YearRange>> {
        YearRange::parse(&self.defaults.years).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Build a query, filling unset parameters from the defaults.
    pub fn build_query(
        &self,
        keywords: &str,
        max_results: Option<i64>,
        threshold: Option<TierThreshold>,
        years: Option<&str>,
        target: Option<usize>,
    ) -> Result<Query> {
        let year_range = match years {
            Some(s) => YearRange::parse(s)?,
            None => self.default_years()?,
        };
        let threshold = match threshold {
            Some(t) => t,
            None => self.default_threshold()?,
        };

        let query = Query::new(keywords, max_results.unwrap_or(self.defaults.max_results))?
            .with_year_range(year_range)
            .with_threshold(threshold)
            .with_target_qualified(target)?;
        query.check_limit(self.engine.max_results_limit)?;
        Ok(query)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            history_size: 1000,
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            threshold: default_threshold(),
            years: default_years(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_history_size() -> usize {
    1000
}

fn default_max_results() -> i64 {
    100
}

fn default_threshold() -> String {
    "2_3".to_string()
}

fn default_years() -> String {
    "all".to_string()
}
