use anyhow::{Context, Result};
use confyg::{env, Confygery};
use paperseek_core::schema::NearVector;
use paperseek_core::vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for paperseek.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (PAPERSEEK_* prefix)
/// 3. Config file (~/.config/paperseek/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database holding papers and collections.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: PAPERSEEK_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/paperseek/paperseek.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: twyg::Opts,
}

/// Where rows come from and which columns are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset name on the Hugging Face hub.
    pub name: String,
    /// Dataset config (subset) name.
    pub subset: String,
    pub split: String,
    pub title_column: String,
    pub abstract_column: String,
    /// Base URL of the datasets-server API.
    pub endpoint: String,
    pub requests_per_second: u32,
    pub max_retries: usize,
    /// Read rows from a local JSON Lines file instead of the hub.
    pub local_file: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: "CShorten/ML-ArXiv-Papers".to_string(),
            subset: "default".to_string(),
            split: "train".to_string(),
            title_column: "title".to_string(),
            abstract_column: "abstract".to_string(),
            endpoint: "https://datasets-server.huggingface.co".to_string(),
            requests_per_second: 5,
            max_retries: 3,
            local_file: None,
        }
    }
}

/// Fixed-seed sampling of dataset rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub seed: u64,
    pub size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { seed: 42, size: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    /// Where downloaded model files are cached.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            batch_size: 32,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
    pub metric: DistanceMetric,
    pub max_distance: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: NearVector::DEFAULT_LIMIT,
            metric: DistanceMetric::Cosine,
            max_distance: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            dataset: DatasetConfig::default(),
            sampling: SamplingConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/paperseek/config.toml
    /// Reads environment variables with PAPERSEEK_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("paperseek");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// Path of the treadle state store, next to the database.
    #[must_use]
    pub fn pipeline_state_path(&self) -> PathBuf {
        self.database_path
            .parent()
            .map(|p| p.join("pipeline.db"))
            .unwrap_or_else(|| PathBuf::from("pipeline.db"))
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/paperseek/paperseek.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paperseek")
        .join("paperseek.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/paperseek/config.toml
/// - macOS: ~/Library/Application Support/paperseek/config.toml
/// - Windows: %APPDATA%\paperseek\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paperseek")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Paperseek Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (PAPERSEEK_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database holding staged papers and the vector collection
#
# Can also be set via:
# - CLI: paperseek --db /custom/path.db ingest
# - Environment: PAPERSEEK_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/paperseek.db"

[dataset]
# Hugging Face dataset and the two text columns to keep
name = "CShorten/ML-ArXiv-Papers"
subset = "default"
split = "train"
title_column = "title"
abstract_column = "abstract"
#endpoint = "https://datasets-server.huggingface.co"
#requests_per_second = 5
#max_retries = 3

# Read rows from a JSON Lines file instead of the hub
#local_file = "/path/to/papers.jsonl"

[sampling]
# The same seed always selects the same rows in the same order
seed = 42
size = 100

[embedding]
# Any model supported by fastembed, e.g. "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5"
model = "all-MiniLM-L6-v2"
batch_size = 32
#cache_dir = "/path/to/model/cache"

[search]
limit = 5
# cosine, dot, or l2-squared
metric = "cosine"
#max_distance = 0.6

# Logger options (twyg)
#[logging]
#coloured = true
#level = "debug"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
