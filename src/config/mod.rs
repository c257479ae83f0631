//! Configuration parsing and validation.
//!
//! Configuration is optional: every section has defaults that reproduce the
//! local demo layout (`data`, `data/silver`, `data/gold`). A YAML file can
//! override any of it, with environment variable interpolation applied first.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyLocationSnafu, EmptyTableNameSnafu, EnvInterpolationSnafu,
    InvalidPopulationSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// File name of the raw order ledger under the raw root.
pub const ORDERS_FILE: &str = "orders.csv";

/// File name of the raw review stream under the raw root.
pub const REVIEWS_FILE: &str = "reviews.json";

/// Largest population that fits the 4-digit `P-####` / `U-####` ids.
pub const MAX_CATALOG_SIZE: usize = 10_000;

/// Largest order count that fits the 6-digit `O-######` ids.
pub const MAX_ORDERS: usize = 1_000_000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which execution context drives the pipeline.
    #[serde(default)]
    pub context: ContextConfig,
    /// Raw, silver and gold roots.
    #[serde(default)]
    pub locations: LocationsConfig,
    /// Table names under the silver and gold roots.
    #[serde(default)]
    pub tables: TablesConfig,
    /// Data file settings for table writes.
    #[serde(default)]
    pub sink: SinkConfig,
    /// Synthetic dataset settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Metrics configuration (optional, disabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Execution context selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub kind: ContextKind,
}

/// The two supported execution contexts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Local run with locations taken from configuration.
    #[default]
    Local,
    /// Managed job run with locations resolved from job parameters.
    Job,
}

/// Root locations of each tier.
///
/// Each root may be a local path (relative or absolute), a `file://` URL,
/// or an object store URL such as `s3://bucket/prefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationsConfig {
    #[serde(default = "default_raw_location")]
    pub raw: String,
    #[serde(default = "default_silver_location")]
    pub silver: String,
    #[serde(default = "default_gold_location")]
    pub gold: String,
    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_location(),
            silver: default_silver_location(),
            gold: default_gold_location(),
            storage_options: HashMap::new(),
        }
    }
}

fn default_raw_location() -> String {
    "data".to_string()
}

fn default_silver_location() -> String {
    "data/silver".to_string()
}

fn default_gold_location() -> String {
    "data/gold".to_string()
}

/// Delta table names relative to their tier root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_orders_table")]
    pub orders: String,
    #[serde(default = "default_reviews_table")]
    pub reviews: String,
    #[serde(default = "default_product_stats_table")]
    pub product_stats: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            orders: default_orders_table(),
            reviews: default_reviews_table(),
            product_stats: default_product_stats_table(),
        }
    }
}

fn default_orders_table() -> String {
    "orders_delta".to_string()
}

fn default_reviews_table() -> String {
    "reviews_delta".to_string()
}

fn default_product_stats_table() -> String {
    "product_stats".to_string()
}

/// Sink configuration for table writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

/// Synthetic dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Directory that receives `orders.csv` and `reviews.json`.
    #[serde(default = "default_raw_location")]
    pub output_dir: String,
    #[serde(default = "default_num_products")]
    pub num_products: usize,
    #[serde(default = "default_num_users")]
    pub num_users: usize,
    #[serde(default = "default_num_orders")]
    pub num_orders: usize,
    #[serde(default = "default_num_reviews")]
    pub num_reviews: usize,
    /// Timestamps are drawn from this many whole days before now.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Seed for reproducible output. A fresh seed is drawn when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: default_raw_location(),
            num_products: default_num_products(),
            num_users: default_num_users(),
            num_orders: default_num_orders(),
            num_reviews: default_num_reviews(),
            lookback_days: default_lookback_days(),
            seed: None,
        }
    }
}

fn default_num_products() -> usize {
    50
}

fn default_num_users() -> usize {
    100
}

fn default_num_orders() -> usize {
    1000
}

fn default_num_reviews() -> usize {
    500
}

fn default_lookback_days() -> u32 {
    365
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install a Prometheus recorder and render it when the run finishes.
    #[serde(default)]
    pub enabled: bool,
    /// Optional file that receives the Prometheus text exposition.
    #[serde(default)]
    pub output_path: Option<String>,
}

impl Config {
    /// Load configuration from an optional YAML file, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment variable interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let content = if interpolate_env {
            vars::interpolate(&content).map_err(|errors| {
                EnvInterpolationSnafu {
                    message: errors.join("\n"),
                }
                .build()
            })?
        } else {
            content
        };

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("raw", &self.locations.raw),
            ("silver", &self.locations.silver),
            ("gold", &self.locations.gold),
            ("generator.output_dir", &self.generator.output_dir),
        ] {
            ensure!(!value.trim().is_empty(), EmptyLocationSnafu { name });
        }

        for (name, value) in [
            ("orders", &self.tables.orders),
            ("reviews", &self.tables.reviews),
            ("product_stats", &self.tables.product_stats),
        ] {
            ensure!(!value.trim().is_empty(), EmptyTableNameSnafu { name });
        }

        self.generator.validate()
    }
}

impl GeneratorConfig {
    /// Check population sizes against the id formats they feed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value, max) in [
            ("num_products", self.num_products, MAX_CATALOG_SIZE),
            ("num_users", self.num_users, MAX_CATALOG_SIZE),
            ("num_orders", self.num_orders, MAX_ORDERS),
            ("num_reviews", self.num_reviews, usize::MAX),
        ] {
            ensure!(
                (1..=max).contains(&value),
                InvalidPopulationSnafu { name, value, max }
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_layout() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.context.kind, ContextKind::Local);
        assert_eq!(config.locations.raw, "data");
        assert_eq!(config.locations.silver, "data/silver");
        assert_eq!(config.locations.gold, "data/gold");
        assert_eq!(config.tables.orders, "orders_delta");
        assert_eq!(config.tables.reviews, "reviews_delta");
        assert_eq!(config.tables.product_stats, "product_stats");
        assert_eq!(config.generator.num_products, 50);
        assert_eq!(config.generator.num_users, 100);
        assert_eq!(config.generator.num_orders, 1000);
        assert_eq!(config.generator.num_reviews, 500);
        assert_eq!(config.generator.lookback_days, 365);
        assert!(config.generator.seed.is_none());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
context:
  kind: job

locations:
  raw: "s3://lake-raw"
  silver: "s3://lake-silver"
  gold: "s3://lake-gold"
  storage_options:
    aws_region: eu-west-1

sink:
  compression: zstd

generator:
  num_orders: 10
  seed: 7
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.context.kind, ContextKind::Job);
        assert_eq!(config.locations.gold, "s3://lake-gold");
        assert_eq!(
            config.locations.storage_options.get("aws_region").unwrap(),
            "eu-west-1"
        );
        assert_eq!(config.sink.compression, ParquetCompression::Zstd);
        assert_eq!(config.generator.num_orders, 10);
        assert_eq!(config.generator.num_reviews, 500);
        assert_eq!(config.generator.seed, Some(7));
        assert_eq!(config.tables.orders, "orders_delta");
    }

    #[test]
    fn test_empty_location_rejected() {
        let err = Config::from_yaml("locations:\n  gold: \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLocation { ref name } if name == "gold"));
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let err = Config::from_yaml("tables:\n  reviews: \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyTableName { .. }));
    }

    #[test]
    fn test_population_must_fit_id_format() {
        let err = Config::from_yaml("generator:\n  num_users: 10001\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPopulation { ref name, value: 10001, max: MAX_CATALOG_SIZE }
                if name == "num_users"
        ));

        let err = Config::from_yaml("generator:\n  num_products: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPopulation { .. }));
    }

    #[test]
    fn test_from_file_interpolates_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glacier.yaml");
        std::fs::write(
            &path,
            "locations:\n  gold: ${GLACIER_TEST_CONFIG_GOLD:-/tmp/lake/gold}\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.locations.gold, "/tmp/lake/gold");

        let raw = Config::from_file_with_options(&path, false).unwrap();
        assert_eq!(
            raw.locations.gold,
            "${GLACIER_TEST_CONFIG_GOLD:-/tmp/lake/gold}"
        );
    }

    #[test]
    fn test_missing_env_var_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glacier.yaml");
        std::fs::write(&path, "locations:\n  raw: $GLACIER_TEST_CONFIG_UNSET_RAW\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::EnvInterpolation { .. }));
    }
}
