//! Execution contexts.
//!
//! A context decides where the raw, silver and gold roots live and how
//! storage for them is opened. The kind is chosen explicitly through
//! `context.kind` in the configuration.

use async_trait::async_trait;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{Config, ContextKind};
use crate::error::{ConfigError, CurrentDirSnafu, StorageError};
use crate::storage::StorageProvider;

/// Job name used by a local run.
pub const LOCAL_JOB_NAME: &str = "local_delta_demo";

/// Job name used when a job run is missing its parameters.
pub const FALLBACK_JOB_NAME: &str = "local_test_with_glue_lib";

const JOB_NAME_ARG: &str = "JOB_NAME";
const RAW_BUCKET_ARG: &str = "raw_bucket";
const SILVER_BUCKET_ARG: &str = "silver_bucket";
const GOLD_BUCKET_ARG: &str = "gold_bucket";

/// Fully resolved roots of each tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocations {
    pub raw: String,
    pub silver: String,
    pub gold: String,
}

/// Location of a table under a tier root.
pub fn table_location(root: &str, table: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), table)
}

/// Where a pipeline run reads from and writes to.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    fn job_name(&self) -> &str;

    fn locations(&self) -> &DataLocations;

    /// Options passed to every object store and Delta table.
    fn storage_options(&self) -> &HashMap<String, String>;

    /// Open storage rooted at `location`.
    async fn open(&self, location: &str) -> Result<StorageProvider, StorageError> {
        StorageProvider::for_url_with_options(location, self.storage_options().clone()).await
    }

    /// Mark a successful run as finished.
    fn commit(&self);
}

/// Build the context selected by the configuration.
///
/// `job_args` are the raw process arguments a job run resolves its
/// parameters from; a local run ignores them.
pub fn from_config(
    config: &Config,
    job_args: &[String],
) -> Result<Box<dyn ExecutionContext>, ConfigError> {
    match config.context.kind {
        ContextKind::Local => Ok(Box::new(LocalContext::new(config)?)),
        ContextKind::Job => Ok(Box::new(JobContext::resolve(config, job_args)?)),
    }
}

/// Local run with locations from configuration.
#[derive(Debug, Clone)]
pub struct LocalContext {
    locations: DataLocations,
    storage_options: HashMap<String, String>,
}

impl LocalContext {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            locations: local_locations(config)?,
            storage_options: config.locations.storage_options.clone(),
        })
    }
}

#[async_trait]
impl ExecutionContext for LocalContext {
    fn job_name(&self) -> &str {
        LOCAL_JOB_NAME
    }

    fn locations(&self) -> &DataLocations {
        &self.locations
    }

    fn storage_options(&self) -> &HashMap<String, String> {
        &self.storage_options
    }

    fn commit(&self) {
        info!("Local run {} complete", LOCAL_JOB_NAME);
    }
}

/// Managed job run with locations taken from job parameters.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_name: String,
    locations: DataLocations,
    storage_options: HashMap<String, String>,
    fallback: bool,
}

impl JobContext {
    /// Resolve job parameters from `args`.
    ///
    /// When `--JOB_NAME`, `--raw_bucket` or `--silver_bucket` is missing the
    /// context falls back to the configured local locations. The gold root
    /// comes from `--gold_bucket` when given, otherwise from configuration.
    pub fn resolve(config: &Config, args: &[String]) -> Result<Self, ConfigError> {
        let params = parse_job_args(args);
        let storage_options = config.locations.storage_options.clone();

        let required = (
            params.get(JOB_NAME_ARG),
            params.get(RAW_BUCKET_ARG),
            params.get(SILVER_BUCKET_ARG),
        );
        let (Some(job_name), Some(raw), Some(silver)) = required else {
            let missing: Vec<_> = [JOB_NAME_ARG, RAW_BUCKET_ARG, SILVER_BUCKET_ARG]
                .into_iter()
                .filter(|name| !params.contains_key(*name))
                .map(|name| format!("--{name}"))
                .collect();
            warn!(
                "Missing job parameters {}, falling back to local locations",
                missing.join(", ")
            );
            return Ok(Self {
                job_name: FALLBACK_JOB_NAME.to_string(),
                locations: local_locations(config)?,
                storage_options,
                fallback: true,
            });
        };

        let gold = match params.get(GOLD_BUCKET_ARG) {
            Some(bucket) => bucket_url(bucket),
            None => resolve_location(&config.locations.gold)?,
        };

        Ok(Self {
            job_name: job_name.clone(),
            locations: DataLocations {
                raw: bucket_url(raw),
                silver: bucket_url(silver),
                gold,
            },
            storage_options,
            fallback: false,
        })
    }

    /// Whether the job parameters were missing.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

#[async_trait]
impl ExecutionContext for JobContext {
    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn locations(&self) -> &DataLocations {
        &self.locations
    }

    fn storage_options(&self) -> &HashMap<String, String> {
        &self.storage_options
    }

    fn commit(&self) {
        if self.fallback {
            info!("Job {} complete (local fallback)", self.job_name);
        } else {
            info!("Committed job {}", self.job_name);
        }
    }
}

/// Parse `--name value` and `--name=value` pairs.
///
/// A flag followed by another flag, or by nothing, is ignored.
pub fn parse_job_args(args: &[String]) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(flag) = arg.strip_prefix("--") else {
            continue;
        };
        if let Some((name, value)) = flag.split_once('=') {
            params.insert(name.to_string(), value.to_string());
        } else if let Some(value) = iter.next_if(|next| !next.starts_with("--")) {
            params.insert(flag.to_string(), value.clone());
        }
    }

    params
}

/// Qualify a bare bucket name as an S3 URL.
fn bucket_url(bucket: &str) -> String {
    if bucket.contains("://") {
        bucket.trim_end_matches('/').to_string()
    } else {
        format!("s3://{}", bucket.trim_matches('/'))
    }
}

fn local_locations(config: &Config) -> Result<DataLocations, ConfigError> {
    Ok(DataLocations {
        raw: resolve_location(&config.locations.raw)?,
        silver: resolve_location(&config.locations.silver)?,
        gold: resolve_location(&config.locations.gold)?,
    })
}

/// Resolve a relative path against the working directory. URLs and absolute
/// paths are kept as they are.
pub fn resolve_location(location: &str) -> Result<String, ConfigError> {
    if location.contains("://") || location.starts_with("file:") || location.starts_with('/') {
        return Ok(location.to_string());
    }

    let cwd = std::env::current_dir().context(CurrentDirSnafu { location })?;
    Ok(join_relative(&cwd, location))
}

fn join_relative(base: &Path, location: &str) -> String {
    let location = location.trim_start_matches("./");
    base.join(location)
        .display()
        .to_string()
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationsConfig;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn absolute_config() -> Config {
        Config {
            locations: LocationsConfig {
                raw: "/lake/raw".to_string(),
                silver: "/lake/silver".to_string(),
                gold: "/lake/gold".to_string(),
                ..LocationsConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_job_args_forms() {
        let params = parse_job_args(&args(&[
            "glacier",
            "--JOB_NAME",
            "nightly",
            "--raw_bucket=lake-raw",
            "--flag",
            "--silver_bucket",
            "lake-silver",
        ]));

        assert_eq!(params.get("JOB_NAME").map(String::as_str), Some("nightly"));
        assert_eq!(params.get("raw_bucket").map(String::as_str), Some("lake-raw"));
        assert_eq!(params.get("silver_bucket").map(String::as_str), Some("lake-silver"));
        assert!(!params.contains_key("flag"));
    }

    #[test]
    fn test_job_context_from_buckets() {
        let ctx = JobContext::resolve(
            &absolute_config(),
            &args(&[
                "--JOB_NAME",
                "nightly",
                "--raw_bucket",
                "lake-raw",
                "--silver_bucket",
                "s3://lake-silver/tier/",
                "--gold_bucket",
                "lake-gold",
            ]),
        )
        .unwrap();

        assert!(!ctx.is_fallback());
        assert_eq!(ctx.job_name(), "nightly");
        assert_eq!(
            ctx.locations(),
            &DataLocations {
                raw: "s3://lake-raw".to_string(),
                silver: "s3://lake-silver/tier".to_string(),
                gold: "s3://lake-gold".to_string(),
            }
        );
    }

    #[test]
    fn test_job_context_gold_defaults_to_config() {
        let ctx = JobContext::resolve(
            &absolute_config(),
            &args(&["--JOB_NAME=n", "--raw_bucket=r", "--silver_bucket=s"]),
        )
        .unwrap();
        assert_eq!(ctx.locations().gold, "/lake/gold");
    }

    #[test]
    fn test_job_context_falls_back_when_parameters_missing() {
        let ctx = JobContext::resolve(&absolute_config(), &args(&["--raw_bucket", "lake-raw"]))
            .unwrap();

        assert!(ctx.is_fallback());
        assert_eq!(ctx.job_name(), FALLBACK_JOB_NAME);
        assert_eq!(ctx.locations().raw, "/lake/raw");
        assert_eq!(ctx.locations().silver, "/lake/silver");
    }

    #[test]
    fn test_local_context() {
        let ctx = LocalContext::new(&absolute_config()).unwrap();
        assert_eq!(ctx.job_name(), LOCAL_JOB_NAME);
        assert_eq!(ctx.locations().gold, "/lake/gold");
    }

    #[test]
    fn test_from_config_selects_kind() {
        let mut config = absolute_config();
        let ctx = from_config(&config, &args(&["--JOB_NAME", "x"])).unwrap();
        assert_eq!(ctx.job_name(), LOCAL_JOB_NAME);

        config.context.kind = ContextKind::Job;
        let ctx = from_config(&config, &[]).unwrap();
        assert_eq!(ctx.job_name(), FALLBACK_JOB_NAME);
    }

    #[test]
    fn test_relative_locations_resolve_against_base() {
        let base = Path::new("/work");
        assert_eq!(join_relative(base, "data/silver"), "/work/data/silver");
        assert_eq!(join_relative(base, "./data/"), "/work/data");
        assert_eq!(resolve_location("gs://lake/gold").unwrap(), "gs://lake/gold");
        assert_eq!(resolve_location("/abs/raw").unwrap(), "/abs/raw");
        assert!(resolve_location("data").unwrap().starts_with('/'));
    }

    #[test]
    fn test_table_location() {
        assert_eq!(table_location("s3://lake/", "orders_delta"), "s3://lake/orders_delta");
        assert_eq!(table_location("/lake/gold", "product_stats"), "/lake/gold/product_stats");
    }

    #[tokio::test]
    async fn test_open_local_location() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = LocalContext::new(&absolute_config()).unwrap();
        let storage = ctx.open(dir.path().to_str().unwrap()).await.unwrap();
        assert!(storage.canonical_url().starts_with("file://"));
    }
}
