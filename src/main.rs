//! glacier: generate synthetic shop data and run the Delta Lake pipeline.
//!
//! `glacier generate` writes `orders.csv` and `reviews.json`;
//! `glacier run` turns them into silver and gold Delta tables.

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use glacier::config::Config;
use glacier::context::{self, table_location};
use glacier::error::{ConfigSnafu, GeneratorSnafu, MetricsSnafu, PipelineError};
use glacier::generator::Generator;
use glacier::metrics::MetricsSnapshot;
use glacier::pipeline::run_pipeline;

/// Synthetic order/review generator and bronze/silver/gold pipeline.
#[derive(Parser, Debug)]
#[command(name = "glacier")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a fresh raw dataset.
    Generate {
        /// Directory that receives orders.csv and reviews.json.
        #[arg(long)]
        output_dir: Option<String>,

        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the bronze to silver to gold pipeline.
    Run {
        /// Dry run - validate configuration and print resolved locations.
        #[arg(long)]
        dry_run: bool,

        /// Job parameters such as --JOB_NAME, --raw_bucket, --silver_bucket.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        job_args: Vec<String>,
    },
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("glacier starting");

    let mut config = Config::load(args.config.as_deref()).context(ConfigSnafu)?;

    // Initialize metrics if enabled
    let snapshot = if config.metrics.enabled {
        debug!("Installing Prometheus recorder");
        Some(glacier::metrics::init().context(MetricsSnafu)?)
    } else {
        None
    };

    match args.command {
        Command::Generate { output_dir, seed } => {
            if let Some(output_dir) = output_dir {
                config.generator.output_dir = output_dir;
            }
            if seed.is_some() {
                config.generator.seed = seed;
            }
            config.validate().context(ConfigSnafu)?;
            generate(&config)?;
        }
        Command::Run { dry_run, job_args } => run(&config, &job_args, dry_run).await?,
    }

    export_metrics(&config, snapshot.as_ref())
}

fn generate(config: &Config) -> Result<(), PipelineError> {
    let summary = Generator::new(config.generator.clone())
        .run()
        .context(GeneratorSnafu)?;

    info!("Dataset generated");
    info!("  Orders: {} ({})", summary.orders, summary.orders_path.display());
    info!("  Reviews: {} ({})", summary.reviews, summary.reviews_path.display());
    info!("  Products: {}", summary.catalog.len());
    info!("  Seed: {}", summary.seed);
    Ok(())
}

async fn run(config: &Config, job_args: &[String], dry_run: bool) -> Result<(), PipelineError> {
    let context = context::from_config(config, job_args).context(ConfigSnafu)?;

    if dry_run {
        let locations = context.locations();
        info!("Dry run mode - validating configuration");
        info!("Job: {}", context.job_name());
        info!("Raw: {}", locations.raw);
        info!(
            "Silver orders: {}",
            table_location(&locations.silver, &config.tables.orders)
        );
        info!(
            "Silver reviews: {}",
            table_location(&locations.silver, &config.tables.reviews)
        );
        info!(
            "Gold product stats: {}",
            table_location(&locations.gold, &config.tables.product_stats)
        );
        info!("Configuration is valid");
        return Ok(());
    }

    let stats = run_pipeline(config, context.as_ref()).await?;

    info!("Pipeline completed successfully");
    info!("  Orders ingested: {}", stats.orders_ingested);
    info!("  Reviews ingested: {}", stats.reviews_ingested);
    if !stats.degraded_inputs.is_empty() {
        let degraded: Vec<_> = stats.degraded_inputs.iter().map(|d| d.as_str()).collect();
        info!("  Degraded inputs: {}", degraded.join(", "));
    }
    info!("  Silver orders: {}", stats.silver_orders);
    info!("  Silver reviews: {}", stats.silver_reviews);
    info!("  Reviews dropped: {}", stats.reviews_dropped);
    info!("  Product stats: {}", stats.gold_rows);
    info!(
        "  Versions: orders {:?}, reviews {:?}, product stats {:?}",
        stats.orders_version, stats.reviews_version, stats.product_stats_version
    );
    info!("  Elapsed: {:.2?}", stats.elapsed);
    Ok(())
}

fn export_metrics(
    config: &Config,
    snapshot: Option<&MetricsSnapshot>,
) -> Result<(), PipelineError> {
    if let Some(snapshot) = snapshot {
        snapshot
            .export(config.metrics.output_path.as_deref())
            .context(MetricsSnafu)?;
    }
    Ok(())
}
