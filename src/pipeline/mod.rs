//! Bronze to silver to gold pipeline.
//!
//! A run reads both raw inputs, writes the two silver tables and then the
//! gold product stats table. Each table is fully overwritten. An unreadable
//! input degrades to an empty dataset; any table write failure aborts the
//! run.

use chrono::Utc;
use deltalake::arrow::array::RecordBatch;
use deltalake::arrow::datatypes::SchemaRef;
use snafu::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::context::{ExecutionContext, table_location};
use crate::emit;
use crate::error::{PipelineError, PipelineStorageSnafu, TableWriteSnafu, TransformSnafu};
use crate::metrics::events::{Dataset, ReviewsDropped};
use crate::schema;
use crate::sink::DeltaSink;
use crate::source::{ingest_orders, ingest_reviews};
use crate::transform::{clean_reviews, enrich_orders, product_stats};

/// Statistics about the pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub orders_ingested: usize,
    pub reviews_ingested: usize,
    /// Inputs that were replaced by an empty dataset.
    pub degraded_inputs: Vec<Dataset>,
    pub silver_orders: usize,
    pub silver_reviews: usize,
    pub reviews_dropped: usize,
    pub gold_rows: usize,
    /// Versions committed per table, `None` when a table was left as is.
    pub orders_version: Option<i64>,
    pub reviews_version: Option<i64>,
    pub product_stats_version: Option<i64>,
    pub elapsed: Duration,
}

/// Run the pipeline once against the locations of `context`.
pub async fn run_pipeline(
    config: &Config,
    context: &dyn ExecutionContext,
) -> Result<PipelineStats, PipelineError> {
    let start = Instant::now();
    let locations = context.locations();
    info!(
        "Starting job {} (raw: {}, silver: {}, gold: {})",
        context.job_name(),
        locations.raw,
        locations.silver,
        locations.gold
    );

    let raw = context
        .open(&locations.raw)
        .await
        .context(PipelineStorageSnafu {
            location: &locations.raw,
        })?;

    let (orders, reviews) = tokio::join!(ingest_orders(&raw), ingest_reviews(&raw));

    let mut stats = PipelineStats {
        orders_ingested: orders.num_rows(),
        reviews_ingested: reviews.num_rows(),
        degraded_inputs: [&orders, &reviews]
            .into_iter()
            .filter(|input| input.is_degraded())
            .map(|input| input.dataset)
            .collect(),
        ..PipelineStats::default()
    };

    let ingested_at = Utc::now();
    let silver_orders = enrich_orders(&orders.batch, ingested_at).context(TransformSnafu)?;
    let silver_reviews = clean_reviews(&reviews.batch, ingested_at).context(TransformSnafu)?;

    if silver_reviews.dropped > 0 {
        info!(
            "Dropped {} reviews with a rating outside 1..=5",
            silver_reviews.dropped
        );
        emit!(ReviewsDropped {
            count: silver_reviews.dropped as u64,
        });
    }

    stats.silver_orders = silver_orders.num_rows();
    stats.silver_reviews = silver_reviews.batch.num_rows();
    stats.reviews_dropped = silver_reviews.dropped;

    stats.orders_version = write_table(
        config,
        context,
        &locations.silver,
        &config.tables.orders,
        schema::silver_orders(),
        &silver_orders,
    )
    .await?;

    stats.reviews_version = write_table(
        config,
        context,
        &locations.silver,
        &config.tables.reviews,
        schema::silver_reviews(),
        &silver_reviews.batch,
    )
    .await?;

    let gold = product_stats(&silver_orders, &silver_reviews.batch).context(TransformSnafu)?;
    stats.gold_rows = gold.num_rows();

    stats.product_stats_version = write_table(
        config,
        context,
        &locations.gold,
        &config.tables.product_stats,
        schema::product_stats(),
        &gold,
    )
    .await?;

    context.commit();
    stats.elapsed = start.elapsed();
    Ok(stats)
}

async fn write_table(
    config: &Config,
    context: &dyn ExecutionContext,
    root: &str,
    table: &str,
    schema: SchemaRef,
    batch: &RecordBatch,
) -> Result<Option<i64>, PipelineError> {
    let location = table_location(root, table);
    debug!("Writing {} rows to {}", batch.num_rows(), location);

    let storage = context
        .open(&location)
        .await
        .context(PipelineStorageSnafu {
            location: &location,
        })?;

    let mut sink = DeltaSink::open_or_create(table, storage, schema, config.sink.compression)
        .await
        .context(TableWriteSnafu { table })?;

    sink.overwrite(batch)
        .await
        .context(TableWriteSnafu { table })
}
