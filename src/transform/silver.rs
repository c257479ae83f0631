//! Silver tier: cleaned raw rows plus an ingestion timestamp.

use chrono::{DateTime, Utc};
use deltalake::arrow::array::{ArrayRef, BooleanArray, RecordBatch, TimestampMicrosecondArray};
use deltalake::arrow::compute::filter_record_batch;
use deltalake::arrow::datatypes::SchemaRef;
use snafu::prelude::*;
use std::sync::Arc;

use super::{conform, int32_column};
use crate::error::{ArrowSnafu, TransformError};
use crate::schema;

/// Lowest rating a silver review may carry.
pub const MIN_RATING: i32 = 1;

/// Highest rating a silver review may carry.
pub const MAX_RATING: i32 = 5;

/// Cleaned reviews and the number of raw rows that failed the rating bound.
#[derive(Debug, Clone)]
pub struct SilverReviews {
    pub batch: RecordBatch,
    pub dropped: usize,
}

/// Append `ingestion_timestamp` to every raw order. No rows are removed.
pub fn enrich_orders(
    batch: &RecordBatch,
    ingested_at: DateTime<Utc>,
) -> Result<RecordBatch, TransformError> {
    let raw = schema::raw_orders();
    let columns = conform(batch, &raw)?;
    with_ingestion_timestamp(columns, batch.num_rows(), ingested_at, schema::silver_orders())
}

/// Keep reviews with a rating in `1..=5` and append `ingestion_timestamp`.
///
/// Null ratings are dropped along with out-of-range ones.
pub fn clean_reviews(
    batch: &RecordBatch,
    ingested_at: DateTime<Utc>,
) -> Result<SilverReviews, TransformError> {
    let raw = schema::raw_reviews();
    let conformed =
        RecordBatch::try_new(Arc::clone(&raw), conform(batch, &raw)?).context(ArrowSnafu)?;

    let ratings = int32_column(&conformed, schema::RATING)?;
    let keep: BooleanArray = ratings
        .iter()
        .map(|rating| Some(rating.is_some_and(|r| (MIN_RATING..=MAX_RATING).contains(&r))))
        .collect();

    let kept = filter_record_batch(&conformed, &keep).context(ArrowSnafu)?;
    let dropped = conformed.num_rows() - kept.num_rows();

    let rows = kept.num_rows();
    let batch = with_ingestion_timestamp(
        kept.columns().to_vec(),
        rows,
        ingested_at,
        schema::silver_reviews(),
    )?;
    Ok(SilverReviews { batch, dropped })
}

fn with_ingestion_timestamp(
    mut columns: Vec<ArrayRef>,
    rows: usize,
    ingested_at: DateTime<Utc>,
    schema: SchemaRef,
) -> Result<RecordBatch, TransformError> {
    let stamp = TimestampMicrosecondArray::from_value(ingested_at.timestamp_micros(), rows)
        .with_timezone("UTC");
    columns.push(Arc::new(stamp));
    RecordBatch::try_new(schema, columns).context(ArrowSnafu)
}
