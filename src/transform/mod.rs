//! Silver and gold transforms over Arrow record batches.
//!
//! - `silver`: per-row cleaning and the ingestion timestamp
//! - `gold`: the product-stats aggregate

pub mod gold;
pub mod silver;

use deltalake::arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int32Array, RecordBatch, StringArray};
use deltalake::arrow::datatypes::{DataType, Float64Type, Int32Type, SchemaRef};
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{ColumnTypeSnafu, MissingColumnSnafu, TransformError};

pub use gold::product_stats;
pub use silver::{SilverReviews, clean_reviews, enrich_orders};

/// Look up a column by name and check its type.
pub(crate) fn column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &DataType,
) -> Result<&'a ArrayRef, TransformError> {
    let column = batch
        .column_by_name(name)
        .context(MissingColumnSnafu { name })?;
    ensure!(
        column.data_type() == expected,
        ColumnTypeSnafu {
            name,
            actual: column.data_type().clone(),
            expected: expected.clone(),
        }
    );
    Ok(column)
}

pub(crate) fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, TransformError> {
    Ok(column(batch, name, &DataType::Utf8)?.as_string::<i32>())
}

pub(crate) fn int32_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Int32Array, TransformError> {
    Ok(column(batch, name, &DataType::Int32)?.as_primitive::<Int32Type>())
}

pub(crate) fn float64_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a Float64Array, TransformError> {
    Ok(column(batch, name, &DataType::Float64)?.as_primitive::<Float64Type>())
}

/// Reorder `batch` to the fields of `schema`, matching by name.
///
/// Extra columns are dropped. Missing or mistyped columns are an error.
pub(crate) fn conform(batch: &RecordBatch, schema: &SchemaRef) -> Result<Vec<ArrayRef>, TransformError> {
    schema
        .fields()
        .iter()
        .map(|field| column(batch, field.name(), field.data_type()).map(Arc::clone))
        .collect()
}
