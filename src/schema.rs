//! Arrow schemas for every tier.
//!
//! Raw schemas are declared up front rather than inferred, so a missing or
//! unreadable input can be replaced by an empty batch with the same shape.

use deltalake::arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::{Arc, LazyLock};

pub const ORDER_ID: &str = "order_id";
pub const USER_ID: &str = "user_id";
pub const PRODUCT_ID: &str = "product_id";
pub const QUANTITY: &str = "quantity";
pub const ORDER_DATE: &str = "order_date";
pub const TOTAL_AMOUNT: &str = "total_amount";

pub const REVIEW_ID: &str = "review_id";
pub const RATING: &str = "rating";
pub const REVIEW_TEXT: &str = "review_text";
pub const TIMESTAMP: &str = "timestamp";

pub const INGESTION_TIMESTAMP: &str = "ingestion_timestamp";

pub const AVERAGE_RATING: &str = "average_rating";
pub const TOTAL_SALES: &str = "total_sales";

static RAW_ORDERS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(ORDER_ID, DataType::Utf8, true),
        Field::new(USER_ID, DataType::Utf8, true),
        Field::new(PRODUCT_ID, DataType::Utf8, true),
        Field::new(QUANTITY, DataType::Int32, true),
        Field::new(ORDER_DATE, DataType::Utf8, true),
        Field::new(TOTAL_AMOUNT, DataType::Float64, true),
    ]))
});

static RAW_REVIEWS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(REVIEW_ID, DataType::Utf8, true),
        Field::new(PRODUCT_ID, DataType::Utf8, true),
        Field::new(USER_ID, DataType::Utf8, true),
        Field::new(RATING, DataType::Int32, true),
        Field::new(REVIEW_TEXT, DataType::Utf8, true),
        Field::new(TIMESTAMP, DataType::Utf8, true),
    ]))
});

static SILVER_ORDERS: LazyLock<SchemaRef> = LazyLock::new(|| with_ingestion_timestamp(&RAW_ORDERS));

static SILVER_REVIEWS: LazyLock<SchemaRef> =
    LazyLock::new(|| with_ingestion_timestamp(&RAW_REVIEWS));

static PRODUCT_STATS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(PRODUCT_ID, DataType::Utf8, false),
        Field::new(AVERAGE_RATING, DataType::Float64, true),
        Field::new(TOTAL_SALES, DataType::Float64, true),
    ]))
});

/// Type of the `ingestion_timestamp` column.
pub fn ingestion_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

fn with_ingestion_timestamp(raw: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = raw.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(
        INGESTION_TIMESTAMP,
        ingestion_timestamp_type(),
        false,
    ));
    Arc::new(Schema::new(fields))
}

/// Schema of `orders.csv`.
pub fn raw_orders() -> SchemaRef {
    Arc::clone(&RAW_ORDERS)
}

/// Schema of `reviews.json`.
pub fn raw_reviews() -> SchemaRef {
    Arc::clone(&RAW_REVIEWS)
}

/// Schema of the silver orders table.
pub fn silver_orders() -> SchemaRef {
    Arc::clone(&SILVER_ORDERS)
}

/// Schema of the silver reviews table.
pub fn silver_reviews() -> SchemaRef {
    Arc::clone(&SILVER_REVIEWS)
}

/// Schema of the gold product stats table.
pub fn product_stats() -> SchemaRef {
    Arc::clone(&PRODUCT_STATS)
}
