//! Raw (bronze) input readers.
//!
//! Each input is read independently. A missing or unreadable input is
//! replaced by an empty batch with the declared schema so the run can
//! continue with the other one.

pub mod delimited;
pub mod reader;

use deltalake::arrow::array::RecordBatch;
use deltalake::arrow::datatypes::SchemaRef;
use snafu::prelude::*;
use tracing::{info, warn};

use crate::config::{ORDERS_FILE, REVIEWS_FILE};
use crate::emit;
use crate::error::{RawReadSnafu, ReaderError};
use crate::metrics::events::{Dataset, InputDegraded, RecordsIngested};
use crate::schema;
use crate::storage::StorageProvider;

pub use delimited::read_orders;
pub use reader::NdjsonReader;

/// Outcome of reading one raw input.
#[derive(Debug)]
pub struct Ingested {
    pub dataset: Dataset,
    pub batch: RecordBatch,
    /// Why the input was replaced by an empty batch, if it was.
    pub degraded: Option<ReaderError>,
}

impl Ingested {
    fn resolve(dataset: Dataset, schema: SchemaRef, result: Result<RecordBatch, ReaderError>) -> Self {
        match result {
            Ok(batch) => {
                info!("Read {} {} records", batch.num_rows(), dataset);
                emit!(RecordsIngested {
                    dataset,
                    count: batch.num_rows() as u64,
                });
                Self {
                    dataset,
                    batch,
                    degraded: None,
                }
            }
            Err(e) => {
                warn!(
                    "Could not read {} input, continuing with an empty dataset: {}",
                    dataset,
                    snafu::Report::from_error(&e)
                );
                emit!(InputDegraded { dataset });
                Self {
                    dataset,
                    batch: RecordBatch::new_empty(schema),
                    degraded: Some(e),
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Read `orders.csv` from the raw root.
pub async fn ingest_orders(raw: &StorageProvider) -> Ingested {
    let result = match fetch(raw, ORDERS_FILE).await {
        Ok(bytes) => read_orders(&bytes, ORDERS_FILE),
        Err(e) => Err(e),
    };
    Ingested::resolve(Dataset::Orders, schema::raw_orders(), result)
}

/// Read `reviews.json` from the raw root.
pub async fn ingest_reviews(raw: &StorageProvider) -> Ingested {
    let result = match fetch(raw, REVIEWS_FILE).await {
        Ok(bytes) => NdjsonReader::new(schema::raw_reviews()).read(&bytes, REVIEWS_FILE),
        Err(e) => Err(e),
    };
    Ingested::resolve(Dataset::Reviews, schema::raw_reviews(), result)
}

async fn fetch(raw: &StorageProvider, file: &str) -> Result<bytes::Bytes, ReaderError> {
    raw.get(file).await.context(RawReadSnafu {
        path: format!("{}/{}", raw.canonical_url(), file),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    async fn raw_root(dir: &std::path::Path) -> StorageProvider {
        StorageProvider::for_url_with_options(dir.to_str().unwrap(), HashMap::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_orders_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_root(dir.path()).await;

        let orders = ingest_orders(&raw).await;

        assert!(orders.is_degraded());
        assert_eq!(orders.num_rows(), 0);
        assert_eq!(orders.batch.schema(), schema::raw_orders());
        match orders.degraded.unwrap() {
            ReaderError::RawRead { source, .. } => assert!(source.is_not_found()),
            other => panic!("Expected RawRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inputs_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_root(dir.path()).await;
        raw.put(
            REVIEWS_FILE,
            Bytes::from_static(
                br#"{"review_id":"r1","product_id":"P-0001","user_id":"U-0001","rating":4,"review_text":"ok","timestamp":"2026-01-01T00:00:00.000000"}
"#,
            ),
        )
        .await
        .unwrap();

        let orders = ingest_orders(&raw).await;
        let reviews = ingest_reviews(&raw).await;

        assert!(orders.is_degraded());
        assert!(!reviews.is_degraded());
        assert_eq!(reviews.num_rows(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_reviews_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_root(dir.path()).await;
        raw.put(REVIEWS_FILE, Bytes::from_static(b"{\"rating\": [oops\n"))
            .await
            .unwrap();

        let reviews = ingest_reviews(&raw).await;

        assert!(reviews.is_degraded());
        assert_eq!(reviews.batch.schema(), schema::raw_reviews());
        assert_eq!(reviews.num_rows(), 0);
    }

    #[tokio::test]
    async fn test_reads_orders() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_root(dir.path()).await;
        raw.put(
            ORDERS_FILE,
            Bytes::from_static(
                b"order_id,user_id,product_id,quantity,order_date,total_amount\n\
                  O-000000,U-0001,P-0001,2,2026-01-01T00:00:00.000000,20.00\n",
            ),
        )
        .await
        .unwrap();

        let orders = ingest_orders(&raw).await;
        assert!(!orders.is_degraded());
        assert_eq!(orders.num_rows(), 1);
    }
}
