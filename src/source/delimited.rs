//! CSV reader for the raw order ledger.
//!
//! Columns are matched by header name. Numeric cells that do not parse
//! become nulls instead of failing the file; a structurally broken file
//! still fails as a whole.

use deltalake::arrow::array::{ArrayRef, Float64Array, Int32Array, RecordBatch, StringArray};
use serde::Deserialize;
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BatchBuildSnafu, CsvDecodeSnafu, ReaderError};
use crate::schema;

#[derive(Debug, Deserialize)]
struct OrderRow {
    order_id: Option<String>,
    user_id: Option<String>,
    product_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    quantity: Option<i32>,
    order_date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_amount: Option<f64>,
}

/// Parse `orders.csv` content into a batch with the raw orders schema.
pub fn read_orders(data: &[u8], path: &str) -> Result<RecordBatch, ReaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let rows = reader
        .deserialize::<OrderRow>()
        .collect::<Result<Vec<_>, _>>()
        .context(CsvDecodeSnafu { path })?;

    let mut order_ids = Vec::with_capacity(rows.len());
    let mut user_ids = Vec::with_capacity(rows.len());
    let mut product_ids = Vec::with_capacity(rows.len());
    let mut quantities = Vec::with_capacity(rows.len());
    let mut order_dates = Vec::with_capacity(rows.len());
    let mut amounts = Vec::with_capacity(rows.len());

    for row in rows {
        order_ids.push(row.order_id);
        user_ids.push(row.user_id);
        product_ids.push(row.product_id);
        quantities.push(row.quantity);
        order_dates.push(row.order_date);
        amounts.push(row.total_amount);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(order_ids)),
        Arc::new(StringArray::from(user_ids)),
        Arc::new(StringArray::from(product_ids)),
        Arc::new(Int32Array::from(quantities)),
        Arc::new(StringArray::from(order_dates)),
        Arc::new(Float64Array::from(amounts)),
    ];

    let batch =
        RecordBatch::try_new(schema::raw_orders(), columns).context(BatchBuildSnafu { path })?;
    debug!("Parsed {} records from {}", batch.num_rows(), path);
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltalake::arrow::array::Array;

    const HEADER: &str = "order_id,user_id,product_id,quantity,order_date,total_amount\n";

    fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> &'a T {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<T>()
            .unwrap()
    }

    #[test]
    fn test_reads_generated_layout() {
        let data = format!(
            "{HEADER}O-000000,U-0001,P-0001,3,2026-01-02T03:04:05.000006,149.70\n\
             O-000001,U-0002,P-0002,1,2026-01-03T03:04:05.000006,10.00\n"
        );
        let batch = read_orders(data.as_bytes(), "orders.csv").unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), schema::raw_orders());
        assert_eq!(column::<StringArray>(&batch, schema::ORDER_ID).value(1), "O-000001");
        assert_eq!(column::<Int32Array>(&batch, schema::QUANTITY).values().to_vec(), vec![3, 1]);
        assert_eq!(
            column::<Float64Array>(&batch, schema::TOTAL_AMOUNT).values().to_vec(),
            vec![149.70, 10.00]
        );
    }

    #[test]
    fn test_columns_matched_by_header() {
        let data = "total_amount,order_id,product_id\n12.50,O-000007,P-0003\n";
        let batch = read_orders(data.as_bytes(), "orders.csv").unwrap();

        assert_eq!(batch.num_rows(), 1);
        assert_eq!(column::<StringArray>(&batch, schema::ORDER_ID).value(0), "O-000007");
        assert_eq!(column::<Float64Array>(&batch, schema::TOTAL_AMOUNT).value(0), 12.5);
        assert!(column::<StringArray>(&batch, schema::USER_ID).is_null(0));
        assert!(column::<Int32Array>(&batch, schema::QUANTITY).is_null(0));
    }

    #[test]
    fn test_unparseable_numbers_become_null() {
        let data = format!("{HEADER}O-000000,U-0001,P-0001,lots,2026-01-02T00:00:00.000000,\n");
        let batch = read_orders(data.as_bytes(), "orders.csv").unwrap();

        assert!(column::<Int32Array>(&batch, schema::QUANTITY).is_null(0));
        assert!(column::<Float64Array>(&batch, schema::TOTAL_AMOUNT).is_null(0));
    }

    #[test]
    fn test_header_only_yields_empty_batch() {
        let batch = read_orders(HEADER.as_bytes(), "orders.csv").unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 6);
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let mut data = HEADER.as_bytes().to_vec();
        data.extend_from_slice(b"O-1,U-1,P-\xff\xfe,1,x,1.0\n");
        let err = read_orders(&data, "orders.csv").unwrap_err();
        assert!(matches!(err, ReaderError::CsvDecode { .. }));
    }
}
