//! NDJSON reader.
//!
//! Decodes newline-delimited JSON into Arrow RecordBatches against a fixed
//! schema. Keys absent from the schema are ignored and missing keys become
//! nulls.

use deltalake::arrow::array::RecordBatch;
use deltalake::arrow::compute::concat_batches;
use deltalake::arrow::datatypes::SchemaRef;
use deltalake::arrow::json::ReaderBuilder;
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BatchBuildSnafu, DecoderBuildSnafu, JsonDecodeSnafu, ReaderError};

/// Default number of records per decoded batch.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// A reader for NDJSON data that yields a single RecordBatch.
pub struct NdjsonReader {
    schema: SchemaRef,
    batch_size: usize,
}

impl NdjsonReader {
    /// Create a new NDJSON reader with the given schema.
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Parse `data` into one batch with the reader's schema.
    ///
    /// Any malformed line fails the whole input.
    pub fn read(&self, data: &[u8], path: &str) -> Result<RecordBatch, ReaderError> {
        let mut decoder = ReaderBuilder::new(Arc::clone(&self.schema))
            .with_batch_size(self.batch_size)
            .with_strict_mode(false)
            .build_decoder()
            .map_err(|e| {
                DecoderBuildSnafu {
                    message: e.to_string(),
                }
                .build()
            })?;

        let decode_error = |e: deltalake::arrow::error::ArrowError| {
            JsonDecodeSnafu {
                path: path.to_string(),
                message: e.to_string(),
            }
            .build()
        };

        // decode() stops after batch_size records, so flush after each call
        let mut offset = 0;
        let mut batches = Vec::new();
        loop {
            let consumed = decoder.decode(&data[offset..]).map_err(decode_error)?;
            if let Some(batch) = decoder.flush().map_err(decode_error)? {
                batches.push(batch);
            }
            if consumed == 0 {
                break;
            }
            offset += consumed;
        }

        let batch = concat_batches(&self.schema, &batches).context(BatchBuildSnafu { path })?;
        debug!(
            "Parsed {} records in {} batches from {}",
            batch.num_rows(),
            batches.len(),
            path
        );
        Ok(batch)
    }
}
