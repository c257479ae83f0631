//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in a run. Events
//! implement the `InternalEvent` trait which records the corresponding
//! metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// The two raw datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Orders,
    Reviews,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Orders => "orders",
            Dataset::Reviews => "reviews",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted when synthetic records are written.
pub struct RecordsGenerated {
    pub dataset: Dataset,
    pub count: u64,
}

impl InternalEvent for RecordsGenerated {
    fn emit(self) {
        trace!(dataset = self.dataset.as_str(), count = self.count, "Records generated");
        counter!("glacier_records_generated_total", "dataset" => self.dataset.as_str())
            .increment(self.count);
    }
}

/// Event emitted when a raw input has been read.
pub struct RecordsIngested {
    pub dataset: Dataset,
    pub count: u64,
}

impl InternalEvent for RecordsIngested {
    fn emit(self) {
        trace!(dataset = self.dataset.as_str(), count = self.count, "Records ingested");
        counter!("glacier_records_ingested_total", "dataset" => self.dataset.as_str())
            .increment(self.count);
    }
}

/// Event emitted when a raw input could not be read and was replaced by an
/// empty dataset.
pub struct InputDegraded {
    pub dataset: Dataset,
}

impl InternalEvent for InputDegraded {
    fn emit(self) {
        trace!(dataset = self.dataset.as_str(), "Input degraded");
        counter!("glacier_inputs_degraded_total", "dataset" => self.dataset.as_str())
            .increment(1);
    }
}

/// Event emitted when reviews fail the rating bound.
pub struct ReviewsDropped {
    pub count: u64,
}

impl InternalEvent for ReviewsDropped {
    fn emit(self) {
        trace!(count = self.count, "Reviews dropped");
        counter!("glacier_reviews_dropped_total").increment(self.count);
    }
}

/// Event emitted when a table has been fully overwritten.
pub struct TableWritten {
    pub table: String,
    pub rows: u64,
    pub duration: Duration,
}

impl InternalEvent for TableWritten {
    fn emit(self) {
        trace!(
            table = %self.table,
            rows = self.rows,
            duration_ms = self.duration.as_millis(),
            "Table written"
        );
        counter!("glacier_table_rows_written_total", "table" => self.table.clone())
            .increment(self.rows);
        histogram!("glacier_table_write_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a data file has been encoded.
pub struct ParquetWriteCompleted {
    pub bytes: u64,
    pub duration: Duration,
}

impl InternalEvent for ParquetWriteCompleted {
    fn emit(self) {
        trace!(
            bytes = self.bytes,
            duration_ms = self.duration.as_millis(),
            "Parquet write completed"
        );
        counter!("glacier_bytes_written_total").increment(self.bytes);
        histogram!("glacier_parquet_write_duration_seconds").record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a Delta commit completes.
pub struct DeltaCommitCompleted {
    pub table: String,
    pub duration: Duration,
}

impl InternalEvent for DeltaCommitCompleted {
    fn emit(self) {
        trace!(
            table = %self.table,
            duration_ms = self.duration.as_millis(),
            "Delta commit completed"
        );
        histogram!("glacier_delta_commit_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Storage operation kinds.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    List,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
        }
    }
}

/// Outcome of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted for every storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "glacier_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted with the latency of a storage request.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        histogram!(
            "glacier_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
