//! Error types for Glacier using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error"))]
    GcsConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A data location is empty.
    #[snafu(display("Location '{name}' cannot be empty"))]
    EmptyLocation { name: String },

    /// A table name is empty.
    #[snafu(display("Table name '{name}' cannot be empty"))]
    EmptyTableName { name: String },

    /// A generator population size is outside the range its id format allows.
    #[snafu(display("Generator setting '{name}' must be between 1 and {max}, got {value}"))]
    InvalidPopulation {
        name: String,
        value: usize,
        max: usize,
    },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },

    /// Failed to resolve the working directory for a relative location.
    #[snafu(display("Failed to resolve working directory for '{location}'"))]
    CurrentDir {
        location: String,
        source: std::io::Error,
    },
}

// ============ Reader Errors ============

/// Errors that can occur while reading raw input files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// The raw file could not be fetched from storage.
    #[snafu(display("Failed to read {path}"))]
    RawRead { path: String, source: StorageError },

    /// A CSV row could not be decoded.
    #[snafu(display("Failed to decode CSV for {path}"))]
    CsvDecode { path: String, source: csv::Error },

    /// Failed to build JSON decoder.
    #[snafu(display("Failed to build JSON decoder: {message}"))]
    DecoderBuild { message: String },

    /// Failed to decode JSON.
    #[snafu(display("Failed to decode JSON for {path}: {message}"))]
    JsonDecode { path: String, message: String },

    /// Failed to assemble decoded rows into a record batch.
    #[snafu(display("Failed to build record batch for {path}"))]
    BatchBuild {
        path: String,
        source: deltalake::arrow::error::ArrowError,
    },
}

// ============ Delta Errors ============

/// Errors that can occur during Delta Lake operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeltaError {
    /// Arrow type has no Delta equivalent.
    #[snafu(display("Unsupported Arrow type: {arrow_type}"))]
    UnsupportedArrowType {
        arrow_type: deltalake::arrow::datatypes::DataType,
    },

    /// Delta Lake operation failed.
    #[snafu(display("Delta Lake operation failed"))]
    DeltaLake { source: deltalake::DeltaTableError },

    /// Failed to parse URL.
    #[snafu(display("Failed to parse URL"))]
    UrlParse { source: url::ParseError },

    /// Failed to encode a data file.
    #[snafu(display("Failed to encode data file for table {table}"))]
    ParquetEncode { table: String, source: ParquetError },

    /// Failed to upload or list data files.
    #[snafu(display("Data file storage failed for table {table}"))]
    DataFile { table: String, source: StorageError },

    /// Failed to decode a committed data file.
    #[snafu(display("Failed to read data file {path}"))]
    DataFileRead {
        path: String,
        source: deltalake::parquet::errors::ParquetError,
    },

    /// Failed to decode a record batch from a committed data file.
    #[snafu(display("Failed to decode record batch from {path}"))]
    DataFileDecode {
        path: String,
        source: deltalake::arrow::error::ArrowError,
    },
}

// ============ Parquet Errors ============

/// Errors that can occur during Parquet file writing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParquetError {
    /// Parquet write error.
    #[snafu(display("Parquet write error"))]
    Write {
        source: deltalake::parquet::errors::ParquetError,
    },

    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer"))]
    WriterCreate {
        source: deltalake::parquet::errors::ParquetError,
    },
}

// ============ Generator Errors ============

/// Errors that can occur while generating the synthetic dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GeneratorError {
    /// Failed to create the output directory.
    #[snafu(display("Failed to create output directory {path}"))]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Failed to create an output file.
    #[snafu(display("Failed to create {path}"))]
    CreateFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a CSV record.
    #[snafu(display("Failed to write CSV record to {path}"))]
    CsvWrite { path: String, source: csv::Error },

    /// Failed to encode a review as JSON.
    #[snafu(display("Failed to encode review as JSON"))]
    JsonEncode { source: serde_json::Error },

    /// Failed to write or flush an output file.
    #[snafu(display("Failed to write {path}"))]
    FileWrite {
        path: String,
        source: std::io::Error,
    },

    /// Failed to move a finished file into place.
    #[snafu(display("Failed to move {path} into place"))]
    Persist {
        path: String,
        source: std::io::Error,
    },

    /// The generator settings are out of range.
    #[snafu(display("Invalid generator configuration"))]
    InvalidConfig { source: ConfigError },

    /// Orders and reviews need at least one product to reference.
    #[snafu(display("Product catalog is empty"))]
    EmptyCatalog,
}

// ============ Transform Errors ============

/// Errors raised when a dataset does not match the expected shape.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// A product's sales total does not fit the cents accumulator.
    #[snafu(display("Sales total of product '{product}' is out of range"))]
    SumOverflow { product: String },

    /// A required column is absent.
    #[snafu(display("Column '{name}' is missing"))]
    MissingColumn { name: String },

    /// A column has an unexpected Arrow type.
    #[snafu(display("Column '{name}' has type {actual}, expected {expected}"))]
    ColumnType {
        name: String,
        actual: deltalake::arrow::datatypes::DataType,
        expected: deltalake::arrow::datatypes::DataType,
    },

    /// An Arrow kernel failed.
    #[snafu(display("Arrow compute failed"))]
    Arrow {
        source: deltalake::arrow::error::ArrowError,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization and export.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Failed to write the metrics snapshot.
    #[snafu(display("Failed to write metrics to {path}"))]
    MetricsOutput {
        path: String,
        source: std::io::Error,
    },
}

// ============ Pipeline Error (top-level) ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Storage error.
    #[snafu(display("Storage error for {location}"))]
    PipelineStorage {
        location: String,
        source: StorageError,
    },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Writing a silver or gold table failed.
    #[snafu(display("Failed to write table {table}"))]
    TableWrite { table: String, source: DeltaError },

    /// Dataset generation failed.
    #[snafu(display("Generator error"))]
    Generator { source: GeneratorError },

    /// Transform error.
    #[snafu(display("Transform error"))]
    Transform { source: TransformError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },
}
