//! Table sinks.
//!
//! Provides Parquet encoding and Delta Lake overwrite commits.

pub mod delta;
pub mod parquet;

pub use delta::DeltaSink;
