//! glacier: synthetic shop data and a bronze/silver/gold Delta Lake pipeline.
//!
//! The generator writes raw orders (CSV) and reviews (NDJSON). The pipeline
//! cleans them into silver Delta tables and aggregates per-product stats
//! into a gold Delta table, overwriting every table on each run.
//!
//! # Example
//!
//! ```ignore
//! use glacier::{Config, context, run_pipeline, error::PipelineError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let config = Config::from_file("glacier.yaml")?;
//!     let context = context::from_config(&config, &[])?;
//!     let stats = run_pipeline(&config, context.as_ref()).await?;
//!     println!("Wrote {} product stats", stats.gold_rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use context::{DataLocations, ExecutionContext, JobContext, LocalContext};
pub use generator::{GenerationSummary, Generator};
pub use pipeline::{PipelineStats, run_pipeline};
pub use storage::StorageProvider;
