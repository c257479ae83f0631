//! Delta Lake table writes.
//!
//! Every write is a full overwrite: the new data file is uploaded to the
//! table root and a single `WRITE` commit in `Overwrite` mode removes every
//! file of the previous version and adds the new one.

use deltalake::DeltaTable;
use deltalake::arrow::array::RecordBatch;
use deltalake::arrow::compute::concat_batches;
use deltalake::arrow::datatypes::{DataType as ArrowType, Schema, SchemaRef};
use deltalake::kernel::transaction::CommitBuilder;
use deltalake::kernel::{Action, Add, DataType as DeltaType, StructField, StructType};
use deltalake::operations::create::CreateBuilder;
use deltalake::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use deltalake::protocol::{DeltaOperation, SaveMode};
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::HashMap;
use std::time::{Instant, SystemTime};
use tracing::{debug, info};
use url::Url;

use super::parquet;
use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    DataFileDecodeSnafu, DataFileReadSnafu, DataFileSnafu, DeltaError, DeltaLakeSnafu,
    ParquetEncodeSnafu, UnsupportedArrowTypeSnafu, UrlParseSnafu,
};
use crate::metrics::events::{DeltaCommitCompleted, TableWritten};
use crate::storage::StorageProvider;

/// A Delta table that is replaced wholesale on every write.
pub struct DeltaSink {
    name: String,
    storage: StorageProvider,
    table: DeltaTable,
    schema: SchemaRef,
    compression: ParquetCompression,
}

impl std::fmt::Debug for DeltaSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaSink")
            .field("name", &self.name)
            .field("location", &self.storage.canonical_url())
            .field("version", &self.version())
            .finish()
    }
}

impl DeltaSink {
    /// Open the table at the storage location, creating it with `schema` if
    /// it does not exist yet.
    pub async fn open_or_create(
        name: impl Into<String>,
        storage: StorageProvider,
        schema: SchemaRef,
        compression: ParquetCompression,
    ) -> Result<Self, DeltaError> {
        // Register Delta Lake handlers for cloud storage
        deltalake::aws::register_handlers(None);
        deltalake::gcp::register_handlers(None);

        let name = name.into();
        storage
            .ensure_exists()
            .await
            .context(DataFileSnafu { table: &name })?;
        let table = load_or_create_table(&name, &storage, &schema).await?;

        Ok(Self {
            name,
            storage,
            table,
            schema,
            compression,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current table version, `None` before the table has been created.
    pub fn version(&self) -> Option<i64> {
        self.table.version()
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Replace the table content with `batch`.
    ///
    /// Returns the committed version, or `None` when the table was already
    /// empty and `batch` has no rows.
    pub async fn overwrite(&mut self, batch: &RecordBatch) -> Result<Option<i64>, DeltaError> {
        let start = Instant::now();
        let now_ms = unix_millis();

        let mut actions: Vec<Action> = self
            .table
            .snapshot()
            .context(DeltaLakeSnafu)?
            .log_data()
            .iter()
            .map(|file| Action::Remove(file.remove_action(true)))
            .collect();
        let removed = actions.len();

        if batch.num_rows() > 0 {
            let bytes = parquet::encode(batch, self.compression).context(ParquetEncodeSnafu {
                table: &self.name,
            })?;
            let file_name = parquet::data_file_name();
            let size = bytes.len() as i64;

            self.storage
                .put(file_name.as_str(), bytes)
                .await
                .context(DataFileSnafu { table: &self.name })?;
            debug!("Uploaded {} ({} bytes) for table {}", file_name, size, self.name);

            actions.push(add_action(&file_name, size, now_ms));
        }

        if actions.is_empty() {
            debug!("Table {} is already empty, nothing to commit", self.name);
            return Ok(None);
        }

        let version = self.commit(actions).await?;
        info!(
            "Overwrote table {} with {} rows (removed {} files), version {}",
            self.name,
            batch.num_rows(),
            removed,
            version
        );
        emit!(TableWritten {
            table: self.name.clone(),
            rows: batch.num_rows() as u64,
            duration: start.elapsed(),
        });

        Ok(Some(version))
    }

    /// Data files of the current version, relative to the table root.
    ///
    /// Taken from the snapshot, so files in subdirectories (partitioned
    /// layouts written by other engines) are included.
    pub fn active_files(&self) -> Result<Vec<Path>, DeltaError> {
        let mut files: Vec<Path> = self
            .table
            .snapshot()
            .context(DeltaLakeSnafu)?
            .file_paths_iter()
            .collect();
        files.sort();
        Ok(files)
    }

    /// Read every row of the current version.
    pub async fn read_all(&self) -> Result<RecordBatch, DeltaError> {
        let mut batches = Vec::new();
        for path in self.active_files()? {
            let bytes = self
                .storage
                .get(path.clone())
                .await
                .context(DataFileSnafu { table: &self.name })?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
                .and_then(|builder| builder.build())
                .context(DataFileReadSnafu {
                    path: path.to_string(),
                })?;
            for batch in reader {
                batches.push(batch.context(DataFileDecodeSnafu {
                    path: path.to_string(),
                })?);
            }
        }

        concat_batches(&self.schema, &batches).context(DataFileDecodeSnafu {
            path: self.storage.canonical_url(),
        })
    }

    async fn commit(&mut self, actions: Vec<Action>) -> Result<i64, DeltaError> {
        let start = Instant::now();
        let version = CommitBuilder::default()
            .with_actions(actions)
            .build(
                Some(self.table.snapshot().context(DeltaLakeSnafu)?),
                self.table.log_store(),
                DeltaOperation::Write {
                    mode: SaveMode::Overwrite,
                    partition_by: None,
                    predicate: None,
                },
            )
            .await
            .context(DeltaLakeSnafu)?
            .version;

        // Reload table to get new state
        self.table.load().await.context(DeltaLakeSnafu)?;

        emit!(DeltaCommitCompleted {
            table: self.name.clone(),
            duration: start.elapsed(),
        });

        Ok(version)
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn add_action(path: &str, size: i64, modification_time: i64) -> Action {
    Action::Add(Add {
        path: path.to_string(),
        size,
        partition_values: HashMap::new(),
        modification_time,
        data_change: true,
        ..Default::default()
    })
}

/// Convert an Arrow schema to a Delta schema.
fn arrow_schema_to_delta(schema: &Schema) -> Result<StructType, DeltaError> {
    StructType::try_new(schema.fields().iter().map(|field| {
        Ok(StructField::new(
            field.name(),
            arrow_type_to_delta(field.data_type())?,
            field.is_nullable(),
        ))
    }))
}

/// Convert an Arrow data type to a Delta data type.
fn arrow_type_to_delta(arrow_type: &ArrowType) -> Result<DeltaType, DeltaError> {
    let delta_type = match arrow_type {
        ArrowType::Boolean => DeltaType::BOOLEAN,
        ArrowType::Int8 => DeltaType::BYTE,
        ArrowType::Int16 => DeltaType::SHORT,
        ArrowType::Int32 => DeltaType::INTEGER,
        ArrowType::Int64 => DeltaType::LONG,
        ArrowType::Float32 => DeltaType::FLOAT,
        ArrowType::Float64 => DeltaType::DOUBLE,
        ArrowType::Utf8 | ArrowType::LargeUtf8 => DeltaType::STRING,
        ArrowType::Binary | ArrowType::LargeBinary => DeltaType::BINARY,
        ArrowType::Date32 | ArrowType::Date64 => DeltaType::DATE,
        ArrowType::Timestamp(_, Some(_)) => DeltaType::TIMESTAMP,
        ArrowType::Timestamp(_, None) => DeltaType::TIMESTAMP_NTZ,
        other => {
            return UnsupportedArrowTypeSnafu {
                arrow_type: other.clone(),
            }
            .fail();
        }
    };

    Ok(delta_type)
}

async fn load_or_create_table(
    name: &str,
    storage: &StorageProvider,
    schema: &Schema,
) -> Result<DeltaTable, DeltaError> {
    let table_url = storage.config().table_url();
    let parsed_url = Url::parse(&table_url).context(UrlParseSnafu)?;

    match deltalake::open_table_with_storage_options(
        parsed_url,
        storage.storage_options().clone(),
    )
    .await
    {
        Ok(table) => {
            info!(
                "Loaded Delta table {} at version {}",
                name,
                table.version().unwrap_or(-1)
            );
            Ok(table)
        }
        Err(e) => {
            debug!("Could not open {} ({}), creating it", table_url, e);
            info!("Creating Delta table {} at {}", name, table_url);

            let delta_schema = arrow_schema_to_delta(schema)?;
            CreateBuilder::new()
                .with_location(&table_url)
                .with_table_name(name)
                .with_columns(delta_schema.fields().cloned())
                .with_storage_options(storage.storage_options().clone())
                .await
                .context(DeltaLakeSnafu)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use deltalake::arrow::array::{Float64Array, StringArray};
    use std::sync::Arc;

    fn stats(rows: &[(&str, f64, f64)]) -> RecordBatch {
        RecordBatch::try_new(
            schema::product_stats(),
            vec![
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.0).collect::<Vec<_>>(),
                )),
                Arc::new(Float64Array::from(
                    rows.iter().map(|r| r.1).collect::<Vec<_>>(),
                )),
                Arc::new(Float64Array::from(
                    rows.iter().map(|r| r.2).collect::<Vec<_>>(),
                )),
            ],
        )
        .unwrap()
    }

    async fn open(dir: &std::path::Path) -> DeltaSink {
        let storage =
            StorageProvider::for_url_with_options(dir.to_str().unwrap(), HashMap::new())
                .await
                .unwrap();
        DeltaSink::open_or_create(
            "product_stats",
            storage,
            schema::product_stats(),
            ParquetCompression::Snappy,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_silver_schemas_convert() {
        let delta = arrow_schema_to_delta(&schema::silver_reviews()).unwrap();
        let stamp = delta.field(schema::INGESTION_TIMESTAMP).unwrap();
        assert_eq!(stamp.data_type(), &DeltaType::TIMESTAMP);
        assert!(!stamp.is_nullable());
        let rating = delta.field(schema::RATING).unwrap();
        assert_eq!(rating.data_type(), &DeltaType::INTEGER);
    }

    #[test]
    fn test_unsupported_type() {
        let err = arrow_type_to_delta(&ArrowType::Duration(
            deltalake::arrow::datatypes::TimeUnit::Second,
        ))
        .unwrap_err();
        assert!(matches!(err, DeltaError::UnsupportedArrowType { .. }));
    }

    #[tokio::test]
    async fn test_create_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let sink = open(dir.path()).await;
        assert_eq!(sink.version(), Some(0));
        assert!(dir.path().join("_delta_log").exists());
        drop(sink);

        let sink = open(dir.path()).await;
        assert_eq!(sink.version(), Some(0));
        assert_eq!(sink.read_all().await.unwrap().num_rows(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = open(dir.path()).await;

        let v1 = sink
            .overwrite(&stats(&[("P-0001", 3.0, 60.0), ("P-0002", 4.0, 8.0)]))
            .await
            .unwrap();
        let v2 = sink.overwrite(&stats(&[("P-0003", 5.0, 1.5)])).await.unwrap();

        assert_eq!(v1, Some(1));
        assert_eq!(v2, Some(2));
        assert_eq!(sink.active_files().unwrap().len(), 1);
        assert_eq!(sink.read_all().await.unwrap(), stats(&[("P-0003", 5.0, 1.5)]));

        // the state survives a reopen
        let reopened = open(dir.path()).await;
        assert_eq!(reopened.version(), Some(2));
        assert_eq!(reopened.read_all().await.unwrap().num_rows(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_with_empty_batch_clears_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = open(dir.path()).await;

        sink.overwrite(&stats(&[("P-0001", 3.0, 60.0)])).await.unwrap();
        let version = sink.overwrite(&stats(&[])).await.unwrap();

        assert_eq!(version, Some(2));
        assert!(sink.active_files().unwrap().is_empty());
        assert_eq!(sink.read_all().await.unwrap().num_rows(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_removes_files_in_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = open(dir.path()).await;

        // a file laid out the way partitioned writers place them
        let nested = "region=eu/part-00000.parquet";
        let bytes = parquet::encode(&stats(&[("P-0009", 1.0, 9.0)]), ParquetCompression::Snappy)
            .unwrap();
        let size = bytes.len() as i64;
        sink.storage.put(nested, bytes).await.unwrap();
        sink.commit(vec![add_action(nested, size, unix_millis())])
            .await
            .unwrap();
        assert_eq!(sink.active_files().unwrap(), vec![Path::from(nested)]);

        sink.overwrite(&stats(&[("P-0001", 3.0, 60.0)])).await.unwrap();

        let active = sink.active_files().unwrap();
        assert_eq!(active.len(), 1);
        assert!(!active[0].as_ref().starts_with("region=eu"));
        assert_eq!(sink.read_all().await.unwrap(), stats(&[("P-0001", 3.0, 60.0)]));
    }

    #[tokio::test]
    async fn test_empty_overwrite_of_empty_table_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = open(dir.path()).await;

        assert_eq!(sink.overwrite(&stats(&[])).await.unwrap(), None);
        assert_eq!(sink.version(), Some(0));
    }
}
