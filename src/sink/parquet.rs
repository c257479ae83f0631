//! Parquet encoding for table data files.

use bytes::Bytes;
use deltalake::arrow::array::RecordBatch;
use deltalake::parquet::arrow::ArrowWriter;
use deltalake::parquet::basic::{Compression, GzipLevel, ZstdLevel};
use deltalake::parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use std::time::Instant;
use uuid::Uuid;

use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{ParquetError, WriteSnafu, WriterCreateSnafu};
use crate::metrics::events::ParquetWriteCompleted;

/// Name for a new data file at the table root.
pub fn data_file_name() -> String {
    format!("part-{}.parquet", Uuid::now_v7())
}

/// Writer properties for the configured codec.
pub fn writer_properties(compression: ParquetCompression) -> WriterProperties {
    let codec = match compression {
        ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        ParquetCompression::Snappy => Compression::SNAPPY,
        ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        ParquetCompression::Lz4 => Compression::LZ4,
    };
    WriterProperties::builder().set_compression(codec).build()
}

/// Encode `batch` as one in-memory Parquet file.
pub fn encode(batch: &RecordBatch, compression: ParquetCompression) -> Result<Bytes, ParquetError> {
    let start = Instant::now();
    let mut writer = ArrowWriter::try_new(
        Vec::new(),
        batch.schema(),
        Some(writer_properties(compression)),
    )
    .context(WriterCreateSnafu)?;

    writer.write(batch).context(WriteSnafu)?;
    let buffer = writer.into_inner().context(WriteSnafu)?;

    emit!(ParquetWriteCompleted {
        bytes: buffer.len() as u64,
        duration: start.elapsed(),
    });
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use deltalake::arrow::array::{Float64Array, StringArray};
    use deltalake::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;

    fn stats_batch() -> RecordBatch {
        RecordBatch::try_new(
            schema::product_stats(),
            vec![
                Arc::new(StringArray::from(vec!["P-0001", "P-0002"])),
                Arc::new(Float64Array::from(vec![Some(3.0), None])),
                Arc::new(Float64Array::from(vec![Some(60.0), Some(12.5)])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_encoded_file_reads_back() {
        for compression in [
            ParquetCompression::Uncompressed,
            ParquetCompression::Snappy,
            ParquetCompression::Zstd,
        ] {
            let bytes = encode(&stats_batch(), compression).unwrap();
            assert_eq!(&bytes[..4], b"PAR1");

            let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
                .unwrap()
                .build()
                .unwrap();
            let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
            assert_eq!(batches, vec![stats_batch()]);
        }
    }

    #[test]
    fn test_compression_mapping() {
        let props = writer_properties(ParquetCompression::Gzip);
        assert!(matches!(
            props.compression(&"product_id".into()),
            Compression::GZIP(_)
        ));
        let props = writer_properties(ParquetCompression::Uncompressed);
        assert_eq!(
            props.compression(&"product_id".into()),
            Compression::UNCOMPRESSED
        );
    }

    #[test]
    fn test_data_file_names_are_unique() {
        let a = data_file_name();
        let b = data_file_name();
        assert_ne!(a, b);
        assert!(a.starts_with("part-") && a.ends_with(".parquet"));
    }
}
