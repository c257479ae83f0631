//! File writers for the raw datasets.
//!
//! Writing is split in two steps. Staging writes a complete sibling `*.tmp`
//! file; publishing renames staged files over their targets. A set of files
//! is published together: if any rename fails, targets already replaced get
//! their previous content back, so a failed run leaves the old dataset as it
//! was.

use snafu::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::records::{OrderRecord, ReviewRecord};
use crate::error::{
    CreateFileSnafu, CsvWriteSnafu, FileWriteSnafu, GeneratorError, JsonEncodeSnafu, PersistSnafu,
};
use crate::schema;

/// Header row of `orders.csv`.
pub const ORDERS_HEADER: [&str; 6] = [
    schema::ORDER_ID,
    schema::USER_ID,
    schema::PRODUCT_ID,
    schema::QUANTITY,
    schema::ORDER_DATE,
    schema::TOTAL_AMOUNT,
];

/// A fully written file waiting next to its target.
///
/// The staged file is removed on drop unless it has been published.
#[derive(Debug)]
pub struct StagedFile {
    staged: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    fn new(target: &Path) -> Self {
        Self {
            staged: sibling(target, "tmp"),
            target: target.to_path_buf(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn staged(&self) -> &Path {
        &self.staged
    }

    fn create(&self) -> Result<BufWriter<File>, GeneratorError> {
        let file = File::create(&self.staged).context(CreateFileSnafu {
            path: self.target.display().to_string(),
        })?;
        Ok(BufWriter::new(file))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Already renamed away when published.
        if self.staged.exists() {
            if let Err(e) = fs::remove_file(&self.staged) {
                warn!("Could not remove {}: {}", self.staged.display(), e);
            }
        }
    }
}

/// Stage orders as comma-separated values with a header row.
pub fn stage_orders_csv(path: &Path, orders: &[OrderRecord]) -> Result<StagedFile, GeneratorError> {
    let display = path.display().to_string();
    let staged = StagedFile::new(path);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(staged.create()?);

    writer
        .write_record(ORDERS_HEADER)
        .context(CsvWriteSnafu { path: &display })?;
    for order in orders {
        writer
            .serialize(order)
            .context(CsvWriteSnafu { path: &display })?;
    }
    writer.flush().context(FileWriteSnafu { path: &display })?;

    Ok(staged)
}

/// Stage reviews as newline-delimited JSON, one object per line.
pub fn stage_reviews_ndjson(
    path: &Path,
    reviews: &[ReviewRecord],
) -> Result<StagedFile, GeneratorError> {
    let display = path.display().to_string();
    let staged = StagedFile::new(path);
    let mut writer = staged.create()?;

    for review in reviews {
        serde_json::to_writer(&mut writer, review).context(JsonEncodeSnafu)?;
        writer
            .write_all(b"\n")
            .context(FileWriteSnafu { path: &display })?;
    }
    writer.flush().context(FileWriteSnafu { path: &display })?;

    Ok(staged)
}

/// Move every staged file over its target, or none of them.
pub fn publish_all(files: &[StagedFile]) -> Result<(), GeneratorError> {
    let mut published: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(files.len());

    for file in files {
        match publish(file) {
            Ok(backup) => published.push((file.target.as_path(), backup)),
            Err(e) => {
                restore(&published);
                return Err(e);
            }
        }
    }

    for backup in published.into_iter().filter_map(|(_, backup)| backup) {
        if let Err(e) = fs::remove_file(&backup) {
            warn!("Could not remove {}: {}", backup.display(), e);
        }
    }
    Ok(())
}

/// Write orders and move them into place.
pub fn write_orders_csv(path: &Path, orders: &[OrderRecord]) -> Result<(), GeneratorError> {
    publish_all(&[stage_orders_csv(path, orders)?])
}

/// Write reviews and move them into place.
pub fn write_reviews_ndjson(path: &Path, reviews: &[ReviewRecord]) -> Result<(), GeneratorError> {
    publish_all(&[stage_reviews_ndjson(path, reviews)?])
}

// Renames the staged file over the target, keeping an existing target file
// aside as `*.bak` until the whole set is published.
fn publish(file: &StagedFile) -> Result<Option<PathBuf>, GeneratorError> {
    let context = || PersistSnafu {
        path: file.target.display().to_string(),
    };

    let backup = if file.target.is_file() {
        let backup = sibling(&file.target, "bak");
        fs::rename(&file.target, &backup).with_context(|_| context())?;
        Some(backup)
    } else {
        None
    };

    if let Err(source) = fs::rename(&file.staged, &file.target) {
        // the target was not replaced, only a moved-aside file needs undoing
        if backup.is_some() {
            restore(&[(file.target.as_path(), backup)]);
        }
        return Err(source).with_context(|_| context());
    }
    Ok(backup)
}

fn restore(published: &[(&Path, Option<PathBuf>)]) {
    for (target, backup) in published.iter().rev() {
        let result = match backup {
            Some(backup) => fs::rename(backup, target),
            None => fs::remove_file(target),
        };
        if let Err(e) = result {
            warn!("Could not restore {}: {}", target.display(), e);
        }
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}
