//! Storage abstraction over object stores.
//!
//! A [`StorageProvider`] is bound to one location (a bucket plus optional key
//! prefix, or a local directory). All paths passed to it are relative to that
//! location.

mod gcs;
mod local;
mod s3;

use bytes::Bytes;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use regex::{Captures, Regex};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::emit;
use crate::error::{InvalidUrlSnafu, IoSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;

/// Storage provider bound to a single location.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
    pub(crate) storage_options: HashMap<String, String>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

// URL patterns, tried in order within each backend.
static S3_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$",
        r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$",
        r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$",
    ])
});

static GCS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+))?$",
        r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$",
    ])
});

static LOCAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^file://(?P<path>.*)$",
        r"^file:(?P<path>.*)$",
        r"^/(?P<path>.*)$",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("storage URL pattern must compile"))
        .collect()
}

fn first_match<'a>(patterns: &[Regex], url: &'a str) -> Option<Captures<'a>> {
    patterns.iter().find_map(|r| r.captures(url))
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        if let Some(caps) = first_match(&S3_PATTERNS, url) {
            return Ok(Self::S3(S3Config {
                region: std::env::var("AWS_DEFAULT_REGION")
                    .ok()
                    .or_else(|| caps.name("region").map(|m| m.as_str().to_string())),
                endpoint: std::env::var("AWS_ENDPOINT").ok(),
                bucket: caps["bucket"].to_string(),
                key: key_of(&caps),
            }));
        }

        if let Some(caps) = first_match(&GCS_PATTERNS, url) {
            return Ok(Self::Gcs(GcsConfig {
                bucket: caps["bucket"].to_string(),
                key: key_of(&caps),
            }));
        }

        if let Some(caps) = first_match(&LOCAL_PATTERNS, url) {
            let path = caps["path"].trim_end_matches('/');
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            };
            return Ok(Self::Local(LocalConfig::new(path)));
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Local(local) => Some(&local.prefix),
        }
    }

    /// URL of this location in the form the Delta Lake handlers expect.
    pub fn table_url(&self) -> String {
        let with_key = |scheme: &str, bucket: &str, key: Option<&Path>| match key {
            Some(key) => format!("{scheme}://{bucket}/{key}"),
            None => format!("{scheme}://{bucket}"),
        };

        match self {
            BackendConfig::S3(s3) => with_key("s3", &s3.bucket, s3.key.as_ref()),
            BackendConfig::Gcs(gcs) => with_key("gs", &gcs.bucket, gcs.key.as_ref()),
            BackendConfig::Local(local) => format!("file://{}", local.path),
        }
    }
}

fn key_of(caps: &Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| m.as_str().trim_end_matches('/'))
        .filter(|key| !key.is_empty())
        .map(Path::from)
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Gcs(config) => Self::construct_gcs(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: impl Into<Path>) -> Result<Bytes, StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = self.object_store.get(&self.qualify_path(&path)).await;
        record(StorageOperation::Get, result.is_ok(), start);

        result
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)
    }

    /// Put bytes to a path, replacing any existing object.
    pub async fn put(&self, path: impl Into<Path>, bytes: Bytes) -> Result<(), StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = self
            .object_store
            .put(&self.qualify_path(&path), PutPayload::from(bytes))
            .await;
        record(StorageOperation::Put, result.is_ok(), start);

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// List objects directly under the location (no recursion).
    ///
    /// Returned paths are relative to the location. A location with no
    /// objects yields an empty list.
    pub async fn list(&self) -> Result<Vec<Path>, StorageError> {
        let start = Instant::now();
        let listing = match self.object_store.list_with_delimiter(self.config.key()).await {
            Ok(listing) => listing,
            Err(object_store::Error::NotFound { .. }) => {
                record(StorageOperation::List, true, start);
                return Ok(Vec::new());
            }
            Err(source) => {
                record(StorageOperation::List, false, start);
                return Err(StorageError::ObjectStore { source });
            }
        };
        record(StorageOperation::List, true, start);

        let key_parts = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let mut paths: Vec<Path> = listing
            .objects
            .into_iter()
            .map(|meta| meta.location.parts().skip(key_parts).collect())
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Make sure the location can receive writes.
    ///
    /// Local directories are created on demand; object store prefixes need
    /// no preparation.
    pub async fn ensure_exists(&self) -> Result<(), StorageError> {
        if let BackendConfig::Local(local) = &self.config {
            tokio::fs::create_dir_all(&local.path)
                .await
                .context(IoSnafu)?;
        }
        Ok(())
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get storage options for external integrations (e.g., Delta Lake).
    pub fn storage_options(&self) -> &HashMap<String, String> {
        &self.storage_options
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Human-readable URL of the location.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

fn record(operation: StorageOperation, ok: bool, start: Instant) {
    let status = if ok {
        RequestStatus::Success
    } else {
        RequestStatus::Error
    };
    emit!(StorageRequest { operation, status });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
}
