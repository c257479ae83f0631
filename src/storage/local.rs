//! Local filesystem storage backend.

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StorageError;

use super::{BackendConfig, StorageProvider};

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Absolute directory the provider is rooted at.
    pub path: String,
    /// The same directory as an object path under the filesystem root.
    pub prefix: Path,
}

impl LocalConfig {
    pub fn new(path: String) -> Self {
        let prefix = Path::from(path.as_str());
        Self { path, prefix }
    }
}

impl StorageProvider {
    pub(super) async fn construct_local(config: LocalConfig) -> Result<Self, StorageError> {
        // Rooted at `/` with the directory as key prefix, so a missing
        // directory reads as not found and is only created by writes.
        let object_store: Arc<dyn ObjectStore> = Arc::new(LocalFileSystem::new());

        let canonical_url = format!("file://{}", config.path);

        Ok(Self {
            config: BackendConfig::Local(config),
            object_store,
            canonical_url,
            storage_options: HashMap::new(),
        })
    }
}
