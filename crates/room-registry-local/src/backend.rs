use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use room_registry_core::{RegistryError, RegistryStore};
use tracing::info;

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Which registry backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// One file per room under the storage directory.
    #[default]
    File,
    /// Process memory only.
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::File => f.write_str("file"),
            StoreKind::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!(
                "unknown store backend '{}', expected 'file' or 'memory'",
                other
            )),
        }
    }
}

/// Create the registry store selected by configuration.
///
/// `storage_dir` is only used by the file backend.
pub fn create_store(
    kind: StoreKind,
    storage_dir: &Path,
) -> Result<Arc<dyn RegistryStore>, RegistryError> {
    let store: Arc<dyn RegistryStore> = match kind {
        StoreKind::File => {
            info!("Registry: file store at {}", storage_dir.display());
            Arc::new(FileStore::new(storage_dir)?)
        }
        StoreKind::Memory => {
            info!("Registry: in-memory store (mappings are lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
