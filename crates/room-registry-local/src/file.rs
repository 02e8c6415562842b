use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use room_registry_core::{validate_key, RegistryError, RegistryStore, SetOutcome};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Name of the lock file serializing writers, kept next to the entries.
const LOCK_FILE: &str = ".registry.lock";

/// File-per-key registry store.
///
/// Layout:
/// ```text
/// {base_dir}/
///   .registry.lock      # exclusive lock held by writers
///   {room name}         # contents: the session id
/// ```
///
/// Writes go to a dot-prefixed temp file and are renamed into place, so readers
/// see either the full value or no entry at all. Readers never take the lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|e| {
            RegistryError::Io(format!(
                "Failed to create registry directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, RegistryError> {
        validate_key(key)?;
        Ok(self.base_dir.join(key))
    }

    /// Run `f` on a blocking thread while holding the writer lock.
    async fn locked<T, F>(&self, f: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, RegistryError> + Send + 'static,
    {
        let base_dir = self.base_dir.clone();
        tokio::task::spawn_blocking(move || {
            let lock = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(base_dir.join(LOCK_FILE))?;
            FileExt::lock_exclusive(&lock)?;

            let result = f(&base_dir);

            if let Err(e) = FileExt::unlock(&lock) {
                warn!("Failed to release registry lock: {}", e);
            }
            result
        })
        .await
        .map_err(|e| RegistryError::Io(format!("Registry task failed: {}", e)))?
    }
}

/// Session id held in an entry file. An empty file is corrupt, not absent.
fn entry_value(path: &Path, contents: &str) -> Result<String, RegistryError> {
    let value = contents.trim_end();
    if value.is_empty() {
        return Err(RegistryError::Io(format!(
            "Registry entry {} is empty",
            path.display()
        )));
    }
    Ok(value.to_string())
}

/// Read an entry, mapping a missing file to `None`.
fn read_entry(path: &Path) -> Result<Option<String>, RegistryError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => entry_value(path, &contents).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RegistryError::Io(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write an entry atomically via a temp file in the same directory.
fn write_entry(base_dir: &Path, key: &str, value: &str) -> Result<(), RegistryError> {
    let path = base_dir.join(key);
    let temp_path = base_dir.join(format!(".{}.tmp", key));

    let mut file = File::create(&temp_path).map_err(|e| {
        RegistryError::Io(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, &path).map_err(|e| {
        RegistryError::Io(format!(
            "Failed to rename temp file to {}: {}",
            path.display(),
            e
        ))
    })
}

#[async_trait]
impl RegistryStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, RegistryError> {
        let path = self.entry_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<String, RegistryError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => entry_value(&path, &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RegistryError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let path = self.entry_path(key)?;
        let key = key.to_string();
        let value = value.to_string();

        self.locked(move |base_dir| {
            if let Some(existing) = read_entry(&path)? {
                return Err(RegistryError::Conflict { key, existing });
            }
            write_entry(base_dir, &key, &value)?;
            debug!("Stored room {} ({} bytes)", key, value.len());
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<SetOutcome, RegistryError> {
        let path = self.entry_path(key)?;
        let key = key.to_string();
        let value = value.to_string();

        self.locked(move |base_dir| {
            if let Some(existing) = read_entry(&path)? {
                debug!("Room {} already mapped, keeping stored value", key);
                return Ok(SetOutcome {
                    value: existing,
                    created: false,
                });
            }
            write_entry(base_dir, &key, &value)?;
            debug!("Stored room {} ({} bytes)", key, value.len());
            Ok(SetOutcome {
                value,
                created: true,
            })
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<(), RegistryError> {
        self.locked(|base_dir| {
            let mut removed = 0usize;
            for entry in std::fs::read_dir(base_dir)? {
                let entry = entry?;
                if entry.file_name() == LOCK_FILE || !entry.file_type()?.is_file() {
                    continue;
                }
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
            debug!("Cleared {} registry entries", removed);
            Ok(())
        })
        .await
    }
}
