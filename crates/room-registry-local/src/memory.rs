use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use room_registry_core::{validate_key, RegistryError, RegistryStore, SetOutcome};
use tracing::{debug, instrument};

/// Volatile registry store backed by a concurrent map.
///
/// Mappings live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &str) -> Result<bool, RegistryError> {
        validate_key(key)?;
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<String, RegistryError> {
        validate_key(key)?;
        self.entries
            .get(key)
            .map(|value| value.clone())
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        validate_key(key)?;
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) => Err(RegistryError::Conflict {
                key: key.to_string(),
                existing: existing.get().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                debug!("Stored room {}", key);
                Ok(())
            }
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<SetOutcome, RegistryError> {
        validate_key(key)?;
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) => Ok(SetOutcome {
                value: existing.get().clone(),
                created: false,
            }),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                debug!("Stored room {}", key);
                Ok(SetOutcome {
                    value: value.to_string(),
                    created: true,
                })
            }
        }
    }

    async fn clear(&self) -> Result<(), RegistryError> {
        let removed = self.entries.len();
        self.entries.clear();
        debug!("Cleared {} registry entries", removed);
        Ok(())
    }
}
