//! Room name -> session id resolution with exactly-once session creation.
//!
//! A room's session is created upstream the first time the room is requested and
//! persisted in the registry store; every later request reuses it. Two layers keep
//! a room from ever mapping to two sessions:
//! - a per-room async lock serializes check-create-persist inside this process
//! - `set_if_absent` at the store settles races with other processes sharing it

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use room_registry_core::{MediaMode, RegistryError, RegistryStore, VideoPlatform};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{BrokerError, Result};

/// A resolved room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoom {
    pub session_id: String,
    /// Whether this call created the session.
    pub created: bool,
}

pub struct SessionResolver {
    store: Arc<dyn RegistryStore>,
    platform: Arc<dyn VideoPlatform>,
    media_mode: MediaMode,
    room_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionResolver {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        platform: Arc<dyn VideoPlatform>,
        media_mode: MediaMode,
    ) -> Self {
        Self {
            store,
            platform,
            media_mode,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    /// Get or create the creation lock for a room.
    fn room_lock(&self, room: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(room.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop a room's creation lock once nobody else is waiting on it.
    ///
    /// Waiters clone the lock under the map mutex, so a count of two (the map
    /// and `lock`) means no one else holds it.
    fn release_room_lock(&self, room: &str, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self
            .room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let idle = locks
            .get(room)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(room);
        }
    }

    #[cfg(test)]
    fn pending_room_locks(&self) -> usize {
        self.room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Look up a room without creating it.
    pub async fn lookup(&self, room: &str) -> Result<Option<String>> {
        match self.store.get(room).await {
            Ok(session_id) => Ok(Some(session_id)),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the room's session id, creating the session upstream on first use.
    ///
    /// If the upstream create fails nothing is persisted and the next call retries.
    #[instrument(skip(self))]
    pub async fn resolve(&self, room: &str) -> Result<ResolvedRoom> {
        if let Some(session_id) = self.lookup(room).await? {
            debug!("Room {} resolved from registry", room);
            return Ok(ResolvedRoom {
                session_id,
                created: false,
            });
        }

        let lock = RoomLock {
            resolver: self,
            room,
            lock: self.room_lock(room),
        };
        let _guard = lock.lock.lock().await;
        self.create_locked(room).await
    }

    /// Check-create-persist for a room whose creation lock is held.
    async fn create_locked(&self, room: &str) -> Result<ResolvedRoom> {
        // Another request may have created the room while we waited.
        if let Some(session_id) = self.lookup(room).await? {
            debug!("Room {} created by a concurrent request", room);
            return Ok(ResolvedRoom {
                session_id,
                created: false,
            });
        }

        let session_id = self.platform.create_session(self.media_mode).await?;
        if session_id.is_empty() {
            return Err(BrokerError::Upstream {
                status: None,
                message: "video platform returned an empty session id".to_string(),
            });
        }

        let outcome = self.store.set_if_absent(room, &session_id).await?;
        if outcome.created {
            info!("Created {} session for room {}", self.media_mode, room);
        } else {
            warn!(
                "Room {} was mapped by another writer; discarding session {} and adopting the stored one",
                room, session_id
            );
        }

        Ok(ResolvedRoom {
            session_id: outcome.value,
            created: outcome.created,
        })
    }
}

/// A room's creation lock, returned to the map when dropped (including on cancellation).
struct RoomLock<'a> {
    resolver: &'a SessionResolver,
    room: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for RoomLock<'_> {
    fn drop(&mut self) {
        self.resolver.release_room_lock(self.room, &self.lock);
    }
}
