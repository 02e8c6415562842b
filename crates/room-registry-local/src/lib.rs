//! Registry store backends that live on the broker host.
//!
//! - `FileStore`: one file per room under a directory, survives restarts
//! - `MemoryStore`: process-local map, lost on restart

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{create_store, StoreKind};
pub use file::FileStore;
pub use memory::MemoryStore;
