//! Durable service registry.
//!
//! Records live in a SQLite database with WAL mode enabled. Only declared
//! intent is stored here (name, location, enabled flag); observed runtime
//! state is never persisted and is recomputed on every read.
//!
//! # Example
//!
//! ```ignore
//! use stackhub::state::{NewServiceRecord, RecordStore};
//!
//! let store = RecordStore::new(db_path).await?;
//! store.initialize().await?;
//! store.insert(NewServiceRecord { name: "web".into(), path, enabled: false }).await?;
//! ```

mod sqlite;
mod types;

pub use sqlite::SqliteRecordStore;
pub use types::{InsertOutcome, NewServiceRecord, ServiceRecord};

/// Primary record store type, backed by SQLite.
pub type RecordStore = SqliteRecordStore;
