use super::types::{InsertOutcome, NewServiceRecord, ServiceRecord};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use rusqlite::OptionalExtension;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

const SCHEMA_VERSION: i32 = 1;

const RECORD_COLUMNS: &str = "id, name, path, enabled, created_at, updated_at";

/// SQLite-backed service registry.
///
/// Uses an advisory lock file next to the database to warn when several
/// `stackhub` processes share one registry. The lock is held for the
/// lifetime of the store and released when dropped. Writes are still safe
/// without it (SQLite serializes them); the lock only improves diagnostics.
pub struct SqliteRecordStore {
    db_path: PathBuf,
    conn: Connection,
    /// Advisory lock file handle. `None` when another process holds it.
    #[allow(dead_code)]
    lock_file: Option<std::fs::File>,
}

impl SqliteRecordStore {
    /// Open (or create) the registry database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_file = Self::try_acquire_lock(&db_path.with_extension("lock"))?;

        let conn = Connection::open(&db_path).await?;

        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            db_path,
            conn,
            lock_file,
        })
    }

    /// Create an ephemeral in-memory registry with no lock file.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            conn,
            lock_file: None,
        })
    }

    /// Try to acquire an advisory file lock.
    ///
    /// Returns `None` (with a warning) if another process holds the lock.
    fn try_acquire_lock(lock_path: &Path) -> Result<Option<std::fs::File>> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| Error::Filesystem(format!("Failed to open lock file: {}", e)))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                let _ = file.set_len(0);
                let _ = writeln!(file, "{}", std::process::id());
                debug!("Acquired advisory lock on {:?}", lock_path);
                Ok(Some(file))
            }
            Err(e) => {
                let owner = std::fs::read_to_string(lock_path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                if owner.is_empty() {
                    debug!("Could not acquire registry lock ({}) - proceeding anyway", e);
                } else if owner == std::process::id().to_string() {
                    debug!("Registry lock already held by this process");
                } else {
                    warn!(
                        "Another stackhub instance (PID {}) is using this registry. \
                         Proceeding anyway; concurrent writes are serialized by SQLite.",
                        owner
                    );
                }
                Ok(None)
            }
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a function within a transaction and commit.
    #[tracing::instrument(skip(self, f), fields(operation = "db_transaction"))]
    async fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                let tx = conn.transaction()?;
                let result = f(&tx)?;
                tx.commit()?;
                Ok(result)
            })
            .await
            .map_err(Error::from)
    }

    /// Create the schema, or check the version of an existing one.
    pub async fn initialize(&self) -> Result<()> {
        let schema_exists: bool = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<bool> {
                    Ok(conn.query_row(
                        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='services'",
                        [],
                        |row| row.get(0),
                    )?)
                },
            )
            .await?;

        if !schema_exists {
            debug!("Creating registry schema");
            self.create_schema().await?;
        } else {
            self.check_schema_version().await?;
        }

        Ok(())
    }

    async fn check_schema_version(&self) -> Result<()> {
        let current_version: i32 = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<i32> {
                    Ok(conn
                        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                            row.get::<_, Option<i32>>(0)
                        })?
                        .unwrap_or(1))
                },
            )
            .await?;

        if current_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Registry schema version {} is newer than this build supports ({}); upgrade stackhub",
                current_version, SCHEMA_VERSION
            )));
        }

        debug!(
            "Registry schema is up to date (version {})",
            current_version
        );
        Ok(())
    }

    async fn create_schema(&self) -> Result<()> {
        self.conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<()> {
                    conn.execute_batch(
                        r#"
                CREATE TABLE schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );

                CREATE TABLE services (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    path TEXT NOT NULL,
                    enabled INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
                    )?;

                    conn.execute(
                        "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                        rusqlite::params![SCHEMA_VERSION],
                    )?;

                    Ok(())
                },
            )
            .await?;

        Ok(())
    }

    /// Insert a new record. An existing record with the same name is left
    /// untouched and reported as [`InsertOutcome::AlreadyExists`].
    pub async fn insert(&self, record: NewServiceRecord) -> Result<InsertOutcome> {
        debug!("Registering service record: {}", record.name);

        let now = Utc::now().to_rfc3339();
        let NewServiceRecord {
            name,
            path,
            enabled,
        } = record;
        let path = path.to_string_lossy().into_owned();

        let outcome = self
            .with_transaction(move |tx| {
                let exists: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM services WHERE name = ?1",
                    rusqlite::params![&name],
                    |row| row.get(0),
                )?;
                if exists {
                    return Ok(InsertOutcome::AlreadyExists);
                }

                tx.execute(
                    "INSERT INTO services (name, path, enabled, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![&name, &path, enabled, &now],
                )?;
                let id = tx.last_insert_rowid();
                let record = tx.query_row(
                    &format!("SELECT {} FROM services WHERE id = ?1", RECORD_COLUMNS),
                    rusqlite::params![id],
                    record_from_row,
                )?;
                Ok(InsertOutcome::Inserted(record))
            })
            .await?;

        if let InsertOutcome::Inserted(ref r) = outcome {
            info!("Registered service '{}' at {}", r.name, r.path.display());
        }
        Ok(outcome)
    }

    pub async fn get(&self, name: &str) -> Result<Option<ServiceRecord>> {
        let name = name.to_string();
        self.conn
            .call(
                move |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Option<ServiceRecord>> {
                    Ok(conn
                        .query_row(
                            &format!("SELECT {} FROM services WHERE name = ?1", RECORD_COLUMNS),
                            rusqlite::params![&name],
                            record_from_row,
                        )
                        .optional()?)
                },
            )
            .await
            .map_err(Error::from)
    }

    /// All records, ordered by name.
    pub async fn list(&self) -> Result<Vec<ServiceRecord>> {
        self.conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Vec<ServiceRecord>> {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM services ORDER BY name",
                        RECORD_COLUMNS
                    ))?;
                    let records = stmt
                        .query_map([], record_from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    Ok(records)
                },
            )
            .await
            .map_err(Error::from)
    }

    /// Delete a record. Returns whether a row was removed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let name_for_tx = name.to_string();
        let rows = self
            .with_transaction(move |tx| {
                tx.execute(
                    "DELETE FROM services WHERE name = ?1",
                    rusqlite::params![&name_for_tx],
                )
            })
            .await?;

        if rows > 0 {
            info!("Removed service record '{}'", name);
        }
        Ok(rows > 0)
    }

    /// Flip the enabled flag, returning the updated record.
    #[must_use = "ignoring this result hides a missing service"]
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<ServiceRecord> {
        let now = Utc::now().to_rfc3339();
        let name_for_tx = name.to_string();

        let updated = self
            .with_transaction(move |tx| {
                let rows = tx.execute(
                    "UPDATE services SET enabled = ?1, updated_at = ?2 WHERE name = ?3",
                    rusqlite::params![enabled, &now, &name_for_tx],
                )?;
                if rows == 0 {
                    return Ok(None);
                }
                tx.query_row(
                    &format!("SELECT {} FROM services WHERE name = ?1", RECORD_COLUMNS),
                    rusqlite::params![&name_for_tx],
                    record_from_row,
                )
                .map(Some)
            })
            .await?;

        match updated {
            Some(record) => {
                info!(
                    "Service '{}' {}",
                    name,
                    if enabled { "enabled" } else { "disabled" }
                );
                Ok(record)
            }
            None => Err(Error::ServiceNotFound(name.to_string())),
        }
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServiceRecord> {
    let path: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(ServiceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        path: PathBuf::from(path),
        enabled: row.get(3)?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_memory_store() -> SqliteRecordStore {
        let store = SqliteRecordStore::new_in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    fn new_record(name: &str) -> NewServiceRecord {
        NewServiceRecord {
            name: name.to_string(),
            path: PathBuf::from(format!("/srv/stacks/{}", name)),
            enabled: false,
        }
    }

    async fn insert(store: &SqliteRecordStore, name: &str) -> ServiceRecord {
        match store.insert(new_record(name)).await.unwrap() {
            InsertOutcome::Inserted(r) => r,
            InsertOutcome::AlreadyExists => panic!("'{}' already registered", name),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = create_memory_store().await;
        let inserted = insert(&store, "web").await;

        let fetched = store.get("web").await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert!(!fetched.enabled);
        assert_eq!(fetched.path, PathBuf::from("/srv/stacks/web"));
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_insert_leaves_existing_row() {
        let store = create_memory_store().await;
        let first = insert(&store, "web").await;

        let second = store
            .insert(NewServiceRecord {
                name: "web".into(),
                path: PathBuf::from("/elsewhere"),
                enabled: true,
            })
            .await
            .unwrap();
        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(store.get("web").await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = create_memory_store().await;
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let store = create_memory_store().await;
        for name in ["zeta", "alpha", "mid"] {
            insert(&store, name).await;
        }
        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_set_enabled_updates_flag_and_timestamp() {
        let store = create_memory_store().await;
        let before = insert(&store, "web").await;

        let after = store.set_enabled("web", true).await.unwrap();
        assert!(after.enabled);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);

        // Idempotent.
        let again = store.set_enabled("web", true).await.unwrap();
        assert!(again.enabled);
    }

    #[tokio::test]
    async fn test_set_enabled_missing_is_not_found() {
        let store = create_memory_store().await;
        let err = store.set_enabled("ghost", true).await.unwrap_err();
        assert!(matches!(err, Error::ServiceNotFound(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let store = create_memory_store().await;
        insert(&store, "web").await;
        assert!(store.delete("web").await.unwrap());
        assert!(!store.delete("web").await.unwrap());
        assert!(store.get("web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data").join("registry.db");
        {
            let store = SqliteRecordStore::new(db.clone()).await.unwrap();
            store.initialize().await.unwrap();
            insert(&store, "web").await;
            store.set_enabled("web", true).await.unwrap();
        }
        let store = SqliteRecordStore::new(db).await.unwrap();
        store.initialize().await.unwrap();
        let record = store.get("web").await.unwrap().unwrap();
        assert!(record.enabled);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = create_memory_store().await;
        insert(&store, "web").await;
        store.initialize().await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
