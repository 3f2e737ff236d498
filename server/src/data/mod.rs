//! Embedded DuckDB store
//!
//! One store file, one connection behind a mutex. Blocking store work is
//! dispatched through `spawn_blocking`; repositories receive the bare
//! connection and build their own SQL.

pub mod backfill;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod schema;

pub use error::StoreError;

use std::sync::Arc;

use duckdb::Connection;
use parking_lot::{Mutex, MutexGuard};

use crate::core::constants::STORE_DB_FILENAME;
use crate::core::storage::{AppStorage, DataSubdir};

/// Embedded store service.
///
/// Handles database initialization, migrations and connection access.
/// Uses a single shared connection protected by a mutex.
pub struct Store {
    conn: Mutex<Option<Connection>>,
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take()
            && let Err((_, e)) = conn.close()
        {
            tracing::warn!("store connection close failed during drop: {}", e);
        }
    }
}

impl Store {
    /// Open (or create) the store file and run schema migrations.
    pub async fn init(storage: &AppStorage) -> Result<Self, StoreError> {
        let db_path = storage.subdir(DataSubdir::Duckdb).join(STORE_DB_FILENAME);

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(
                "SET autoinstall_known_extensions = false;
                 SET autoload_known_extensions = false;
                 PRAGMA enable_checkpoint_on_shutdown;
                 LOAD json;",
            )?;
            migrations::run_migrations(&conn)?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            path = %storage.subdir(DataSubdir::Duckdb).join(STORE_DB_FILENAME).display(),
            "Store initialized"
        );
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Open an in-memory store (tests and benches).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("LOAD json;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Get exclusive access to the connection.
    ///
    /// # Panics
    /// Panics if the connection has been closed via `close()`.
    pub fn conn(&self) -> parking_lot::MappedMutexGuard<'_, Connection> {
        MutexGuard::map(self.conn.lock(), |opt| {
            opt.as_mut()
                .expect("store connection already closed - do not call conn() after close()")
        })
    }

    /// Run blocking store work on the blocking pool. The request task waits
    /// for completion; there is no timeout or cancellation.
    pub async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let conn = db.conn();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Checkpoint the WAL into the main store file. No-op when closed.
    pub async fn checkpoint(self: &Arc<Self>) -> Result<(), StoreError> {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let conn_guard = db.conn.lock();
            if let Some(ref conn) = *conn_guard {
                conn.execute("CHECKPOINT", [])?;
                tracing::debug!("store checkpoint completed");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Close the connection gracefully.
    pub async fn close(self: Arc<Self>) -> Result<(), StoreError> {
        tokio::task::spawn_blocking(move || {
            let mut conn_guard = self.conn.lock();
            if let Some(conn) = conn_guard.take() {
                if let Err(e) = conn.execute("CHECKPOINT", []) {
                    tracing::warn!("CHECKPOINT failed during close: {}", e);
                }
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                tracing::debug!("store connection closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

/// Execute a function within a transaction, rolling back on error.
pub fn in_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError>,
{
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(val) => {
            conn.execute_batch("COMMIT")?;
            Ok(val)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                tracing::warn!("ROLLBACK failed after transaction error: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_storage() -> (TempDir, AppStorage) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        tokio::fs::create_dir_all(temp_dir.path().join("duckdb"))
            .await
            .expect("Failed to create duckdb dir");
        let storage = AppStorage::init_for_test(temp_dir.path().to_path_buf());
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_store_init() {
        let (_temp_dir, storage) = create_test_storage().await;
        let result = Store::init(&storage).await;
        assert!(result.is_ok(), "Store should initialize successfully");
    }

    #[tokio::test]
    async fn test_store_init_idempotent() {
        let (_temp_dir, storage) = create_test_storage().await;
        let store = Store::init(&storage).await.expect("first init");
        store.close_for_test().await;
        Store::init(&storage).await.expect("second init against existing file");
    }

    #[tokio::test]
    async fn test_store_run() {
        let (_temp_dir, storage) = create_test_storage().await;
        let store = Arc::new(Store::init(&storage).await.expect("init"));
        let count: i64 = store
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM spans", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .await
            .expect("query should succeed");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_checkpoint_after_close_is_noop() {
        let (_temp_dir, storage) = create_test_storage().await;
        let store = Arc::new(Store::init(&storage).await.expect("init"));
        let for_checkpoint = Arc::clone(&store);
        store.close().await.expect("close should succeed");
        assert!(for_checkpoint.checkpoint().await.is_ok());
    }

    #[test]
    fn test_in_transaction_rolls_back() {
        let store = Store::open_in_memory().expect("open");
        let conn = store.conn();
        let result: Result<(), StoreError> = in_transaction(&conn, |conn| {
            conn.execute(
                "INSERT INTO spans (trace_id, span_id) VALUES ('t1', 's1')",
                [],
            )?;
            Err(StoreError::Io(std::io::Error::other("forced failure")))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM spans", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "failed transaction must leave no rows");
    }

    impl Store {
        async fn close_for_test(self) {
            Arc::new(self).close().await.expect("close");
        }
    }
}
