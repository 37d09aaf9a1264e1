//! Connection pool for the item store.
//!
//! Every connection handed out by the pool enforces foreign keys and waits on
//! a locked database instead of failing immediately, so concurrent writers
//! serialize on SQLite's write lock.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::debug;

use crate::database::schema;
use crate::error::{Result, StoreError};

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

pub const DEFAULT_POOL_SIZE: u32 = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool over an existing database file.
///
/// The schema is expected to be in place already; see [`init_pool`] for the
/// setup path that creates it.
pub fn open_pool(db_path: &Path, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // journal_mode reports the resulting mode as a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
    });

    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| StoreError::storage(format!("Failed to create connection pool: {}", e)))?;

    debug!("Opened pool over {:?} ({} connections)", db_path, max_size);
    Ok(pool)
}

/// Open a pool and run the schema setup on it.
pub fn init_pool(db_path: &Path, max_size: u32) -> Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = open_pool(db_path, max_size)?;
    let conn = get_conn(&pool)?;
    schema::initialize(&conn)
        .map_err(|e| StoreError::storage(format!("Failed to initialize schema: {}", e)))?;
    Ok(pool)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    Ok(pool.get()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connections_enforce_foreign_keys() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let pool = init_pool(&dir.path().join("market.sqlite3"), 2)?;
        let conn = get_conn(&pool)?;

        let enabled: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        assert_eq!(enabled, 1);

        let orphan = conn.execute(
            "INSERT INTO items (name, category_id, image_filename) VALUES ('jacket', 99, '')",
            [],
        );
        assert!(orphan.is_err());
        Ok(())
    }

    #[test]
    fn test_init_pool_creates_parent_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("db").join("mercari.sqlite3");
        let pool = init_pool(&db_path, DEFAULT_POOL_SIZE)?;

        assert!(db_path.exists());
        assert_eq!(pool.max_size(), DEFAULT_POOL_SIZE);
        Ok(())
    }

    #[test]
    fn test_data_is_shared_between_connections() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let pool = init_pool(&dir.path().join("market.sqlite3"), 2)?;

        {
            let conn = get_conn(&pool)?;
            conn.execute("INSERT INTO categories (name) VALUES ('Books')", [])?;
        }

        let conn = get_conn(&pool)?;
        let name: String =
            conn.query_row("SELECT name FROM categories WHERE id = 1", [], |row| row.get(0))?;
        assert_eq!(name, "Books");
        Ok(())
    }
}
