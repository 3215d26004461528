//! Database connection management
//!
//! Provides the SQLite connection pool and the crate-wide database error type.

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Database error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The unit has no gram mapping for the ingredient
    #[error("Unit {unit_id} is not valid for ingredient {ingredient_id}")]
    InvalidUnit { ingredient_id: i64, unit_id: i64 },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }

    /// True for errors caused by caller input rather than infrastructure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DbError::NotFound { .. } | DbError::InvalidUnit { .. } | DbError::Validation(_)
        )
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl Database {
    /// Create a new database connection pool
    pub fn new<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::with_pool_size(path, 10)
    }

    /// Create a connection pool with an explicit maximum size
    pub fn with_pool_size<P: AsRef<Path>>(path: P, max_size: u32) -> DbResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|conn| {
                // Cascading deletes on association tables depend on this
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA temp_store = MEMORY;",
                )?;
                Ok(())
            });

        let pool = Pool::builder().max_size(max_size.max(1)).build(manager)?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Execute a closure with a database connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// Execute a closure inside a transaction.
    ///
    /// The transaction commits when the closure returns `Ok` and rolls back
    /// otherwise, so a mutation and the recalculation it triggers either
    /// both land or neither does.
    pub fn with_transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn database(dir: &TempDir) -> Database {
        let db = Database::with_pool_size(dir.path().join("test.db"), 2).unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("CREATE TABLE items (name TEXT NOT NULL)")?;
            Ok(())
        })
        .unwrap();
        db
    }

    fn count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        db.with_transaction(|conn| {
            conn.execute("INSERT INTO items (name) VALUES ('a')", [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let result: DbResult<()> = db.with_transaction(|conn| {
            conn.execute("INSERT INTO items (name) VALUES ('a')", [])?;
            Err(DbError::Validation("nope".to_string()))
        });
        assert!(result.unwrap_err().is_validation());
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);
        let enabled: i64 = db
            .with_conn(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
