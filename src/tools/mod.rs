//! Nutritrack Tools module
//!
//! Service-layer operations behind the MCP tools. Every mutation runs in one
//! transaction together with the recalculation it triggers.

pub mod ingredients;
pub mod meals;
pub mod metrics;
pub mod recipes;
pub mod status;
pub mod users;

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;

/// Failure of a tool call, split by who has to fix it
#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad input: unknown IDs, invalid units, rule violations
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Internal(String),
}

impl From<DbError> for ToolError {
    fn from(e: DbError) -> Self {
        if e.is_validation() {
            ToolError::Invalid(e.to_string())
        } else {
            ToolError::Internal(format!("Database error: {}", e))
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Parse an ISO `YYYY-MM-DD` date into its canonical form
pub fn parse_date(date: &str) -> Result<String, DbError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| DbError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)))
}

/// Reject amounts and portions that are not strictly positive
pub fn require_positive(field: &str, value: f64) -> Result<(), DbError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DbError::Validation(format!("{} must be greater than 0", field)));
    }
    Ok(())
}

/// Reject names that are empty after trimming
pub fn require_name(field: &str, value: &str) -> Result<(), DbError> {
    if value.trim().is_empty() {
        return Err(DbError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Reject linking another user's row into something `user_id` owns
pub fn require_same_owner(user_id: i64, entity: &str, id: i64, owner_id: i64) -> Result<(), DbError> {
    if owner_id != user_id {
        return Err(DbError::Validation(format!("{} {} belongs to another user", entity, id)));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use crate::db::{migrations, Database};

    /// A pooled database in a temporary directory, migrated
    pub fn temp_database() -> (TempDir, Database) {
        let dir = TempDir::new().expect("create temp dir");
        let db = Database::with_pool_size(dir.path().join("nutritrack.db"), 2).expect("open pool");
        db.with_conn(migrations::run_migrations).expect("run migrations");
        (dir, db)
    }
}
