//! Meal Category model

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A user-defined meal category ("breakfast", "post-workout", ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCategory {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

impl MealCategory {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
        })
    }

    pub fn create(conn: &Connection, user_id: i64, name: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meal_categories (user_id, name) VALUES (?1, ?2)",
            params![user_id, name.trim()],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("MealCategory", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_categories WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_user(conn: &Connection, user_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM meal_categories WHERE user_id = ?1 ORDER BY name ASC")?;

        let categories = stmt
            .query_map([user_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Delete a category; meals keep existing with no category
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meal_categories WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
