//! Meal model
//!
//! A meal eaten on a date. `calories` is derived from the meal's recipes and
//! ingredients and written only by the recalculation engine.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub user_id: i64,
    pub date: String, // ISO date: "2025-01-09"
    pub category_id: Option<i64>,
    pub calories: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCreate {
    pub user_id: i64,
    pub date: String,
    pub category_id: Option<i64>,
}

/// Data for updating a meal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealUpdate {
    pub date: Option<String>,
    pub category_id: Option<i64>,
}

impl Meal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            category_id: row.get("category_id")?,
            calories: row.get("calories")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meals (user_id, date, category_id) VALUES (?1, ?2, ?3)",
            params![data.user_id, data.date, data.category_id],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Meal", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(meal) => Ok(Some(meal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require(conn: &Connection, id: i64) -> DbResult<Self> {
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Meal", id))
    }

    /// All meals a user logged on a date
    pub fn list_for_date(conn: &Connection, user_id: i64, date: &str) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM meals WHERE user_id = ?1 AND date = ?2 ORDER BY id")?;

        let meals = stmt
            .query_map(params![user_id, date], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// All meal IDs, optionally restricted to one user
    pub fn ids(conn: &Connection, user_id: Option<i64>) -> DbResult<Vec<i64>> {
        let mut stmt =
            conn.prepare("SELECT id FROM meals WHERE ?1 IS NULL OR user_id = ?1 ORDER BY id")?;

        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    pub fn update(conn: &Connection, id: i64, data: &MealUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref date) = data.date {
            updates.push(format!("date = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(date.clone()));
        }
        if let Some(category_id) = data.category_id {
            updates.push(format!("category_id = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(category_id));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE meals SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Persist the derived calories and nothing else
    pub fn update_calories(conn: &Connection, id: i64, calories: f64) -> DbResult<()> {
        let rows = conn.execute(
            "UPDATE meals SET calories = ?1 WHERE id = ?2",
            params![calories, id],
        )?;
        if rows == 0 {
            return Err(DbError::not_found("Meal", id));
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
