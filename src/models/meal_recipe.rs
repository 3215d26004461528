//! Meal Recipe model
//!
//! A recipe eaten as part of a meal, measured in portions of the recipe.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecipe {
    pub id: i64,
    pub meal_id: i64,
    pub recipe_id: i64,
    pub portion: f64,
}

/// Meal recipe with the recipe name resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecipeDetail {
    pub id: i64,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub portion: f64,
}

impl MealRecipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            meal_id: row.get("meal_id")?,
            recipe_id: row.get("recipe_id")?,
            portion: row.get("portion")?,
        })
    }

    pub fn create(conn: &Connection, meal_id: i64, recipe_id: i64, portion: f64) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meal_recipes (meal_id, recipe_id, portion) VALUES (?1, ?2, ?3)",
            params![meal_id, recipe_id, portion],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("MealRecipe", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_recipes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_details_for_meal(conn: &Connection, meal_id: i64) -> DbResult<Vec<MealRecipeDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT mr.id, mr.recipe_id, r.name AS recipe_name, mr.portion
            FROM meal_recipes mr
            INNER JOIN recipes r ON r.id = mr.recipe_id
            WHERE mr.meal_id = ?1
            ORDER BY mr.id
            "#,
        )?;

        let details = stmt
            .query_map([meal_id], |row| {
                Ok(MealRecipeDetail {
                    id: row.get("id")?,
                    recipe_id: row.get("recipe_id")?,
                    recipe_name: row.get("recipe_name")?,
                    portion: row.get("portion")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn update_portion(conn: &Connection, id: i64, portion: f64) -> DbResult<Option<Self>> {
        conn.execute(
            "UPDATE meal_recipes SET portion = ?1 WHERE id = ?2",
            params![portion, id],
        )?;
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meal_recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
