//! Meal Ingredient model
//!
//! An ingredient eaten directly as part of a meal, with unit and amount.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealIngredient {
    pub id: i64,
    pub meal_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

/// Meal ingredient with names resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealIngredientDetail {
    pub id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub unit_id: Option<i64>,
    pub unit_name: Option<String>,
    pub amount: Option<f64>,
}

/// Data for adding an ingredient to a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealIngredientCreate {
    pub meal_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

/// Data for updating a meal ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealIngredientUpdate {
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

impl MealIngredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            meal_id: row.get("meal_id")?,
            ingredient_id: row.get("ingredient_id")?,
            unit_id: row.get("unit_id")?,
            amount: row.get("amount")?,
        })
    }

    pub fn create(conn: &Connection, data: &MealIngredientCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO meal_ingredients (meal_id, ingredient_id, unit_id, amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.meal_id, data.ingredient_id, data.unit_id, data.amount],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("MealIngredient", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_ingredients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_details_for_meal(
        conn: &Connection,
        meal_id: i64,
    ) -> DbResult<Vec<MealIngredientDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT mi.id, mi.ingredient_id, i.name AS ingredient_name,
                   mi.unit_id, u.name AS unit_name, mi.amount
            FROM meal_ingredients mi
            INNER JOIN ingredients i ON i.id = mi.ingredient_id
            LEFT JOIN units u ON u.id = mi.unit_id
            WHERE mi.meal_id = ?1
            ORDER BY mi.id
            "#,
        )?;

        let details = stmt
            .query_map([meal_id], |row| {
                Ok(MealIngredientDetail {
                    id: row.get("id")?,
                    ingredient_id: row.get("ingredient_id")?,
                    ingredient_name: row.get("ingredient_name")?,
                    unit_id: row.get("unit_id")?,
                    unit_name: row.get("unit_name")?,
                    amount: row.get("amount")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn update(conn: &Connection, id: i64, data: &MealIngredientUpdate) -> DbResult<Option<Self>> {
        if data.unit_id.is_none() && data.amount.is_none() {
            return Self::get_by_id(conn, id);
        }

        conn.execute(
            r#"
            UPDATE meal_ingredients
            SET unit_id = COALESCE(?1, unit_id), amount = COALESCE(?2, amount)
            WHERE id = ?3
            "#,
            params![data.unit_id, data.amount, id],
        )?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meal_ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
