//! Recipe model
//!
//! Represents a recipe with derived nutrition totals. The totals have no
//! user-facing write path; only `update_nutrition` touches them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::Nutrition;

/// A recipe with its derived nutrition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub portions: i64,
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
    pub nutrition: Nutrition,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub user_id: i64,
    pub name: String,
    #[serde(default = "default_portions")]
    pub portions: i64,
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
}

fn default_portions() -> i64 {
    1
}

/// Data for updating a recipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub portions: Option<i64>,
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
}

impl Recipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            portions: row.get("portions")?,
            prepare_time: row.get("prepare_time")?,
            description: row.get("description")?,
            nutrition: Nutrition {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fat: row.get("fat")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new recipe into the database
    pub fn create(conn: &Connection, data: &RecipeCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO recipes (user_id, name, portions, prepare_time, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.user_id,
                data.name.trim(),
                data.portions,
                data.prepare_time,
                data.description,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Recipe", id))
    }

    /// Get a recipe by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a recipe by ID, failing if it does not exist
    pub fn require(conn: &Connection, id: i64) -> DbResult<Self> {
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Recipe", id))
    }

    /// List a user's recipes, optionally filtered by a name fragment
    pub fn list_for_user(conn: &Connection, user_id: i64, query: Option<&str>) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            "SELECT * FROM recipes WHERE user_id = ?1 AND name LIKE ?2 ORDER BY name ASC",
        )?;

        let recipes = stmt
            .query_map(params![user_id, pattern], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipes)
    }

    /// All recipe IDs, optionally restricted to one user
    pub fn ids(conn: &Connection, user_id: Option<i64>) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM recipes WHERE ?1 IS NULL OR user_id = ?1 ORDER BY id",
        )?;

        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Update user-editable recipe fields
    pub fn update(conn: &Connection, id: i64, data: &RecipeUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(portions) = data.portions {
            updates.push(format!("portions = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(portions));
        }
        if let Some(prepare_time) = data.prepare_time {
            updates.push(format!("prepare_time = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(prepare_time));
        }
        if let Some(ref description) = data.description {
            updates.push(format!("description = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(description.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE recipes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Persist the derived nutrition fields and nothing else
    pub fn update_nutrition(conn: &Connection, id: i64, nutrition: &Nutrition) -> DbResult<()> {
        let rows = conn.execute(
            "UPDATE recipes SET calories = ?1, protein = ?2, carbs = ?3, fat = ?4 WHERE id = ?5",
            params![
                nutrition.calories,
                nutrition.protein,
                nutrition.carbs,
                nutrition.fat,
                id,
            ],
        )?;
        if rows == 0 {
            return Err(DbError::not_found("Recipe", id));
        }
        Ok(())
    }

    /// Meal IDs that include this recipe
    pub fn meal_ids_using(conn: &Connection, id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT meal_id FROM meal_recipes WHERE recipe_id = ?1 ORDER BY meal_id",
        )?;

        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Delete a recipe. Its ingredient and meal associations cascade.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::User;

    fn create(conn: &Connection, portions: i64) -> DbResult<Recipe> {
        let user = match User::get_by_username(conn, "anna")? {
            Some(u) => u,
            None => User::create(conn, "anna")?,
        };
        Recipe::create(
            conn,
            &RecipeCreate {
                user_id: user.id,
                name: "Porridge".into(),
                portions,
                prepare_time: Some(10),
                description: None,
            },
        )
    }

    #[test]
    fn test_new_recipe_has_zero_nutrition() {
        let conn = test_connection();
        let recipe = create(&conn, 2).unwrap();
        assert_eq!(recipe.nutrition, Nutrition::zero());
    }

    #[test]
    fn test_zero_portions_rejected_by_schema() {
        let conn = test_connection();
        assert!(create(&conn, 0).is_err());
    }

    #[test]
    fn test_update_nutrition_leaves_other_fields() {
        let conn = test_connection();
        let recipe = create(&conn, 2).unwrap();
        let totals = Nutrition { calories: 300.0, protein: 10.0, carbs: 50.0, fat: 5.0 };
        Recipe::update_nutrition(&conn, recipe.id, &totals).unwrap();

        let stored = Recipe::require(&conn, recipe.id).unwrap();
        assert_eq!(stored.nutrition, totals);
        assert_eq!(stored.name, "Porridge");
        assert_eq!(stored.portions, 2);
        assert!(matches!(
            Recipe::update_nutrition(&conn, 999, &totals),
            Err(DbError::NotFound { .. })
        ));
    }
}
