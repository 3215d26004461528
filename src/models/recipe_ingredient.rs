//! Recipe Ingredient model
//!
//! Links an ingredient to a recipe with a unit and amount. Either may be
//! missing while the recipe is still being written.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A recipe ingredient linking an ingredient to a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

/// Recipe ingredient with names resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientDetail {
    pub id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub unit_id: Option<i64>,
    pub unit_name: Option<String>,
    pub amount: Option<f64>,
}

/// Data for adding an ingredient to a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientCreate {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

/// Data for updating a recipe ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeIngredientUpdate {
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

impl RecipeIngredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            recipe_id: row.get("recipe_id")?,
            ingredient_id: row.get("ingredient_id")?,
            unit_id: row.get("unit_id")?,
            amount: row.get("amount")?,
        })
    }

    /// Add an ingredient to a recipe
    pub fn create(conn: &Connection, data: &RecipeIngredientCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, unit_id, amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.recipe_id, data.ingredient_id, data.unit_id, data.amount],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("RecipeIngredient", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipe_ingredients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get all ingredients for a recipe
    pub fn get_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY id")?;

        let ingredients = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ingredients)
    }

    /// Get ingredients with names for a recipe
    pub fn get_details_for_recipe(
        conn: &Connection,
        recipe_id: i64,
    ) -> DbResult<Vec<RecipeIngredientDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT ri.id, ri.ingredient_id, i.name AS ingredient_name,
                   ri.unit_id, u.name AS unit_name, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON ri.ingredient_id = i.id
            LEFT JOIN units u ON ri.unit_id = u.id
            WHERE ri.recipe_id = ?1
            ORDER BY ri.id
            "#,
        )?;

        let details = stmt
            .query_map([recipe_id], |row| {
                Ok(RecipeIngredientDetail {
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

    /// Update an ingredient's unit and/or amount
    pub fn update(conn: &Connection, id: i64, data: &RecipeIngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(unit_id) = data.unit_id {
            updates.push(format!("unit_id = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit_id));
        }
        if let Some(amount) = data.amount {
            updates.push(format!("amount = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(amount));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        let sql = format!(
            "UPDATE recipe_ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete an ingredient
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipe_ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Remove every ingredient from a recipe, returning how many were removed
    pub fn clear_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<usize> {
        let rows = conn.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [recipe_id])?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{Ingredient, IngredientCreate, Recipe, RecipeCreate, User};

    fn setup(conn: &Connection) -> (Recipe, Ingredient) {
        let user = User::create(conn, "anna").unwrap();
        let recipe = Recipe::create(
            conn,
            &RecipeCreate {
                user_id: user.id,
                name: "Soup".into(),
                portions: 2,
                prepare_time: None,
                description: None,
            },
        )
        .unwrap();
        let carrot = Ingredient::create(
            conn,
            &IngredientCreate {
                user_id: user.id,
                name: "Carrot".into(),
                ingredient_type: Default::default(),
                nutrients: Default::default(),
            },
        )
        .unwrap();
        (recipe, carrot)
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let conn = test_connection();
        let (recipe, carrot) = setup(&conn);
        let line = RecipeIngredient::create(
            &conn,
            &RecipeIngredientCreate {
                recipe_id: recipe.id,
                ingredient_id: carrot.id,
                unit_id: None,
                amount: Some(80.0),
            },
        )
        .unwrap();

        let updated = RecipeIngredient::update(
            &conn,
            line.id,
            &RecipeIngredientUpdate { amount: Some(120.0), ..Default::default() },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.amount, Some(120.0));
        assert_eq!(updated.unit_id, None);

        let details = RecipeIngredient::get_details_for_recipe(&conn, recipe.id).unwrap();
        assert_eq!(details[0].ingredient_name, "Carrot");
        assert!(details[0].unit_name.is_none());
    }

    #[test]
    fn test_clear_and_ingredient_delete_cascade() {
        let conn = test_connection();
        let (recipe, carrot) = setup(&conn);
        for amount in [10.0, 20.0] {
            RecipeIngredient::create(
                &conn,
                &RecipeIngredientCreate {
                    recipe_id: recipe.id,
                    ingredient_id: carrot.id,
                    unit_id: None,
                    amount: Some(amount),
                },
            )
            .unwrap();
        }

        Ingredient::delete(&conn, carrot.id).unwrap();
        assert!(RecipeIngredient::get_for_recipe(&conn, recipe.id).unwrap().is_empty());
        assert_eq!(RecipeIngredient::clear_for_recipe(&conn, recipe.id).unwrap(), 0);
    }
}
