//! Ingredient unit mapping
//!
//! Records how many grams one unit of an ingredient weighs. Every
//! ingredient carries a gram mapping at exactly 1.0.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::Unit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientUnit {
    pub id: i64,
    pub ingredient_id: i64,
    pub unit_id: i64,
    pub unit_name: String,
    pub grams_in_one_unit: f64,
}

const SELECT_MAPPING: &str = r#"
    SELECT iu.id, iu.ingredient_id, iu.unit_id, u.name AS unit_name, iu.grams_in_one_unit
    FROM ingredient_units iu
    INNER JOIN units u ON u.id = iu.unit_id
"#;

impl IngredientUnit {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ingredient_id: row.get("ingredient_id")?,
            unit_id: row.get("unit_id")?,
            unit_name: row.get("unit_name")?,
            grams_in_one_unit: row.get("grams_in_one_unit")?,
        })
    }

    /// Map the canonical gram unit at 1:1
    pub(crate) fn create_gram_mapping(conn: &Connection, ingredient_id: i64) -> DbResult<Self> {
        let gram = Unit::gram(conn)?;
        conn.execute(
            "INSERT INTO ingredient_units (ingredient_id, unit_id, grams_in_one_unit) VALUES (?1, ?2, 1.0)",
            params![ingredient_id, gram.id],
        )?;
        Self::get(conn, ingredient_id, gram.id)?
            .ok_or_else(|| DbError::not_found("IngredientUnit", conn.last_insert_rowid()))
    }

    /// Add a mapping for a non-gram unit
    pub fn create(
        conn: &Connection,
        ingredient_id: i64,
        unit_id: i64,
        grams_in_one_unit: f64,
    ) -> DbResult<Self> {
        let unit = Unit::get_by_id(conn, unit_id)?.ok_or_else(|| DbError::not_found("Unit", unit_id))?;
        if unit.is_gram() {
            return Err(DbError::Validation(
                "The gram mapping is created with the ingredient and fixed at 1.0".to_string(),
            ));
        }
        validate_factor(grams_in_one_unit)?;

        if Self::get(conn, ingredient_id, unit_id)?.is_some() {
            return Err(DbError::Validation(format!(
                "Ingredient {} already has a mapping for unit '{}'",
                ingredient_id, unit.name
            )));
        }

        conn.execute(
            "INSERT INTO ingredient_units (ingredient_id, unit_id, grams_in_one_unit) VALUES (?1, ?2, ?3)",
            params![ingredient_id, unit_id, grams_in_one_unit],
        )?;

        Self::get(conn, ingredient_id, unit_id)?
            .ok_or_else(|| DbError::not_found("IngredientUnit", conn.last_insert_rowid()))
    }

    /// Look up the mapping for (ingredient, unit)
    pub fn get(conn: &Connection, ingredient_id: i64, unit_id: i64) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE iu.ingredient_id = ?1 AND iu.unit_id = ?2", SELECT_MAPPING);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row(params![ingredient_id, unit_id], Self::from_row);
        match result {
            Ok(mapping) => Ok(Some(mapping)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_ingredient(conn: &Connection, ingredient_id: i64) -> DbResult<Vec<Self>> {
        let sql = format!("{} WHERE iu.ingredient_id = ?1 ORDER BY u.name", SELECT_MAPPING);
        let mut stmt = conn.prepare(&sql)?;

        let mappings = stmt
            .query_map([ingredient_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(mappings)
    }

    /// Change the gram factor of a non-gram mapping
    pub fn update_factor(
        conn: &Connection,
        ingredient_id: i64,
        unit_id: i64,
        grams_in_one_unit: f64,
    ) -> DbResult<Option<Self>> {
        guard_not_gram(conn, unit_id)?;
        validate_factor(grams_in_one_unit)?;

        let rows = conn.execute(
            "UPDATE ingredient_units SET grams_in_one_unit = ?1 WHERE ingredient_id = ?2 AND unit_id = ?3",
            params![grams_in_one_unit, ingredient_id, unit_id],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        Self::get(conn, ingredient_id, unit_id)
    }

    /// Recipe and meal lines that measure this ingredient in this unit
    pub fn usage_count(conn: &Connection, ingredient_id: i64, unit_id: i64) -> DbResult<i64> {
        let count = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM recipe_ingredients WHERE ingredient_id = ?1 AND unit_id = ?2)
                + (SELECT COUNT(*) FROM meal_ingredients WHERE ingredient_id = ?1 AND unit_id = ?2)
            "#,
            params![ingredient_id, unit_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Remove a non-gram mapping
    pub fn delete(conn: &Connection, ingredient_id: i64, unit_id: i64) -> DbResult<bool> {
        guard_not_gram(conn, unit_id)?;

        let rows = conn.execute(
            "DELETE FROM ingredient_units WHERE ingredient_id = ?1 AND unit_id = ?2",
            params![ingredient_id, unit_id],
        )?;
        Ok(rows > 0)
    }
}

fn validate_factor(grams_in_one_unit: f64) -> DbResult<()> {
    if !grams_in_one_unit.is_finite() || grams_in_one_unit <= 0.0 {
        return Err(DbError::Validation(
            "grams_in_one_unit must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn guard_not_gram(conn: &Connection, unit_id: i64) -> DbResult<()> {
    if Unit::gram(conn)?.id == unit_id {
        return Err(DbError::Validation(
            "The gram mapping cannot be changed or removed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{
        Ingredient, IngredientCreate, Meal, MealCreate, MealIngredient, MealIngredientCreate, Recipe,
        RecipeCreate, RecipeIngredient, RecipeIngredientCreate, User,
    };

    fn oats(conn: &Connection) -> Ingredient {
        let user = User::create(conn, "anna").unwrap();
        Ingredient::create(
            conn,
            &IngredientCreate {
                user_id: user.id,
                name: "Oats".into(),
                ingredient_type: Default::default(),
                nutrients: Default::default(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_one_mapping_per_unit() {
        let conn = test_connection();
        let oats = oats(&conn);
        let spoon = Unit::create(&conn, "spoon").unwrap();

        IngredientUnit::create(&conn, oats.id, spoon.id, 10.0).unwrap();
        let err = IngredientUnit::create(&conn, oats.id, spoon.id, 12.0).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn test_gram_mapping_is_fixed() {
        let conn = test_connection();
        let oats = oats(&conn);
        let gram = Unit::gram(&conn).unwrap();

        assert!(IngredientUnit::create(&conn, oats.id, gram.id, 2.0).is_err());
        assert!(IngredientUnit::update_factor(&conn, oats.id, gram.id, 2.0).is_err());
        assert!(IngredientUnit::delete(&conn, oats.id, gram.id).is_err());
        assert_eq!(
            IngredientUnit::get(&conn, oats.id, gram.id).unwrap().unwrap().grams_in_one_unit,
            1.0
        );
    }

    #[test]
    fn test_factor_must_be_positive() {
        let conn = test_connection();
        let oats = oats(&conn);
        let cup = Unit::create(&conn, "cup").unwrap();

        assert!(IngredientUnit::create(&conn, oats.id, cup.id, 0.0).is_err());
        assert!(IngredientUnit::create(&conn, oats.id, cup.id, f64::NAN).is_err());
        let mapping = IngredientUnit::create(&conn, oats.id, cup.id, 90.0).unwrap();
        assert_eq!(mapping.unit_name, "cup");
    }

    #[test]
    fn test_usage_count_spans_recipes_and_meals() {
        let conn = test_connection();
        let oats = oats(&conn);
        let cup = Unit::create(&conn, "cup").unwrap();
        IngredientUnit::create(&conn, oats.id, cup.id, 90.0).unwrap();
        assert_eq!(IngredientUnit::usage_count(&conn, oats.id, cup.id).unwrap(), 0);

        let recipe = Recipe::create(
            &conn,
            &RecipeCreate {
                user_id: oats.user_id,
                name: "Porridge".into(),
                portions: 1,
                prepare_time: None,
                description: None,
            },
        )
        .unwrap();
        RecipeIngredient::create(
            &conn,
            &RecipeIngredientCreate {
                recipe_id: recipe.id,
                ingredient_id: oats.id,
                unit_id: Some(cup.id),
                amount: Some(1.0),
            },
        )
        .unwrap();
        let meal = Meal::create(
            &conn,
            &MealCreate { user_id: oats.user_id, date: "2025-03-01".into(), category_id: None },
        )
        .unwrap();
        MealIngredient::create(
            &conn,
            &MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: oats.id,
                unit_id: Some(cup.id),
                amount: Some(0.5),
            },
        )
        .unwrap();

        assert_eq!(IngredientUnit::usage_count(&conn, oats.id, cup.id).unwrap(), 2);
    }
}
