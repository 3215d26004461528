//! Ingredient model
//!
//! A user-owned ingredient with nutrition per 100 grams.

use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{IngredientUnit, Nutrients};

/// Physical form of an ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IngredientType {
    #[default]
    Solid,
    Liquid,
}

impl IngredientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientType::Solid => "solid",
            IngredientType::Liquid => "liquid",
        }
    }

}

impl FromStr for IngredientType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solid" => Ok(IngredientType::Solid),
            "liquid" => Ok(IngredientType::Liquid),
            other => Err(DbError::Validation(format!(
                "Unknown ingredient type '{}', expected solid or liquid",
                other
            ))),
        }
    }
}

impl FromSql for IngredientType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// An ingredient with its per-100g nutrient profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub ingredient_type: IngredientType,
    pub nutrients: Nutrients,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub ingredient_type: IngredientType,
    #[serde(default)]
    pub nutrients: Nutrients,
}

/// Data for updating an ingredient. Only `Some` fields are written; a
/// nutrient set to `Some(None)` is reset to unknown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub ingredient_type: Option<IngredientType>,
    pub calories: Option<Option<f64>>,
    pub protein: Option<Option<f64>>,
    pub carbs: Option<Option<f64>>,
    pub fat: Option<Option<f64>>,
    pub fiber: Option<Option<f64>>,
    pub sodium: Option<Option<f64>>,
    pub potassium: Option<Option<f64>>,
    pub calcium: Option<Option<f64>>,
    pub iron: Option<Option<f64>>,
    pub magnesium: Option<Option<f64>>,
    pub selenium: Option<Option<f64>>,
    pub zinc: Option<Option<f64>>,
}

impl IngredientUpdate {
    /// Whether the update changes a value that recipe or meal aggregates read
    pub fn touches_aggregates(&self) -> bool {
        self.calories.is_some()
            || self.protein.is_some()
            || self.carbs.is_some()
            || self.fat.is_some()
    }

    /// Mark a nutrient, by column name, to be reset to unknown
    pub fn clear_nutrient(&mut self, field: &str) -> DbResult<()> {
        let slot = match field.trim().to_lowercase().as_str() {
            "calories" => &mut self.calories,
            "protein" => &mut self.protein,
            "carbs" => &mut self.carbs,
            "fat" => &mut self.fat,
            "fiber" => &mut self.fiber,
            "sodium" => &mut self.sodium,
            "potassium" => &mut self.potassium,
            "calcium" => &mut self.calcium,
            "iron" => &mut self.iron,
            "magnesium" => &mut self.magnesium,
            "selenium" => &mut self.selenium,
            "zinc" => &mut self.zinc,
            other => {
                return Err(DbError::Validation(format!("Unknown nutrient '{}'", other)));
            }
        };
        *slot = Some(None);
        Ok(())
    }
}

impl Ingredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            ingredient_type: row.get("ingredient_type")?,
            nutrients: Nutrients {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fat: row.get("fat")?,
                fiber: row.get("fiber")?,
                sodium: row.get("sodium")?,
                potassium: row.get("potassium")?,
                calcium: row.get("calcium")?,
                iron: row.get("iron")?,
                magnesium: row.get("magnesium")?,
                selenium: row.get("selenium")?,
                zinc: row.get("zinc")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new ingredient together with its 1:1 gram mapping.
    ///
    /// Both rows are written on `conn`; run inside a transaction to keep
    /// them atomic.
    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let n = &data.nutrients;
        conn.execute(
            r#"
            INSERT INTO ingredients (
                user_id, name, ingredient_type,
                calories, protein, carbs, fat, fiber, sodium,
                potassium, calcium, iron, magnesium, selenium, zinc
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                data.user_id,
                data.name.trim(),
                data.ingredient_type.as_str(),
                n.calories,
                n.protein,
                n.carbs,
                n.fat,
                n.fiber,
                n.sodium,
                n.potassium,
                n.calcium,
                n.iron,
                n.magnesium,
                n.selenium,
                n.zinc,
            ],
        )?;

        let id = conn.last_insert_rowid();
        IngredientUnit::create_gram_mapping(conn, id)?;

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Ingredient", id))
    }

    /// Get an ingredient by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get an ingredient by ID, failing if it does not exist
    pub fn require(conn: &Connection, id: i64) -> DbResult<Self> {
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Ingredient", id))
    }

    /// Find a user's ingredient by exact name
    pub fn get_by_name(conn: &Connection, user_id: i64, name: &str) -> DbResult<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM ingredients WHERE user_id = ?1 AND name = ?2")?;

        let result = stmt.query_row(params![user_id, name.trim()], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List a user's ingredients, optionally filtered by a name fragment
    pub fn list_for_user(
        conn: &Connection,
        user_id: i64,
        query: Option<&str>,
    ) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE user_id = ?1 AND name LIKE ?2
            ORDER BY name ASC
            "#,
        )?;

        let items = stmt
            .query_map(params![user_id, pattern], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Update an ingredient
    pub fn update(conn: &Connection, id: i64, data: &IngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", stringify!($field), params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(kind) = data.ingredient_type {
            updates.push(format!("ingredient_type = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(kind.as_str()));
        }

        add_update!(calories);
        add_update!(protein);
        add_update!(carbs);
        add_update!(fat);
        add_update!(fiber);
        add_update!(sodium);
        add_update!(potassium);
        add_update!(calcium);
        add_update!(iron);
        add_update!(magnesium);
        add_update!(selenium);
        add_update!(zinc);

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE ingredients SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete an ingredient. Mappings and associations cascade.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Recipe IDs that use this ingredient
    pub fn recipe_ids_using(conn: &Connection, id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT recipe_id FROM recipe_ingredients WHERE ingredient_id = ?1 ORDER BY recipe_id",
        )?;

        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Meal IDs that list this ingredient directly
    pub fn meal_ids_using(conn: &Connection, id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT meal_id FROM meal_ingredients WHERE ingredient_id = ?1 ORDER BY meal_id",
        )?;

        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{Unit, User};

    fn create(conn: &Connection, user_id: i64, name: &str) -> Ingredient {
        Ingredient::create(
            conn,
            &IngredientCreate {
                user_id,
                name: name.to_string(),
                ingredient_type: IngredientType::Solid,
                nutrients: Nutrients { calories: Some(100.0), ..Default::default() },
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_adds_gram_mapping() {
        let conn = test_connection();
        let user = User::create(&conn, "anna").unwrap();
        let oats = create(&conn, user.id, "Oats");

        let gram = Unit::gram(&conn).unwrap();
        let mapping = IngredientUnit::get(&conn, oats.id, gram.id).unwrap().unwrap();
        assert_eq!(mapping.grams_in_one_unit, 1.0);
        assert_eq!(IngredientUnit::list_for_ingredient(&conn, oats.id).unwrap().len(), 1);
    }

    #[test]
    fn test_name_unique_per_user() {
        let conn = test_connection();
        let anna = User::create(&conn, "anna").unwrap();
        let ben = User::create(&conn, "ben").unwrap();
        create(&conn, anna.id, "Oats");
        create(&conn, ben.id, "Oats");

        let duplicate = Ingredient::create(
            &conn,
            &IngredientCreate {
                user_id: anna.id,
                name: "Oats".to_string(),
                ingredient_type: IngredientType::Solid,
                nutrients: Nutrients::default(),
            },
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let conn = test_connection();
        let user = User::create(&conn, "anna").unwrap();
        let oats = create(&conn, user.id, "Oats");

        let update = IngredientUpdate { protein: Some(Some(13.0)), ..Default::default() };
        assert!(update.touches_aggregates());
        let updated = Ingredient::update(&conn, oats.id, &update).unwrap().unwrap();
        assert_eq!(updated.nutrients.calories, Some(100.0));
        assert_eq!(updated.nutrients.protein, Some(13.0));

        let rename = IngredientUpdate { name: Some("Rolled oats".into()), ..Default::default() };
        assert!(!rename.touches_aggregates());
    }

    #[test]
    fn test_cleared_nutrient_becomes_unknown() {
        let conn = test_connection();
        let user = User::create(&conn, "anna").unwrap();
        let oats = create(&conn, user.id, "Oats");

        let mut update = IngredientUpdate::default();
        update.clear_nutrient("Calories").unwrap();
        assert!(update.touches_aggregates());
        assert!(update.clear_nutrient("vitamin_c").is_err());

        let updated = Ingredient::update(&conn, oats.id, &update).unwrap().unwrap();
        assert_eq!(updated.nutrients.calories, None);
    }

    #[test]
    fn test_ingredient_type_parsing() {
        assert_eq!(" Liquid ".parse::<IngredientType>().unwrap(), IngredientType::Liquid);
        assert_eq!("solid".parse::<IngredientType>().unwrap(), IngredientType::Solid);
        assert!(matches!("gas".parse::<IngredientType>(), Err(DbError::Validation(_))));
    }
}
