//! Recipe and meal aggregate calculators
//!
//! Aggregates are pure functions of the current association lists. Each
//! recalculation loads the lists, computes from scratch and persists only
//! the derived fields, so repeated calls with unchanged data store the same
//! values.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::db::migrations::GRAM_UNIT_NAME;
use crate::db::DbResult;
use crate::models::{round2, Meal, Nutrients, Nutrition, Recipe};
use super::converter::to_grams_checked;
use super::units::UnitFactor;

/// One ingredient association of a recipe or meal, joined with what the
/// calculation needs from the ingredient and its unit mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub association_id: i64,
    pub ingredient_id: i64,
    /// Macros per 100 g, unknown values already read as zero
    pub per_100g: Nutrition,
    pub unit_id: Option<i64>,
    pub factor: UnitFactor,
    pub amount: Option<f64>,
}

impl IngredientLine {
    /// Nutrition this line adds. Incomplete lines add nothing.
    pub fn contribution(&self) -> DbResult<Nutrition> {
        let (Some(unit_id), Some(amount)) = (self.unit_id, self.amount) else {
            return Ok(Nutrition::zero());
        };
        let grams = to_grams_checked(self.ingredient_id, unit_id, amount, self.factor)?;
        Ok(self.per_100g.scale(grams / 100.0))
    }
}

/// One recipe eaten in a meal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipePortionLine {
    pub recipe_id: i64,
    pub recipe_calories: Option<f64>,
    pub recipe_portions: i64,
    pub portion: f64,
}

impl RecipePortionLine {
    /// Calories of the eaten share of the recipe.
    ///
    /// `recipe_portions` is at least 1, enforced when recipes are written.
    pub fn calories(&self) -> f64 {
        match self.recipe_calories {
            Some(calories) => calories * (self.portion / self.recipe_portions as f64),
            None => 0.0,
        }
    }
}

/// Total recipe nutrition over its ingredient lines, rounded to 2 places
pub fn recipe_totals(lines: &[IngredientLine]) -> DbResult<Nutrition> {
    let mut total = Nutrition::zero();
    for line in lines {
        total = total + line.contribution()?;
    }
    Ok(total.rounded())
}

/// Total meal calories over its recipe portions and direct ingredients
pub fn meal_calories(recipes: &[RecipePortionLine], ingredients: &[IngredientLine]) -> DbResult<f64> {
    let mut calories: f64 = recipes.iter().map(RecipePortionLine::calories).sum();
    for line in ingredients {
        calories += line.contribution()?.calories;
    }
    Ok(round2(calories))
}

/// Which association table ingredient lines are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Recipe,
    Meal,
}

impl LineSource {
    fn table_and_owner(&self) -> (&'static str, &'static str) {
        match self {
            LineSource::Recipe => ("recipe_ingredients", "recipe_id"),
            LineSource::Meal => ("meal_ingredients", "meal_id"),
        }
    }
}

fn ingredient_line_from_row(row: &Row) -> rusqlite::Result<IngredientLine> {
    let unit_name: Option<String> = row.get("unit_name")?;
    let grams_in_one_unit: Option<f64> = row.get("grams_in_one_unit")?;

    let factor = match (unit_name.as_deref(), grams_in_one_unit) {
        (Some(GRAM_UNIT_NAME), _) => UnitFactor::Gram,
        (_, Some(grams)) => UnitFactor::Mapped(grams),
        _ => UnitFactor::Unmapped,
    };

    Ok(IngredientLine {
        association_id: row.get("association_id")?,
        ingredient_id: row.get("ingredient_id")?,
        per_100g: Nutrients {
            calories: row.get("calories")?,
            protein: row.get("protein")?,
            carbs: row.get("carbs")?,
            fat: row.get("fat")?,
            ..Default::default()
        }
        .macros(),
        unit_id: row.get("unit_id")?,
        factor,
        amount: row.get("amount")?,
    })
}

/// Load the ingredient associations of a recipe or meal
pub fn load_ingredient_lines(
    conn: &Connection,
    source: LineSource,
    owner_id: i64,
) -> DbResult<Vec<IngredientLine>> {
    let (table, owner) = source.table_and_owner();
    let sql = format!(
        r#"
        SELECT a.id AS association_id, a.ingredient_id, a.unit_id, a.amount,
               i.calories, i.protein, i.carbs, i.fat,
               u.name AS unit_name, iu.grams_in_one_unit
        FROM {table} a
        INNER JOIN ingredients i ON i.id = a.ingredient_id
        LEFT JOIN units u ON u.id = a.unit_id
        LEFT JOIN ingredient_units iu
            ON iu.ingredient_id = a.ingredient_id AND iu.unit_id = a.unit_id
        WHERE a.{owner} = ?1
        ORDER BY a.id
        "#
    );

    let mut stmt = conn.prepare(&sql)?;
    let lines = stmt
        .query_map([owner_id], ingredient_line_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(lines)
}

/// Load the recipe portions of a meal
pub fn load_recipe_portion_lines(conn: &Connection, meal_id: i64) -> DbResult<Vec<RecipePortionLine>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT mr.recipe_id, mr.portion, r.calories, r.portions
        FROM meal_recipes mr
        INNER JOIN recipes r ON r.id = mr.recipe_id
        WHERE mr.meal_id = ?1
        ORDER BY mr.id
        "#,
    )?;

    let lines = stmt
        .query_map([meal_id], |row| {
            Ok(RecipePortionLine {
                recipe_id: row.get("recipe_id")?,
                recipe_calories: row.get("calories")?,
                recipe_portions: row.get("portions")?,
                portion: row.get("portion")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(lines)
}

/// Recompute and persist a recipe's calories, protein, carbs and fat
pub fn recalculate_recipe_nutrition(conn: &Connection, recipe_id: i64) -> DbResult<Nutrition> {
    Recipe::require(conn, recipe_id)?;

    let lines = load_ingredient_lines(conn, LineSource::Recipe, recipe_id)?;
    let totals = recipe_totals(&lines)?;
    Recipe::update_nutrition(conn, recipe_id, &totals)?;

    tracing::debug!(
        recipe_id,
        ingredients = lines.len(),
        calories = totals.calories,
        "Recalculated recipe nutrition"
    );
    Ok(totals)
}

/// Recompute and persist a meal's calories
pub fn recalculate_meal_calories(conn: &Connection, meal_id: i64) -> DbResult<f64> {
    Meal::require(conn, meal_id)?;

    let recipes = load_recipe_portion_lines(conn, meal_id)?;
    let ingredients = load_ingredient_lines(conn, LineSource::Meal, meal_id)?;
    let calories = meal_calories(&recipes, &ingredients)?;
    Meal::update_calories(conn, meal_id, calories)?;

    tracing::debug!(
        meal_id,
        recipes = recipes.len(),
        ingredients = ingredients.len(),
        calories,
        "Recalculated meal calories"
    );
    Ok(calories)
}
