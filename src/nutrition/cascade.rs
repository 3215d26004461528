//! Recalculation cascade
//!
//! Recomputes derived values after a mutation: ingredient changes flow into
//! recipes, recipe changes flow into meals. Recipes always settle before the
//! meals that read them.
//!
//! A directly requested recalculation propagates its error. Inside a batch
//! (every recipe of an ingredient, every meal of a recipe) one entity
//! failing is logged, recorded in the report and skipped, so the others
//! still update.

use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::DbResult;
use crate::models::{Ingredient, Meal, Recipe};
use super::aggregate::{recalculate_meal_calories, recalculate_recipe_nutrition};

/// An entity a batch recalculation had to skip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeFailure {
    pub entity: &'static str,
    pub id: i64,
    pub error: String,
}

/// What a recalculation touched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    pub recipes_recalculated: Vec<i64>,
    pub meals_recalculated: Vec<i64>,
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: CascadeReport) {
        self.recipes_recalculated.extend(other.recipes_recalculated);
        self.meals_recalculated.extend(other.meals_recalculated);
        self.failures.extend(other.failures);
    }

    fn record_failure(&mut self, entity: &'static str, id: i64, error: String) {
        self.failures.push(CascadeFailure { entity, id, error });
    }
}

/// Recompute one recipe, then every meal that includes it.
///
/// An error on the recipe itself propagates. Meal failures are collected.
pub fn recalculate_recipe(conn: &Connection, recipe_id: i64) -> DbResult<CascadeReport> {
    recalculate_recipe_nutrition(conn, recipe_id)?;

    let mut report = CascadeReport {
        recipes_recalculated: vec![recipe_id],
        ..Default::default()
    };
    report.merge(recalculate_meals_for_recipe(conn, recipe_id)?);
    Ok(report)
}

/// Recompute one meal. Errors propagate.
pub fn recalculate_meal(conn: &Connection, meal_id: i64) -> DbResult<f64> {
    recalculate_meal_calories(conn, meal_id)
}

/// Recompute every meal that includes a recipe
pub fn recalculate_meals_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<CascadeReport> {
    let meal_ids = Recipe::meal_ids_using(conn, recipe_id)?;

    let mut report = CascadeReport::default();
    recalculate_meal_batch(conn, meal_ids, &mut report);
    Ok(report)
}

/// Recompute every recipe that uses an ingredient, then every meal that
/// includes one of those recipes or lists the ingredient directly
pub fn recalculate_recipes_for_ingredient(
    conn: &Connection,
    ingredient_id: i64,
) -> DbResult<CascadeReport> {
    let recipe_ids = Ingredient::recipe_ids_using(conn, ingredient_id)?;
    let meal_ids = Ingredient::meal_ids_using(conn, ingredient_id)?;
    recalculate_affected(conn, &recipe_ids, &meal_ids)
}

/// Batch-recompute the given recipes, then the given meals together with
/// every meal that includes one of those recipes.
///
/// Used after deletions, where the affected IDs have to be collected before
/// the rows that link them disappear.
pub fn recalculate_affected(
    conn: &Connection,
    recipe_ids: &[i64],
    meal_ids: &[i64],
) -> DbResult<CascadeReport> {
    let mut report = CascadeReport::default();
    let mut meals: BTreeSet<i64> = meal_ids.iter().copied().collect();

    for &recipe_id in recipe_ids {
        match recalculate_recipe_nutrition(conn, recipe_id) {
            Ok(_) => report.recipes_recalculated.push(recipe_id),
            Err(e) => {
                tracing::warn!(recipe_id, error = %e, "Skipping recipe recalculation");
                report.record_failure("recipe", recipe_id, e.to_string());
            }
        }
        // A recipe that failed still had its meals' inputs touched
        meals.extend(Recipe::meal_ids_using(conn, recipe_id)?);
    }

    recalculate_meal_batch(conn, meals, &mut report);
    Ok(report)
}

/// Recompute every recipe and then every meal, optionally for one user
pub fn recalculate_all(conn: &Connection, user_id: Option<i64>) -> DbResult<CascadeReport> {
    let recipe_ids = Recipe::ids(conn, user_id)?;
    let meal_ids = Meal::ids(conn, user_id)?;

    tracing::info!(
        recipes = recipe_ids.len(),
        meals = meal_ids.len(),
        "Recalculating all derived values"
    );
    recalculate_affected(conn, &recipe_ids, &meal_ids)
}

fn recalculate_meal_batch<I>(conn: &Connection, meal_ids: I, report: &mut CascadeReport)
where
    I: IntoIterator<Item = i64>,
{
    for meal_id in meal_ids {
        match recalculate_meal_calories(conn, meal_id) {
            Ok(_) => report.meals_recalculated.push(meal_id),
            Err(e) => {
                tracing::warn!(meal_id, error = %e, "Skipping meal recalculation");
                report.record_failure("meal", meal_id, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_connection, DbError};
    use crate::models::{
        IngredientCreate, IngredientUnit, IngredientUpdate, MealCreate, MealIngredient,
        MealIngredientCreate, MealRecipe, Nutrients, RecipeCreate, RecipeIngredient,
        RecipeIngredientCreate, Unit, User,
    };

    struct Fixture {
        user_id: i64,
        gram_id: i64,
    }

    fn fixture(conn: &Connection) -> Fixture {
        let user = User::create(conn, "anna").unwrap();
        Fixture {
            user_id: user.id,
            gram_id: Unit::gram(conn).unwrap().id,
        }
    }

    fn ingredient(conn: &Connection, fx: &Fixture, name: &str, calories: f64) -> Ingredient {
        Ingredient::create(
            conn,
            &IngredientCreate {
                user_id: fx.user_id,
                name: name.into(),
                ingredient_type: Default::default(),
                nutrients: Nutrients { calories: Some(calories), ..Default::default() },
            },
        )
        .unwrap()
    }

    fn recipe(conn: &Connection, fx: &Fixture, portions: i64) -> Recipe {
        Recipe::create(
            conn,
            &RecipeCreate {
                user_id: fx.user_id,
                name: format!("Recipe for {}", portions),
                portions,
                prepare_time: None,
                description: None,
            },
        )
        .unwrap()
    }

    fn add_to_recipe(conn: &Connection, recipe_id: i64, ingredient_id: i64, unit_id: i64, amount: f64) {
        RecipeIngredient::create(
            conn,
            &RecipeIngredientCreate {
                recipe_id,
                ingredient_id,
                unit_id: Some(unit_id),
                amount: Some(amount),
            },
        )
        .unwrap();
    }

    fn meal(conn: &Connection, fx: &Fixture) -> Meal {
        Meal::create(
            conn,
            &MealCreate { user_id: fx.user_id, date: "2025-03-01".into(), category_id: None },
        )
        .unwrap()
    }

    #[test]
    fn test_ingredient_change_reaches_recipe_and_meal() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let oats = ingredient(&conn, &fx, "Oats", 100.0);
        let porridge = recipe(&conn, &fx, 1);
        add_to_recipe(&conn, porridge.id, oats.id, fx.gram_id, 100.0);
        let breakfast = meal(&conn, &fx);
        MealRecipe::create(&conn, breakfast.id, porridge.id, 1.0).unwrap();

        recalculate_recipe(&conn, porridge.id).unwrap();
        assert_eq!(Recipe::require(&conn, porridge.id).unwrap().nutrition.calories, 100.0);
        assert_eq!(Meal::require(&conn, breakfast.id).unwrap().calories, 100.0);

        Ingredient::update(
            &conn,
            oats.id,
            &IngredientUpdate { calories: Some(Some(200.0)), ..Default::default() },
        )
        .unwrap();
        let report = recalculate_recipes_for_ingredient(&conn, oats.id).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.recipes_recalculated, vec![porridge.id]);
        assert_eq!(report.meals_recalculated, vec![breakfast.id]);
        assert_eq!(Recipe::require(&conn, porridge.id).unwrap().nutrition.calories, 200.0);
        assert_eq!(Meal::require(&conn, breakfast.id).unwrap().calories, 200.0);
    }

    #[test]
    fn test_ingredient_change_reaches_direct_meal_ingredients() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let apple = ingredient(&conn, &fx, "Apple", 52.0);
        let snack = meal(&conn, &fx);
        MealIngredient::create(
            &conn,
            &MealIngredientCreate {
                meal_id: snack.id,
                ingredient_id: apple.id,
                unit_id: Some(fx.gram_id),
                amount: Some(200.0),
            },
        )
        .unwrap();

        let report = recalculate_recipes_for_ingredient(&conn, apple.id).unwrap();
        assert!(report.recipes_recalculated.is_empty());
        assert_eq!(report.meals_recalculated, vec![snack.id]);
        assert_eq!(Meal::require(&conn, snack.id).unwrap().calories, 104.0);
    }

    #[test]
    fn test_portion_change_rescales_meal() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let rice = ingredient(&conn, &fx, "Rice", 100.0);
        let pot = recipe(&conn, &fx, 4);
        add_to_recipe(&conn, pot.id, rice.id, fx.gram_id, 400.0);
        let dinner = meal(&conn, &fx);
        let link = MealRecipe::create(&conn, dinner.id, pot.id, 1.0).unwrap();

        recalculate_recipe(&conn, pot.id).unwrap();
        assert_eq!(Meal::require(&conn, dinner.id).unwrap().calories, 100.0);

        MealRecipe::update_portion(&conn, link.id, 2.0).unwrap();
        assert_eq!(recalculate_meal(&conn, dinner.id).unwrap(), 200.0);
    }

    #[test]
    fn test_batch_skips_failing_recipe() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let sugar = ingredient(&conn, &fx, "Sugar", 400.0);
        let spoon = Unit::create(&conn, "spoon").unwrap();
        IngredientUnit::create(&conn, sugar.id, spoon.id, 5.0).unwrap();

        let tea = recipe(&conn, &fx, 1);
        add_to_recipe(&conn, tea.id, sugar.id, spoon.id, 2.0);
        let cake = recipe(&conn, &fx, 2);
        add_to_recipe(&conn, cake.id, sugar.id, fx.gram_id, 100.0);

        // Dropping the mapping leaves the tea recipe with an unconvertible line
        IngredientUnit::delete(&conn, sugar.id, spoon.id).unwrap();

        let report = recalculate_recipes_for_ingredient(&conn, sugar.id).unwrap();
        assert_eq!(report.recipes_recalculated, vec![cake.id]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entity, "recipe");
        assert_eq!(report.failures[0].id, tea.id);
        assert_eq!(Recipe::require(&conn, cake.id).unwrap().nutrition.calories, 400.0);
    }

    #[test]
    fn test_direct_recalculation_propagates_errors() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let salt = ingredient(&conn, &fx, "Salt", 0.0);
        let pinch = Unit::create(&conn, "pinch").unwrap();
        IngredientUnit::create(&conn, salt.id, pinch.id, 0.3).unwrap();
        let soup = recipe(&conn, &fx, 1);
        add_to_recipe(&conn, soup.id, salt.id, pinch.id, 1.0);
        IngredientUnit::delete(&conn, salt.id, pinch.id).unwrap();

        assert!(matches!(
            recalculate_recipe(&conn, soup.id),
            Err(DbError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_recalculate_affected_after_removal() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let butter = ingredient(&conn, &fx, "Butter", 700.0);
        let toast = recipe(&conn, &fx, 1);
        add_to_recipe(&conn, toast.id, butter.id, fx.gram_id, 10.0);
        let lunch = meal(&conn, &fx);
        MealRecipe::create(&conn, lunch.id, toast.id, 1.0).unwrap();
        recalculate_recipe(&conn, toast.id).unwrap();
        assert_eq!(Meal::require(&conn, lunch.id).unwrap().calories, 70.0);

        let recipe_ids = Ingredient::recipe_ids_using(&conn, butter.id).unwrap();
        let meal_ids = Ingredient::meal_ids_using(&conn, butter.id).unwrap();
        Ingredient::delete(&conn, butter.id).unwrap();

        let report = recalculate_affected(&conn, &recipe_ids, &meal_ids).unwrap();
        assert!(report.is_clean());
        assert_eq!(Recipe::require(&conn, toast.id).unwrap().nutrition.calories, 0.0);
        assert_eq!(Meal::require(&conn, lunch.id).unwrap().calories, 0.0);
    }

    #[test]
    fn test_recalculate_all_is_idempotent() {
        let conn = test_connection();
        let fx = fixture(&conn);
        let milk = ingredient(&conn, &fx, "Milk", 64.0);
        let shake = recipe(&conn, &fx, 2);
        add_to_recipe(&conn, shake.id, milk.id, fx.gram_id, 500.0);
        let dinner = meal(&conn, &fx);
        MealRecipe::create(&conn, dinner.id, shake.id, 1.0).unwrap();

        let first = recalculate_all(&conn, Some(fx.user_id)).unwrap();
        let calories = Meal::require(&conn, dinner.id).unwrap().calories;
        let second = recalculate_all(&conn, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(calories, 160.0);
        assert_eq!(Meal::require(&conn, dinner.id).unwrap().calories, calories);
    }
}
