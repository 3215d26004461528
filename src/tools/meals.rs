//! Meal MCP Tools
//!
//! Meals and the recipes and ingredients eaten in them. Each change to a
//! meal's contents recalculates that meal's calories.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{Database, DbError, DbResult};
use crate::models::{
    Ingredient, Meal, MealCategory, MealCreate, MealIngredient, MealIngredientCreate,
    MealIngredientDetail, MealIngredientUpdate, MealRecipe, MealRecipeDetail, MealUpdate, Recipe,
    User,
};
use crate::nutrition::{ensure_unit_valid, recalculate_meal};
use super::{parse_date, require_positive, require_same_owner, ToolResult};

/// Full meal detail with its recipes and ingredients
#[derive(Debug, Serialize)]
pub struct MealDetail {
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub category: Option<MealCategory>,
    pub calories: f64,
    pub recipes: Vec<MealRecipeDetail>,
    pub ingredients: Vec<MealIngredientDetail>,
    pub created_at: String,
    pub updated_at: String,
}

/// Response for list_meals
#[derive(Debug, Serialize)]
pub struct ListMealsResponse {
    pub user_id: i64,
    pub date: String,
    pub meals: Vec<Meal>,
    pub total_calories: f64,
}

/// Response for every change to a meal's contents
#[derive(Debug, Serialize)]
pub struct MealMutationResponse {
    pub meal_id: i64,
    /// ID of the association row that was added or changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
    pub calories: f64,
}

#[derive(Debug, Serialize)]
pub struct DeleteMealResponse {
    pub success: bool,
    pub deleted_id: i64,
}

fn validate_category(conn: &Connection, user_id: i64, category_id: Option<i64>) -> DbResult<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    let category = MealCategory::get_by_id(conn, category_id)?
        .ok_or_else(|| DbError::not_found("MealCategory", category_id))?;
    require_same_owner(user_id, "Meal category", category_id, category.user_id)
}

fn settle(conn: &Connection, meal_id: i64, entry_id: Option<i64>) -> DbResult<MealMutationResponse> {
    let calories = recalculate_meal(conn, meal_id)?;
    Ok(MealMutationResponse { meal_id, entry_id, calories })
}

// ============================================================================
// Meal Tools
// ============================================================================

/// Create an empty meal on a date
pub fn create_meal(db: &Database, data: MealCreate) -> ToolResult<Meal> {
    Ok(db.with_transaction(|conn| {
        User::get_by_id(conn, data.user_id)?
            .ok_or_else(|| DbError::not_found("User", data.user_id))?;
        validate_category(conn, data.user_id, data.category_id)?;

        let data = MealCreate { date: parse_date(&data.date)?, ..data };
        Meal::create(conn, &data)
    })?)
}

pub fn get_meal(db: &Database, id: i64) -> ToolResult<Option<MealDetail>> {
    Ok(db.with_conn(|conn| {
        let Some(meal) = Meal::get_by_id(conn, id)? else {
            return Ok(None);
        };

        let category = match meal.category_id {
            Some(category_id) => MealCategory::get_by_id(conn, category_id)?,
            None => None,
        };

        Ok(Some(MealDetail {
            id: meal.id,
            user_id: meal.user_id,
            date: meal.date,
            category,
            calories: meal.calories,
            recipes: MealRecipe::get_details_for_meal(conn, id)?,
            ingredients: MealIngredient::get_details_for_meal(conn, id)?,
            created_at: meal.created_at,
            updated_at: meal.updated_at,
        }))
    })?)
}

/// List a user's meals on a date
pub fn list_meals(db: &Database, user_id: i64, date: &str) -> ToolResult<ListMealsResponse> {
    let date = parse_date(date)?;
    let meals = db.with_conn(|conn| Meal::list_for_date(conn, user_id, &date))?;
    let total_calories = crate::models::round2(meals.iter().map(|m| m.calories).sum());

    Ok(ListMealsResponse { user_id, date, meals, total_calories })
}

/// Move a meal to another date or category
pub fn update_meal(db: &Database, id: i64, data: MealUpdate) -> ToolResult<Meal> {
    Ok(db.with_transaction(|conn| {
        let meal = Meal::require(conn, id)?;
        validate_category(conn, meal.user_id, data.category_id)?;

        let date = data.date.as_deref().map(parse_date).transpose()?;
        Meal::update(conn, id, &MealUpdate { date, ..data })?
            .ok_or_else(|| DbError::not_found("Meal", id))
    })?)
}

pub fn delete_meal(db: &Database, id: i64) -> ToolResult<DeleteMealResponse> {
    db.with_transaction(|conn| {
        if !Meal::delete(conn, id)? {
            return Err(DbError::not_found("Meal", id));
        }
        Ok(())
    })?;

    Ok(DeleteMealResponse { success: true, deleted_id: id })
}

/// Recalculate a meal on request
pub fn recalculate_meal_calories(db: &Database, id: i64) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| settle(conn, id, None))?)
}

// ============================================================================
// Meal Recipe Tools
// ============================================================================

/// Add a portion of a recipe to a meal
pub fn add_meal_recipe(db: &Database, meal_id: i64, recipe_id: i64, portion: f64) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let meal = Meal::require(conn, meal_id)?;
        let recipe = Recipe::require(conn, recipe_id)?;
        require_same_owner(meal.user_id, "Recipe", recipe_id, recipe.user_id)?;
        require_positive("portion", portion)?;

        let entry = MealRecipe::create(conn, meal_id, recipe_id, portion)?;
        settle(conn, meal_id, Some(entry.id))
    })?)
}

pub fn update_meal_recipe(db: &Database, id: i64, portion: f64) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        require_positive("portion", portion)?;
        let entry = MealRecipe::update_portion(conn, id, portion)?
            .ok_or_else(|| DbError::not_found("MealRecipe", id))?;
        settle(conn, entry.meal_id, Some(id))
    })?)
}

pub fn remove_meal_recipe(db: &Database, id: i64) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let entry = MealRecipe::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("MealRecipe", id))?;
        MealRecipe::delete(conn, id)?;
        settle(conn, entry.meal_id, None)
    })?)
}

// ============================================================================
// Meal Ingredient Tools
// ============================================================================

/// Add an ingredient eaten directly in a meal
pub fn add_meal_ingredient(db: &Database, data: MealIngredientCreate) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let meal = Meal::require(conn, data.meal_id)?;
        let ingredient = Ingredient::require(conn, data.ingredient_id)?;
        require_same_owner(meal.user_id, "Ingredient", ingredient.id, ingredient.user_id)?;
        if let Some(unit_id) = data.unit_id {
            ensure_unit_valid(conn, data.ingredient_id, unit_id)?;
        }
        if let Some(amount) = data.amount {
            require_positive("amount", amount)?;
        }

        let entry = MealIngredient::create(conn, &data)?;
        settle(conn, data.meal_id, Some(entry.id))
    })?)
}

pub fn update_meal_ingredient(
    db: &Database,
    id: i64,
    data: MealIngredientUpdate,
) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let entry = MealIngredient::get_by_id(conn, id)?
            .ok_or_else(|| DbError::not_found("MealIngredient", id))?;
        if let Some(unit_id) = data.unit_id {
            ensure_unit_valid(conn, entry.ingredient_id, unit_id)?;
        }
        if let Some(amount) = data.amount {
            require_positive("amount", amount)?;
        }

        MealIngredient::update(conn, id, &data)?;
        settle(conn, entry.meal_id, Some(id))
    })?)
}

pub fn remove_meal_ingredient(db: &Database, id: i64) -> ToolResult<MealMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let entry = MealIngredient::get_by_id(conn, id)?
            .ok_or_else(|| DbError::not_found("MealIngredient", id))?;
        MealIngredient::delete(conn, id)?;
        settle(conn, entry.meal_id, None)
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientCreate, Nutrients, RecipeCreate, RecipeIngredientCreate, Unit};
    use crate::tools::test_support::temp_database;
    use crate::tools::{ingredients, recipes, users, ToolError};

    struct Table {
        db: Database,
        _dir: tempfile::TempDir,
        user_id: i64,
        gram_id: i64,
        apple_id: i64,
        stew_id: i64,
    }

    /// An apple ingredient and a 4-portion, 400 kcal stew
    fn table() -> Table {
        let (dir, db) = temp_database();
        let user = users::create_user(&db, "anna").unwrap();
        let gram_id = db.with_conn(Unit::gram).unwrap().id;
        let apple = ingredients::add_ingredient(
            &db,
            IngredientCreate {
                user_id: user.id,
                name: "Apple".into(),
                ingredient_type: Default::default(),
                nutrients: Nutrients { calories: Some(52.0), ..Default::default() },
            },
        )
        .unwrap();
        let stew = recipes::create_recipe(
            &db,
            RecipeCreate {
                user_id: user.id,
                name: "Stew".into(),
                portions: 4,
                prepare_time: None,
                description: None,
            },
        )
        .unwrap();
        let beans = ingredients::add_ingredient(
            &db,
            IngredientCreate {
                user_id: user.id,
                name: "Beans".into(),
                ingredient_type: Default::default(),
                nutrients: Nutrients { calories: Some(100.0), ..Default::default() },
            },
        )
        .unwrap();
        recipes::add_recipe_ingredient(
            &db,
            RecipeIngredientCreate {
                recipe_id: stew.id,
                ingredient_id: beans.id,
                unit_id: Some(gram_id),
                amount: Some(400.0),
            },
        )
        .unwrap();

        Table { db, _dir: dir, user_id: user.id, gram_id, apple_id: apple.id, stew_id: stew.id }
    }

    fn new_meal(t: &Table) -> Meal {
        create_meal(&t.db, MealCreate { user_id: t.user_id, date: "2025-03-01".into(), category_id: None })
            .unwrap()
    }

    #[test]
    fn test_new_meal_has_zero_calories() {
        let t = table();
        let meal = new_meal(&t);
        assert_eq!(meal.calories, 0.0);
        assert_eq!(get_meal(&t.db, meal.id).unwrap().unwrap().recipes.len(), 0);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let t = table();
        let err = create_meal(&t.db, MealCreate { user_id: t.user_id, date: "March 1".into(), category_id: None })
            .unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));
    }

    #[test]
    fn test_recipe_portions_scale_meal() {
        let t = table();
        let meal = new_meal(&t);

        let added = add_meal_recipe(&t.db, meal.id, t.stew_id, 1.0).unwrap();
        assert_eq!(added.calories, 100.0);

        let updated = update_meal_recipe(&t.db, added.entry_id.unwrap(), 2.0).unwrap();
        assert_eq!(updated.calories, 200.0);

        let removed = remove_meal_recipe(&t.db, added.entry_id.unwrap()).unwrap();
        assert_eq!(removed.calories, 0.0);
    }

    #[test]
    fn test_direct_ingredients_add_up() {
        let t = table();
        let meal = new_meal(&t);
        add_meal_recipe(&t.db, meal.id, t.stew_id, 1.0).unwrap();

        let added = add_meal_ingredient(
            &t.db,
            MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: t.apple_id,
                unit_id: Some(t.gram_id),
                amount: Some(150.0),
            },
        )
        .unwrap();
        assert_eq!(added.calories, 178.0);

        let updated = update_meal_ingredient(
            &t.db,
            added.entry_id.unwrap(),
            MealIngredientUpdate { amount: Some(100.0), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.calories, 152.0);

        let listed = list_meals(&t.db, t.user_id, "2025-03-01").unwrap();
        assert_eq!(listed.total_calories, 152.0);
    }

    #[test]
    fn test_removing_ingredient_recalculates_meal() {
        let t = table();
        let meal = new_meal(&t);
        add_meal_recipe(&t.db, meal.id, t.stew_id, 1.0).unwrap();
        let added = add_meal_ingredient(
            &t.db,
            MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: t.apple_id,
                unit_id: Some(t.gram_id),
                amount: Some(150.0),
            },
        )
        .unwrap();
        assert_eq!(added.calories, 178.0);

        let removed = remove_meal_ingredient(&t.db, added.entry_id.unwrap()).unwrap();
        assert_eq!(removed.calories, 100.0);

        let detail = get_meal(&t.db, meal.id).unwrap().unwrap();
        assert_eq!(detail.calories, 100.0);
        assert!(detail.ingredients.is_empty());
    }

    #[test]
    fn test_invalid_unit_leaves_no_meal_ingredient() {
        let t = table();
        let meal = new_meal(&t);
        let slice = users::create_unit(&t.db, "slice").unwrap();

        let err = add_meal_ingredient(
            &t.db,
            MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: t.apple_id,
                unit_id: Some(slice.id),
                amount: Some(2.0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));
        assert!(get_meal(&t.db, meal.id).unwrap().unwrap().ingredients.is_empty());
    }

    #[test]
    fn test_non_positive_portion_is_rejected() {
        let t = table();
        let meal = new_meal(&t);
        assert!(add_meal_recipe(&t.db, meal.id, t.stew_id, 0.0).is_err());
        assert!(add_meal_recipe(&t.db, meal.id, t.stew_id, -1.0).is_err());
    }

    #[test]
    fn test_category_must_belong_to_user() {
        let t = table();
        let other = users::create_user(&t.db, "ben").unwrap();
        let category = users::create_meal_category(&t.db, other.id, "Lunch").unwrap();

        let err = create_meal(
            &t.db,
            MealCreate { user_id: t.user_id, date: "2025-03-01".into(), category_id: Some(category.id) },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));
    }

    #[test]
    fn test_other_users_recipe_and_ingredient_are_rejected() {
        let t = table();
        let meal = new_meal(&t);
        let ben = users::create_user(&t.db, "ben").unwrap();
        let oil = ingredients::add_ingredient(
            &t.db,
            IngredientCreate {
                user_id: ben.id,
                name: "Oil".into(),
                ingredient_type: Default::default(),
                nutrients: Nutrients { calories: Some(900.0), ..Default::default() },
            },
        )
        .unwrap();
        let fries = recipes::create_recipe(
            &t.db,
            RecipeCreate {
                user_id: ben.id,
                name: "Fries".into(),
                portions: 1,
                prepare_time: None,
                description: None,
            },
        )
        .unwrap();

        let err = add_meal_recipe(&t.db, meal.id, fries.id, 1.0).unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));

        let err = add_meal_ingredient(
            &t.db,
            MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: oil.id,
                unit_id: Some(t.gram_id),
                amount: Some(10.0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));

        let detail = get_meal(&t.db, meal.id).unwrap().unwrap();
        assert!(detail.recipes.is_empty());
        assert!(detail.ingredients.is_empty());
        assert_eq!(detail.calories, 0.0);
    }
}
