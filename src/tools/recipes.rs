//! Recipe MCP Tools
//!
//! Tools for managing recipes and their ingredients. Every change to a
//! recipe's ingredient list recalculates the recipe and then its meals.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{Database, DbError, DbResult};
use crate::models::{
    Ingredient, Nutrition, Recipe, RecipeCreate, RecipeIngredient, RecipeIngredientCreate,
    RecipeIngredientDetail, RecipeIngredientUpdate, RecipeUpdate, User,
};
use crate::nutrition::{
    ensure_unit_valid, recalculate_affected, recalculate_meals_for_recipe, recalculate_recipe,
    CascadeReport,
};
use super::{require_name, require_positive, require_same_owner, ToolResult};

/// Full recipe detail with ingredients
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub portions: i64,
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
    pub nutrition: Nutrition,
    pub nutrition_per_portion: Nutrition,
    pub ingredients: Vec<RecipeIngredientDetail>,
    pub used_in_meals: usize,
    pub created_at: String,
    pub updated_at: String,
}

/// Recipe summary for listing
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub portions: i64,
    pub calories: f64,
}

/// Response for list_recipes
#[derive(Debug, Serialize)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub count: usize,
}

/// Response for recipe and recipe-ingredient mutations
#[derive(Debug, Serialize)]
pub struct RecipeMutationResponse {
    pub recipe_id: i64,
    pub nutrition: Nutrition,
    pub recalculated: CascadeReport,
}

/// Response for add_recipe_ingredient
#[derive(Debug, Serialize)]
pub struct AddIngredientResponse {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
    pub nutrition: Nutrition,
    pub recalculated: CascadeReport,
}

/// Response for delete_recipe
#[derive(Debug, Serialize)]
pub struct DeleteRecipeResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub recalculated: CascadeReport,
}

fn validate_portions(portions: i64) -> DbResult<()> {
    if portions < 1 {
        return Err(DbError::Validation("portions must be at least 1".to_string()));
    }
    Ok(())
}

/// A unit and amount pair is checked against the ingredient's mappings
fn validate_line(
    conn: &Connection,
    ingredient_id: i64,
    unit_id: Option<i64>,
    amount: Option<f64>,
) -> DbResult<()> {
    if let Some(unit_id) = unit_id {
        ensure_unit_valid(conn, ingredient_id, unit_id)?;
    }
    if let Some(amount) = amount {
        require_positive("amount", amount)?;
    }
    Ok(())
}

/// Recalculate a recipe after its ingredient list changed
fn settle(conn: &Connection, recipe_id: i64) -> DbResult<RecipeMutationResponse> {
    let recalculated = recalculate_recipe(conn, recipe_id)?;
    let recipe = Recipe::require(conn, recipe_id)?;
    Ok(RecipeMutationResponse { recipe_id, nutrition: recipe.nutrition, recalculated })
}

// ============================================================================
// Recipe Tools
// ============================================================================

/// Create a new recipe
pub fn create_recipe(db: &Database, data: RecipeCreate) -> ToolResult<Recipe> {
    let recipe = db.with_transaction(|conn| {
        require_name("Recipe name", &data.name)?;
        validate_portions(data.portions)?;
        User::get_by_id(conn, data.user_id)?
            .ok_or_else(|| DbError::not_found("User", data.user_id))?;
        Recipe::create(conn, &data)
    })?;

    tracing::info!(recipe_id = recipe.id, name = %recipe.name, "Created recipe");
    Ok(recipe)
}

/// Get a recipe with full details
pub fn get_recipe(db: &Database, id: i64) -> ToolResult<Option<RecipeDetail>> {
    Ok(db.with_conn(|conn| {
        let Some(recipe) = Recipe::get_by_id(conn, id)? else {
            return Ok(None);
        };

        let ingredients = RecipeIngredient::get_details_for_recipe(conn, id)?;
        let used_in_meals = Recipe::meal_ids_using(conn, id)?.len();
        let nutrition_per_portion = recipe.nutrition.scale(1.0 / recipe.portions as f64).rounded();

        Ok(Some(RecipeDetail {
            id: recipe.id,
            user_id: recipe.user_id,
            name: recipe.name,
            portions: recipe.portions,
            prepare_time: recipe.prepare_time,
            description: recipe.description,
            nutrition: recipe.nutrition,
            nutrition_per_portion,
            ingredients,
            used_in_meals,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }))
    })?)
}

/// List a user's recipes, optionally filtered by name
pub fn list_recipes(db: &Database, user_id: i64, query: Option<&str>) -> ToolResult<ListRecipesResponse> {
    let recipes = db.with_conn(|conn| Recipe::list_for_user(conn, user_id, query))?;

    let recipes: Vec<RecipeSummary> = recipes
        .into_iter()
        .map(|r| RecipeSummary {
            id: r.id,
            name: r.name,
            portions: r.portions,
            calories: r.nutrition.calories,
        })
        .collect();

    Ok(ListRecipesResponse { count: recipes.len(), recipes })
}

/// Update a recipe. Changing portions rescales every meal that uses it.
pub fn update_recipe(db: &Database, id: i64, data: RecipeUpdate) -> ToolResult<RecipeMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let current = Recipe::require(conn, id)?;
        if let Some(ref name) = data.name {
            require_name("Recipe name", name)?;
        }
        if let Some(portions) = data.portions {
            validate_portions(portions)?;
        }

        let recipe = Recipe::update(conn, id, &data)?.ok_or_else(|| DbError::not_found("Recipe", id))?;

        let recalculated = if recipe.portions != current.portions {
            recalculate_meals_for_recipe(conn, id)?
        } else {
            CascadeReport::default()
        };

        Ok(RecipeMutationResponse { recipe_id: id, nutrition: recipe.nutrition, recalculated })
    })?)
}

/// Delete a recipe and recalculate the meals that included it
pub fn delete_recipe(db: &Database, id: i64) -> ToolResult<DeleteRecipeResponse> {
    let recalculated = db.with_transaction(|conn| {
        Recipe::require(conn, id)?;
        let meal_ids = Recipe::meal_ids_using(conn, id)?;

        Recipe::delete(conn, id)?;
        recalculate_affected(conn, &[], &meal_ids)
    })?;

    tracing::info!(recipe_id = id, meals = recalculated.meals_recalculated.len(), "Deleted recipe");
    Ok(DeleteRecipeResponse { success: true, deleted_id: id, recalculated })
}

/// Recalculate a recipe on request
pub fn recalculate_recipe_nutrition(db: &Database, id: i64) -> ToolResult<RecipeMutationResponse> {
    Ok(db.with_transaction(|conn| settle(conn, id))?)
}

// ============================================================================
// Recipe Ingredient Tools
// ============================================================================

/// Add an ingredient to a recipe
pub fn add_recipe_ingredient(db: &Database, data: RecipeIngredientCreate) -> ToolResult<AddIngredientResponse> {
    Ok(db.with_transaction(|conn| {
        let recipe = Recipe::require(conn, data.recipe_id)?;
        let ingredient = Ingredient::require(conn, data.ingredient_id)?;
        require_same_owner(recipe.user_id, "Ingredient", ingredient.id, ingredient.user_id)?;
        validate_line(conn, data.ingredient_id, data.unit_id, data.amount)?;

        let line = RecipeIngredient::create(conn, &data)?;
        let settled = settle(conn, data.recipe_id)?;

        Ok(AddIngredientResponse {
            id: line.id,
            recipe_id: line.recipe_id,
            ingredient_id: line.ingredient_id,
            unit_id: line.unit_id,
            amount: line.amount,
            nutrition: settled.nutrition,
            recalculated: settled.recalculated,
        })
    })?)
}

/// Change the unit or amount of a recipe ingredient
pub fn update_recipe_ingredient(
    db: &Database,
    id: i64,
    data: RecipeIngredientUpdate,
) -> ToolResult<RecipeMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let line = RecipeIngredient::get_by_id(conn, id)?
            .ok_or_else(|| DbError::not_found("RecipeIngredient", id))?;
        validate_line(conn, line.ingredient_id, data.unit_id, data.amount)?;

        RecipeIngredient::update(conn, id, &data)?;
        settle(conn, line.recipe_id)
    })?)
}

/// Remove an ingredient from a recipe
pub fn remove_recipe_ingredient(db: &Database, id: i64) -> ToolResult<RecipeMutationResponse> {
    Ok(db.with_transaction(|conn| {
        let line = RecipeIngredient::get_by_id(conn, id)?
            .ok_or_else(|| DbError::not_found("RecipeIngredient", id))?;

        RecipeIngredient::delete(conn, id)?;
        settle(conn, line.recipe_id)
    })?)
}

/// Remove every ingredient from a recipe
pub fn clear_recipe_ingredients(db: &Database, recipe_id: i64) -> ToolResult<RecipeMutationResponse> {
    Ok(db.with_transaction(|conn| {
        Recipe::require(conn, recipe_id)?;
        let removed = RecipeIngredient::clear_for_recipe(conn, recipe_id)?;
        tracing::debug!(recipe_id, removed, "Cleared recipe ingredients");
        settle(conn, recipe_id)
    })?)
}
