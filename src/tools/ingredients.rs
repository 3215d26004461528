//! Ingredient MCP Tools
//!
//! Ingredients, their per-100 g nutrition and their unit mappings. Changes
//! that affect nutrition fan out to every recipe and meal using the
//! ingredient.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{
    Ingredient, IngredientCreate, IngredientUnit, IngredientUpdate, Unit, User,
};
use crate::nutrition::{
    recalculate_affected, recalculate_recipes_for_ingredient, standard_grams_per_unit,
    CascadeReport,
};
use super::{require_name, require_positive, ToolResult};

/// Ingredient with its unit mappings
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub units: Vec<IngredientUnit>,
    pub used_in_recipes: usize,
    pub used_in_meals: usize,
}

/// Response for list_ingredients
#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub ingredients: Vec<Ingredient>,
    pub count: usize,
}

/// Response for mutations that may have triggered recalculation
#[derive(Debug, Serialize)]
pub struct IngredientMutationResponse<T: Serialize> {
    #[serde(flatten)]
    pub value: T,
    pub recalculated: CascadeReport,
}

/// Response for delete_ingredient
#[derive(Debug, Serialize)]
pub struct DeleteIngredientResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub recalculated: CascadeReport,
}

/// Response for remove_unit_mapping
#[derive(Debug, Serialize)]
pub struct RemoveMappingResponse {
    pub success: bool,
    pub ingredient_id: i64,
    pub unit_id: i64,
    pub recalculated: CascadeReport,
}

/// Add an ingredient. Its gram mapping is created alongside.
pub fn add_ingredient(db: &Database, data: IngredientCreate) -> ToolResult<Ingredient> {
    let ingredient = db.with_transaction(|conn| {
        require_name("Ingredient name", &data.name)?;
        User::get_by_id(conn, data.user_id)?
            .ok_or_else(|| DbError::not_found("User", data.user_id))?;
        if Ingredient::get_by_name(conn, data.user_id, &data.name)?.is_some() {
            return Err(DbError::Validation(format!(
                "Ingredient '{}' already exists",
                data.name.trim()
            )));
        }
        Ingredient::create(conn, &data)
    })?;

    tracing::info!(ingredient_id = ingredient.id, name = %ingredient.name, "Added ingredient");
    Ok(ingredient)
}

/// Get an ingredient with its mappings and usage counts
pub fn get_ingredient(db: &Database, id: i64) -> ToolResult<Option<IngredientDetail>> {
    Ok(db.with_conn(|conn| {
        let Some(ingredient) = Ingredient::get_by_id(conn, id)? else {
            return Ok(None);
        };
        Ok(Some(IngredientDetail {
            units: IngredientUnit::list_for_ingredient(conn, id)?,
            used_in_recipes: Ingredient::recipe_ids_using(conn, id)?.len(),
            used_in_meals: Ingredient::meal_ids_using(conn, id)?.len(),
            ingredient,
        }))
    })?)
}

/// List a user's ingredients, optionally filtered by name
pub fn list_ingredients(
    db: &Database,
    user_id: i64,
    query: Option<&str>,
) -> ToolResult<ListIngredientsResponse> {
    let ingredients = db.with_conn(|conn| Ingredient::list_for_user(conn, user_id, query))?;
    Ok(ListIngredientsResponse { count: ingredients.len(), ingredients })
}

/// Update an ingredient. Nutrition changes recalculate its recipes and meals.
pub fn update_ingredient(
    db: &Database,
    id: i64,
    data: IngredientUpdate,
) -> ToolResult<IngredientMutationResponse<Ingredient>> {
    Ok(db.with_transaction(|conn| {
        let current = Ingredient::require(conn, id)?;
        if let Some(ref name) = data.name {
            require_name("Ingredient name", name)?;
            if let Some(other) = Ingredient::get_by_name(conn, current.user_id, name)? {
                if other.id != id {
                    return Err(DbError::Validation(format!(
                        "Ingredient '{}' already exists",
                        name.trim()
                    )));
                }
            }
        }

        let ingredient = Ingredient::update(conn, id, &data)?
            .ok_or_else(|| DbError::not_found("Ingredient", id))?;

        let recalculated = if data.touches_aggregates() {
            recalculate_recipes_for_ingredient(conn, id)?
        } else {
            CascadeReport::default()
        };

        Ok(IngredientMutationResponse { value: ingredient, recalculated })
    })?)
}

/// Delete an ingredient and recalculate everything that used it
pub fn delete_ingredient(db: &Database, id: i64) -> ToolResult<DeleteIngredientResponse> {
    let recalculated = db.with_transaction(|conn| {
        Ingredient::require(conn, id)?;
        let recipe_ids = Ingredient::recipe_ids_using(conn, id)?;
        let meal_ids = Ingredient::meal_ids_using(conn, id)?;

        Ingredient::delete(conn, id)?;
        recalculate_affected(conn, &recipe_ids, &meal_ids)
    })?;

    tracing::info!(
        ingredient_id = id,
        recipes = recalculated.recipes_recalculated.len(),
        meals = recalculated.meals_recalculated.len(),
        "Deleted ingredient"
    );
    Ok(DeleteIngredientResponse { success: true, deleted_id: id, recalculated })
}

/// Map a unit to grams for an ingredient.
///
/// The unit is created if it does not exist yet. Without a factor, standard
/// mass units use their fixed gram weight; any other unit needs one.
pub fn add_unit_mapping(
    db: &Database,
    ingredient_id: i64,
    unit_name: &str,
    grams_in_one_unit: Option<f64>,
) -> ToolResult<IngredientUnit> {
    Ok(db.with_transaction(|conn| {
        Ingredient::require(conn, ingredient_id)?;
        let unit = Unit::get_or_create(conn, unit_name)?;

        let grams = match grams_in_one_unit.or_else(|| standard_grams_per_unit(&unit.name)) {
            Some(grams) => grams,
            None => {
                return Err(DbError::Validation(format!(
                    "grams_in_one_unit is required for unit '{}'",
                    unit.name
                )))
            }
        };

        IngredientUnit::create(conn, ingredient_id, unit.id, grams)
    })?)
}

/// Change a mapping's gram factor and recalculate dependents
pub fn update_unit_mapping(
    db: &Database,
    ingredient_id: i64,
    unit_id: i64,
    grams_in_one_unit: f64,
) -> ToolResult<IngredientMutationResponse<IngredientUnit>> {
    Ok(db.with_transaction(|conn| {
        require_positive("grams_in_one_unit", grams_in_one_unit)?;
        let mapping = IngredientUnit::update_factor(conn, ingredient_id, unit_id, grams_in_one_unit)?
            .ok_or_else(|| {
                DbError::Validation(format!(
                    "Ingredient {} has no mapping for unit {}",
                    ingredient_id, unit_id
                ))
            })?;

        let recalculated = recalculate_recipes_for_ingredient(conn, ingredient_id)?;
        Ok(IngredientMutationResponse { value: mapping, recalculated })
    })?)
}

/// Remove a mapping. Refused while any recipe or meal line still uses the unit.
pub fn remove_unit_mapping(
    db: &Database,
    ingredient_id: i64,
    unit_id: i64,
) -> ToolResult<RemoveMappingResponse> {
    Ok(db.with_transaction(|conn| {
        let mapping = IngredientUnit::get(conn, ingredient_id, unit_id)?.ok_or_else(|| {
            DbError::Validation(format!(
                "Ingredient {} has no mapping for unit {}",
                ingredient_id, unit_id
            ))
        })?;

        let in_use = IngredientUnit::usage_count(conn, ingredient_id, unit_id)?;
        if in_use > 0 {
            return Err(DbError::Validation(format!(
                "Unit '{}' is still used by {} recipe or meal line(s) of ingredient {}",
                mapping.unit_name, in_use, ingredient_id
            )));
        }

        IngredientUnit::delete(conn, ingredient_id, unit_id)?;
        let recalculated = recalculate_recipes_for_ingredient(conn, ingredient_id)?;
        Ok(RemoveMappingResponse { success: true, ingredient_id, unit_id, recalculated })
    })?)
}
