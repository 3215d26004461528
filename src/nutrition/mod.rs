//! Nutrition calculation module
//!
//! Unit conversion, aggregate calculation and the recalculation cascade.

pub mod aggregate;
pub mod cascade;
pub mod converter;
pub mod units;

pub use aggregate::{
    meal_calories, recalculate_meal_calories, recalculate_recipe_nutrition, recipe_totals,
    IngredientLine, LineSource, RecipePortionLine,
};
pub use cascade::{
    recalculate_affected, recalculate_all, recalculate_meal, recalculate_meals_for_recipe,
    recalculate_recipe, recalculate_recipes_for_ingredient, CascadeFailure, CascadeReport,
};
pub use converter::{ensure_unit_valid, grams_for, resolve_factor, to_grams, to_grams_checked};
pub use units::{standard_grams_per_unit, UnitFactor};
