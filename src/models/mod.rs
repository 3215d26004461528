//! Data models
//!
//! Rust structs representing database entities.

mod health_metric;
mod ingredient;
mod ingredient_unit;
mod meal;
mod meal_category;
mod meal_ingredient;
mod meal_recipe;
mod nutrition;
mod recipe;
mod recipe_ingredient;
mod unit;
mod user;

pub use health_metric::{HealthMetric, HealthMetricRecord};
pub use ingredient::{Ingredient, IngredientCreate, IngredientType, IngredientUpdate};
pub use ingredient_unit::IngredientUnit;
pub use meal::{Meal, MealCreate, MealUpdate};
pub use meal_category::MealCategory;
pub use meal_ingredient::{
    MealIngredient, MealIngredientCreate, MealIngredientDetail, MealIngredientUpdate,
};
pub use meal_recipe::{MealRecipe, MealRecipeDetail};
pub use nutrition::{round2, Nutrients, Nutrition};
pub use recipe::{Recipe, RecipeCreate, RecipeUpdate};
pub use recipe_ingredient::{
    RecipeIngredient, RecipeIngredientCreate, RecipeIngredientDetail, RecipeIngredientUpdate,
};
pub use unit::Unit;
pub use user::User;
