//! Nutritrack MCP Server Implementation
//!
//! Implements the MCP server with all Nutritrack tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{
    HealthMetricRecord, IngredientCreate, IngredientType, IngredientUpdate, MealCreate,
    MealIngredientCreate, MealIngredientUpdate, MealUpdate, Nutrients, RecipeCreate,
    RecipeIngredientCreate, RecipeIngredientUpdate, RecipeUpdate,
};
use crate::tools::status::StatusTracker;
use crate::tools::{ingredients, meals, metrics, recipes, status, users, ToolError};

/// Nutritrack MCP Service
#[derive(Clone)]
pub struct NutritrackService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<NutritrackService>,
}

impl NutritrackService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

impl From<ToolError> for McpError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Invalid(message) => McpError::invalid_params(message, None),
            ToolError::Internal(message) => McpError::internal_error(message, None),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_ingredient_type(raw: Option<&str>) -> Result<Option<IngredientType>, McpError> {
    Ok(raw.map(str::parse::<IngredientType>).transpose().map_err(ToolError::from)?)
}

/// Serialize a lookup result, or a not-found payload for `None`
fn found_or_missing<T: Serialize>(value: Option<T>, entity: &str, id: i64) -> Result<CallToolResult, McpError> {
    match value {
        Some(value) => to_json(&value),
        None => Ok(CallToolResult::success(vec![Content::text(format!(
            r#"{{"error": "{} not found", "id": {}}}"#,
            entity, id
        ))])),
    }
}

// ============================================================================
// User, Unit and Category Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateUserParams {
    /// Unique username
    pub username: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateUnitParams {
    /// Unit name, e.g. "cup", "slice", "tbsp" (stored lowercase)
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserIdParams {
    /// User ID
    pub user_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMealCategoryParams {
    /// Owning user ID
    pub user_id: i64,
    /// Category name, e.g. "breakfast"
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    /// Owning user ID
    pub user_id: i64,
    /// Ingredient name, unique per user
    pub name: String,
    /// "solid" (default) or "liquid"
    pub ingredient_type: Option<String>,
    /// kcal per 100 g
    pub calories: Option<f64>,
    /// Grams per 100 g
    pub protein: Option<f64>,
    /// Grams per 100 g
    pub carbs: Option<f64>,
    /// Grams per 100 g
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sodium: Option<f64>,
    pub potassium: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
    pub magnesium: Option<f64>,
    pub selenium: Option<f64>,
    pub zinc: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListIngredientsParams {
    /// User ID
    pub user_id: i64,
    /// Name fragment to filter by (optional)
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    /// Ingredient ID
    pub id: i64,
    pub name: Option<String>,
    /// "solid" or "liquid"
    pub ingredient_type: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sodium: Option<f64>,
    pub potassium: Option<f64>,
    pub calcium: Option<f64>,
    pub iron: Option<f64>,
    pub magnesium: Option<f64>,
    pub selenium: Option<f64>,
    pub zinc: Option<f64>,
    /// Nutrient names to reset to unknown, e.g. ["fiber", "sodium"]
    pub clear: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddUnitMappingParams {
    /// Ingredient ID
    pub ingredient_id: i64,
    /// Unit name; created if it does not exist
    pub unit: String,
    /// Grams in one unit. Optional for kg, mg, oz and lb.
    pub grams_in_one_unit: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateUnitMappingParams {
    pub ingredient_id: i64,
    pub unit_id: i64,
    /// New grams in one unit (> 0)
    pub grams_in_one_unit: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveUnitMappingParams {
    pub ingredient_id: i64,
    pub unit_id: i64,
}

// ============================================================================
// Recipe Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    /// Owning user ID
    pub user_id: i64,
    /// Name of the recipe
    pub name: String,
    /// Number of portions the recipe yields (default 1, at least 1)
    #[serde(default = "default_portions")]
    pub portions: i64,
    /// Preparation time in minutes
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
}

fn default_portions() -> i64 { 1 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRecipesParams {
    /// User ID
    pub user_id: i64,
    /// Search query for recipe name (optional)
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeParams {
    /// Recipe ID
    pub id: i64,
    pub name: Option<String>,
    /// New portion count; meals using the recipe are rescaled
    pub portions: Option<i64>,
    pub prepare_time: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddRecipeIngredientParams {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    /// Unit ID; must be gram or mapped for the ingredient
    pub unit_id: Option<i64>,
    /// Amount in that unit
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeIngredientParams {
    /// Recipe ingredient ID
    pub id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMealParams {
    pub user_id: i64,
    /// Date (ISO format: YYYY-MM-DD)
    pub date: String,
    /// Meal category ID (optional)
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMealsParams {
    pub user_id: i64,
    /// Date (ISO format: YYYY-MM-DD)
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealParams {
    /// Meal ID
    pub id: i64,
    /// New date (YYYY-MM-DD)
    pub date: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMealRecipeParams {
    pub meal_id: i64,
    pub recipe_id: i64,
    /// How many of the recipe's portions were eaten (> 0)
    pub portion: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealRecipeParams {
    /// Meal recipe ID
    pub id: i64,
    pub portion: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMealIngredientParams {
    pub meal_id: i64,
    pub ingredient_id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealIngredientParams {
    /// Meal ingredient ID
    pub id: i64,
    pub unit_id: Option<i64>,
    pub amount: Option<f64>,
}

// ============================================================================
// Health Metric Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordHealthMetricParams {
    pub user_id: i64,
    /// Date (ISO format: YYYY-MM-DD)
    pub date: String,
    /// Body weight in kg
    pub weight: Option<f64>,
    pub sleep_minutes: Option<i64>,
    /// Resting heart rate in bpm
    pub resting_heart_rate: Option<i64>,
    /// Calories burned through activity
    pub burned_calories: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserDateParams {
    pub user_id: i64,
    /// Date (ISO format: YYYY-MM-DD)
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListHealthMetricsParams {
    pub user_id: i64,
    /// Start date, inclusive
    pub from: String,
    /// End date, inclusive
    pub to: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecalculateAllParams {
    /// Restrict to one user (optional)
    pub user_id: Option<i64>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutritrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the Nutritrack service including build info, database status, and process information")]
    async fn nutritrack_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status(&self.database))
    }

    #[tool(description = "Get instructions for tracking ingredients, recipes, meals and health metrics. Call this when starting a session or when unsure how the tools fit together.")]
    fn nutrition_instructions(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(status::NUTRITION_INSTRUCTIONS)]))
    }

    #[tool(description = "Recompute every recipe and meal total, optionally for one user")]
    fn recalculate_all(&self, Parameters(p): Parameters<RecalculateAllParams>) -> Result<CallToolResult, McpError> {
        to_json(&status::recalculate_all(&self.database, p.user_id)?)
    }

    // --- Users, Units, Categories ---

    #[tool(description = "Create a user. Users only scope ownership of data.")]
    fn create_user(&self, Parameters(p): Parameters<CreateUserParams>) -> Result<CallToolResult, McpError> {
        to_json(&users::create_user(&self.database, &p.username)?)
    }

    #[tool(description = "List all users")]
    fn list_users(&self) -> Result<CallToolResult, McpError> {
        to_json(&users::list_users(&self.database)?)
    }

    #[tool(description = "Create a measurement unit (returns the existing one if the name is taken)")]
    fn create_unit(&self, Parameters(p): Parameters<CreateUnitParams>) -> Result<CallToolResult, McpError> {
        to_json(&users::create_unit(&self.database, &p.name)?)
    }

    #[tool(description = "List all measurement units")]
    fn list_units(&self) -> Result<CallToolResult, McpError> {
        to_json(&users::list_units(&self.database)?)
    }

    #[tool(description = "Create a meal category for a user")]
    fn create_meal_category(&self, Parameters(p): Parameters<CreateMealCategoryParams>) -> Result<CallToolResult, McpError> {
        to_json(&users::create_meal_category(&self.database, p.user_id, &p.name)?)
    }

    #[tool(description = "List a user's meal categories")]
    fn list_meal_categories(&self, Parameters(p): Parameters<UserIdParams>) -> Result<CallToolResult, McpError> {
        to_json(&users::list_meal_categories(&self.database, p.user_id)?)
    }

    #[tool(description = "Delete a meal category. Meals in it keep existing without a category.")]
    fn delete_meal_category(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&users::delete_meal_category(&self.database, p.id)?)
    }

    // --- Ingredients ---

    #[tool(description = "Add an ingredient with nutrition per 100 g. A gram unit mapping is created automatically.")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate {
            user_id: p.user_id,
            name: p.name,
            ingredient_type: parse_ingredient_type(p.ingredient_type.as_deref())?.unwrap_or_default(),
            nutrients: Nutrients {
                calories: p.calories, protein: p.protein, carbs: p.carbs, fat: p.fat,
                fiber: p.fiber, sodium: p.sodium, potassium: p.potassium, calcium: p.calcium,
                iron: p.iron, magnesium: p.magnesium, selenium: p.selenium, zinc: p.zinc,
            },
        };
        to_json(&ingredients::add_ingredient(&self.database, data)?)
    }

    #[tool(description = "Get an ingredient with its unit mappings and usage counts")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        found_or_missing(ingredients::get_ingredient(&self.database, p.id)?, "Ingredient", p.id)
    }

    #[tool(description = "List a user's ingredients, optionally filtered by name")]
    fn list_ingredients(&self, Parameters(p): Parameters<ListIngredientsParams>) -> Result<CallToolResult, McpError> {
        to_json(&ingredients::list_ingredients(&self.database, p.user_id, p.query.as_deref())?)
    }

    #[tool(description = "Update an ingredient. Nutrition changes recalculate every recipe and meal using it. List nutrients in `clear` to reset them to unknown.")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let mut data = IngredientUpdate {
            name: p.name,
            ingredient_type: parse_ingredient_type(p.ingredient_type.as_deref())?,
            calories: p.calories.map(Some), protein: p.protein.map(Some),
            carbs: p.carbs.map(Some), fat: p.fat.map(Some),
            fiber: p.fiber.map(Some), sodium: p.sodium.map(Some),
            potassium: p.potassium.map(Some), calcium: p.calcium.map(Some),
            iron: p.iron.map(Some), magnesium: p.magnesium.map(Some),
            selenium: p.selenium.map(Some), zinc: p.zinc.map(Some),
        };
        for field in p.clear.iter().flatten() {
            data.clear_nutrient(field).map_err(ToolError::from)?;
        }
        to_json(&ingredients::update_ingredient(&self.database, p.id, data)?)
    }

    #[tool(description = "Delete an ingredient. Recipes and meals that used it are recalculated.")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&ingredients::delete_ingredient(&self.database, p.id)?)
    }

    #[tool(description = "Map a unit to grams for an ingredient, e.g. 1 cup of rice = 185 g")]
    fn add_unit_mapping(&self, Parameters(p): Parameters<AddUnitMappingParams>) -> Result<CallToolResult, McpError> {
        to_json(&ingredients::add_unit_mapping(&self.database, p.ingredient_id, &p.unit, p.grams_in_one_unit)?)
    }

    #[tool(description = "Change a unit mapping's grams. Recipes and meals using the ingredient are recalculated.")]
    fn update_unit_mapping(&self, Parameters(p): Parameters<UpdateUnitMappingParams>) -> Result<CallToolResult, McpError> {
        to_json(&ingredients::update_unit_mapping(&self.database, p.ingredient_id, p.unit_id, p.grams_in_one_unit)?)
    }

    #[tool(description = "Remove a unit mapping. The gram mapping cannot be removed, nor can a mapping still used by a recipe or meal line.")]
    fn remove_unit_mapping(&self, Parameters(p): Parameters<RemoveUnitMappingParams>) -> Result<CallToolResult, McpError> {
        to_json(&ingredients::remove_unit_mapping(&self.database, p.ingredient_id, p.unit_id)?)
    }

    // --- Recipes ---

    #[tool(description = "Create a new recipe. Nutrition is computed from its ingredients.")]
    fn create_recipe(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeCreate {
            user_id: p.user_id,
            name: p.name,
            portions: p.portions,
            prepare_time: p.prepare_time,
            description: p.description,
        };
        to_json(&recipes::create_recipe(&self.database, data)?)
    }

    #[tool(description = "Get a recipe with its ingredients and nutrition per recipe and per portion")]
    fn get_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        found_or_missing(recipes::get_recipe(&self.database, p.id)?, "Recipe", p.id)
    }

    #[tool(description = "List a user's recipes, optionally filtered by name")]
    fn list_recipes(&self, Parameters(p): Parameters<ListRecipesParams>) -> Result<CallToolResult, McpError> {
        to_json(&recipes::list_recipes(&self.database, p.user_id, p.query.as_deref())?)
    }

    #[tool(description = "Update a recipe's name, portions, prepare time or description")]
    fn update_recipe(&self, Parameters(p): Parameters<UpdateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeUpdate {
            name: p.name,
            portions: p.portions,
            prepare_time: p.prepare_time,
            description: p.description,
        };
        to_json(&recipes::update_recipe(&self.database, p.id, data)?)
    }

    #[tool(description = "Delete a recipe. Meals that included it are recalculated.")]
    fn delete_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&recipes::delete_recipe(&self.database, p.id)?)
    }

    #[tool(description = "Add an ingredient to a recipe with a unit and amount")]
    fn add_recipe_ingredient(&self, Parameters(p): Parameters<AddRecipeIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeIngredientCreate {
            recipe_id: p.recipe_id,
            ingredient_id: p.ingredient_id,
            unit_id: p.unit_id,
            amount: p.amount,
        };
        to_json(&recipes::add_recipe_ingredient(&self.database, data)?)
    }

    #[tool(description = "Change the unit or amount of a recipe ingredient")]
    fn update_recipe_ingredient(&self, Parameters(p): Parameters<UpdateRecipeIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeIngredientUpdate { unit_id: p.unit_id, amount: p.amount };
        to_json(&recipes::update_recipe_ingredient(&self.database, p.id, data)?)
    }

    #[tool(description = "Remove an ingredient from a recipe")]
    fn remove_recipe_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&recipes::remove_recipe_ingredient(&self.database, p.id)?)
    }

    #[tool(description = "Remove every ingredient from a recipe")]
    fn clear_recipe_ingredients(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&recipes::clear_recipe_ingredients(&self.database, p.id)?)
    }

    #[tool(description = "Recalculate a recipe's nutrition and the meals that include it")]
    fn recalculate_recipe_nutrition(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&recipes::recalculate_recipe_nutrition(&self.database, p.id)?)
    }

    // --- Meals ---

    #[tool(description = "Create an empty meal on a date")]
    fn create_meal(&self, Parameters(p): Parameters<CreateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealCreate { user_id: p.user_id, date: p.date, category_id: p.category_id };
        to_json(&meals::create_meal(&self.database, data)?)
    }

    #[tool(description = "Get a meal with its recipes, ingredients and calories")]
    fn get_meal(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        found_or_missing(meals::get_meal(&self.database, p.id)?, "Meal", p.id)
    }

    #[tool(description = "List a user's meals on a date with the day's total calories")]
    fn list_meals(&self, Parameters(p): Parameters<ListMealsParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::list_meals(&self.database, p.user_id, &p.date)?)
    }

    #[tool(description = "Move a meal to another date or category")]
    fn update_meal(&self, Parameters(p): Parameters<UpdateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealUpdate { date: p.date, category_id: p.category_id };
        to_json(&meals::update_meal(&self.database, p.id, data)?)
    }

    #[tool(description = "Delete a meal and its entries")]
    fn delete_meal(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::delete_meal(&self.database, p.id)?)
    }

    #[tool(description = "Add portions of a recipe to a meal")]
    fn add_meal_recipe(&self, Parameters(p): Parameters<AddMealRecipeParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::add_meal_recipe(&self.database, p.meal_id, p.recipe_id, p.portion)?)
    }

    #[tool(description = "Change how many portions of a recipe a meal contains")]
    fn update_meal_recipe(&self, Parameters(p): Parameters<UpdateMealRecipeParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::update_meal_recipe(&self.database, p.id, p.portion)?)
    }

    #[tool(description = "Remove a recipe from a meal")]
    fn remove_meal_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::remove_meal_recipe(&self.database, p.id)?)
    }

    #[tool(description = "Add an ingredient eaten directly to a meal")]
    fn add_meal_ingredient(&self, Parameters(p): Parameters<AddMealIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = MealIngredientCreate {
            meal_id: p.meal_id,
            ingredient_id: p.ingredient_id,
            unit_id: p.unit_id,
            amount: p.amount,
        };
        to_json(&meals::add_meal_ingredient(&self.database, data)?)
    }

    #[tool(description = "Change the unit or amount of a meal ingredient")]
    fn update_meal_ingredient(&self, Parameters(p): Parameters<UpdateMealIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = MealIngredientUpdate { unit_id: p.unit_id, amount: p.amount };
        to_json(&meals::update_meal_ingredient(&self.database, p.id, data)?)
    }

    #[tool(description = "Remove an ingredient from a meal")]
    fn remove_meal_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::remove_meal_ingredient(&self.database, p.id)?)
    }

    #[tool(description = "Recalculate a meal's calories")]
    fn recalculate_meal_calories(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::recalculate_meal_calories(&self.database, p.id)?)
    }

    // --- Health Metrics ---

    #[tool(description = "Record weight, sleep, resting heart rate or burned calories for a date. Omitted values keep what is stored.")]
    fn record_health_metric(&self, Parameters(p): Parameters<RecordHealthMetricParams>) -> Result<CallToolResult, McpError> {
        let data = HealthMetricRecord {
            weight: p.weight,
            sleep_minutes: p.sleep_minutes,
            resting_heart_rate: p.resting_heart_rate,
            burned_calories: p.burned_calories,
            notes: p.notes,
        };
        to_json(&metrics::record_health_metric(&self.database, p.user_id, &p.date, data)?)
    }

    #[tool(description = "Get the health metrics recorded on a date")]
    fn get_health_metric(&self, Parameters(p): Parameters<UserDateParams>) -> Result<CallToolResult, McpError> {
        match metrics::get_health_metric(&self.database, p.user_id, &p.date)? {
            Some(metric) => to_json(&metric),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "No health metric recorded", "date": "{}"}}"#,
                p.date
            ))])),
        }
    }

    #[tool(description = "List health metrics between two dates, inclusive")]
    fn list_health_metrics(&self, Parameters(p): Parameters<ListHealthMetricsParams>) -> Result<CallToolResult, McpError> {
        to_json(&metrics::list_health_metrics(&self.database, p.user_id, &p.from, &p.to)?)
    }

    #[tool(description = "Delete the health metrics recorded on a date")]
    fn delete_health_metric(&self, Parameters(p): Parameters<UserDateParams>) -> Result<CallToolResult, McpError> {
        to_json(&metrics::delete_health_metric(&self.database, p.user_id, &p.date)?)
    }

    #[tool(description = "Summarize a date: meals eaten, calories eaten, calories burned and net calories")]
    fn get_day_summary(&self, Parameters(p): Parameters<UserDateParams>) -> Result<CallToolResult, McpError> {
        to_json(&metrics::day_summary(&self.database, p.user_id, &p.date)?)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutritrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutritrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutritrack".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutritrack - ingredients, recipes, meals and daily health metrics with computed nutrition. \
                 IMPORTANT: Call nutrition_instructions first. \
                 Users: create_user/list_users. Units: create_unit/list_units. \
                 Categories: create/list/delete_meal_category. \
                 Ingredients: add/get/list/update/delete_ingredient, add/update/remove_unit_mapping. \
                 Recipes: create/get/list/update/delete_recipe, add/update/remove_recipe_ingredient, \
                 clear_recipe_ingredients, recalculate_recipe_nutrition. \
                 Meals: create/get/list/update/delete_meal, add/update/remove_meal_recipe, \
                 add/update/remove_meal_ingredient, recalculate_meal_calories. \
                 Health: record/get/delete_health_metric, list_health_metrics, get_day_summary. \
                 Recipe and meal totals are computed; they update whenever their inputs change. \
                 Maintenance: recalculate_all, nutritrack_status."
                    .into(),
            ),
        }
    }
}
